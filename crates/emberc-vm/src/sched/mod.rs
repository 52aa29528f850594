// SPDX-License-Identifier: MIT

//! Cooperative task scheduler, feature `scheduler`.
//!
//! Each [`Task`] owns its arena directly, so the scheduler here
//! multiplexes ownership of several independently-owned `Task`s and
//! round-robins which one's dispatch loop is currently running.
//! Preemption points remain between opcodes only — the timer handler
//! sets a flag and nothing else.


use crate::task::{StopReason, Task};
use alloc::vec::Vec;
use emberc_abi::HostSink;

/// Host-provided hook for the hardware interrupt seam the scheduler ticks
/// through. Bare-metal hosts wire this directly to their interrupt
/// controller; hosted targets needing no real timer can pass `()`, whose
/// default impls are all no-ops.
pub trait TimerTick {
    /// Arm the periodic interrupt that will go on to call
    /// [`Scheduler::timer_tick`].
    fn enable(&mut self) {}
    /// Disable it, e.g. around a critical section.
    fn disable(&mut self) {}
    /// Enter a low-power wait when every task is idle and no hardware
    /// timer is configured.
    fn idle(&mut self) {}
}

impl TimerTick for () {}

/// Opaque handle into a [`Scheduler`]'s task table. Stable for the life of
/// the task, even as other tasks finish and are dropped from rotation.
pub type TaskHandle = usize;

/// Round-robin multiplexer over independently-owned [`Task`]s.
pub struct Scheduler<'a> {
    tasks: Vec<Option<Task<'a>>>,
    current: usize,
    slice_ticks: u32,
    ticks_since_slice: u32,
}

impl<'a> Scheduler<'a> {
    #[must_use]
    pub fn new(slice_ticks: u32) -> Self {
        Self { tasks: Vec::new(), current: 0, slice_ticks: slice_ticks.max(1), ticks_since_slice: 0 }
    }

    /// Register a task with the scheduler. Returns a handle usable with
    /// [`Self::cancel`] and [`Self::task`].
    pub fn add_task(&mut self, task: Task<'a>) -> TaskHandle {
        self.tasks.push(Some(task));
        self.tasks.len() - 1
    }

    /// Timer interrupt entry point. Only ever sets the preemption flag on
    /// whichever task is about to run next and advances an internal
    /// counter — never touches a task's registers or call stack.
    pub fn timer_tick(&mut self) {
        self.ticks_since_slice += 1;
        if self.ticks_since_slice >= self.slice_ticks {
            self.ticks_since_slice = 0;
            if let Some(Some(t)) = self.tasks.get_mut(self.current) {
                t.tick();
            }
        }
    }

    /// Stop a task as if its time slice had just expired with nothing
    /// left to resume, and drop it from rotation.
    pub fn cancel(&mut self, handle: TaskHandle) {
        if let Some(slot) = self.tasks.get_mut(handle) {
            *slot = None;
        }
    }

    fn next_runnable(&self, after: usize) -> Option<usize> {
        let n = self.tasks.len();
        if n == 0 {
            return None;
        }
        (1..=n).map(|step| (after + step) % n).find(|&i| self.tasks[i].is_some())
    }

    /// Run whichever task is current until it is preempted or stops on
    /// its own, then advance to the next runnable task. `None` once every
    /// task has finished or been cancelled.
    pub fn run_one_slice(&mut self, sink: &mut dyn HostSink) -> Option<(TaskHandle, StopReason)> {
        let idx = if self.tasks.get(self.current).is_some_and(Option::is_some) {
            self.current
        } else {
            self.next_runnable(self.current)?
        };
        let reason = self.tasks[idx].as_mut()?.run(sink);
        if !matches!(reason, StopReason::Preempted) {
            self.tasks[idx] = None;
        }
        self.current = self.next_runnable(idx).unwrap_or(idx);
        Some((idx, reason))
    }

    /// Drive every registered task to completion, interleaving time
    /// slices round-robin. Returns once the task table is empty.
    pub fn run_to_completion(&mut self, sink: &mut dyn HostSink) {
        while self.tasks.iter().any(Option::is_some) {
            self.run_one_slice(sink);
        }
    }

    #[must_use]
    pub fn task(&self, handle: TaskHandle) -> Option<&Task<'a>> {
        self.tasks.get(handle)?.as_ref()
    }

    /// Drive scheduling with no hardware timer: between slices, idle the
    /// platform and tick once by hand instead of waiting for a real
    /// interrupt.
    pub fn run_with_fake_timer<T: TimerTick>(&mut self, sink: &mut dyn HostSink, hal: &mut T) {
        while self.tasks.iter().any(Option::is_some) {
            hal.idle();
            self.timer_tick();
            self.run_one_slice(sink);
        }
    }
}
