// SPDX-License-Identifier: MIT

//! A runnable instance of the VM.
//!
//! This crate collapses the source API's separate `init`/`create_task`
//! pair into one type: `Task` owns its arena directly rather than several
//! tasks sharing one arena behind raw pointers, so a single `Task` is both
//! the "VM" and the "task" distinct types elsewhere might keep apart.
//! The optional scheduler (`sched`, feature `scheduler`)
//! multiplexes several independently-owned `Task`s instead.

#[cfg(test)]
mod task_test;

mod native;

pub use native::{NativeCtx, NativeFn, NativeTable, ProcOutcome};

use crate::call::{CallInfo, CallStack, HandlerFrame, HandlerKind, HandlerStack};
use crate::decode::ExtFlag;
use crate::irep::{load, IrepNode, LoaderError};
use crate::mem::Arena;
use crate::object::{class_name, define_method, is_a, Bootstrap, MethodKind, Runtime};
use crate::symbol::SymbolTable;
use crate::types::{Addr, SymId};
use crate::value::{dec_ref, inc_ref, Proc, Value};
use alloc::vec::Vec;
use emberc_abi::HostSink;

/// Register file budget shared by every frame's window.
pub const MAX_REGS: usize = 1024;

/// Why [`Task::run`] returned control to the host.
#[derive(Debug, Clone, Copy)]
pub enum StopReason {
    /// [`Task::tick`] set the preemption flag since the last instruction
    /// boundary.
    Preempted,
    /// The top-level frame returned.
    Finished(Value),
    /// An exception unwound past the outermost frame with no matching
    /// `rescue`.
    Uncaught(Value),
}

/// Result of stepping a single instruction: `None` to keep running, `Some`
/// when the task has stopped. Dispatch-level faults (arity mismatch, zero
/// division, an unknown opcode, ...) are turned into a `RAISE` of the
/// matching bootstrap exception class by [`Task::fault`] rather than
/// threaded through here as a separate error channel — the VM has exactly
/// one way to stop early, its own exception protocol.
pub(crate) type StepResult = Option<StopReason>;

/// A running instance of the VM.
///
/// Bundles the arena, the symbol table and object-model runtime, the
/// loaded IREP pool, and all per-task execution state: register file,
/// callinfo/handler stacks, instruction pointer. Fields are `pub(crate)`
/// so the sibling `vm::dispatch` module can operate on them directly.
pub struct Task<'a> {
    pub(crate) arena: Arena<'a>,
    pub(crate) runtime: Runtime,
    pub(crate) symtab: SymbolTable,
    pub(crate) bootstrap: Bootstrap,
    pub(crate) native_fns: NativeTable,

    pub(crate) irep_pool: Vec<IrepNode>,
    pub(crate) cur_irep: u32,
    pub(crate) pc: u32,

    pub(crate) regs: [Value; MAX_REGS],
    pub(crate) reg_base: u32,

    pub(crate) calls: CallStack,
    pub(crate) handlers: HandlerStack,

    /// The most recently raised value, valid only while unwinding or once
    /// `terminal` is set.
    pub(crate) pending_exception: Value,
    /// Set once an uncaught raise has nowhere left to unwind to; every
    /// enclosing native call checks this and re-propagates immediately
    /// so an escape from one native call keeps propagating through its
    /// callers rather than being swallowed partway up.
    pub(crate) terminal: bool,
    /// Set by `RETURN_BLK`/`BREAK` so the nearest `call_proc` knows the
    /// proc didn't simply fall through its last instruction.
    pub(crate) nonlocal: bool,
    /// The block argument of the `SENDB`/`SENDVB` currently being
    /// dispatched, if any — read by [`NativeCtx::block`] (native
    /// iterator methods like `each`/`times`).
    pub(crate) pending_block: Value,

    pub(crate) ext: ExtFlag,
    pub(crate) vm_id: u16,
    pub(crate) preempt: bool,
}

impl<'a> Task<'a> {
    /// Initialize a task over `buf`. Installs the exception-class
    /// bootstrap chain; fails only if `buf` is too small to hold it.
    pub fn init(buf: &'a mut [u8]) -> Option<Self> {
        let mut arena = Arena::init(buf);
        let mut runtime = Runtime::new();
        let mut symtab = SymbolTable::new();
        let bootstrap = Bootstrap::install(&mut arena, &mut runtime, &mut symtab)?;

        let mut task = Self {
            arena,
            runtime,
            symtab,
            bootstrap,
            native_fns: Vec::new(),
            irep_pool: Vec::new(),
            cur_irep: 0,
            pc: 0,
            regs: [Value::Nil; MAX_REGS],
            reg_base: 0,
            calls: CallStack::new(),
            handlers: HandlerStack::new(),
            pending_exception: Value::Nil,
            terminal: false,
            nonlocal: false,
            pending_block: Value::Nil,
            ext: ExtFlag::NONE,
            vm_id: 0,
            preempt: false,
        };
        task.define_native_method(task.bootstrap.object, "new", native::default_new);
        Some(task)
    }

    /// Load an IREP image as this task's program, positioning the
    /// instruction pointer at its root node.
    pub fn load(&mut self, image: &[u8]) -> Result<(), LoaderError> {
        let (pool, root) = load(image, &mut self.arena, &mut self.symtab)?;
        self.irep_pool = pool;
        self.cur_irep = root;
        self.pc = 0;
        Ok(())
    }

    /// Register a native method on `class` under `name`.
    pub fn define_native_method(&mut self, class: Addr, name: &str, f: NativeFn) -> Option<()> {
        let sym = self.symtab.intern(&mut self.arena, name)?;
        let idx = self.native_fns.len() as u32;
        self.native_fns.push(f);
        define_method(&mut self.arena, class, sym, MethodKind::Native, idx)
    }

    /// Run until the task finishes, is preempted, or hits an uncaught
    /// exception.
    pub fn run(&mut self, sink: &mut dyn HostSink) -> StopReason {
        loop {
            if self.preempt {
                self.preempt = false;
                return StopReason::Preempted;
            }
            if let Some(reason) = crate::vm::dispatch::step(self, sink) {
                return reason;
            }
        }
    }

    /// Run at most one timeslice's worth of work, returning early on
    /// preemption. The scheduler calls `tick()` to arm preemption, then
    /// `run()` to execute until the next checked boundary.
    pub fn tick(&mut self) {
        self.preempt = true;
    }

    /// Reclaim every allocation tagged with this task's `vm_id`.
    pub fn cleanup(&mut self) {
        self.arena.free_all(self.vm_id);
    }

    #[must_use]
    pub fn bootstrap(&self) -> Bootstrap {
        self.bootstrap
    }

    #[must_use]
    pub fn symtab(&self) -> &SymbolTable {
        &self.symtab
    }

    #[must_use]
    pub fn arena(&self) -> &Arena<'a> {
        &self.arena
    }

    // --- register window -----------------------------------------------------

    pub(crate) fn reg(&self, rel: u32) -> Value {
        self.regs[(self.reg_base + rel) as usize]
    }

    pub(crate) fn set_reg(&mut self, rel: u32, v: Value) {
        let idx = (self.reg_base + rel) as usize;
        let old = self.regs[idx];
        dec_ref(&mut self.arena, old);
        self.regs[idx] = v;
    }

    /// Move without touching refcounts — used when duplicating a value
    /// already `inc_ref`'d by the caller (e.g. array/hash literals).
    pub(crate) fn set_reg_raw(&mut self, rel: u32, v: Value) {
        self.regs[(self.reg_base + rel) as usize] = v;
    }

    pub(crate) fn release_window(&mut self, base: u32, nregs: u32, keep: Option<u32>) {
        for i in 0..nregs {
            if Some(i) == keep {
                continue;
            }
            let v = self.regs[(base + i) as usize];
            dec_ref(&mut self.arena, v);
        }
    }

    // --- call stack -----------------------------------------------------------

    /// Push a new frame and shift the register window by `reg_offset`
    /// (shifts the current-regs base by `reg_offset`).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn push_frame(
        &mut self,
        irep_idx: u32,
        method_id: SymId,
        argc: u32,
        target_class: Addr,
        owning_class: Addr,
        current_class: Addr,
        proc_addr: Addr,
        reg_offset: u32,
    ) -> Option<()> {
        let frame = CallInfo {
            ret_irep: self.cur_irep,
            ret_pc: self.pc,
            reg_base: self.reg_base,
            method_id,
            argc,
            target_class,
            owning_class,
            current_class,
            proc_addr,
        };
        self.calls.push(frame)?;
        self.reg_base += reg_offset;
        self.cur_irep = irep_idx;
        self.pc = 0;
        Some(())
    }

    /// The proc whose body is the currently executing frame, if any
    /// (`LOADSELF`/`RETURN_BLK` inside blocks).
    pub(crate) fn current_proc(&self) -> Addr {
        self.calls.top().map_or(Addr::NULL, |f| f.proc_addr)
    }

    /// Pop one frame, writing `value` into the caller's destination
    /// register (the slot this frame's register 0 occupied). `ret_reg` is
    /// the relative register `value` was read from, so its reference is
    /// kept alive while the rest of the window is released. Returns the
    /// `StopReason` if this was the outermost frame — a plain top-level
    /// `RETURN` with no pushed frame to pop.
    pub(crate) fn do_return(&mut self, ret_reg: u32, value: Value, nonlocal: bool) -> Option<StopReason> {
        self.nonlocal = nonlocal;
        let slot = self.reg_base;
        let nregs = self.irep_pool[self.cur_irep as usize].nregs as u32;
        // `value`'s reference lives in `ret_reg`; keep it out of the
        // release so the returning frame's window doesn't drop the last
        // owner of a ref-typed value before the caller gets to see it.
        self.release_window(slot, nregs, Some(ret_reg));
        let Some(frame) = self.calls.pop() else {
            return Some(StopReason::Finished(value));
        };
        self.cur_irep = frame.ret_irep;
        self.pc = frame.ret_pc;
        self.reg_base = frame.reg_base;
        self.regs[slot as usize] = value;
        None
    }

    // --- exceptions -------------------------------------------------------------

    /// Push a rescue handler (`ONERR`).
    pub(crate) fn push_handler(&mut self, handler_pc: u32) -> Option<()> {
        self.handlers.push(HandlerFrame {
            kind: HandlerKind::Rescue,
            handler_irep: self.cur_irep,
            handler_pc,
            call_depth: self.calls.depth() as u32,
        })
    }

    /// Raise the bootstrap exception matching `kind`. `Arity`, `Type`,
    /// and `ZeroDivision` map to `RuntimeError`; the remaining, more
    /// structural kinds (`Name`, `OutOfMemory`, `ImageFormat`,
    /// `UnsupportedOpcode`) map to the broader `StandardError` since this
    /// bootstrap chain doesn't carry one class per kind.
    pub(crate) fn fault(&mut self, kind: crate::ErrorKind) -> StepResult {
        let class = match kind {
            crate::ErrorKind::Arity | crate::ErrorKind::Type | crate::ErrorKind::ZeroDivision => {
                self.bootstrap.runtime_error
            }
            _ => self.bootstrap.standard_error,
        };
        let value = Value::Class(class);
        if self.raise(value) { None } else { Some(StopReason::Uncaught(value)) }
    }

    /// Raise `value`: unwind the call stack to the nearest rescue handler
    /// and transfer control there. Returns `false` when nothing catches
    /// it, in which case `self.terminal`/`self.pending_exception` record
    /// the final state for the host.
    pub(crate) fn raise(&mut self, value: Value) -> bool {
        match self.handlers.pop_nearest_rescue() {
            Some(h) => {
                while self.calls.depth() as u32 > h.call_depth {
                    self.calls.pop();
                }
                self.pending_exception = value;
                self.cur_irep = h.handler_irep;
                self.pc = h.handler_pc;
                true
            }
            None => {
                self.pending_exception = value;
                self.terminal = true;
                false
            }
        }
    }

    /// Run a proc body to completion (used both by `SENDB`/`SENDVB` block
    /// dispatch and by native iterator methods via
    /// [`NativeCtx::call_proc`]).
    pub(crate) fn call_proc(&mut self, sink: &mut dyn HostSink, proc_addr: Addr, args: &[Value]) -> ProcOutcome {
        let start_depth = self.calls.depth();
        let nregs = self.irep_pool[self.cur_irep as usize].nregs.max(1) as u32;
        let irep_idx = Proc::irep_idx(&self.arena, proc_addr);
        let self_val = Proc::captured_self(&self.arena, proc_addr);

        if self.push_frame(irep_idx, SymId::new(0), args.len() as u32, Addr::NULL, Addr::NULL, Addr::NULL, proc_addr, nregs)
            .is_none()
        {
            return ProcOutcome::Escaped(Value::Nil);
        }

        let base = self.reg_base;
        inc_ref(&mut self.arena, self_val);
        self.regs[base as usize] = self_val;
        for (i, v) in args.iter().enumerate() {
            inc_ref(&mut self.arena, *v);
            self.regs[base as usize + 1 + i] = *v;
        }
        self.nonlocal = false;

        loop {
            match crate::vm::dispatch::step(self, sink) {
                Some(StopReason::Uncaught(v)) => return ProcOutcome::Escaped(v),
                Some(_) => unreachable!("a proc body cannot itself finish the whole task"),
                None => {
                    if self.calls.depth() <= start_depth {
                        break;
                    }
                }
            }
        }

        let result = self.regs[base as usize];
        if self.nonlocal { ProcOutcome::NonLocal(result) } else { ProcOutcome::Value(result) }
    }

    /// `true` if `value`'s class is `ancestor` or a descendant of it
    /// (`RESCUE`'s class-match test).
    pub(crate) fn exception_is_a(&self, value: Value, ancestor: Addr) -> bool {
        match value {
            Value::Class(c) => is_a(&self.arena, c, ancestor),
            Value::Object(o) => is_a(&self.arena, crate::value::Instance::class_of(&self.arena, o), ancestor),
            _ => false,
        }
    }

    #[must_use]
    pub(crate) fn class_name_str(&self, class: Addr) -> Option<&str> {
        self.symtab.name_of(&self.arena, class_name(&self.arena, class))
    }
}
