// SPDX-License-Identifier: MIT

use super::*;
use crate::decode::OpCode;
use crate::object::lookup_method;
use crate::value::Proc;
use alloc::vec;

struct NullSink;

impl HostSink for NullSink {
    fn write(&mut self, _fd: i32, buf: &[u8]) -> usize {
        buf.len()
    }
}

fn node(nregs: u16, code: Vec<u8>) -> IrepNode {
    IrepNode { nregs, pool: Vec::new(), locals: Vec::new(), code, children: Vec::new() }
}

#[test]
fn init_installs_bootstrap_and_object_new() {
    let mut buf = vec![0u8; 1 << 16];
    let task = Task::init(&mut buf).unwrap();
    let bs = task.bootstrap();
    assert!(lookup_method(&task.arena, bs.object, task.symtab.find(&task.arena, "new").unwrap()).is_some());
}

#[test]
fn push_frame_and_do_return_round_trip() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.irep_pool = vec![node(2, Vec::new()), node(2, Vec::new())];
    task.cur_irep = 0;
    task.pc = 5;

    task.push_frame(1, SymId::new(0), 0, Addr::NULL, Addr::NULL, Addr::NULL, Addr::NULL, 0).unwrap();
    assert_eq!(task.calls.depth(), 1);
    assert_eq!(task.cur_irep, 1);
    assert_eq!(task.pc, 0);

    let stop = task.do_return(0, Value::Fixnum(7), false);
    assert!(stop.is_none());
    assert_eq!(task.calls.depth(), 0);
    assert_eq!(task.cur_irep, 0);
    assert_eq!(task.pc, 5);
    assert_eq!(task.regs[0], Value::Fixnum(7));
}

#[test]
fn do_return_with_no_frame_to_pop_finishes_the_task() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.irep_pool = vec![node(1, Vec::new())];
    task.cur_irep = 0;
    let stop = task.do_return(0, Value::Fixnum(42), false);
    assert!(matches!(stop, Some(StopReason::Finished(Value::Fixnum(42)))));
}

#[test]
fn raise_with_no_handler_marks_the_task_terminal() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    let bs = task.bootstrap();
    let caught = task.raise(Value::Class(bs.standard_error));
    assert!(!caught);
    assert!(task.terminal);
    assert_eq!(task.pending_exception, Value::Class(bs.standard_error));
}

#[test]
fn raise_with_a_pending_handler_transfers_control_there() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.irep_pool = vec![node(1, Vec::new())];
    task.cur_irep = 0;
    task.pc = 3;
    task.push_handler(20).unwrap();

    let bs = task.bootstrap();
    let caught = task.raise(Value::Class(bs.runtime_error));
    assert!(caught);
    assert!(!task.terminal);
    assert_eq!(task.pc, 20);
    assert_eq!(task.pending_exception, Value::Class(bs.runtime_error));
}

#[test]
fn fault_with_no_handler_surfaces_as_uncaught() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    let reason = task.fault(crate::ErrorKind::ZeroDivision);
    match reason {
        Some(StopReason::Uncaught(Value::Class(c))) => assert_eq!(c, task.bootstrap().runtime_error),
        other => panic!("expected an uncaught RuntimeError, got {other:?}"),
    }
}

#[test]
fn call_proc_runs_a_block_body_to_its_return() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.irep_pool = vec![
        node(1, Vec::new()),
        node(2, vec![OpCode::LoadI.as_byte(), 0, 9, OpCode::Return.as_byte(), 0]),
    ];
    task.cur_irep = 0;
    task.pc = 0;

    let proc_addr = Proc::alloc(&mut task.arena, 1, Addr::NULL, Value::Nil, &[]).unwrap();
    let outcome = task.call_proc(&mut NullSink, proc_addr, &[]);
    assert!(matches!(outcome, ProcOutcome::Value(Value::Fixnum(9))));
    assert_eq!(task.calls.depth(), 0);
}

#[test]
fn cleanup_frees_every_allocation_tagged_with_this_tasks_vm_id() {
    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.vm_id = 3;
    let before = task.arena.statistics().used;
    task.arena.alloc_tagged(64, task.vm_id).unwrap();
    assert!(task.arena.statistics().used > before);

    task.cleanup();
    assert_eq!(task.arena.statistics().used, before);
}

#[test]
fn define_native_method_is_dispatched_through_send() {
    fn native_answer(ctx: &mut NativeCtx<'_, '_>, _argc: u32) {
        ctx.return_fixnum(7);
    }

    let mut buf = vec![0u8; 1 << 16];
    let mut task = Task::init(&mut buf).unwrap();
    task.define_native_method(task.bootstrap().object, "answer", native_answer).unwrap();
    let sym = task.symtab.find(&task.arena, "answer").unwrap();

    let mut main = node(
        2,
        vec![
            OpCode::LoadSelf.as_byte(), 0,
            OpCode::Send.as_byte(), 0, 0, 0,
            OpCode::Return.as_byte(), 0,
        ],
    );
    main.locals = vec![sym];
    task.irep_pool = vec![main];
    task.cur_irep = 0;
    task.pc = 0;

    let reason = task.run(&mut NullSink);
    assert!(matches!(reason, StopReason::Finished(Value::Fixnum(7))));
}
