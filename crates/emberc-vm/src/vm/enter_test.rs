// SPDX-License-Identifier: MIT

//! `ENTER`'s optional-parameter default-stub skipping.

use crate::decode::OpCode;
use crate::irep::IrepNode;
use crate::task::{StopReason, Task};
use crate::types::{Addr, SymId};
use crate::value::Value;
use alloc::vec;
use alloc::vec::Vec;
use emberc_abi::HostSink;

struct NullSink;

impl HostSink for NullSink {
    fn write(&mut self, _fd: i32, buf: &[u8]) -> usize {
        buf.len()
    }
}

fn node(nregs: u16, code: Vec<u8>) -> IrepNode {
    IrepNode { nregs, pool: Vec::new(), locals: Vec::new(), code, children: Vec::new() }
}

/// Pack `m1:5 o:5 r:1 m2:5 k:5 d:1 b:1`, the bit layout `ENTER` decodes.
fn enter_bits(m1: u32, o: u32, r: bool, m2: u32, k: u32, d: bool, b: bool) -> [u8; 3] {
    let bits = (m1 & 0x1f) << 18
        | (o & 0x1f) << 13
        | (r as u32) << 12
        | (m2 & 0x1f) << 7
        | (k & 0x1f) << 2
        | (d as u32) << 1
        | b as u32;
    [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

/// Two optional params, no required/rest/keyword/block params. Each
/// default stub writes to a different register, so a test can tell
/// which stubs actually ran and which were skipped.
fn program_with_two_optional_defaults() -> IrepNode {
    let [b0, b1, b2] = enter_bits(0, 2, false, 0, 0, false, false);
    node(
        4,
        vec![
            OpCode::Enter.as_byte(), b0, b1, b2,
            // stub 0: default for the first optional
            OpCode::LoadI.as_byte(), 2, 111,
            // stub 1: default for the second optional
            OpCode::LoadI.as_byte(), 1, 222,
            OpCode::Stop.as_byte(),
        ],
    )
}

fn run_with_argc(argc: u32) -> Task<'static> {
    let buf: &'static mut [u8] = alloc::boxed::Box::leak(alloc::vec![0u8; 1 << 16].into_boxed_slice());
    let mut task = Task::init(buf).unwrap();
    task.irep_pool = vec![program_with_two_optional_defaults()];
    task.push_frame(0, SymId::new(0), argc, Addr::NULL, Addr::NULL, Addr::NULL, Addr::NULL, 0).unwrap();
    let reason = task.run(&mut NullSink);
    assert!(!matches!(reason, StopReason::Uncaught(_)), "unexpected uncaught exception: {reason:?}");
    task
}

#[test]
fn no_optionals_supplied_runs_both_default_stubs() {
    let task = run_with_argc(0);
    assert_eq!(task.regs[2], Value::Fixnum(111));
    assert_eq!(task.regs[1], Value::Fixnum(222));
}

#[test]
fn one_optional_supplied_skips_only_its_own_stub() {
    let task = run_with_argc(1);
    assert_eq!(task.regs[2], Value::Nil);
    assert_eq!(task.regs[1], Value::Fixnum(222));
}

#[test]
fn both_optionals_supplied_skips_every_stub() {
    let task = run_with_argc(2);
    assert_eq!(task.regs[2], Value::Nil);
    assert_eq!(task.regs[1], Value::Nil);
}
