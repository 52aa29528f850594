// SPDX-License-Identifier: MIT

//! `ENTER` argument reshaping: unpacks the 23-bit parameter-shape operand
//! and rearranges the callee's argument registers to match a method's
//! declared signature.
//!
//! Bit layout, high to low: `m1:5 o:5 r:1 m2:5 k:5 d:1 b:1` — required
//! params before an optional/rest run, optional count, a rest-param flag,
//! required params after it, keyword-param count, a `**kwargs` flag, and a
//! trailing block-param flag.

use crate::task::Task;
use crate::value::{dec_ref, inc_ref, HeapArray, Value};

#[derive(Clone, Copy, Debug)]
pub(crate) struct EnterSpec {
    pub m1: u32,
    pub o: u32,
    pub r: bool,
    pub m2: u32,
    pub k: u32,
    pub d: bool,
    pub b: bool,
}

pub(crate) fn decode(bits: u32) -> EnterSpec {
    EnterSpec {
        m1: (bits >> 18) & 0x1f,
        o: (bits >> 13) & 0x1f,
        r: (bits >> 12) & 0x1 != 0,
        m2: (bits >> 7) & 0x1f,
        k: (bits >> 2) & 0x1f,
        d: (bits >> 1) & 0x1 != 0,
        b: bits & 0x1 != 0,
    }
}

/// Reshape the current frame's argument window in place.
///
/// Required-before and required-after params are left where they already
/// sit; a declared rest param collects whatever argument registers don't
/// belong to a fixed param into one new array value. Optional params that
/// did receive an argument are left alone; for the rest, `nil` is seeded
/// into their register as a safe initial value, and the instruction
/// pointer is advanced past the 3-byte default-value jump stub of every
/// optional that *was* supplied, so the dispatch loop falls straight into
/// whichever stub belongs to the first optional actually missing a value
/// — the bytecode there is ordinary instructions computing and storing
/// that default, not special-cased here.
/// Keyword/`**kwargs`/block params (`k`, `d`, `b`) are decoded but not
/// repacked: callers that declare them still receive their positional
/// arguments correctly, just not a separate keyword/block register.
pub(crate) fn enter(task: &mut Task<'_>, spec: EnterSpec) -> Option<()> {
    let argc = task.calls.top().map_or(0, |f| f.argc);
    let fixed = spec.m1 + spec.m2;

    if !spec.r && spec.o == 0 {
        for i in argc..fixed {
            task.set_reg(1 + i, Value::Nil);
        }
        return Some(());
    }

    // Required-before params: registers 1..=m1 already hold the right
    // values (or nil, if the call was short — left as-is, a caller arity
    // mismatch a bytecode-level native arity check should have already
    // rejected).
    let avail_for_opt_rest = argc.saturating_sub(fixed);

    let opt_taken = avail_for_opt_rest.min(spec.o);
    for i in 0..spec.o {
        let reg = 1 + spec.m1 + i;
        if i >= opt_taken {
            task.set_reg(reg, Value::Nil);
        }
    }

    if spec.r {
        let rest_count = avail_for_opt_rest.saturating_sub(opt_taken);
        let rest_start = 1 + spec.m1 + opt_taken;
        let mut elems = alloc::vec::Vec::with_capacity(rest_count as usize);
        for i in 0..rest_count {
            let v = task.reg(rest_start + i);
            inc_ref(&mut task.arena, v);
            elems.push(v);
        }
        let Some(arr_addr) = HeapArray::alloc(&mut task.arena, &elems) else {
            for v in elems {
                dec_ref(&mut task.arena, v);
            }
            return None;
        };
        let rest_reg = 1 + spec.m1 + spec.o;
        // Required-after params currently sit right after the rest span,
        // which may need to shift (when fewer optionals were supplied
        // than declared). Read every post-required value out before
        // writing any of them back, since source and destination ranges
        // can overlap.
        let mut post = [Value::Nil; 32];
        for i in 0..spec.m2 {
            post[i as usize] = task.reg(rest_start + rest_count + i);
        }
        task.set_reg(rest_reg, Value::Array(arr_addr));
        for i in 0..spec.m2 {
            let dest = rest_reg + 1 + i;
            let src = rest_start + rest_count + i;
            if dest == src {
                continue;
            }
            task.set_reg(dest, post[i as usize]);
        }
    }

    // `spec.o` 3-byte jump stubs immediately follow this instruction, one
    // per optional param in order. Skip the ones whose param already got
    // a value; pc lands on the first stub, if any, that still needs to
    // run its default-value code.
    task.pc += opt_taken * 3;

    Some(())
}
