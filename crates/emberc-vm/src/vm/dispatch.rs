// SPDX-License-Identifier: MIT

//! The fetch-decode-execute loop and every opcode's semantics.
//!
//! One `step()` call decodes and executes exactly one instruction (or, for
//! `EXT1`/`EXT2`/`EXT3`, arms the widening prefix for the next one). Binary
//! arithmetic/comparison opcodes follow the convention `regs[a] = regs[a]
//! OP regs[b]`, writing their result back into the left operand rather than
//! a third destination register — there is no spare operand slot for one in
//! this format's `Bb` shape.

use super::enter;
use crate::decode::{decode, ExtFlag, OpCode, SPLAT_ARGC};
use crate::object::{
    define_class, define_method, get_class_const, lookup_method, set_class_const, super_of, Method, MethodKind,
};
use crate::task::{StepResult, StopReason, Task};
use crate::types::{Addr, SymId};
use crate::value::{dec_ref, inc_ref, HeapArray, HeapHash, HeapRange, HeapString, Instance, Proc, Value};
use alloc::vec::Vec;
use emberc_abi::HostSink;

/// Execute one instruction. `None` means keep running.
pub(crate) fn step(task: &mut Task<'_>, sink: &mut dyn HostSink) -> StepResult {
    let idx = task.cur_irep as usize;
    let mut pc = task.pc;
    let decoded = {
        let code = &task.irep_pool[idx].code;
        match decode(code, &mut pc, task.ext) {
            Ok(d) => d,
            Err(_) => {
                task.pc = pc;
                return task.fault(crate::ErrorKind::UnsupportedOpcode);
            }
        }
    };
    task.pc = pc;

    match decoded.op {
        OpCode::Ext1 => {
            task.ext = ExtFlag::EXT1;
            return None;
        }
        OpCode::Ext2 => {
            task.ext = ExtFlag::EXT2;
            return None;
        }
        OpCode::Ext3 => {
            task.ext = ExtFlag::EXT3;
            return None;
        }
        _ => {}
    }
    let ext_used = task.ext;
    task.ext = ExtFlag::NONE;

    let a = decoded.operands.a;
    let b = decoded.operands.b;
    let c = decoded.operands.c;

    match decoded.op {
        OpCode::Nop => None,
        OpCode::Stop => Some(StopReason::Finished(Value::Nil)),
        OpCode::Unknown => task.fault(crate::ErrorKind::UnsupportedOpcode),

        // --- loads/moves -----------------------------------------------------
        OpCode::Move => {
            let v = task.reg(b);
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::LoadL => {
            let pool_idx = b as usize;
            let v = match task.irep_pool[idx].pool.get(pool_idx) {
                Some(crate::irep::PoolValue::Int(n)) => Value::Fixnum(*n),
                Some(crate::irep::PoolValue::Float(f)) => Value::Float(*f),
                Some(crate::irep::PoolValue::Str(bytes)) => {
                    let bytes = bytes.clone();
                    match HeapString::alloc(&mut task.arena, &bytes) {
                        Some(addr) => Value::String(addr),
                        None => return task.fault(crate::ErrorKind::OutOfMemory),
                    }
                }
                None => Value::Nil,
            };
            task.set_reg(a, v);
            None
        }
        OpCode::LoadI => {
            let imm = if ext_used.second_wide { sign_extend_16(b) } else { sign_extend_8(b) };
            task.set_reg(a, Value::Fixnum(imm));
            None
        }
        OpCode::LoadSym => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            task.set_reg(a, Value::Symbol(sym));
            None
        }
        OpCode::LoadNil => {
            task.set_reg(a, Value::Nil);
            None
        }
        OpCode::LoadSelf => {
            let v = task.reg(0);
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::LoadT => {
            task.set_reg(a, Value::True);
            None
        }
        OpCode::LoadF => {
            task.set_reg(a, Value::False);
            None
        }

        // --- variable access ---------------------------------------------------
        OpCode::GetGv => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let v = task.runtime.get_global(sym);
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::SetGv => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let v = task.reg(a);
            inc_ref(&mut task.arena, v);
            let old = task.runtime.get_global(sym);
            dec_ref(&mut task.arena, old);
            task.runtime.set_global(sym, v);
            None
        }
        OpCode::GetIv => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let v = match task.reg(0) {
                Value::Object(addr) => Instance::get_ivar(&task.arena, addr, sym.as_u32()).unwrap_or(Value::Nil),
                _ => Value::Nil,
            };
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::SetIv => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let v = task.reg(a);
            if let Value::Object(self_addr) = task.reg(0) {
                inc_ref(&mut task.arena, v);
                match Instance::set_ivar(&mut task.arena, self_addr, sym.as_u32(), v) {
                    Some((new_addr, old)) => {
                        if let Some(old) = old {
                            dec_ref(&mut task.arena, old);
                        }
                        if new_addr != self_addr {
                            task.set_reg_raw(0, Value::Object(new_addr));
                        }
                    }
                    None => return task.fault(crate::ErrorKind::OutOfMemory),
                }
            }
            None
        }
        OpCode::GetConst => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let current_class = current_lexical_class(task);
            let v = get_class_const(&task.arena, current_class, sym).or_else(|| task.runtime.get_global_const(sym));
            match v {
                Some(v) => {
                    inc_ref(&mut task.arena, v);
                    task.set_reg(a, v);
                    None
                }
                None => task.fault(crate::ErrorKind::Name),
            }
        }
        OpCode::SetConst => {
            let Some(sym) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let v = task.reg(a);
            inc_ref(&mut task.arena, v);
            let current_class = current_lexical_class(task);
            let ok = if current_class == task.bootstrap.object {
                task.runtime.set_global_const(sym, v)
            } else {
                set_class_const(&mut task.arena, current_class, sym, v)
            };
            if ok.is_none() {
                return task.fault(crate::ErrorKind::OutOfMemory);
            }
            None
        }
        OpCode::GetMConst => {
            let Some(sym) = local_sym(task, idx, c) else { return task.fault(crate::ErrorKind::Name) };
            let Value::Class(class) = task.reg(b) else { return task.fault(crate::ErrorKind::Type) };
            match get_class_const(&task.arena, class, sym) {
                Some(v) => {
                    inc_ref(&mut task.arena, v);
                    task.set_reg(a, v);
                    None
                }
                None => task.fault(crate::ErrorKind::Name),
            }
        }
        OpCode::GetUpvar => {
            let Some(proc_addr) = Proc::ancestor(&task.arena, task.current_proc(), c) else {
                task.set_reg(a, Value::Nil);
                return None;
            };
            let v = Proc::get_capture(&task.arena, proc_addr, b).unwrap_or(Value::Nil);
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::SetUpvar => {
            let Some(proc_addr) = Proc::ancestor(&task.arena, task.current_proc(), c) else { return None };
            let v = task.reg(a);
            inc_ref(&mut task.arena, v);
            let old = Proc::get_capture(&task.arena, proc_addr, b);
            Proc::set_capture(&mut task.arena, proc_addr, b, v);
            if let Some(old) = old {
                dec_ref(&mut task.arena, old);
            }
            None
        }

        // --- control flow --------------------------------------------------------
        OpCode::Jmp => {
            task.pc = a;
            None
        }
        OpCode::JmpIf => {
            if task.reg(a).is_truthy() {
                task.pc = b;
            }
            None
        }
        OpCode::JmpNot => {
            if !task.reg(a).is_truthy() {
                task.pc = b;
            }
            None
        }
        OpCode::JmpNil => {
            if task.reg(a).is_nil() {
                task.pc = b;
            }
            None
        }

        // --- exception control ----------------------------------------------------
        OpCode::OnErr => {
            if task.push_handler(a).is_none() {
                return task.fault(crate::ErrorKind::OutOfMemory);
            }
            None
        }
        OpCode::Except => {
            let v = task.pending_exception;
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::Rescue => {
            let matched = match task.reg(a) {
                Value::Class(class) => task.exception_is_a(task.pending_exception, class),
                _ => false,
            };
            task.set_reg(b, Value::bool(matched));
            if matched {
                task.pending_exception = Value::Nil;
            }
            None
        }
        OpCode::PopErr => {
            task.handlers.pop();
            None
        }
        OpCode::Raise => {
            let v = task.reg(a);
            if task.raise(v) { None } else { Some(StopReason::Uncaught(v)) }
        }
        OpCode::EPush => {
            let ok = task.handlers.push(crate::call::HandlerFrame {
                kind: crate::call::HandlerKind::Ensure,
                handler_irep: task.cur_irep,
                handler_pc: a,
                call_depth: task.calls.depth() as u32,
            });
            if ok.is_none() {
                return task.fault(crate::ErrorKind::OutOfMemory);
            }
            None
        }
        OpCode::EPop => {
            task.handlers.pop();
            None
        }

        // --- calls ------------------------------------------------------------
        OpCode::Send | OpCode::SendV => dispatch_send(task, sink, a, b, c, None),
        OpCode::SendB | OpCode::SendVB => {
            let block_reg = if c == SPLAT_ARGC { a + 2 } else { a + c + 1 };
            let block = task.reg(block_reg);
            dispatch_send(task, sink, a, b, c, Some(block))
        }
        OpCode::Super => dispatch_super(task, sink, a, b),
        OpCode::ArgAry => {
            let argc = task.calls.top().map_or(0, |f| f.argc);
            let mut elems = Vec::with_capacity(argc as usize);
            for i in 0..argc {
                let v = task.reg(1 + i);
                inc_ref(&mut task.arena, v);
                elems.push(v);
            }
            match HeapArray::alloc(&mut task.arena, &elems) {
                Some(addr) => {
                    task.set_reg(1, Value::Array(addr));
                    None
                }
                None => {
                    for v in elems {
                        dec_ref(&mut task.arena, v);
                    }
                    task.fault(crate::ErrorKind::OutOfMemory)
                }
            }
        }
        OpCode::Enter => {
            let spec = enter::decode(a);
            match enter::enter(task, spec) {
                Some(()) => None,
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }

        // --- returns -------------------------------------------------------------
        OpCode::Return => {
            let v = task.reg(a);
            task.do_return(a, v, false)
        }
        OpCode::ReturnBlk | OpCode::Break => {
            let v = task.reg(a);
            task.do_return(a, v, true)
        }

        // --- block/class definition ------------------------------------------------
        OpCode::Block => {
            let nregs = task.irep_pool[idx].nregs as u32;
            let Some(child_idx) = task.irep_pool[idx].children.get(b as usize).copied() else {
                return task.fault(crate::ErrorKind::ImageFormat);
            };
            let mut captures = Vec::with_capacity(nregs as usize);
            for i in 0..nregs {
                let v = task.reg(i);
                inc_ref(&mut task.arena, v);
                captures.push(v);
            }
            let parent = task.current_proc();
            if !parent.is_null() {
                inc_ref(&mut task.arena, Value::Proc(parent));
            }
            let self_v = task.reg(0);
            inc_ref(&mut task.arena, self_v);
            match Proc::alloc(&mut task.arena, child_idx, parent, self_v, &captures) {
                Some(addr) => {
                    task.set_reg(a, Value::Proc(addr));
                    None
                }
                None => {
                    for v in captures {
                        dec_ref(&mut task.arena, v);
                    }
                    dec_ref(&mut task.arena, self_v);
                    task.fault(crate::ErrorKind::OutOfMemory)
                }
            }
        }
        OpCode::Method => {
            let Some(child_idx) = task.irep_pool[idx].children.get(b as usize).copied() else {
                return task.fault(crate::ErrorKind::ImageFormat);
            };
            // A method body doesn't close over its defining frame's
            // registers the way a block does; it is carried to `DEF` as a
            // zero-capture `Proc` purely to pass the IREP index through.
            match Proc::alloc(&mut task.arena, child_idx, Addr::NULL, Value::Nil, &[]) {
                Some(addr) => {
                    task.set_reg(a, Value::Proc(addr));
                    None
                }
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }
        OpCode::Def => {
            let Some(name) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let target_class = match task.reg(0) {
                Value::Class(c) => c,
                _ => task.bootstrap.object,
            };
            let proc_v = task.reg(a);
            if let Value::Proc(paddr) = proc_v {
                let irep_idx = Proc::irep_idx(&task.arena, paddr);
                let ok = define_method(&mut task.arena, target_class, name, MethodKind::Bytecode, irep_idx);
                dec_ref(&mut task.arena, proc_v);
                task.set_reg_raw(a, Value::Empty);
                if ok.is_none() {
                    return task.fault(crate::ErrorKind::OutOfMemory);
                }
            }
            None
        }
        OpCode::Alias => {
            let (Some(new_name), Some(old_name)) = (local_sym(task, idx, a), local_sym(task, idx, b)) else {
                return task.fault(crate::ErrorKind::Name);
            };
            let target_class = match task.reg(0) {
                Value::Class(c) => c,
                _ => task.bootstrap.object,
            };
            match lookup_method(&task.arena, target_class, old_name) {
                Some(Method { kind, payload, .. }) => {
                    if define_method(&mut task.arena, target_class, new_name, kind, payload).is_none() {
                        return task.fault(crate::ErrorKind::OutOfMemory);
                    }
                    None
                }
                None => task.fault(crate::ErrorKind::Name),
            }
        }
        OpCode::Class | OpCode::Module => {
            let Some(name) = local_sym(task, idx, b) else { return task.fault(crate::ErrorKind::Name) };
            let super_class = match task.reg(a + 1) {
                Value::Class(c) => Some(c),
                _ => None,
            };
            match define_class(&mut task.arena, &mut task.runtime, name, super_class) {
                Some(addr) => {
                    task.set_reg(a, Value::Class(addr));
                    None
                }
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }
        OpCode::Exec => {
            let class_v = task.reg(a);
            let Value::Class(class_addr) = class_v else { return task.fault(crate::ErrorKind::Type) };
            let Some(child_idx) = task.irep_pool[idx].children.get(b as usize).copied() else {
                return task.fault(crate::ErrorKind::ImageFormat);
            };
            // The register at `a` already holds `class_v`; shifting the
            // window base to it (reg_offset = a) makes it the new frame's
            // register 0 without copying anything.
            match task.push_frame(child_idx, SymId::new(0), 0, class_addr, class_addr, class_addr, Addr::NULL, a) {
                Some(()) => None,
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }
        OpCode::SClass => {
            // No distinct singleton-class heap layout in this VM; `class <<
            // self` resolves to the receiver's own class, so singleton
            // methods land as regular instance methods.
            let class_addr = class_of_value(task, task.reg(0));
            task.set_reg(a, Value::Class(class_addr));
            None
        }

        // --- arithmetic/comparison ------------------------------------------------
        OpCode::Add => binary_numeric(task, a, b, |x, y| x.checked_add(y), |x, y| x + y),
        OpCode::Sub => binary_numeric(task, a, b, |x, y| x.checked_sub(y), |x, y| x - y),
        OpCode::Mul => binary_numeric(task, a, b, |x, y| x.checked_mul(y), |x, y| x * y),
        OpCode::Div => {
            let lhs = task.reg(a);
            let rhs = task.reg(b);
            match (lhs, rhs) {
                (Value::Fixnum(_), Value::Fixnum(0)) => task.fault(crate::ErrorKind::ZeroDivision),
                (Value::Fixnum(x), Value::Fixnum(y)) => {
                    task.set_reg(a, Value::Fixnum(x.wrapping_div(y)));
                    None
                }
                (Value::Fixnum(x), Value::Float(y)) => {
                    task.set_reg(a, Value::Float(x as f64 / y));
                    None
                }
                (Value::Float(x), Value::Fixnum(y)) => {
                    task.set_reg(a, Value::Float(x / y as f64));
                    None
                }
                (Value::Float(x), Value::Float(y)) => {
                    task.set_reg(a, Value::Float(x / y));
                    None
                }
                _ => task.fault(crate::ErrorKind::Type),
            }
        }
        OpCode::AddI => {
            let imm = if ext_used.second_wide { sign_extend_16(b) } else { sign_extend_8(b) };
            match task.reg(a) {
                Value::Fixnum(x) => {
                    task.set_reg(a, Value::Fixnum(x.wrapping_add(imm)));
                    None
                }
                _ => task.fault(crate::ErrorKind::Type),
            }
        }
        OpCode::SubI => {
            let imm = if ext_used.second_wide { sign_extend_16(b) } else { sign_extend_8(b) };
            match task.reg(a) {
                Value::Fixnum(x) => {
                    task.set_reg(a, Value::Fixnum(x.wrapping_sub(imm)));
                    None
                }
                _ => task.fault(crate::ErrorKind::Type),
            }
        }
        OpCode::Eq => {
            let result = values_equal(task, task.reg(a), task.reg(b));
            task.set_reg(a, Value::bool(result));
            None
        }
        OpCode::Lt => compare(task, a, b, |o| o.is_lt()),
        OpCode::Le => compare(task, a, b, |o| o.is_le()),
        OpCode::Gt => compare(task, a, b, |o| o.is_gt()),
        OpCode::Ge => compare(task, a, b, |o| o.is_ge()),

        // --- collection construction -----------------------------------------------
        OpCode::Array => {
            let mut elems = Vec::with_capacity(c as usize);
            for i in 0..c {
                let v = task.reg(b + i);
                inc_ref(&mut task.arena, v);
                elems.push(v);
            }
            alloc_array_into(task, a, elems)
        }
        OpCode::Array2 => {
            let mut elems = Vec::new();
            if let Value::Array(src) = task.reg(b) {
                let len = HeapArray::len(&task.arena, src);
                for i in 0..len {
                    if let Some(v) = HeapArray::get(&task.arena, src, i) {
                        inc_ref(&mut task.arena, v);
                        elems.push(v);
                    }
                }
            }
            for i in 0..c.saturating_sub(1) {
                let v = task.reg(b + 1 + i);
                inc_ref(&mut task.arena, v);
                elems.push(v);
            }
            alloc_array_into(task, a, elems)
        }
        OpCode::AryCat => {
            let (Value::Array(lhs), Value::Array(rhs)) = (task.reg(a), task.reg(b)) else {
                return task.fault(crate::ErrorKind::Type);
            };
            let mut elems = Vec::new();
            for i in 0..HeapArray::len(&task.arena, lhs) {
                if let Some(v) = HeapArray::get(&task.arena, lhs, i) {
                    inc_ref(&mut task.arena, v);
                    elems.push(v);
                }
            }
            for i in 0..HeapArray::len(&task.arena, rhs) {
                if let Some(v) = HeapArray::get(&task.arena, rhs, i) {
                    inc_ref(&mut task.arena, v);
                    elems.push(v);
                }
            }
            alloc_array_into(task, a, elems)
        }
        OpCode::AryDup => {
            let Value::Array(src) = task.reg(b) else { return task.fault(crate::ErrorKind::Type) };
            let mut elems = Vec::new();
            for i in 0..HeapArray::len(&task.arena, src) {
                if let Some(v) = HeapArray::get(&task.arena, src, i) {
                    inc_ref(&mut task.arena, v);
                    elems.push(v);
                }
            }
            alloc_array_into(task, a, elems)
        }
        OpCode::Aref => {
            let Value::Array(src) = task.reg(b) else { return task.fault(crate::ErrorKind::Type) };
            let v = HeapArray::get(&task.arena, src, c).unwrap_or(Value::Nil);
            inc_ref(&mut task.arena, v);
            task.set_reg(a, v);
            None
        }
        OpCode::Apost => {
            let Value::Array(src) = task.reg(b) else { return task.fault(crate::ErrorKind::Type) };
            let len = HeapArray::len(&task.arena, src);
            let start = len.saturating_sub(c);
            for i in 0..c {
                let v = HeapArray::get(&task.arena, src, start + i).unwrap_or(Value::Nil);
                inc_ref(&mut task.arena, v);
                task.set_reg(a + i, v);
            }
            None
        }
        OpCode::Hash => {
            let Some(addr) = HeapHash::alloc_empty(&mut task.arena) else {
                return task.fault(crate::ErrorKind::OutOfMemory);
            };
            let mut addr = addr;
            for i in 0..b {
                let k = task.reg(a + 1 + 2 * i);
                let v = task.reg(a + 2 + 2 * i);
                inc_ref(&mut task.arena, k);
                inc_ref(&mut task.arena, v);
                match HeapHash::insert(&mut task.arena, addr, k, v) {
                    Some((new_addr, old)) => {
                        if let Some(old) = old {
                            dec_ref(&mut task.arena, old);
                        }
                        addr = new_addr;
                    }
                    None => {
                        dec_ref(&mut task.arena, k);
                        dec_ref(&mut task.arena, v);
                        return task.fault(crate::ErrorKind::OutOfMemory);
                    }
                }
            }
            task.set_reg(a, Value::Hash(addr));
            None
        }
        OpCode::StringOp => {
            // Minimal primitive: `b == 0` replaces a string register with
            // its byte length. The richer `String` method surface is a
            // plugin/native-class concern, out of scope here.
            if b == 0 {
                if let Value::String(addr) = task.reg(a) {
                    let len = HeapString::len(&task.arena, addr) as i64;
                    task.set_reg(a, Value::Fixnum(len));
                }
            }
            None
        }
        OpCode::StrCat => {
            let (Value::String(lhs), Value::String(rhs)) = (task.reg(a), task.reg(b)) else {
                return task.fault(crate::ErrorKind::Type);
            };
            let mut bytes = Vec::with_capacity(
                HeapString::bytes(&task.arena, lhs).len() + HeapString::bytes(&task.arena, rhs).len(),
            );
            bytes.extend_from_slice(HeapString::bytes(&task.arena, lhs));
            bytes.extend_from_slice(HeapString::bytes(&task.arena, rhs));
            match HeapString::alloc(&mut task.arena, &bytes) {
                Some(addr) => {
                    task.set_reg(a, Value::String(addr));
                    None
                }
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }
        OpCode::Intern => {
            let Value::String(addr) = task.reg(b) else { return task.fault(crate::ErrorKind::Type) };
            let bytes = HeapString::bytes(&task.arena, addr).to_vec();
            let Ok(s) = core::str::from_utf8(&bytes) else { return task.fault(crate::ErrorKind::Type) };
            match task.symtab.intern(&mut task.arena, s) {
                Some(sym) => {
                    task.set_reg(a, Value::Symbol(sym));
                    None
                }
                None => task.fault(crate::ErrorKind::OutOfMemory),
            }
        }
        OpCode::RangeInc | OpCode::RangeExc => {
            let first = task.reg(b);
            let last = task.reg(c);
            inc_ref(&mut task.arena, first);
            inc_ref(&mut task.arena, last);
            match HeapRange::alloc(&mut task.arena, first, last, decoded.op == OpCode::RangeInc) {
                Some(addr) => {
                    task.set_reg(a, Value::Range(addr));
                    None
                }
                None => {
                    dec_ref(&mut task.arena, first);
                    dec_ref(&mut task.arena, last);
                    task.fault(crate::ErrorKind::OutOfMemory)
                }
            }
        }

        OpCode::Ext1 | OpCode::Ext2 | OpCode::Ext3 => unreachable!("handled above"),
    }
}

fn local_sym(task: &Task<'_>, irep_idx: usize, index: u32) -> Option<SymId> {
    task.irep_pool[irep_idx].locals.get(index as usize).copied()
}

fn sign_extend_8(b: u32) -> i64 {
    (b as u8) as i8 as i64
}

fn sign_extend_16(b: u32) -> i64 {
    (b as u16) as i16 as i64
}

/// The current lexical class for `GETCONST`/`SETCONST`: the class whose
/// body is executing, or `Object` at the top level.
fn current_lexical_class(task: &Task<'_>) -> Addr {
    task.calls.top().map_or(task.bootstrap.object, |f| {
        if f.current_class.is_null() { task.bootstrap.object } else { f.current_class }
    })
}

/// Every receiver kind dispatches through `Object`'s method table: this VM
/// models no separate built-in class per primitive/collection type, so
/// `SEND` on a `Fixnum`/`Array`/... only resolves methods a host or
/// bootstrap installed on `Object`.
fn class_of_value(task: &Task<'_>, v: Value) -> Addr {
    match v {
        Value::Object(addr) => Instance::class_of(&task.arena, addr),
        _ => task.bootstrap.object,
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch_send(task: &mut Task<'_>, sink: &mut dyn HostSink, a: u32, name_idx: u32, argc_operand: u32, block: Option<Value>) -> StepResult {
    let Some(name) = local_sym(task, task.cur_irep as usize, name_idx) else {
        return task.fault(crate::ErrorKind::Name);
    };
    let argc = resolve_argc(task, a, argc_operand);
    let recv = task.reg(a);
    let class = class_of_value(task, recv);

    task.pending_block = block.unwrap_or(Value::Nil);

    match lookup_method(&task.arena, class, name) {
        Some(Method { owner, kind: MethodKind::Native, payload }) => {
            invoke_native(task, sink, a, argc, owner, class, payload)
        }
        Some(Method { owner, kind: MethodKind::Bytecode, payload }) => {
            invoke_bytecode(task, payload, name, argc, class, owner, a)
        }
        None => task.fault(crate::ErrorKind::Name),
    }
}

fn dispatch_super(task: &mut Task<'_>, sink: &mut dyn HostSink, a: u32, argc_operand: u32) -> StepResult {
    let Some(frame) = task.calls.top().copied() else { return task.fault(crate::ErrorKind::Type) };
    let argc = resolve_argc(task, a, argc_operand);
    let Some(start) = super_of(&task.arena, frame.owning_class) else {
        return task.fault(crate::ErrorKind::Name);
    };
    task.pending_block = Value::Nil;

    match lookup_method(&task.arena, start, frame.method_id) {
        Some(Method { owner, kind: MethodKind::Native, payload }) => {
            let recv_class = class_of_value(task, task.reg(0));
            invoke_native(task, sink, 0, argc, owner, recv_class, payload)
        }
        Some(Method { owner, kind: MethodKind::Bytecode, payload }) => {
            invoke_bytecode(task, payload, frame.method_id, argc, frame.target_class, owner, a)
        }
        None => task.fault(crate::ErrorKind::Name),
    }
}

fn resolve_argc(task: &Task<'_>, a: u32, operand: u32) -> u32 {
    if operand == SPLAT_ARGC {
        match task.reg(a + 1) {
            Value::Array(addr) => HeapArray::len(&task.arena, addr),
            _ => 0,
        }
    } else {
        operand
    }
}

fn invoke_native(
    task: &mut Task<'_>,
    sink: &mut dyn HostSink,
    window_base_rel: u32,
    argc: u32,
    _owner: Addr,
    _class: Addr,
    payload: u32,
) -> StepResult {
    let Some(&f) = task.native_fns.get(payload as usize) else {
        return task.fault(crate::ErrorKind::Name);
    };
    let base = task.reg_base + window_base_rel;
    {
        let mut ctx = crate::task::NativeCtx { task: &mut *task, sink, base };
        f(&mut ctx, argc);
    }
    if task.terminal {
        return Some(StopReason::Uncaught(task.pending_exception));
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn invoke_bytecode(
    task: &mut Task<'_>,
    irep_idx: u32,
    method_id: SymId,
    argc: u32,
    target_class: Addr,
    owning_class: Addr,
    reg_offset: u32,
) -> StepResult {
    match task.push_frame(irep_idx, method_id, argc, target_class, owning_class, owning_class, Addr::NULL, reg_offset) {
        Some(()) => None,
        None => task.fault(crate::ErrorKind::OutOfMemory),
    }
}

fn alloc_array_into(task: &mut Task<'_>, dest: u32, elems: Vec<Value>) -> StepResult {
    match HeapArray::alloc(&mut task.arena, &elems) {
        Some(addr) => {
            task.set_reg(dest, Value::Array(addr));
            None
        }
        None => {
            for v in elems {
                dec_ref(&mut task.arena, v);
            }
            task.fault(crate::ErrorKind::OutOfMemory)
        }
    }
}

fn binary_numeric(
    task: &mut Task<'_>,
    a: u32,
    b: u32,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> StepResult {
    match (task.reg(a), task.reg(b)) {
        (Value::Fixnum(x), Value::Fixnum(y)) => match int_op(x, y) {
            Some(r) => {
                task.set_reg(a, Value::Fixnum(r));
                None
            }
            None => {
                task.set_reg(a, Value::Float(float_op(x as f64, y as f64)));
                None
            }
        },
        (Value::Fixnum(x), Value::Float(y)) => {
            task.set_reg(a, Value::Float(float_op(x as f64, y)));
            None
        }
        (Value::Float(x), Value::Fixnum(y)) => {
            task.set_reg(a, Value::Float(float_op(x, y as f64)));
            None
        }
        (Value::Float(x), Value::Float(y)) => {
            task.set_reg(a, Value::Float(float_op(x, y)));
            None
        }
        _ => task.fault(crate::ErrorKind::Type),
    }
}

fn values_equal(task: &Task<'_>, lhs: Value, rhs: Value) -> bool {
    match (lhs, rhs) {
        (Value::Fixnum(x), Value::Fixnum(y)) => x == y,
        (Value::Fixnum(x), Value::Float(y)) | (Value::Float(y), Value::Fixnum(x)) => x as f64 == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::String(x), Value::String(y)) => HeapString::bytes(&task.arena, x) == HeapString::bytes(&task.arena, y),
        _ => lhs == rhs,
    }
}

fn compare(task: &mut Task<'_>, a: u32, b: u32, pred: impl Fn(core::cmp::Ordering) -> bool) -> StepResult {
    let ord = match (task.reg(a), task.reg(b)) {
        (Value::Fixnum(x), Value::Fixnum(y)) => x.partial_cmp(&y),
        (Value::Fixnum(x), Value::Float(y)) => (x as f64).partial_cmp(&y),
        (Value::Float(x), Value::Fixnum(y)) => x.partial_cmp(&(y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(&y),
        (Value::String(x), Value::String(y)) => {
            HeapString::bytes(&task.arena, x).partial_cmp(HeapString::bytes(&task.arena, y))
        }
        _ => None,
    };
    match ord {
        Some(ord) => {
            task.set_reg(a, Value::bool(pred(ord)));
            None
        }
        None => task.fault(crate::ErrorKind::Type),
    }
}
