// SPDX-License-Identifier: MIT

//! Explicit reference counting over [`super::Value`].
//!
//! The dispatch core calls these at assignment/duplication and
//! scope-exit points instead of leaning on `Clone`/`Drop` — `Value` is
//! `Copy`, so a bare `let b = a;` would silently duplicate a heap
//! reference without bumping its count. Forcing every duplication through
//! `inc_ref` keeps that mistake visible at the call site.

use super::heap::{read_refcount, write_refcount, HeapArray, HeapHash, HeapRange, HeapRecord, Instance, Proc};
use crate::mem::Arena;
use crate::value::Value;

/// Increment the refcount behind `v`, if it carries one. A no-op for
/// value types (`Fixnum`, `Symbol`, ...) and for `Class`/`Handle`.
pub fn inc_ref(arena: &mut Arena<'_>, v: Value) {
    let Some(addr) = ref_counted_addr(v) else { return };
    let n = read_refcount(arena, addr);
    write_refcount(arena, addr, n + 1);
}

/// Decrement the refcount behind `v`. At zero, recursively releases
/// anything `v` holds and frees its storage.
pub fn dec_ref(arena: &mut Arena<'_>, v: Value) {
    let Some(addr) = ref_counted_addr(v) else { return };
    let n = read_refcount(arena, addr);
    if n <= 1 {
        match v {
            Value::Array(_) => HeapArray::release(arena, addr),
            Value::String(_) => {}
            Value::Hash(_) => HeapHash::release(arena, addr),
            Value::Range(_) => HeapRange::release(arena, addr),
            Value::Object(_) => Instance::release(arena, addr),
            Value::Proc(_) => Proc::release(arena, addr),
            _ => unreachable!("ref_counted_addr only returns Some for the variants above"),
        }
        arena.free(addr);
        return;
    }
    write_refcount(arena, addr, n - 1);
}

fn ref_counted_addr(v: Value) -> Option<crate::types::Addr> {
    match v {
        Value::Object(a) | Value::Proc(a) | Value::Array(a) | Value::String(a) | Value::Range(a) | Value::Hash(a) => Some(a),
        _ => None,
    }
}
