// SPDX-License-Identifier: MIT

//! Classes and method tables.
//!
//! Classes are permanent: allocated once via `raw_alloc_no_free` and never
//! individually freed, mirroring how symbols are interned (`Value::Class`
//! is accordingly excluded from refcounting, see `value::Value::is_ref_counted`).

use crate::mem::Arena;
use crate::object::runtime::Runtime;
use crate::types::{Addr, SymId};
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MethodKind {
    Native,
    Bytecode,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ClassHeader {
    name: SymId,
    super_: Addr,
    methods: Addr,
    consts: Addr,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct MethodRecord {
    name: SymId,
    kind: u8,
    _pad: [u8; 3],
    /// Index into the host's native-method table when `kind == Native`,
    /// or into the task's flat IREP pool when `kind == Bytecode`.
    payload: u32,
    next: Addr,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ConstEntry {
    name: SymId,
    value: Value,
    next: Addr,
}

/// A resolved method: which class defines it (needed for `super`) and its
/// implementation.
#[derive(Clone, Copy, Debug)]
pub struct Method {
    pub owner: Addr,
    pub kind: MethodKind,
    pub payload: u32,
}

/// Install a class named `name` under `super_` (or under the runtime's
/// root `Object` when `None`). Idempotent: re-defining a name already
/// registered as a class returns the existing one.
pub fn define_class(arena: &mut Arena<'_>, runtime: &mut Runtime, name: SymId, super_: Option<Addr>) -> Option<Addr> {
    if let Some(Value::Class(existing)) = runtime.global_consts.get(name) {
        return Some(existing);
    }

    let addr = arena.raw_alloc_no_free(core::mem::size_of::<ClassHeader>())?;
    arena.write(
        addr,
        ClassHeader { name, super_: super_.unwrap_or(Addr::NULL), methods: Addr::NULL, consts: Addr::NULL },
    );
    runtime.global_consts.set(name, Value::Class(addr));
    Some(addr)
}

/// Prepend a method record to `class`'s method list (LIFO: later
/// definitions shadow earlier ones with the same name without erasing
/// them, so lookup order is LIFO by definition.
pub fn define_method(arena: &mut Arena<'_>, class: Addr, name: SymId, kind: MethodKind, payload: u32) -> Option<()> {
    let h = arena.read::<ClassHeader>(class);
    let rec_addr = arena.raw_alloc_no_free(core::mem::size_of::<MethodRecord>())?;
    arena.write(
        rec_addr,
        MethodRecord { name, kind: kind as u8, _pad: [0; 3], payload, next: h.methods },
    );
    let mut h = h;
    h.methods = rec_addr;
    arena.write(class, h);
    Some(())
}

/// Look up `name` starting at `class`, following `super` links on miss.
pub fn lookup_method(arena: &Arena<'_>, class: Addr, name: SymId) -> Option<Method> {
    let mut cur = class;
    while !cur.is_null() {
        let h = arena.read::<ClassHeader>(cur);
        let mut rec = h.methods;
        while !rec.is_null() {
            let r = arena.read::<MethodRecord>(rec);
            if r.name == name {
                let kind = if r.kind == MethodKind::Native as u8 { MethodKind::Native } else { MethodKind::Bytecode };
                return Some(Method { owner: cur, kind, payload: r.payload });
            }
            rec = r.next;
        }
        cur = h.super_;
    }
    None
}

/// Superclass of `class`, or `None` at the root.
#[must_use]
pub fn super_of(arena: &Arena<'_>, class: Addr) -> Option<Addr> {
    let s = arena.read::<ClassHeader>(class).super_;
    if s.is_null() { None } else { Some(s) }
}

/// `true` if `class` is `ancestor` or descends from it by following
/// `super` links — the basis for `RESCUE`'s class-match test.
#[must_use]
pub fn is_a(arena: &Arena<'_>, mut class: Addr, ancestor: Addr) -> bool {
    loop {
        if class == ancestor {
            return true;
        }
        match super_of(arena, class) {
            Some(s) => class = s,
            None => return false,
        }
    }
}

/// Look up a per-class constant at `class`, walking its `super` chain
/// only (`GETMCNST`).
#[must_use]
pub fn get_class_const(arena: &Arena<'_>, class: Addr, name: SymId) -> Option<Value> {
    let mut cur = class;
    while !cur.is_null() {
        let h = arena.read::<ClassHeader>(cur);
        let mut e = h.consts;
        while !e.is_null() {
            let entry = arena.read::<ConstEntry>(e);
            if entry.name == name {
                return Some(entry.value);
            }
            e = entry.next;
        }
        cur = h.super_;
    }
    None
}

/// Define (or overwrite) a constant directly on `class`, without walking
/// `super` (`SETCONST`).
pub fn set_class_const(arena: &mut Arena<'_>, class: Addr, name: SymId, value: Value) -> Option<()> {
    let h = arena.read::<ClassHeader>(class);
    let mut e = h.consts;
    while !e.is_null() {
        let mut entry = arena.read::<ConstEntry>(e);
        if entry.name == name {
            entry.value = value;
            arena.write(e, entry);
            return Some(());
        }
        e = entry.next;
    }

    let rec_addr = arena.raw_alloc_no_free(core::mem::size_of::<ConstEntry>())?;
    arena.write(rec_addr, ConstEntry { name, value, next: h.consts });
    let mut h = h;
    h.consts = rec_addr;
    arena.write(class, h);
    Some(())
}

#[must_use]
pub fn class_name(arena: &Arena<'_>, class: Addr) -> SymId {
    arena.read::<ClassHeader>(class).name
}
