// SPDX-License-Identifier: MIT

//! Heap-resident object layouts backing the reference-typed [`super::Value`]
//! variants.
//!
//! Every layout starts with a `u32 refcount` field at offset zero so
//! [`super::refcount`] can bump/drop it generically without knowing which
//! variant it is holding; only the "last reference dropped" path needs to
//! know the concrete layout, to recursively release anything it contains.

use crate::mem::Arena;
use crate::types::Addr;
use crate::value::Value;

const VALUE_SIZE: usize = core::mem::size_of::<Value>();

/// A heap layout that can release what it contains when its refcount hits
/// zero, then free its own backing storage.
pub trait HeapRecord {
    /// Drop held references and free `addr`'s storage. Called only once the
    /// refcount at `addr` has already reached zero.
    fn release(arena: &mut Arena<'_>, addr: Addr);
}

/// Header shared by every heap record: a `u32` refcount at offset zero.
#[derive(Clone, Copy)]
#[repr(C)]
struct RcHeader {
    refcount: u32,
}

pub(super) fn read_refcount(arena: &Arena<'_>, addr: Addr) -> u32 {
    arena.read::<RcHeader>(addr).refcount
}

pub(super) fn write_refcount(arena: &mut Arena<'_>, addr: Addr, n: u32) {
    let mut h = arena.read::<RcHeader>(addr);
    h.refcount = n;
    arena.write(addr, h);
}

// --- String ------------------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct StringHeader {
    refcount: u32,
    len: u32,
}

/// Immutable byte string.
pub struct HeapString;

impl HeapString {
    const HEADER_SIZE: usize = core::mem::size_of::<StringHeader>();

    /// Allocate a new string copying `bytes`.
    pub fn alloc(arena: &mut Arena<'_>, bytes: &[u8]) -> Option<Addr> {
        let addr = arena.alloc(Self::HEADER_SIZE + bytes.len())?;
        arena.write(addr, StringHeader { refcount: 1, len: bytes.len() as u32 });
        if !bytes.is_empty() {
            arena.slice_mut(addr.add(Self::HEADER_SIZE as u32), bytes.len()).copy_from_slice(bytes);
        }
        Some(addr)
    }

    #[must_use]
    pub fn len(arena: &Arena<'_>, addr: Addr) -> u32 {
        arena.read::<StringHeader>(addr).len
    }

    #[must_use]
    pub fn bytes<'a>(arena: &'a Arena<'_>, addr: Addr) -> &'a [u8] {
        let len = Self::len(arena, addr) as usize;
        arena.slice(addr.add(Self::HEADER_SIZE as u32), len)
    }
}

impl HeapRecord for HeapString {
    fn release(_arena: &mut Arena<'_>, _addr: Addr) {
        // No contained references to release; the caller frees the block.
    }
}

// --- Array ---------------------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct ArrayHeader {
    refcount: u32,
    len: u32,
    cap: u32,
    _pad: u32,
}

/// Fixed-identity, growable array. `cap` grows by doubling on push.
pub struct HeapArray;

impl HeapArray {
    const HEADER_SIZE: usize = core::mem::size_of::<ArrayHeader>();

    fn slot_addr(addr: Addr, idx: u32) -> Addr {
        addr.add(Self::HEADER_SIZE as u32).add(idx * VALUE_SIZE as u32)
    }

    /// Allocate a new array by copying `elems` (the caller is responsible
    /// for having already `inc_ref`'d each one).
    pub fn alloc(arena: &mut Arena<'_>, elems: &[Value]) -> Option<Addr> {
        let cap = elems.len().max(1) as u32;
        let addr = arena.alloc(Self::HEADER_SIZE + cap as usize * VALUE_SIZE)?;
        arena.write(addr, ArrayHeader { refcount: 1, len: elems.len() as u32, cap, _pad: 0 });
        for (i, v) in elems.iter().enumerate() {
            arena.write(Self::slot_addr(addr, i as u32), *v);
        }
        Some(addr)
    }

    #[must_use]
    pub fn len(arena: &Arena<'_>, addr: Addr) -> u32 {
        arena.read::<ArrayHeader>(addr).len
    }

    #[must_use]
    pub fn get(arena: &Arena<'_>, addr: Addr, idx: u32) -> Option<Value> {
        if idx >= Self::len(arena, addr) {
            return None;
        }
        Some(arena.read(Self::slot_addr(addr, idx)))
    }

    /// Overwrite an existing slot. Caller manages refcounts of the old and
    /// new value.
    pub fn set(arena: &mut Arena<'_>, addr: Addr, idx: u32, v: Value) {
        debug_assert!(idx < Self::len(arena, addr));
        arena.write(Self::slot_addr(addr, idx), v);
    }

    /// Append `v`, growing the backing storage if needed. Returns the
    /// (possibly new) address of the array — callers must update any
    /// `Value::Array` pointing at the old one.
    #[must_use]
    pub fn push(arena: &mut Arena<'_>, addr: Addr, v: Value) -> Option<Addr> {
        let mut h = arena.read::<ArrayHeader>(addr);
        let addr = if h.len == h.cap {
            let new_cap = (h.cap * 2).max(4);
            let new_addr = arena.realloc(addr, Self::HEADER_SIZE + new_cap as usize * VALUE_SIZE)?;
            h.cap = new_cap;
            arena.write(new_addr, h);
            new_addr
        } else {
            addr
        };
        arena.write(Self::slot_addr(addr, h.len), v);
        h.len += 1;
        arena.write(addr, h);
        Some(addr)
    }
}

impl HeapRecord for HeapArray {
    fn release(arena: &mut Arena<'_>, addr: Addr) {
        let len = Self::len(arena, addr);
        for i in 0..len {
            let v = arena.read::<Value>(Self::slot_addr(addr, i));
            super::dec_ref(arena, v);
        }
    }
}

// --- Hash ------------------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct HashHeader {
    refcount: u32,
    len: u32,
    cap: u32,
    _pad: u32,
}

/// Association-list backed map. Simple linear scan, adequate for the
/// small hashes this VM actually sees; not a real hash table.
pub struct HeapHash;

impl HeapHash {
    const HEADER_SIZE: usize = core::mem::size_of::<HashHeader>();
    const ENTRY_SIZE: usize = 2 * VALUE_SIZE;

    fn key_addr(addr: Addr, idx: u32) -> Addr {
        addr.add(Self::HEADER_SIZE as u32).add(idx * Self::ENTRY_SIZE as u32)
    }

    fn val_addr(addr: Addr, idx: u32) -> Addr {
        Self::key_addr(addr, idx).add(VALUE_SIZE as u32)
    }

    #[must_use]
    pub fn alloc_empty(arena: &mut Arena<'_>) -> Option<Addr> {
        let cap = 4u32;
        let addr = arena.alloc(Self::HEADER_SIZE + cap as usize * Self::ENTRY_SIZE)?;
        arena.write(addr, HashHeader { refcount: 1, len: 0, cap, _pad: 0 });
        Some(addr)
    }

    #[must_use]
    pub fn len(arena: &Arena<'_>, addr: Addr) -> u32 {
        arena.read::<HashHeader>(addr).len
    }

    fn find_index(arena: &Arena<'_>, addr: Addr, key: Value) -> Option<u32> {
        let len = Self::len(arena, addr);
        (0..len).find(|&i| arena.read::<Value>(Self::key_addr(addr, i)) == key)
    }

    #[must_use]
    pub fn get(arena: &Arena<'_>, addr: Addr, key: Value) -> Option<Value> {
        let idx = Self::find_index(arena, addr, key)?;
        Some(arena.read(Self::val_addr(addr, idx)))
    }

    /// Insert or overwrite `key -> value`. Returns the (possibly new)
    /// address; the caller must update any `Value::Hash` pointing at the
    /// old one. Caller owns the refcounts of both `key` and `value`; on
    /// overwrite the old value's refcount must be dropped by the caller
    /// first (it is returned to let the caller do so). Returns `None` on
    /// out-of-memory growing the backing storage; the original block is
    /// left untouched in that case.
    #[must_use]
    pub fn insert(arena: &mut Arena<'_>, addr: Addr, key: Value, value: Value) -> Option<(Addr, Option<Value>)> {
        if let Some(idx) = Self::find_index(arena, addr, key) {
            let old = arena.read::<Value>(Self::val_addr(addr, idx));
            arena.write(Self::val_addr(addr, idx), value);
            return Some((addr, Some(old)));
        }

        let mut h = arena.read::<HashHeader>(addr);
        let addr = if h.len == h.cap {
            let new_cap = (h.cap * 2).max(4);
            let new_addr = arena.realloc(addr, Self::HEADER_SIZE + new_cap as usize * Self::ENTRY_SIZE)?;
            h.cap = new_cap;
            arena.write(new_addr, h);
            new_addr
        } else {
            addr
        };
        arena.write(Self::key_addr(addr, h.len), key);
        arena.write(Self::val_addr(addr, h.len), value);
        h.len += 1;
        arena.write(addr, h);
        Some((addr, None))
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn for_each(arena: &Arena<'_>, addr: Addr, mut f: impl FnMut(Value, Value)) {
        let len = Self::len(arena, addr);
        for i in 0..len {
            f(arena.read(Self::key_addr(addr, i)), arena.read(Self::val_addr(addr, i)));
        }
    }
}

impl HeapRecord for HeapHash {
    fn release(arena: &mut Arena<'_>, addr: Addr) {
        let len = Self::len(arena, addr);
        for i in 0..len {
            let k = arena.read::<Value>(Self::key_addr(addr, i));
            let v = arena.read::<Value>(Self::val_addr(addr, i));
            super::dec_ref(arena, k);
            super::dec_ref(arena, v);
        }
    }
}

// --- Range -------------------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct RangeHeader {
    refcount: u32,
    inclusive: u8,
    _pad: [u8; 3],
    first: Value,
    last: Value,
}

/// A `first..last` or `first..=last` range.
pub struct HeapRange;

impl HeapRange {
    #[must_use]
    pub fn alloc(arena: &mut Arena<'_>, first: Value, last: Value, inclusive: bool) -> Option<Addr> {
        let addr = arena.alloc(core::mem::size_of::<RangeHeader>())?;
        arena.write(
            addr,
            RangeHeader { refcount: 1, inclusive: u8::from(inclusive), _pad: [0; 3], first, last },
        );
        Some(addr)
    }

    #[must_use]
    pub fn first(arena: &Arena<'_>, addr: Addr) -> Value {
        arena.read::<RangeHeader>(addr).first
    }

    #[must_use]
    pub fn last(arena: &Arena<'_>, addr: Addr) -> Value {
        arena.read::<RangeHeader>(addr).last
    }

    #[must_use]
    pub fn is_inclusive(arena: &Arena<'_>, addr: Addr) -> bool {
        arena.read::<RangeHeader>(addr).inclusive != 0
    }
}

impl HeapRecord for HeapRange {
    fn release(arena: &mut Arena<'_>, addr: Addr) {
        super::dec_ref(arena, Self::first(arena, addr));
        super::dec_ref(arena, Self::last(arena, addr));
    }
}

// --- Object instance -----------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct InstanceHeader {
    refcount: u32,
    class: Addr,
    len: u32,
    cap: u32,
}

/// An object instance: a class pointer plus a sparse symbol -> value map of
/// instance variables.
pub struct Instance;

impl Instance {
    const HEADER_SIZE: usize = core::mem::size_of::<InstanceHeader>();
    const ENTRY_SIZE: usize = 4 + VALUE_SIZE; // SymId (u32) + Value

    fn key_addr(addr: Addr, idx: u32) -> Addr {
        addr.add(Self::HEADER_SIZE as u32).add(idx * Self::ENTRY_SIZE as u32)
    }

    fn val_addr(addr: Addr, idx: u32) -> Addr {
        Self::key_addr(addr, idx).add(4)
    }

    #[must_use]
    pub fn alloc(arena: &mut Arena<'_>, class: Addr) -> Option<Addr> {
        let cap = 4u32;
        let addr = arena.alloc(Self::HEADER_SIZE + cap as usize * Self::ENTRY_SIZE)?;
        arena.write(addr, InstanceHeader { refcount: 1, class, len: 0, cap });
        Some(addr)
    }

    #[must_use]
    pub fn class_of(arena: &Arena<'_>, addr: Addr) -> Addr {
        arena.read::<InstanceHeader>(addr).class
    }

    fn find_index(arena: &Arena<'_>, addr: Addr, sym: u32) -> Option<u32> {
        let len = arena.read::<InstanceHeader>(addr).len;
        (0..len).find(|&i| arena.read::<u32>(Self::key_addr(addr, i)) == sym)
    }

    /// Read an instance variable, or `None` if it was never set (callers
    /// map that to `Value::Nil`).
    #[must_use]
    pub fn get_ivar(arena: &Arena<'_>, addr: Addr, sym: u32) -> Option<Value> {
        let idx = Self::find_index(arena, addr, sym)?;
        Some(arena.read(Self::val_addr(addr, idx)))
    }

    /// Set an instance variable, growing backing storage if needed. Returns
    /// the (possibly new) address and the previous value, if any (caller
    /// must `dec_ref` it). Returns `None` on out-of-memory growing the
    /// backing storage; the original block is left untouched in that case.
    #[must_use]
    pub fn set_ivar(arena: &mut Arena<'_>, addr: Addr, sym: u32, value: Value) -> Option<(Addr, Option<Value>)> {
        if let Some(idx) = Self::find_index(arena, addr, sym) {
            let old = arena.read::<Value>(Self::val_addr(addr, idx));
            arena.write(Self::val_addr(addr, idx), value);
            return Some((addr, Some(old)));
        }

        let mut h = arena.read::<InstanceHeader>(addr);
        let addr = if h.len == h.cap {
            let new_cap = (h.cap * 2).max(4);
            let new_addr = arena.realloc(addr, Self::HEADER_SIZE + new_cap as usize * Self::ENTRY_SIZE)?;
            h.cap = new_cap;
            arena.write(new_addr, h);
            new_addr
        } else {
            addr
        };
        arena.write(Self::key_addr(addr, h.len), sym);
        arena.write(Self::val_addr(addr, h.len), value);
        h.len += 1;
        arena.write(addr, h);
        Some((addr, None))
    }
}

impl HeapRecord for Instance {
    fn release(arena: &mut Arena<'_>, addr: Addr) {
        let len = arena.read::<InstanceHeader>(addr).len;
        for i in 0..len {
            let v = arena.read::<Value>(Self::val_addr(addr, i));
            super::dec_ref(arena, v);
        }
    }
}

// --- Proc (closure) --------------------------------------------------------------

#[derive(Clone, Copy)]
#[repr(C)]
struct ProcHeader {
    refcount: u32,
    /// Index into the owning task's flat IREP pool.
    irep_idx: u32,
    /// Lexically enclosing proc, or `Addr::NULL` for a top-level method.
    parent: Addr,
    /// `self` at the point this proc was created (`LOADSELF` inside a block).
    captured_self: Value,
    captures_len: u32,
}

/// A closure: an IREP reference plus a snapshot of the registers it closes
/// over, copied by value at creation time rather than a live back-pointer
/// into the call stack.
pub struct Proc;

impl Proc {
    const HEADER_SIZE: usize = core::mem::size_of::<ProcHeader>();

    fn capture_addr(addr: Addr, idx: u32) -> Addr {
        addr.add(Self::HEADER_SIZE as u32).add(idx * VALUE_SIZE as u32)
    }

    #[must_use]
    pub fn alloc(
        arena: &mut Arena<'_>,
        irep_idx: u32,
        parent: Addr,
        captured_self: Value,
        captures: &[Value],
    ) -> Option<Addr> {
        let addr = arena.alloc(Self::HEADER_SIZE + captures.len() * VALUE_SIZE)?;
        arena.write(
            addr,
            ProcHeader { refcount: 1, irep_idx, parent, captured_self, captures_len: captures.len() as u32 },
        );
        for (i, v) in captures.iter().enumerate() {
            arena.write(Self::capture_addr(addr, i as u32), *v);
        }
        Some(addr)
    }

    #[must_use]
    pub fn irep_idx(arena: &Arena<'_>, addr: Addr) -> u32 {
        arena.read::<ProcHeader>(addr).irep_idx
    }

    #[must_use]
    pub fn parent(arena: &Arena<'_>, addr: Addr) -> Addr {
        arena.read::<ProcHeader>(addr).parent
    }

    #[must_use]
    pub fn captured_self(arena: &Arena<'_>, addr: Addr) -> Value {
        arena.read::<ProcHeader>(addr).captured_self
    }

    #[must_use]
    pub fn get_capture(arena: &Arena<'_>, addr: Addr, idx: u32) -> Option<Value> {
        if idx >= arena.read::<ProcHeader>(addr).captures_len {
            return None;
        }
        Some(arena.read(Self::capture_addr(addr, idx)))
    }

    pub fn set_capture(arena: &mut Arena<'_>, addr: Addr, idx: u32, v: Value) {
        debug_assert!(idx < arena.read::<ProcHeader>(addr).captures_len);
        arena.write(Self::capture_addr(addr, idx), v);
    }

    /// Walk `hops` parent links up the lexical chain.
    #[must_use]
    pub fn ancestor(arena: &Arena<'_>, addr: Addr, hops: u32) -> Option<Addr> {
        let mut cur = addr;
        for _ in 0..hops {
            cur = Self::parent(arena, cur);
            if cur.is_null() {
                return None;
            }
        }
        Some(cur)
    }
}

impl HeapRecord for Proc {
    fn release(arena: &mut Arena<'_>, addr: Addr) {
        super::dec_ref(arena, Self::captured_self(arena, addr));
        let len = arena.read::<ProcHeader>(addr).captures_len;
        for i in 0..len {
            let v = arena.read::<Value>(Self::capture_addr(addr, i));
            super::dec_ref(arena, v);
        }
        let parent = Self::parent(arena, addr);
        if !parent.is_null() {
            super::dec_ref(arena, Value::Proc(parent));
        }
    }
}
