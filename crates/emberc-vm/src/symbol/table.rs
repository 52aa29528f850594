// SPDX-License-Identifier: MIT

//! Fixed-capacity intern table.

use crate::mem::Arena;
use crate::types::{Addr, SymId};

/// Hard capacity for interned symbols; overflowing it is a hard error.
/// Sized to keep the table under 16 KiB.
pub const MAX_SYMBOLS: usize = 2000;

/// Maps strings to dense integer ids and back.
///
/// Backing bytes for each interned name live in the VM's [`Arena`] (via
/// [`Arena::raw_alloc_no_free`], since symbols are never individually
/// freed); this table itself only tracks `(Addr, len)` pairs and is cheap
/// to keep process-wide or per-VM depending on the embedding.
pub struct SymbolTable {
    entries: [(Addr, u16); MAX_SYMBOLS],
    len: usize,
}

impl SymbolTable {
    /// An empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [(Addr::NULL, 0); MAX_SYMBOLS],
            len: 0,
        }
    }

    /// Number of interned symbols so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// `true` when no symbol has been interned yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Intern `s`, returning its existing id if already interned.
    ///
    /// Returns `None` only when the table is at [`MAX_SYMBOLS`] capacity or
    /// the arena is out of memory — both are hard errors the caller should
    /// surface as a fatal initialization failure, not retry.
    pub fn intern(&mut self, arena: &mut Arena<'_>, s: &str) -> Option<SymId> {
        for i in 0..self.len {
            if self.bytes_at(arena, i) == s.as_bytes() {
                return Some(SymId::new(i as u32));
            }
        }

        if self.len >= MAX_SYMBOLS {
            return None;
        }

        let addr = arena.raw_alloc_no_free(s.len())?;
        if !s.is_empty() {
            arena.slice_mut(addr, s.len()).copy_from_slice(s.as_bytes());
        }

        self.entries[self.len] = (addr, s.len() as u16);
        let id = SymId::new(self.len as u32);
        self.len += 1;
        Some(id)
    }

    /// Look up the name behind `id`, if it was interned through this table.
    #[must_use]
    pub fn name_of<'a>(&self, arena: &'a Arena<'_>, id: SymId) -> Option<&'a str> {
        let idx = id.as_u32() as usize;
        if idx >= self.len {
            return None;
        }
        let (addr, len) = self.entries[idx];
        core::str::from_utf8(arena.slice(addr, len as usize)).ok()
    }

    /// Look up the id for `s` without interning it.
    #[must_use]
    pub fn find(&self, arena: &Arena<'_>, s: &str) -> Option<SymId> {
        (0..self.len)
            .find(|&i| self.bytes_at(arena, i) == s.as_bytes())
            .map(|i| SymId::new(i as u32))
    }

    fn bytes_at<'a>(&self, arena: &'a Arena<'_>, idx: usize) -> &'a [u8] {
        let (addr, len) = self.entries[idx];
        arena.slice(addr, len as usize)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
