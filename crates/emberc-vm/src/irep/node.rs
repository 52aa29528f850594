// SPDX-License-Identifier: MIT

//! In-memory instruction representation (IREP) node.

use crate::types::SymId;
use alloc::vec::Vec;

/// A literal pool entry, tagged by kind — integer, float, or string.
#[derive(Clone, Debug, PartialEq)]
pub enum PoolValue {
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
}

/// One node of the flattened IREP tree.
///
/// `children` holds indices into the owning `Vec<IrepNode>`, not nested
/// owned nodes — `BLOCK`/`METHOD` reference a child by its small index
/// from the parent's bytecode, which this mirrors directly.
#[derive(Clone, Debug)]
pub struct IrepNode {
    pub nregs: u16,
    pub pool: Vec<PoolValue>,
    /// Names referenced by this IREP's symbol-bearing opcodes
    /// (`GETGV`/`SETGV`/`GETIV`/`SETIV`/`GETCONST`/`SETCONST`/`LOADSYM`/
    /// `ALIAS`/`DEF`/`CLASS`/`MODULE`), interned at load time. Those
    /// opcodes carry an index into this vec rather than interning a name
    /// at dispatch time.
    pub locals: Vec<SymId>,
    pub code: Vec<u8>,
    pub children: Vec<u32>,
}
