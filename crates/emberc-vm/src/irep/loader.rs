// SPDX-License-Identifier: MIT

//! Binary image parser.
//!
//! Integer and size fields are big-endian; pool strings and local names
//! carry a 2-byte length prefix followed by raw bytes then a zero
//! terminator; floats are stored as portable decimal ASCII text and
//! parsed on load with a `strtod`-style decimal parser.

use super::node::{IrepNode, PoolValue};
use crate::mem::Arena;
use crate::symbol::SymbolTable;
use alloc::vec::Vec;
use emberc_abi::image::{MAGIC, SECTION_IREP, VERSION};

/// Why loading an image failed. No partial tree is retained on error.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoaderError {
    MagicMismatch,
    UnsupportedVersion,
    Truncated,
    InvalidPoolTag,
    SymbolTableFull,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoaderError> {
        let end = self.pos.checked_add(len).ok_or(LoaderError::Truncated)?;
        let s = self.buf.get(self.pos..end).ok_or(LoaderError::Truncated)?;
        self.pos = end;
        Ok(s)
    }

    fn u8(&mut self) -> Result<u8, LoaderError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, LoaderError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoaderError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64, LoaderError> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes(b.try_into().expect("take(8) yields exactly 8 bytes")))
    }

    /// A 2-byte-length-prefixed byte string followed by a zero terminator.
    fn len_prefixed(&mut self) -> Result<&'a [u8], LoaderError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        let terminator = self.u8()?;
        if terminator != 0 {
            return Err(LoaderError::Truncated);
        }
        Ok(bytes)
    }
}

/// Parse `image`, producing a flat pre-order IREP pool and the index of
/// its root node (always `0` on success).
pub fn load(image: &[u8], arena: &mut Arena<'_>, symtab: &mut SymbolTable) -> Result<(Vec<IrepNode>, u32), LoaderError> {
    let mut r = Reader::new(image);

    let magic = r.take(MAGIC.len())?;
    if magic != MAGIC {
        return Err(LoaderError::MagicMismatch);
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(LoaderError::UnsupportedVersion);
    }

    let mut pool = Vec::new();
    let mut root = None;

    while r.pos < r.buf.len() {
        let tag = r.u8()?;
        let len = r.u32()? as usize;
        let section = r.take(len)?;
        if tag == SECTION_IREP {
            let mut sr = Reader::new(section);
            let idx = parse_node(&mut sr, arena, symtab, &mut pool)?;
            root.get_or_insert(idx);
        }
        // Any other section (e.g. debug line numbers) is skipped whole.
    }

    let root = root.ok_or(LoaderError::Truncated)?;
    Ok((pool, root))
}

fn parse_node(
    r: &mut Reader<'_>,
    arena: &mut Arena<'_>,
    symtab: &mut SymbolTable,
    pool_out: &mut Vec<IrepNode>,
) -> Result<u32, LoaderError> {
    let nregs = r.u16()?;
    let child_count = r.u16()?;
    let pool_count = r.u16()?;

    let mut pool = Vec::with_capacity(pool_count as usize);
    for _ in 0..pool_count {
        let tag = r.u8()?;
        let value = match tag {
            0 => PoolValue::Int(r.i64()?),
            1 => {
                let text = r.len_prefixed()?;
                let text = core::str::from_utf8(text).map_err(|_| LoaderError::InvalidPoolTag)?;
                let f = text.parse::<f64>().map_err(|_| LoaderError::InvalidPoolTag)?;
                PoolValue::Float(f)
            }
            2 => PoolValue::Str(r.len_prefixed()?.to_vec()),
            _ => return Err(LoaderError::InvalidPoolTag),
        };
        pool.push(value);
    }

    let local_count = r.u16()?;
    let mut locals = Vec::with_capacity(local_count as usize);
    for _ in 0..local_count {
        let name = r.len_prefixed()?;
        let name = core::str::from_utf8(name).map_err(|_| LoaderError::InvalidPoolTag)?;
        let sym = symtab.intern(arena, name).ok_or(LoaderError::SymbolTableFull)?;
        locals.push(sym);
    }

    let code_len = r.u32()? as usize;
    let code = r.take(code_len)?.to_vec();

    // Reserve this node's slot before recursing so a child's index is
    // always greater than its parent's (pre-order).
    let self_idx = pool_out.len() as u32;
    pool_out.push(IrepNode { nregs, pool, locals, code, children: Vec::with_capacity(child_count as usize) });

    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        children.push(parse_node(r, arena, symtab, pool_out)?);
    }
    pool_out[self_idx as usize].children = children;

    Ok(self_idx)
}
