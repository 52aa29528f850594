// SPDX-License-Identifier: MIT

//! Variable-width opcode decoder.
//!
//! Each opcode is a 1-byte operation followed by a packed operand pattern:
//! `Z` (no operand), `B`/`BB`/`BBB` (one to three bytes), `S` (one 16-bit
//! big-endian field), `BS` (one byte plus one 16-bit field), `W` (one
//! 24-bit field). `EXT1`/`EXT2`/`EXT3` prefix opcodes widen the first
//! and/or second byte-operand of the *next* instruction from 8 to 16
//! bits; the decoder tracks that as `ext` state cleared after one fetch.


mod op;

pub use op::OpCode;

/// Which byte-operands of the next instruction are widened to 16 bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct ExtFlag {
    pub first_wide: bool,
    pub second_wide: bool,
}

impl ExtFlag {
    pub const NONE: Self = Self { first_wide: false, second_wide: false };
    pub const EXT1: Self = Self { first_wide: true, second_wide: false };
    pub const EXT2: Self = Self { first_wide: false, second_wide: true };
    pub const EXT3: Self = Self { first_wide: true, second_wide: true };
}

/// Operand family an opcode decodes to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    /// No operand.
    Z,
    /// One byte-operand (widened by `EXT1`/`EXT3`).
    B,
    /// Two byte-operands (first widened by `EXT1`/`EXT3`, second by
    /// `EXT2`/`EXT3`).
    Bb,
    /// Three byte-operands; only the first two are ever widened.
    Bbb,
    /// One fixed 16-bit big-endian operand.
    S,
    /// One byte-operand (widenable) followed by a fixed 16-bit operand.
    Bs,
    /// One fixed 24-bit big-endian operand.
    W,
}

/// Decoded operands, in source order. Unused slots are zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Operands {
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

/// One decoded instruction and how many bytes it occupied (operands only,
/// not counting the opcode byte itself).
#[derive(Clone, Copy, Debug)]
pub struct Decoded {
    pub op: OpCode,
    pub operands: Operands,
}

/// Decode reached past the end of `code` while reading operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncated;

/// Fetch and decode one instruction at `*pc`, advancing `*pc` past it.
///
/// `ext` is the widening state left by a previous `EXT*` prefix; the
/// caller is responsible for clearing it after this call unless the
/// decoded opcode is itself `EXT1`/`EXT2`/`EXT3` ("`EXT*` prefixes
/// apply to exactly the next opcode and leave `ext_flag` clear after").
pub fn decode(code: &[u8], pc: &mut u32, ext: ExtFlag) -> Result<Decoded, Truncated> {
    let op = OpCode::from_byte(read_u8(code, pc)?);
    let shape = op.shape();
    let operands = match shape {
        Shape::Z => Operands::default(),
        Shape::B => Operands { a: read_operand(code, pc, ext.first_wide)?, b: 0, c: 0 },
        Shape::Bb => {
            let a = read_operand(code, pc, ext.first_wide)?;
            let b = read_operand(code, pc, ext.second_wide)?;
            Operands { a, b, c: 0 }
        }
        Shape::Bbb => {
            let a = read_operand(code, pc, ext.first_wide)?;
            let b = read_operand(code, pc, ext.second_wide)?;
            let c = read_operand(code, pc, false)?;
            Operands { a, b, c }
        }
        Shape::S => Operands { a: read_u16(code, pc)?, b: 0, c: 0 },
        Shape::Bs => {
            let a = read_operand(code, pc, ext.first_wide)?;
            let b = read_u16(code, pc)?;
            Operands { a, b, c: 0 }
        }
        Shape::W => Operands { a: read_u24(code, pc)?, b: 0, c: 0 },
    };
    Ok(Decoded { op, operands })
}

fn read_operand(code: &[u8], pc: &mut u32, wide: bool) -> Result<u32, Truncated> {
    if wide { read_u16(code, pc) } else { read_u8(code, pc).map(u32::from) }
}

fn read_u8(code: &[u8], pc: &mut u32) -> Result<u32, Truncated> {
    let byte = *code.get(*pc as usize).ok_or(Truncated)?;
    *pc += 1;
    Ok(u32::from(byte))
}

fn read_u16(code: &[u8], pc: &mut u32) -> Result<u32, Truncated> {
    let hi = read_u8(code, pc)?;
    let lo = read_u8(code, pc)?;
    Ok((hi << 8) | lo)
}

fn read_u24(code: &[u8], pc: &mut u32) -> Result<u32, Truncated> {
    let hi = read_u8(code, pc)?;
    let mid = read_u8(code, pc)?;
    let lo = read_u8(code, pc)?;
    Ok((hi << 16) | (mid << 8) | lo)
}

/// Splat marker for a call-count operand.
pub const SPLAT_ARGC: u32 = 255;
/// Splat marker for a super-call operand.
pub const SPLAT_SUPER: u32 = 127;
