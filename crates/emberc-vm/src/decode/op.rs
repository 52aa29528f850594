// SPDX-License-Identifier: MIT

//! Opcode table: one variant per named operation, grouped by family.

use super::Shape;

/// A single VM instruction's operation.
///
/// Grouped here by family: loads/moves,
/// variable access, control flow, exception control, calls, returns,
/// block/class definition, arithmetic/comparison, collection
/// construction, then the `EXT*` prefixes.
///
/// `LOADI_n`/`LOADINEG` shorthand opcodes are folded into `LoadI` taking
/// a signed byte operand — one opcode covers the full small-int
/// immediate range instead of one shorthand per value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum OpCode {
    Nop = 0,
    Move,
    LoadL,
    LoadI,
    LoadSym,
    LoadNil,
    LoadSelf,
    LoadT,
    LoadF,

    GetGv,
    SetGv,
    GetIv,
    SetIv,
    GetConst,
    SetConst,
    GetMConst,
    GetUpvar,
    SetUpvar,

    Jmp,
    JmpIf,
    JmpNot,
    JmpNil,

    OnErr,
    Except,
    Rescue,
    PopErr,
    Raise,
    EPush,
    EPop,

    Send,
    SendB,
    SendV,
    SendVB,
    Super,
    ArgAry,
    Enter,

    Return,
    ReturnBlk,
    Break,

    Block,
    Method,
    Def,
    Alias,
    Class,
    Module,
    Exec,
    SClass,

    Add,
    Sub,
    Mul,
    Div,
    AddI,
    SubI,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,

    Array,
    Array2,
    AryCat,
    AryDup,
    Aref,
    Apost,
    Hash,
    StringOp,
    StrCat,
    Intern,
    RangeInc,
    RangeExc,

    Ext1,
    Ext2,
    Ext3,

    Stop,

    /// Any byte that does not map to a known opcode. Carries no operands
    /// (decoded as `Z`); the dispatch core turns this into
    /// `ErrorKind::UnsupportedOpcode`.
    Unknown,
}

impl OpCode {
    #[must_use]
    pub fn from_byte(b: u8) -> Self {
        const TABLE: [OpCode; 67] = [
            OpCode::Nop,
            OpCode::Move,
            OpCode::LoadL,
            OpCode::LoadI,
            OpCode::LoadSym,
            OpCode::LoadNil,
            OpCode::LoadSelf,
            OpCode::LoadT,
            OpCode::LoadF,
            OpCode::GetGv,
            OpCode::SetGv,
            OpCode::GetIv,
            OpCode::SetIv,
            OpCode::GetConst,
            OpCode::SetConst,
            OpCode::GetMConst,
            OpCode::GetUpvar,
            OpCode::SetUpvar,
            OpCode::Jmp,
            OpCode::JmpIf,
            OpCode::JmpNot,
            OpCode::JmpNil,
            OpCode::OnErr,
            OpCode::Except,
            OpCode::Rescue,
            OpCode::PopErr,
            OpCode::Raise,
            OpCode::EPush,
            OpCode::EPop,
            OpCode::Send,
            OpCode::SendB,
            OpCode::SendV,
            OpCode::SendVB,
            OpCode::Super,
            OpCode::ArgAry,
            OpCode::Enter,
            OpCode::Return,
            OpCode::ReturnBlk,
            OpCode::Break,
            OpCode::Block,
            OpCode::Method,
            OpCode::Def,
            OpCode::Alias,
            OpCode::Class,
            OpCode::Module,
            OpCode::Exec,
            OpCode::SClass,
            OpCode::Add,
            OpCode::Sub,
            OpCode::Mul,
            OpCode::Div,
            OpCode::AddI,
            OpCode::SubI,
            OpCode::Eq,
            OpCode::Lt,
            OpCode::Le,
            OpCode::Gt,
            OpCode::Ge,
            OpCode::Array,
            OpCode::Array2,
            OpCode::AryCat,
            OpCode::AryDup,
            OpCode::Aref,
            OpCode::Apost,
            OpCode::Hash,
            OpCode::StringOp,
            OpCode::StrCat,
        ];
        // The remaining tail (Intern, RangeInc, RangeExc, Ext1..3, Stop) is
        // appended below; kept as a second slice so the table above stays
        // easy to scan against the opcode table's listing order.
        const TAIL: [OpCode; 6] =
            [OpCode::Intern, OpCode::RangeInc, OpCode::RangeExc, OpCode::Ext1, OpCode::Ext2, OpCode::Ext3];
        let idx = b as usize;
        if idx < TABLE.len() {
            TABLE[idx]
        } else if idx < TABLE.len() + TAIL.len() {
            TAIL[idx - TABLE.len()]
        } else if idx == TABLE.len() + TAIL.len() {
            OpCode::Stop
        } else {
            OpCode::Unknown
        }
    }

    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Operand family for this opcode.
    #[must_use]
    pub const fn shape(self) -> Shape {
        match self {
            Self::Nop | Self::PopErr | Self::ArgAry | Self::Ext1 | Self::Ext2 | Self::Ext3 | Self::Stop | Self::Unknown => {
                Shape::Z
            }

            // One register operand (source or destination depending on the
            // opcode); `Jmp`/`EPush`/`EPop` instead carry a jump target,
            // almost always emitted with a preceding `EXT1` to reach the
            // full 16-bit range.
            Self::LoadNil
            | Self::LoadSelf
            | Self::LoadT
            | Self::LoadF
            | Self::Except
            | Self::Raise
            | Self::Return
            | Self::ReturnBlk
            | Self::Break
            | Self::SClass
            | Self::EPush
            | Self::EPop
            | Self::Jmp => Shape::B,

            Self::Move
            | Self::LoadI
            | Self::LoadSym
            | Self::GetGv
            | Self::SetGv
            | Self::GetIv
            | Self::SetIv
            | Self::GetConst
            | Self::SetConst
            | Self::JmpIf
            | Self::JmpNot
            | Self::JmpNil
            | Self::Rescue
            | Self::Super
            | Self::Def
            | Self::Alias
            | Self::Class
            | Self::Module
            | Self::Exec
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::AddI
            | Self::SubI
            | Self::Eq
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge
            | Self::AryCat
            | Self::AryDup
            | Self::Hash
            | Self::StrCat
            | Self::Intern => Shape::Bb,

            Self::GetMConst
            | Self::Send
            | Self::SendB
            | Self::SendV
            | Self::SendVB
            | Self::Array
            | Self::Array2
            | Self::Aref
            | Self::Apost
            | Self::RangeInc
            | Self::RangeExc
            // a = register, b = index within the target frame's capture
            // list, c = how many enclosing-proc hops to walk first.
            | Self::GetUpvar
            | Self::SetUpvar => Shape::Bbb,

            Self::OnErr => Shape::S,

            Self::LoadL | Self::Block | Self::Method | Self::StringOp => Shape::Bs,

            Self::Enter => Shape::W,
        }
    }
}
