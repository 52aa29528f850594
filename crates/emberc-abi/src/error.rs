// SPDX-License-Identifier: MIT

//! Cross-boundary error kinds.
//!
//! These are the error *kinds* a host needs to recognize regardless of which
//! VM subsystem raised them. The VM crate's richer `RuntimeError`/
//! `LoaderError` enums each map onto one of these for host-facing reporting.

/// Coarse error classification visible to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    /// Wrong number of arguments to a method or block.
    Arity = 0,
    /// Operand of the wrong runtime type.
    Type = 1,
    /// Undefined method, constant, or global.
    Name = 2,
    /// Division or modulo by zero.
    ZeroDivision = 3,
    /// Allocator could not satisfy a request.
    OutOfMemory = 4,
    /// Bytecode image failed to parse (bad magic, truncated, unsupported version).
    ImageFormat = 5,
    /// Decoder encountered a byte that is not a known opcode.
    UnsupportedOpcode = 6,
}

impl ErrorKind {
    /// Short machine-readable name, useful for host-side log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arity => "arity",
            Self::Type => "type",
            Self::Name => "name",
            Self::ZeroDivision => "zero-division",
            Self::OutOfMemory => "out-of-memory",
            Self::ImageFormat => "image-format",
            Self::UnsupportedOpcode => "unsupported-opcode",
        }
    }
}

#[cfg(test)]
mod error_test {
    use super::ErrorKind;

    #[test]
    fn as_str_is_stable() {
        assert_eq!(ErrorKind::OutOfMemory.as_str(), "out-of-memory");
        assert_eq!(ErrorKind::ZeroDivision.as_str(), "zero-division");
    }
}
