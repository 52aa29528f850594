// SPDX-License-Identifier: MIT

//! # emberc VM
//!
//! An embeddable bytecode virtual machine for a compiled dynamic
//! object-oriented language subset.
//!
//! This crate provides:
//! - A bump/best-fit memory manager over a host-supplied arena
//! - A process-wide symbol table
//! - A tagged, reference-counted value representation
//! - A binary IREP image loader
//! - An object model: classes, methods, constants, ivars, globals
//! - A variable-width opcode decoder with `EXT` prefix widening
//! - The dispatch core: per-opcode semantics over a register file
//! - The call protocol: callinfo stack, blocks, super, rescue/ensure
//! - A printf-style formatter used for diagnostic output
//! - An optional cooperative task scheduler (feature `scheduler`)
//!
//! The VM never allocates outside the arena it is given at `init()`, and
//! never touches the host write sink except through [`task::Task::tick`]
//! and the `print`/`p`/`puts` family of intrinsics.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod call;
pub mod decode;
pub mod fmt;
pub mod irep;
pub mod mem;
pub mod object;
pub mod symbol;
pub mod task;
pub mod types;
pub mod value;
pub mod vm;

#[cfg(feature = "scheduler")]
pub mod sched;

pub use emberc_abi::{ErrorKind, HostSink};
pub use task::Task;
pub use types::Addr;
pub use value::Value;

/// Crate version, mirrored into panics/diagnostics where useful.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
