// SPDX-License-Identifier: MIT

//! Core type definitions for the emberc VM.
//!
//! Newtypes prevent mixing incompatible integers (an arena offset where a
//! symbol id was meant, or vice versa).

#[cfg(test)]
mod addr_test;

mod addr;
mod sym;

pub use addr::Addr;
pub use sym::SymId;
