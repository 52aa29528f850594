// SPDX-License-Identifier: MIT

//! Symbol table: interns identifiers to small dense integer ids.

#[cfg(test)]
mod table_test;

mod table;

pub use table::{SymbolTable, MAX_SYMBOLS};
