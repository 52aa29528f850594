// SPDX-License-Identifier: MIT

//! Binary IREP image loader.
//!
//! An image is a file header (magic, version) followed by sections; the
//! `IREP` section holds a pre-order-flattened tree of instruction
//! representation nodes. Loading produces a flat [`Vec<IrepNode>`] rather
//! than a tree of owned children — each node's `children` field is a list
//! of indices into that same vector, which keeps the call protocol's
//! `Proc`/`CallInfo` records `Copy` (a `u32` index instead of a borrow).

#[cfg(test)]
mod loader_test;

mod loader;
mod node;

pub use loader::{load, LoaderError};
pub use node::{IrepNode, PoolValue};
