// SPDX-License-Identifier: MIT

//! printf-style diagnostic formatter, a building block for the
//! `print`/`p`/`puts` method family. Output is buffered in a fixed-size
//! stack buffer and flushed through the host write sink.

#[cfg(test)]
mod format_test;

mod format;

pub use format::{Arg, Writer};
