// SPDX-License-Identifier: MIT

//! Shared ABI between the emberc VM core and the host application.
//!
//! This crate carries no VM logic — only the data types and traits that
//! cross the VM/host boundary: the host write sink contract, the
//! cross-boundary error-kind enum, and image-format constants that both
//! a host-side image builder and the VM's loader need to agree on.
//!
//! Kept dependency-free and `no_std` so it can be vendored by either side
//! without pulling in the VM itself.

#![no_std]

mod error;
mod image;
mod sink;

pub use error::ErrorKind;
pub use image::{MAGIC, SECTION_DEBUG_LINES, SECTION_IREP, VERSION};
pub use sink::{FD_STDERR, FD_STDOUT, HostSink};
