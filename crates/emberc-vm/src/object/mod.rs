// SPDX-License-Identifier: MIT

//! Object model: classes, method tables, constants, globals.

#[cfg(test)]
mod runtime_test;

mod bootstrap;
mod class;
mod runtime;

pub use bootstrap::Bootstrap;
pub use class::{
    class_name, define_class, define_method, get_class_const, is_a, lookup_method, set_class_const, super_of,
    Method, MethodKind,
};
pub use runtime::{Runtime, MAX_GLOBALS, MAX_GLOBAL_CONSTS};
