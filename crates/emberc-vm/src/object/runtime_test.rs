// SPDX-License-Identifier: MIT

//! Tests for global/constant tables.

use super::Runtime;
use crate::types::SymId;
use crate::value::Value;

#[test]
fn unset_global_reads_as_nil() {
    let runtime = Runtime::new();
    assert_eq!(runtime.get_global(SymId::new(0)), Value::Nil);
}

#[test]
fn set_global_then_get_round_trips() {
    let mut runtime = Runtime::new();
    runtime.set_global(SymId::new(3), Value::Fixnum(7)).unwrap();
    assert_eq!(runtime.get_global(SymId::new(3)), Value::Fixnum(7));
}

#[test]
fn global_consts_are_independent_of_globals() {
    let mut runtime = Runtime::new();
    runtime.set_global(SymId::new(1), Value::Fixnum(1)).unwrap();
    assert_eq!(runtime.get_global_const(SymId::new(1)), None);
}

#[test]
fn set_overwrites_existing_entry_in_place() {
    let mut runtime = Runtime::new();
    runtime.set_global(SymId::new(5), Value::Fixnum(1)).unwrap();
    runtime.set_global(SymId::new(5), Value::Fixnum(2)).unwrap();
    assert_eq!(runtime.get_global(SymId::new(5)), Value::Fixnum(2));
}
