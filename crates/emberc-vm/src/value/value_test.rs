// SPDX-License-Identifier: MIT

//! Tests for value tag semantics.

use super::Value;
use crate::types::{Addr, SymId};

#[test]
fn false_and_nil_are_falsey() {
    assert!(!Value::False.is_truthy());
    assert!(!Value::Nil.is_truthy());
}

#[test]
fn everything_else_is_truthy() {
    assert!(Value::True.is_truthy());
    assert!(Value::Fixnum(0).is_truthy());
    assert!(Value::Fixnum(-1).is_truthy());
    assert!(Value::Float(0.0).is_truthy());
    assert!(Value::Symbol(SymId::new(0)).is_truthy());
    assert!(Value::Array(Addr::new(8)).is_truthy());
}

#[test]
fn empty_is_distinct_from_nil() {
    assert!(Value::Empty.is_empty());
    assert!(!Value::Empty.is_nil());
    assert!(!Value::Nil.is_empty());
}

#[test]
fn type_names_match_tags() {
    assert_eq!(Value::Nil.type_name(), "nil");
    assert_eq!(Value::Fixnum(1).type_name(), "fixnum");
    assert_eq!(Value::Float(1.0).type_name(), "float");
    assert_eq!(Value::True.type_name(), "boolean");
    assert_eq!(Value::False.type_name(), "boolean");
}

#[test]
fn class_is_not_ref_counted_but_array_is() {
    assert!(!Value::Class(Addr::new(8)).is_ref_counted());
    assert!(Value::Array(Addr::new(8)).is_ref_counted());
    assert!(!Value::Handle(0).is_ref_counted());
}

#[test]
fn bool_helper_round_trips() {
    assert_eq!(Value::bool(true), Value::True);
    assert_eq!(Value::bool(false), Value::False);
}
