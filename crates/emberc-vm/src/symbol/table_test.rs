// SPDX-License-Identifier: MIT

//! Tests for the symbol table.

use super::SymbolTable;
use crate::mem::Arena;
use proptest::prelude::*;

#[test]
fn intern_is_idempotent() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut table = SymbolTable::new();

    let a = table.intern(&mut arena, "foo").unwrap();
    let b = table.intern(&mut arena, "foo").unwrap();
    assert_eq!(a, b);
    assert_eq!(table.len(), 1);
}

#[test]
fn distinct_names_get_distinct_ids() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut table = SymbolTable::new();

    let a = table.intern(&mut arena, "foo").unwrap();
    let b = table.intern(&mut arena, "bar").unwrap();
    assert_ne!(a, b);
}

#[test]
fn name_of_round_trips() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut table = SymbolTable::new();

    let id = table.intern(&mut arena, "hello").unwrap();
    assert_eq!(table.name_of(&arena, id), Some("hello"));
}

#[test]
fn find_does_not_intern() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut table = SymbolTable::new();

    assert_eq!(table.find(&arena, "missing"), None);
    assert_eq!(table.len(), 0);
}

proptest! {
    #[test]
    fn intern_name_of_is_a_bijection(names in proptest::collection::vec("[a-z]{1,12}", 1..40)) {
        let mut buf = vec![0u8; 64 * 1024];
        let mut arena = Arena::init(&mut buf);
        let mut table = SymbolTable::new();

        let mut ids = Vec::new();
        for name in &names {
            if let Some(id) = table.intern(&mut arena, name) {
                ids.push((name.clone(), id));
            }
        }

        for (name, id) in ids {
            prop_assert_eq!(table.name_of(&arena, id), Some(name.as_str()));
        }
    }
}
