// SPDX-License-Identifier: MIT

//! Tests for the binary image loader.

use super::loader::{load, LoaderError};
use super::node::PoolValue;
use crate::mem::Arena;
use crate::symbol::SymbolTable;
use emberc_abi::image::{MAGIC, SECTION_IREP, VERSION};

fn len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(bytes);
    out.push(0);
}

/// Build a one-node image: no children, one int and one string pool
/// entry, one local, and the given bytecode.
fn build_leaf_image(code: &[u8]) -> Vec<u8> {
    let mut node = Vec::new();
    node.extend_from_slice(&1u16.to_be_bytes()); // nregs
    node.extend_from_slice(&0u16.to_be_bytes()); // child_count
    node.extend_from_slice(&2u16.to_be_bytes()); // pool_count
    node.push(0); // int tag
    node.extend_from_slice(&42i64.to_be_bytes());
    node.push(2); // string tag
    len_prefixed(&mut node, b"hi");
    node.extend_from_slice(&1u16.to_be_bytes()); // local_count
    len_prefixed(&mut node, b"x");
    node.extend_from_slice(&(code.len() as u32).to_be_bytes());
    node.extend_from_slice(code);

    let mut image = Vec::new();
    image.extend_from_slice(&MAGIC);
    image.extend_from_slice(&VERSION.to_be_bytes());
    image.push(SECTION_IREP);
    image.extend_from_slice(&(node.len() as u32).to_be_bytes());
    image.extend_from_slice(&node);
    image
}

#[test]
fn loads_register_count_pool_and_bytecode() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut symtab = SymbolTable::new();

    let image = build_leaf_image(&[0xAA, 0xBB]);
    let (pool, root) = load(&image, &mut arena, &mut symtab).unwrap();

    assert_eq!(root, 0);
    let node = &pool[root as usize];
    assert_eq!(node.nregs, 1);
    assert_eq!(node.code, vec![0xAA, 0xBB]);
    assert_eq!(node.pool[0], PoolValue::Int(42));
    assert_eq!(node.pool[1], PoolValue::Str(b"hi".to_vec()));
    assert_eq!(symtab.name_of(&arena, node.locals[0]), Some("x"));
}

#[test]
fn rejects_bad_magic() {
    let mut buf = vec![0u8; 1024];
    let mut arena = Arena::init(&mut buf);
    let mut symtab = SymbolTable::new();

    let mut image = build_leaf_image(&[]);
    image[0] = b'X';
    assert_eq!(load(&image, &mut arena, &mut symtab), Err(LoaderError::MagicMismatch));
}

#[test]
fn rejects_truncated_section() {
    let mut buf = vec![0u8; 1024];
    let mut arena = Arena::init(&mut buf);
    let mut symtab = SymbolTable::new();

    let mut image = build_leaf_image(&[0x00]);
    image.truncate(image.len() - 3);
    assert_eq!(load(&image, &mut arena, &mut symtab), Err(LoaderError::Truncated));
}

#[test]
fn does_not_mutate_the_source_bytes() {
    let mut buf = vec![0u8; 4096];
    let mut arena = Arena::init(&mut buf);
    let mut symtab = SymbolTable::new();

    let image = build_leaf_image(&[1, 2, 3]);
    let before = image.clone();
    let _ = load(&image, &mut arena, &mut symtab).unwrap();
    assert_eq!(image, before, "loading must not mutate the image bytes");
}

#[test]
fn float_pool_entries_round_trip_through_decimal_text() {
    let mut node = Vec::new();
    node.extend_from_slice(&0u16.to_be_bytes());
    node.extend_from_slice(&0u16.to_be_bytes());
    node.extend_from_slice(&1u16.to_be_bytes());
    node.push(1); // float tag
    len_prefixed(&mut node, b"3.5");
    node.extend_from_slice(&0u16.to_be_bytes()); // local_count
    node.extend_from_slice(&0u32.to_be_bytes()); // code len

    let mut image = Vec::new();
    image.extend_from_slice(&MAGIC);
    image.extend_from_slice(&VERSION.to_be_bytes());
    image.push(SECTION_IREP);
    image.extend_from_slice(&(node.len() as u32).to_be_bytes());
    image.extend_from_slice(&node);

    let mut buf = vec![0u8; 1024];
    let mut arena = Arena::init(&mut buf);
    let mut symtab = SymbolTable::new();
    let (pool, root) = load(&image, &mut arena, &mut symtab).unwrap();
    assert_eq!(pool[root as usize].pool[0], PoolValue::Float(3.5));
}
