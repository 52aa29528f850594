// SPDX-License-Identifier: MIT

//! Tests for the arena allocator.

use super::Arena;

fn new_arena(size: usize) -> Vec<u8> {
    vec![0u8; size]
}

#[test]
fn alloc_then_free_returns_to_initial_capacity() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);
    let before = arena.statistics();

    let a = arena.alloc(64).expect("should allocate");
    let b = arena.alloc(128).expect("should allocate");
    assert_ne!(a, b);

    arena.free(a);
    arena.free(b);

    let after = arena.statistics();
    assert_eq!(before.free, after.free, "coalescing should restore free space");
    assert_eq!(after.used, 0);
}

#[test]
fn alloc_writes_are_isolated() {
    let mut buf = new_arena(1024);
    let mut arena = Arena::init(&mut buf);

    let a = arena.alloc(8).unwrap();
    let b = arena.alloc(8).unwrap();

    arena.write(a, 0xDEAD_BEEFu32);
    arena.write(b, 0xCAFE_BABEu32);

    assert_eq!(arena.read::<u32>(a), 0xDEAD_BEEF);
    assert_eq!(arena.read::<u32>(b), 0xCAFE_BABE);
}

#[test]
fn oom_returns_none_without_aborting() {
    let mut buf = new_arena(128);
    let mut arena = Arena::init(&mut buf);

    assert!(arena.alloc(64).is_some());
    assert!(arena.alloc(1_000_000).is_none(), "must return None, not panic");
}

#[test]
fn realloc_grow_preserves_contents() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);

    let a = arena.alloc(8).unwrap();
    arena.write(a, 0x1234_5678u32);

    let grown = arena.realloc(a, 256).unwrap();
    assert_eq!(arena.read::<u32>(grown), 0x1234_5678);
}

#[test]
fn realloc_shrink_reuses_block() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);

    let a = arena.alloc(256).unwrap();
    arena.write(a, 0xABCDu32);

    let shrunk = arena.realloc(a, 8).unwrap();
    assert_eq!(shrunk, a, "shrinking in place should keep the same address");
    assert_eq!(arena.read::<u32>(shrunk), 0xABCD);
}

#[test]
fn no_free_allocations_survive_free_and_free_all() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);

    let perm = arena.raw_alloc_no_free(16).unwrap();
    arena.write(perm, 7u32);

    arena.free(perm);
    assert_eq!(arena.read::<u32>(perm), 7, "free() on no-free block is a no-op");

    arena.free_all(0);
    assert_eq!(arena.read::<u32>(perm), 7, "free_all() must not touch no-free blocks");
}

#[test]
fn free_all_only_releases_matching_vm_id() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);

    let before = arena.statistics();
    let owned_by_1 = arena.alloc_tagged(64, 1).unwrap();
    let owned_by_2 = arena.alloc_tagged(64, 2).unwrap();

    arena.free_all(1);
    // vm 2's allocation must still be readable/writable.
    arena.write(owned_by_2, 99u32);
    assert_eq!(arena.read::<u32>(owned_by_2), 99);

    arena.free_all(2);
    let after = arena.statistics();
    assert_eq!(before.free, after.free);
    let _ = owned_by_1;
}

#[test]
fn split_leaves_remainder_allocatable() {
    let mut buf = new_arena(4096);
    let mut arena = Arena::init(&mut buf);

    let a = arena.alloc(64).unwrap();
    arena.free(a);
    // After a free + re-alloc of a smaller size, the remainder must still
    // be usable by a subsequent allocation.
    let b = arena.alloc(16).unwrap();
    let c = arena.alloc(16).unwrap();
    assert_ne!(b, c);
}
