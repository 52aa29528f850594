// SPDX-License-Identifier: MIT

//! Tests for [`super::Addr`].

use super::Addr;

#[test]
fn basic() {
    let a = Addr::new(0x1000);
    assert_eq!(a.as_u32(), 0x1000);
    assert!(!a.is_null());
    assert!(Addr::NULL.is_null());
}

#[test]
fn arithmetic() {
    let a = Addr::new(0x1000);
    assert_eq!(a.add(0x100).as_u32(), 0x1100);
    assert_eq!(a.sub(0x100).as_u32(), 0x0F00);
    assert_eq!((a + 0x100).as_u32(), 0x1100);
    assert_eq!((a - 0x100).as_u32(), 0x0F00);
}

#[test]
fn alignment() {
    let a = Addr::new(0x1234);
    assert_eq!(a.align_up(0x1000).map(Addr::as_u32), Some(0x2000));
    assert_eq!(a.is_aligned(0x1000), Some(false));
    assert_eq!(Addr::new(0x2000).is_aligned(0x1000), Some(true));
    assert_eq!(a.align_up(0), None);
    assert_eq!(a.align_up(3), None);
}

#[test]
fn diff() {
    let a = Addr::new(0x5000);
    let b = Addr::new(0x3000);
    assert_eq!(a.diff(b), 0x2000);
    assert_eq!(b.diff(a), -0x2000);
}

#[test]
fn debug_format() {
    assert_eq!(format!("{:?}", Addr::new(0x1234)), "Addr(0x1234)");
}
