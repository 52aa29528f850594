// SPDX-License-Identifier: MIT

use super::format::{Arg, Writer};
use alloc::vec::Vec;
use emberc_abi::HostSink;

struct RecordingSink {
    out: Vec<u8>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { out: Vec::new() }
    }
}

impl HostSink for RecordingSink {
    fn write(&mut self, _fd: i32, buf: &[u8]) -> usize {
        self.out.extend_from_slice(buf);
        buf.len()
    }
}

fn render(fmt: &str, args: &[Arg<'_>]) -> alloc::string::String {
    let mut sink = RecordingSink::new();
    {
        let mut w = Writer::new(&mut sink, 1);
        w.format(fmt, args);
        w.flush();
    }
    alloc::string::String::from_utf8(sink.out).unwrap()
}

#[test]
fn literal_text_passes_through_untouched() {
    assert_eq!(render("hello, world", &[]), "hello, world");
}

#[test]
fn percent_percent_is_a_literal_percent() {
    assert_eq!(render("100%%", &[]), "100%");
}

#[test]
fn decimal_conversion() {
    assert_eq!(render("%d", &[Arg::Int(-7)]), "-7");
    assert_eq!(render("%d", &[Arg::Int(42)]), "42");
    assert_eq!(render("%+d", &[Arg::Int(42)]), "+42");
    assert_eq!(render("% d", &[Arg::Int(42)]), " 42");
}

#[test]
fn width_and_padding() {
    assert_eq!(render("%5d", &[Arg::Int(7)]), "    7");
    assert_eq!(render("%-5d|", &[Arg::Int(7)]), "7    |");
    assert_eq!(render("%05d", &[Arg::Int(7)]), "00007");
    // Zero-padding pads the formatted bytes as a block; it doesn't thread
    // the fill between a sign and the digits.
    assert_eq!(render("%05d", &[Arg::Int(-7)]), "000-7");
}

#[test]
fn hex_octal_binary() {
    assert_eq!(render("%x", &[Arg::Int(255)]), "ff");
    assert_eq!(render("%X", &[Arg::Int(255)]), "FF");
    assert_eq!(render("%o", &[Arg::Int(8)]), "10");
    assert_eq!(render("%b", &[Arg::Int(5)]), "101");
}

#[test]
fn negative_radix_values_print_dotdot_prefix() {
    // Negative values are reinterpreted as a 64-bit pattern and printed
    // as ".." followed by that full-width magnitude.
    assert_eq!(render("%x", &[Arg::Int(-1)]), "..ffffffffffffffff");
}

#[test]
fn float_with_default_and_explicit_precision() {
    assert_eq!(render("%f", &[Arg::Float(3.5)]), "3.500000");
    assert_eq!(render("%.2f", &[Arg::Float(3.14159)]), "3.14");
    assert_eq!(render("%.0f", &[Arg::Float(9.9)]), "9");
    assert_eq!(render("%f", &[Arg::Float(-2.5)]), "-2.500000");
}

#[test]
fn string_conversion_with_precision_truncates() {
    assert_eq!(render("%s", &[Arg::Str("hello")]), "hello");
    assert_eq!(render("%.3s", &[Arg::Str("hello")]), "hel");
}

#[test]
fn char_conversion() {
    assert_eq!(render("%c", &[Arg::Char(b'Q')]), "Q");
}

#[test]
fn pointer_conversion_is_dollar_and_eight_hex_digits() {
    assert_eq!(render("%p", &[Arg::Ptr(0xDEAD_BEEF)]), "$deadbeef");
    assert_eq!(render("%p", &[Arg::Ptr(0x1234)]), "$00001234");
}

#[test]
fn multiple_directives_consume_arguments_left_to_right() {
    assert_eq!(
        render("%s = %d (%x)", &[Arg::Str("answer"), Arg::Int(42), Arg::Int(42)]),
        "answer = 42 (2a)"
    );
}

#[test]
fn a_directive_with_no_matching_argument_emits_nothing() {
    assert_eq!(render("[%d]", &[]), "[]");
}

#[test]
fn output_larger_than_the_internal_buffer_flushes_in_chunks() {
    let fmt: alloc::string::String = core::iter::repeat('a').take(300).collect();
    assert_eq!(render(&fmt, &[]).len(), 300);
}
