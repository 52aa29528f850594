// SPDX-License-Identifier: MIT

//! std-only mock "host application": a recording [`HostSink`] and a
//! hand bytecode assembler, standing in for the real compiler and
//! embedding host that this workspace doesn't otherwise provide.

use emberc_abi::{HostSink, FD_STDERR, MAGIC, SECTION_IREP, VERSION};


/// A [`HostSink`] that records everything written to it, split by file
/// descriptor, for tests and the REPL-style demo binary to inspect.
#[derive(Default)]
pub struct RecordingSink {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stdout_str(&self) -> &str {
        core::str::from_utf8(&self.stdout).unwrap_or("<invalid utf-8>")
    }
}

impl HostSink for RecordingSink {
    fn write(&mut self, fd: i32, buf: &[u8]) -> usize {
        if fd == FD_STDERR {
            self.stderr.extend_from_slice(buf);
        } else {
            self.stdout.extend_from_slice(buf);
        }
        buf.len()
    }
}

/// One literal-pool entry, mirroring the loader's pool tags.
pub enum Pool {
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
}

/// Hand-assembles one IREP node's binary encoding, matching exactly what
/// `emberc_vm::irep::loader` parses. There is no compiler in this
/// workspace, so tests and demos build IREP trees this way instead.
pub struct NodeBuilder {
    nregs: u16,
    pool: Vec<Pool>,
    locals: Vec<String>,
    code: Vec<u8>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    #[must_use]
    pub fn new(nregs: u16) -> Self {
        Self { nregs, pool: Vec::new(), locals: Vec::new(), code: Vec::new(), children: Vec::new() }
    }

    #[must_use]
    pub fn pool(mut self, entries: Vec<Pool>) -> Self {
        self.pool = entries;
        self
    }

    #[must_use]
    pub fn locals(mut self, names: &[&str]) -> Self {
        self.locals = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn code(mut self, bytes: Vec<u8>) -> Self {
        self.code = bytes;
        self
    }

    /// Append a child node, referenced by `BLOCK`/`METHOD` via its
    /// position in encounter order.
    #[must_use]
    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(bytes);
        out.push(0);
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.nregs.to_be_bytes());
        out.extend_from_slice(&(self.children.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.pool.len() as u16).to_be_bytes());
        for entry in &self.pool {
            match entry {
                Pool::Int(n) => {
                    out.push(0);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Pool::Float(f) => {
                    out.push(1);
                    Self::write_len_prefixed(out, f.to_string().as_bytes());
                }
                Pool::Str(bytes) => {
                    out.push(2);
                    Self::write_len_prefixed(out, bytes);
                }
            }
        }
        out.extend_from_slice(&(self.locals.len() as u16).to_be_bytes());
        for name in &self.locals {
            Self::write_len_prefixed(out, name.as_bytes());
        }
        out.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.code);
        // Children are serialized depth-first right after their parent's
        // own fields, with no length prefix — the loader recurses the
        // same way it read the parent, so no prefix is needed.
        for child in &self.children {
            child.encode(out);
        }
    }

    /// Assemble a complete image with this node as the root IREP, ready
    /// for `Task::load`.
    #[must_use]
    pub fn into_image(self) -> Vec<u8> {
        let mut section = Vec::new();
        self.encode(&mut section);

        let mut image = Vec::new();
        image.extend_from_slice(&MAGIC);
        image.extend_from_slice(&VERSION.to_be_bytes());
        image.push(SECTION_IREP);
        image.extend_from_slice(&(section.len() as u32).to_be_bytes());
        image.extend_from_slice(&section);
        image
    }
}
