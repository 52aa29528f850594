// SPDX-License-Identifier: MIT

//! C-method calling convention: a native method is a plain function
//! pointer operating over the callee's register window. Argument `i` is
//! at `window[i]` (1-indexed), the receiver at `window[0]`; the return
//! value is written back to `window[0]`.

use super::Task;
use crate::mem::Arena;
use crate::object::Runtime;
use crate::symbol::SymbolTable;
use crate::types::Addr;
use crate::value::{dec_ref, inc_ref, HeapString, Instance, Value};
use emberc_abi::HostSink;
use alloc::vec::Vec;

/// A host- or bootstrap-registered native method.
pub type NativeFn = fn(&mut NativeCtx<'_, '_>, argc: u32);

/// Everything a [`NativeFn`] needs: its argument window plus the shared VM
/// state, so it can allocate, raise, or call back into a block.
pub struct NativeCtx<'t, 'a> {
    pub(crate) task: &'t mut Task<'a>,
    pub(crate) sink: &'t mut dyn HostSink,
    /// Absolute register index of `window[0]` (the receiver).
    pub(crate) base: u32,
}

impl<'t, 'a> NativeCtx<'t, 'a> {
    #[must_use]
    pub fn arena(&mut self) -> &mut Arena<'a> {
        &mut self.task.arena
    }

    #[must_use]
    pub fn runtime(&mut self) -> &mut Runtime {
        &mut self.task.runtime
    }

    #[must_use]
    pub fn symtab(&mut self) -> &mut SymbolTable {
        &mut self.task.symtab
    }

    #[must_use]
    pub fn sink(&mut self) -> &mut dyn HostSink {
        self.sink
    }

    /// The receiver, `window[0]`.
    #[must_use]
    pub fn receiver(&self) -> Value {
        self.task.regs[self.base as usize]
    }

    /// Argument `i`, 1-indexed.
    #[must_use]
    pub fn arg(&self, i: u32) -> Value {
        self.task.regs[(self.base + i) as usize]
    }

    /// The block passed via `SENDB`/`SENDVB` to reach this method, if any.
    /// Native iterator methods read this to drive [`Self::call_proc`].
    #[must_use]
    pub fn block(&self) -> Option<Addr> {
        match self.task.pending_block {
            Value::Proc(addr) => Some(addr),
            _ => None,
        }
    }

    #[must_use]
    pub fn arg_fixnum(&self, i: u32) -> Option<i64> {
        match self.arg(i) {
            Value::Fixnum(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn arg_string(&self, i: u32) -> Option<&[u8]> {
        match self.arg(i) {
            Value::String(addr) => Some(HeapString::bytes(&self.task.arena, addr)),
            _ => None,
        }
    }

    /// Overwrite `window[0]` with the method's return value. Releases
    /// whatever was there (typically the receiver).
    pub fn set_return(&mut self, v: Value) {
        let old = self.task.regs[self.base as usize];
        dec_ref(&mut self.task.arena, old);
        inc_ref(&mut self.task.arena, v);
        self.task.regs[self.base as usize] = v;
    }

    pub fn return_nil(&mut self) {
        self.set_return(Value::Nil);
    }

    pub fn return_bool(&mut self, b: bool) {
        self.set_return(Value::bool(b));
    }

    pub fn return_fixnum(&mut self, n: i64) {
        self.set_return(Value::Fixnum(n));
    }

    pub fn return_string(&mut self, bytes: &[u8]) {
        let Some(addr) = HeapString::alloc(&mut self.task.arena, bytes) else {
            self.return_nil();
            return;
        };
        self.set_return(Value::String(addr));
    }

    /// Raise `value` (typically a `Value::Class` naming an exception type)
    /// from inside a native method, using the same unwind path `RAISE`
    /// uses.
    pub fn raise(&mut self, value: Value) {
        self.task.raise(value);
    }

    /// Synchronously run a block/proc to completion, as plugin classes
    /// like `Array#each`/`Integer#times` need to. Returns the proc's result,
    /// or signals that the proc broke out early (`break`) or that an
    /// uncaught exception escaped it.
    pub fn call_proc(&mut self, proc: Addr, args: &[Value]) -> ProcOutcome {
        self.task.call_proc(self.sink, proc, args)
    }
}

/// How a [`NativeCtx::call_proc`] invocation ended.
#[derive(Clone, Copy, Debug)]
pub enum ProcOutcome {
    /// The proc body ran to its final `RETURN`.
    Value(Value),
    /// `RETURN_BLK`/`BREAK` fired inside the proc; the native caller
    /// should stop iterating and treat `v` as its own result. Non-local
    /// returns are collapsed here to unwinding past exactly the native
    /// iterator that invoked the block.
    NonLocal(Value),
    /// An uncaught exception unwound out of the proc entirely; the host
    /// will see [`super::StopReason::Uncaught`].
    Escaped(Value),
}

/// A native method awaiting assignment of its table index, used while a
/// host is still building up its registration call (`Vec::push` order is
/// the source of truth for `payload`).
pub type NativeTable = Vec<NativeFn>;

/// `Object#new`: allocate a bare instance of the receiver class. Every
/// class needs a default instantiator; this VM has no separate
/// `initialize` convention, so `new` just allocates.
pub(crate) fn default_new(ctx: &mut NativeCtx<'_, '_>, _argc: u32) {
    let Value::Class(class) = ctx.receiver() else {
        ctx.return_nil();
        return;
    };
    match Instance::alloc(ctx.arena(), class) {
        Some(addr) => ctx.set_return(Value::Object(addr)),
        None => ctx.return_nil(),
    }
}
