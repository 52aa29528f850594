// SPDX-License-Identifier: MIT

//! Exception class bootstrap: `RAISE`/`RESCUE` are meaningless without
//! at least one built-in exception class to raise and match against, so
//! the root chain is installed at `init()` time.

use crate::mem::Arena;
use crate::object::class::define_class;
use crate::object::runtime::Runtime;
use crate::symbol::SymbolTable;
use crate::types::Addr;

/// Root classes installed before any user bytecode runs.
#[derive(Clone, Copy, Debug)]
pub struct Bootstrap {
    pub object: Addr,
    pub exception: Addr,
    pub standard_error: Addr,
    pub runtime_error: Addr,
}

impl Bootstrap {
    /// Install `Object`, then `Exception < Object`, `StandardError <
    /// Exception`, `RuntimeError < StandardError`.
    pub fn install(arena: &mut Arena<'_>, runtime: &mut Runtime, symtab: &mut SymbolTable) -> Option<Self> {
        let object_sym = symtab.intern(arena, "Object")?;
        let exception_sym = symtab.intern(arena, "Exception")?;
        let standard_error_sym = symtab.intern(arena, "StandardError")?;
        let runtime_error_sym = symtab.intern(arena, "RuntimeError")?;

        let object = define_class(arena, runtime, object_sym, None)?;
        let exception = define_class(arena, runtime, exception_sym, Some(object))?;
        let standard_error = define_class(arena, runtime, standard_error_sym, Some(exception))?;
        let runtime_error = define_class(arena, runtime, runtime_error_sym, Some(standard_error))?;

        Some(Self { object, exception, standard_error, runtime_error })
    }
}
