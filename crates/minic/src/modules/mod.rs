//! Built-in library modules.
//!
//! Each `#include <name.h>` imports one module. A module exposes a table of
//! [`BuiltinSpec`] entries (name, return type, parameter types) which
//! the semantic analyzer uses for call checking and the interpreter uses to
//! bind the functions into the global scope.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::{
    ast::TypeName,
    error::{CodeLoc, RunResult},
    io::{InputReader, PrintWriter},
    memory::Memory,
    value::Value,
};

pub(crate) mod stdio;

/// Identifier of a built-in function, used for dispatch at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Printf,
    Scanf,
    Getchar,
}

/// Registration record for one importable built-in function.
///
/// `arg_types: None` marks a variadic/unchecked signature: the analyzer
/// bypasses arity and parameter-type checks for it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuiltinSpec {
    pub name: &'static str,
    pub builtin: Builtin,
    pub return_type: TypeName,
    pub arg_types: Option<&'static [TypeName]>,
}

/// Resolves an include library name to its function table.
pub(crate) fn library(name: &str) -> Option<&'static [BuiltinSpec]> {
    match name {
        "stdio" => Some(stdio::FUNCTIONS),
        _ => None,
    }
}

/// Invokes a built-in with already-evaluated argument values.
///
/// `scanf` is the reason `memory` is threaded through: it writes fields back
/// into the bindings whose names arrived as pseudo-addresses.
pub(crate) fn invoke(
    builtin: Builtin,
    args: &[Value],
    memory: &mut Memory,
    print: &mut impl PrintWriter,
    input: &mut impl InputReader,
    position: CodeLoc,
) -> RunResult<Value> {
    match builtin {
        Builtin::Printf => stdio::printf(args, print, position),
        Builtin::Scanf => stdio::scanf(args, memory, input, position),
        Builtin::Getchar => stdio::getchar(input),
    }
}
