//! Runtime values stored in [`crate::memory::Memory`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{modules::Builtin, number::Number};

/// Reference to a user function registered at program load.
///
/// The index points into the interpreter's function table; keeping an index
/// rather than a reference keeps values plain data, so memory snapshots can
/// cross threads without touching the AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub index: u32,
    pub name: String,
}

/// Field storage for one struct instance. Fields keep declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructRecord {
    pub(crate) fields: IndexMap<String, Value>,
}

impl StructRecord {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Walks a `a.b.c` field path to the referenced value.
    #[must_use]
    pub fn get_path(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.fields.get(first)?;
        if rest.is_empty() {
            Some(value)
        } else {
            match value {
                Value::Record(inner) => inner.get_path(rest),
                _ => None,
            }
        }
    }

    /// Walks a field path and stores `value` at its end. Returns false if any
    /// segment does not name an existing field.
    pub(crate) fn set_path(&mut self, path: &[String], value: Value) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        let Some(slot) = self.fields.get_mut(first) else {
            return false;
        };
        if rest.is_empty() {
            *slot = value;
            true
        } else {
            match slot {
                Value::Record(inner) => inner.set_path(rest, value),
                _ => false,
            }
        }
    }
}

impl fmt::Display for StructRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// A value bound in a scope.
///
/// User functions and built-ins share the global name table with data values;
/// call dispatch branches on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Num(Number),
    /// A string literal argument (only ever flows into built-in calls).
    Str(String),
    /// A pseudo-address: the name yielded by unary `&`, used by `scanf` to
    /// write through a binding.
    Addr(String),
    /// A struct instance.
    Record(StructRecord),
    /// A user function declared in the program.
    Function(FunctionRef),
    /// An imported built-in function.
    Builtin(Builtin),
}

impl Value {
    /// Short tag used in runtime diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Num(_) => "int",
            Self::Str(_) => "string",
            Self::Addr(_) => "address",
            Self::Record(_) => "struct",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin",
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Num(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Addr(name) => write!(f, "&{name}"),
            Self::Record(record) => write!(f, "{record}"),
            Self::Function(func) => write!(f, "<function {}>", func.name),
            Self::Builtin(builtin) => write!(f, "<builtin {builtin}>"),
        }
    }
}
