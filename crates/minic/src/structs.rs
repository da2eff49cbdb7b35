//! Registry of declared struct layouts and instantiation of struct-typed
//! variables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    ast::{Stmt, StmtLoc, TypeName},
    error::{CodeLoc, Exception, RunResult},
    memory::Memory,
    number::Number,
    value::{StructRecord, Value},
};

/// One field of a struct layout: a scalar of a tracked type, or a reference
/// to another registered layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum FieldKind {
    Scalar(TypeName),
    Struct(String),
}

/// An ordered field list for one struct type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StructLayout {
    fields: IndexMap<String, FieldKind>,
}

/// Declared struct layouts by type name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructRegistry {
    layouts: IndexMap<String, StructLayout>,
}

impl StructRegistry {
    /// Registers the layout of a `struct T { ... };` declaration. The body
    /// holds the `VarDecl`/`StructDecl` field statements produced by the
    /// parser; nested struct fields refer to already-registered layouts.
    pub(crate) fn create(&mut self, name: &str, body: &[StmtLoc], position: CodeLoc) -> RunResult<()> {
        let mut layout = StructLayout::default();
        for field in body {
            match &field.stmt {
                Stmt::VarDecl { type_name, name: field_name } => {
                    layout.fields.insert(field_name.clone(), FieldKind::Scalar(*type_name));
                }
                Stmt::StructDecl { struct_type, name: field_name } => {
                    if !self.layouts.contains_key(struct_type) {
                        return Err(Exception::runtime(
                            format!("Unknown struct type '{struct_type}'"),
                            field.position,
                        ));
                    }
                    layout.fields.insert(field_name.clone(), FieldKind::Struct(struct_type.clone()));
                }
                _ => {
                    return Err(Exception::runtime(
                        format!("Invalid field declaration in struct '{name}'"),
                        position,
                    ));
                }
            }
        }
        self.layouts.insert(name.to_owned(), layout);
        Ok(())
    }

    /// Builds a zero-initialized field record for the named layout. Nested
    /// struct fields are zero-initialized recursively.
    pub(crate) fn instantiate(&self, type_name: &str, position: CodeLoc) -> RunResult<StructRecord> {
        let layout = self
            .layouts
            .get(type_name)
            .ok_or_else(|| Exception::runtime(format!("Unknown struct type '{type_name}'"), position))?;
        let mut record = StructRecord::default();
        for (field_name, kind) in &layout.fields {
            let value = match kind {
                FieldKind::Scalar(_) => Value::Num(Number::ZERO),
                FieldKind::Struct(inner) => Value::Record(self.instantiate(inner, position)?),
            };
            record.insert(field_name.clone(), value);
        }
        Ok(record)
    }

    /// Looks up the declared type of a `struct T name;` declaration and binds
    /// a zero-initialized record under `name` in the current scope.
    pub(crate) fn declare(
        &self,
        struct_type: &str,
        var_name: &str,
        memory: &mut Memory,
        position: CodeLoc,
    ) -> RunResult<()> {
        let record = self.instantiate(struct_type, position)?;
        memory.declare(var_name, Value::Record(record));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StmtLoc;

    fn field(name: &str) -> StmtLoc {
        StmtLoc::new(
            CodeLoc::new(1, 1),
            Stmt::VarDecl {
                type_name: TypeName::Int,
                name: name.to_owned(),
            },
        )
    }

    #[test]
    fn instances_are_zero_initialized_in_field_order() {
        let mut registry = StructRegistry::default();
        registry.create("P", &[field("x"), field("y")], CodeLoc::new(1, 1)).unwrap();
        let record = registry.instantiate("P", CodeLoc::new(2, 1)).unwrap();
        let names: Vec<_> = record.fields.keys().cloned().collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(record.get_path(&["x".to_owned()]), Some(&Value::Num(Number::ZERO)));
    }

    #[test]
    fn nested_layouts_instantiate_recursively() {
        let mut registry = StructRegistry::default();
        registry.create("Inner", &[field("v")], CodeLoc::new(1, 1)).unwrap();
        let nested = StmtLoc::new(
            CodeLoc::new(2, 3),
            Stmt::StructDecl {
                struct_type: "Inner".to_owned(),
                name: "inner".to_owned(),
            },
        );
        registry.create("Outer", &[field("tag"), nested], CodeLoc::new(2, 1)).unwrap();
        let record = registry.instantiate("Outer", CodeLoc::new(3, 1)).unwrap();
        let path = ["inner".to_owned(), "v".to_owned()];
        assert_eq!(record.get_path(&path), Some(&Value::Num(Number::ZERO)));
    }

    #[test]
    fn unknown_nested_type_is_an_error() {
        let mut registry = StructRegistry::default();
        let nested = StmtLoc::new(
            CodeLoc::new(1, 3),
            Stmt::StructDecl {
                struct_type: "Missing".to_owned(),
                name: "field".to_owned(),
            },
        );
        let err = registry.create("Outer", &[nested], CodeLoc::new(1, 1)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::RuntimeError);
    }
}
