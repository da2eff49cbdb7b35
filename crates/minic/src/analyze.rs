//! Semantic analysis: a single top-down walk over the AST that maintains a
//! stack of scoped symbol tables.
//!
//! The pass mutates no AST node. Undeclared identifiers, duplicate
//! declarations in the same scope, bad calls, and a missing `main` are hard
//! errors; type mismatches produce warnings and execution proceeds. Types are
//! tracked on the `char < int < float < double` lattice, with binary
//! operations promoting to the larger operand type.

use ahash::AHashMap;
use strum::Display;

use crate::{
    ast::{AssignTarget, Expr, ExprLoc, Program, Stmt, StmtLoc, TypeName, UnaryOp},
    error::{CodeLoc, Exception, RunResult, TypeWarning},
    modules,
};

/// Analyzer-side numeric type, ordered by promotion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum CType {
    Char,
    Int,
    Float,
    Double,
}

impl CType {
    /// Maps a declared type to its lattice entry; `void` has no rank.
    fn of(type_name: TypeName) -> Option<Self> {
        match type_name {
            TypeName::Char => Some(Self::Char),
            TypeName::Int => Some(Self::Int),
            TypeName::Float => Some(Self::Float),
            TypeName::Double => Some(Self::Double),
            TypeName::Void => None,
        }
    }
}

/// What a declared variable holds.
#[derive(Debug, Clone)]
enum VarKind {
    Scalar(TypeName),
    Struct(String),
}

#[derive(Debug, Clone)]
enum Symbol {
    Var(VarKind),
    Function {
        return_type: TypeName,
        /// `None` for variadic/unchecked built-ins: arity and parameter
        /// types bypass checking.
        params: Option<Vec<TypeName>>,
    },
    StructType(AHashMap<String, VarKind>),
}

struct ScopedSymbolTable {
    #[expect(dead_code, reason = "scope names appear in debug dumps of the table stack")]
    scope_name: String,
    symbols: AHashMap<String, Symbol>,
}

/// Runs the analyzer over a parsed program.
///
/// # Errors
/// Returns the first `SemanticError`. On success, yields the collected
/// non-fatal type warnings in source order.
pub(crate) fn analyze(program: &Program) -> RunResult<Vec<TypeWarning>> {
    let mut analyzer = SemanticAnalyzer {
        scopes: vec![],
        warnings: vec![],
    };
    analyzer.visit_program(program)?;
    Ok(analyzer.warnings)
}

struct SemanticAnalyzer {
    scopes: Vec<ScopedSymbolTable>,
    warnings: Vec<TypeWarning>,
}

impl SemanticAnalyzer {
    fn push_scope(&mut self, scope_name: &str) {
        self.scopes.push(ScopedSymbolTable {
            scope_name: scope_name.to_owned(),
            symbols: AHashMap::new(),
        });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn insert(&mut self, name: &str, symbol: Symbol) {
        self.scopes
            .last_mut()
            .expect("analyzer always runs inside a scope")
            .symbols
            .insert(name.to_owned(), symbol);
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.symbols.get(name))
    }

    fn lookup_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.symbols.get(name))
    }

    fn warn(&mut self, message: String, position: CodeLoc) {
        self.warnings.push(TypeWarning::new(message, position));
    }

    fn duplicate_check(&self, name: &str, position: CodeLoc) -> RunResult<()> {
        if self.lookup_current(name).is_some() {
            return Err(Exception::semantic(
                format!("Error: Duplicate identifier '{name}' found at line {}", position.line),
                Some(position),
            ));
        }
        Ok(())
    }

    fn visit_program(&mut self, program: &Program) -> RunResult<()> {
        self.push_scope("global");
        for stmt in &program.body {
            self.visit_stmt(stmt)?;
        }
        if !matches!(self.lookup("main"), Some(Symbol::Function { .. })) {
            return Err(Exception::semantic("Error: Undeclared mandatory function main", None));
        }
        self.pop_scope();
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &StmtLoc) -> RunResult<()> {
        let position = stmt.position;
        match &stmt.stmt {
            Stmt::Include { library } => self.visit_include(library, position),
            Stmt::VarDecl { type_name, name } => {
                self.duplicate_check(name, position)?;
                self.insert(name, Symbol::Var(VarKind::Scalar(*type_name)));
                Ok(())
            }
            Stmt::StructDecl { struct_type, name } => {
                if !matches!(self.lookup(struct_type), Some(Symbol::StructType(_))) {
                    return Err(Exception::semantic(
                        format!("Undeclared struct type '{struct_type}' at line {}", position.line),
                        Some(position),
                    ));
                }
                self.duplicate_check(name, position)?;
                self.insert(name, Symbol::Var(VarKind::Struct(struct_type.clone())));
                Ok(())
            }
            Stmt::StructType { name, body } => self.visit_struct_type(name, body, position),
            Stmt::Function(decl) => {
                self.duplicate_check(&decl.name, position)?;
                self.insert(
                    &decl.name,
                    Symbol::Function {
                        return_type: decl.return_type,
                        params: Some(decl.params.iter().map(|p| p.type_name).collect()),
                    },
                );
                self.push_scope(&decl.name);
                let result = self.visit_function_body(decl.params.iter(), &decl.body);
                self.pop_scope();
                result
            }
            Stmt::Expr(expr) => self.visit_expr(expr).map(|_| ()),
            Stmt::Compound(children) => {
                self.push_scope("block");
                let result = children.iter().try_for_each(|child| self.visit_stmt(child));
                self.pop_scope();
                result
            }
            Stmt::If { cond, then_body, else_body } => {
                self.visit_expr(cond)?;
                self.visit_stmt(then_body)?;
                if let Some(else_body) = else_body {
                    self.visit_stmt(else_body)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } | Stmt::DoWhile { cond, body } => {
                self.visit_expr(cond)?;
                self.visit_stmt(body)
            }
            Stmt::For { init, cond, step, body } => {
                self.push_scope("for");
                let result = (|| {
                    for stmt in init {
                        self.visit_stmt(stmt)?;
                    }
                    if let Some(cond) = cond {
                        self.visit_expr(cond)?;
                    }
                    if let Some(step) = step {
                        self.visit_expr(step)?;
                    }
                    self.visit_stmt(body)
                })();
                self.pop_scope();
                result
            }
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.visit_expr(value)?;
                }
                Ok(())
            }
            Stmt::Break | Stmt::Continue | Stmt::NoOp => Ok(()),
        }
    }

    fn visit_function_body<'a>(
        &mut self,
        params: impl Iterator<Item = &'a crate::ast::Param>,
        body: &[StmtLoc],
    ) -> RunResult<()> {
        for param in params {
            self.duplicate_check(&param.name, param.position)?;
            self.insert(&param.name, Symbol::Var(VarKind::Scalar(param.type_name)));
        }
        body.iter().try_for_each(|stmt| self.visit_stmt(stmt))
    }

    /// Imports every function the named library announces, skipping names
    /// already bound (a double include is harmless).
    fn visit_include(&mut self, library: &str, position: CodeLoc) -> RunResult<()> {
        let functions = modules::library(library).ok_or_else(|| {
            Exception::semantic(
                format!("Unknown library <{library}.h> at line {}", position.line),
                Some(position),
            )
        })?;
        for spec in functions {
            if self.lookup(spec.name).is_some() {
                continue;
            }
            self.insert(
                spec.name,
                Symbol::Function {
                    return_type: spec.return_type,
                    params: spec.arg_types.map(<[TypeName]>::to_vec),
                },
            );
        }
        Ok(())
    }

    fn visit_struct_type(&mut self, name: &str, body: &[StmtLoc], position: CodeLoc) -> RunResult<()> {
        self.duplicate_check(name, position)?;
        let mut fields = AHashMap::new();
        for field in body {
            match &field.stmt {
                Stmt::VarDecl { type_name, name: field_name } => {
                    if fields
                        .insert(field_name.clone(), VarKind::Scalar(*type_name))
                        .is_some()
                    {
                        return Err(Exception::semantic(
                            format!(
                                "Error: Duplicate field '{field_name}' in struct '{name}' at line {}",
                                field.position.line
                            ),
                            Some(field.position),
                        ));
                    }
                }
                Stmt::StructDecl { struct_type, name: field_name } => {
                    if !matches!(self.lookup(struct_type), Some(Symbol::StructType(_))) {
                        return Err(Exception::semantic(
                            format!("Undeclared struct type '{struct_type}' at line {}", field.position.line),
                            Some(field.position),
                        ));
                    }
                    fields.insert(field_name.clone(), VarKind::Struct(struct_type.clone()));
                }
                _ => {
                    return Err(Exception::semantic(
                        format!("Invalid field declaration in struct '{name}' at line {}", position.line),
                        Some(position),
                    ));
                }
            }
        }
        self.insert(name, Symbol::StructType(fields));
        Ok(())
    }

    /// Resolves the scalar type at the end of a struct field path.
    fn field_type(&self, container: &str, path: &[String], position: CodeLoc) -> RunResult<Option<CType>> {
        let Some(Symbol::Var(VarKind::Struct(mut struct_type))) = self.lookup(container).cloned() else {
            return Err(Exception::semantic(
                format!("'{container}' is not a struct variable at line {}", position.line),
                Some(position),
            ));
        };
        let mut result = None;
        for (i, field) in path.iter().enumerate() {
            let Some(Symbol::StructType(fields)) = self.lookup(&struct_type) else {
                return Err(Exception::semantic(
                    format!("Undeclared struct type '{struct_type}' at line {}", position.line),
                    Some(position),
                ));
            };
            match fields.get(field) {
                Some(VarKind::Scalar(type_name)) if i + 1 == path.len() => {
                    result = CType::of(*type_name);
                }
                Some(VarKind::Struct(inner)) if i + 1 < path.len() => {
                    struct_type = inner.clone();
                }
                _ => {
                    return Err(Exception::semantic(
                        format!(
                            "Struct '{struct_type}' has no field '{field}' at line {}",
                            position.line
                        ),
                        Some(position),
                    ));
                }
            }
        }
        Ok(result)
    }

    fn visit_expr(&mut self, expr: &ExprLoc) -> RunResult<Option<CType>> {
        let position = expr.position;
        match &expr.expr {
            Expr::Int(_) => Ok(Some(CType::Int)),
            Expr::Char(_) => Ok(Some(CType::Char)),
            Expr::Str(_) => Ok(None),
            Expr::Var(name) => match self.lookup(name) {
                None => Err(Exception::semantic(
                    format!("Symbol(identifier) not found '{name}' at line {}", position.line),
                    Some(position),
                )),
                Some(Symbol::Var(VarKind::Scalar(type_name))) => Ok(CType::of(*type_name)),
                Some(_) => Ok(None),
            },
            Expr::StructVar { container, field_path } => self.field_type(container, field_path, position),
            Expr::Unary { op: UnaryOp::Cast(type_name), operand, .. } => {
                self.visit_expr(operand)?;
                Ok(CType::of(*type_name))
            }
            Expr::Unary { operand, .. } => self.visit_expr(operand),
            Expr::Binary { left, right, .. } => {
                let left = self.visit_expr(left)?;
                let right = self.visit_expr(right)?;
                Ok(match (left, right) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                })
            }
            Expr::Ternary { cond, then_expr, else_expr } => {
                self.visit_expr(cond)?;
                let then_type = self.visit_expr(then_expr)?;
                let else_type = self.visit_expr(else_expr)?;
                if let (Some(t), Some(f)) = (then_type, else_type)
                    && t != f
                {
                    self.warn(
                        format!(
                            "Incompatible types at ternary operator texpr:<{t}> fexpr:<{f}> at line {}",
                            position.line
                        ),
                        position,
                    );
                }
                Ok(then_type.or(else_type))
            }
            Expr::Assign { target, op, value } => {
                let right = self.visit_expr(value)?;
                let left = match target {
                    AssignTarget::Var(name) => match self.lookup(name) {
                        None => {
                            return Err(Exception::semantic(
                                format!("Symbol(identifier) not found '{name}' at line {}", position.line),
                                Some(position),
                            ));
                        }
                        Some(Symbol::Var(VarKind::Scalar(type_name))) => CType::of(*type_name),
                        Some(_) => None,
                    },
                    AssignTarget::Field { container, path } => self.field_type(container, path, position)?,
                };
                if let (Some(l), Some(r)) = (left, right)
                    && l != r
                {
                    self.warn(
                        format!("Incompatible types <{l}> {op} <{r}> at line {}", position.line),
                        position,
                    );
                }
                Ok(right)
            }
            Expr::Call { name, args } => self.visit_call(name, args, position),
            Expr::Comma(children) => {
                let mut last = None;
                for child in children {
                    last = self.visit_expr(child)?;
                }
                Ok(last)
            }
        }
    }

    fn visit_call(&mut self, name: &str, args: &[ExprLoc], position: CodeLoc) -> RunResult<Option<CType>> {
        let (return_type, params) = match self.lookup(name) {
            None => {
                return Err(Exception::semantic(
                    format!("Function '{name}' not found at line {}", position.line),
                    Some(position),
                ));
            }
            Some(Symbol::Function { return_type, params }) => (*return_type, params.clone()),
            Some(_) => {
                return Err(Exception::semantic(
                    format!("Identifier '{name}' cannot be used as a function at line {}", position.line),
                    Some(position),
                ));
            }
        };

        let Some(params) = params else {
            // Variadic/unchecked signature: still analyze the argument
            // expressions themselves.
            for arg in args {
                self.visit_expr(arg)?;
            }
            return Ok(CType::of(return_type));
        };

        if args.len() != params.len() {
            return Err(Exception::semantic(
                format!(
                    "Function {name} takes {} positional arguments but {} were given at line {}",
                    params.len(),
                    args.len(),
                    position.line
                ),
                Some(position),
            ));
        }

        let mut expected = vec![];
        let mut found = vec![];
        let mut mismatch = false;
        for (arg, param_type) in args.iter().zip(&params) {
            let arg_type = self.visit_expr(arg)?;
            let param_type = CType::of(*param_type);
            if let (Some(a), Some(p)) = (arg_type, param_type)
                && a != p
            {
                mismatch = true;
            }
            expected.push(param_type.map_or_else(|| "void".to_owned(), |t| t.to_string()));
            found.push(arg_type.map_or_else(|| "?".to_owned(), |t| t.to_string()));
        }
        if mismatch {
            self.warn(
                format!(
                    "Incompatible argument types for function <{name}({})> but found <{name}({})> at line {}",
                    expected.join(", "),
                    found.join(", "),
                    position.line
                ),
                position,
            );
        }
        Ok(CType::of(return_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn analyze_source(source: &str) -> RunResult<Vec<TypeWarning>> {
        analyze(&parse(source).unwrap())
    }

    #[test]
    fn undeclared_identifier_is_fatal() {
        let err = analyze_source("int main() { return x; }").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::SemanticError);
        assert!(err.message.contains("Symbol(identifier) not found 'x'"));
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_fatal() {
        let err = analyze_source("int main() { int a; int a; return 0; }").unwrap_err();
        assert!(err.message.contains("Duplicate identifier 'a'"));
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let warnings = analyze_source("int main() { int a; { int a; } return 0; }").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_main_is_fatal() {
        let err = analyze_source("int f() { return 0; }").unwrap_err();
        assert!(err.message.contains("Undeclared mandatory function main"));
    }

    #[test]
    fn call_arity_is_checked_for_user_functions() {
        let err = analyze_source("int f(int a) { return a; } int main() { return f(1, 2); }").unwrap_err();
        assert!(err.message.contains("takes 1 positional arguments but 2 were given"));
    }

    #[test]
    fn non_callable_identifier_is_fatal() {
        let err = analyze_source("int main() { int a; return a(); }").unwrap_err();
        assert!(err.message.contains("cannot be used as a function"));
    }

    #[test]
    fn assignment_type_mismatch_warns_but_passes() {
        let warnings = analyze_source("int main() { char c; c = 300; return 0; }").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Incompatible types <char> = <int>"));
    }

    #[test]
    fn ternary_branch_divergence_warns() {
        let warnings = analyze_source("int main() { int a; a = 1 ? 2 : 'c'; return a; }").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("ternary"));
    }

    #[test]
    fn parameter_type_mismatch_warns() {
        let warnings =
            analyze_source("int f(int a) { return a; } int main() { return f('c'); }").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Incompatible argument types"));
    }

    #[test]
    fn binary_operations_promote_to_the_larger_type() {
        // char + int promotes to int: assigning it to an int is clean.
        let warnings = analyze_source("int main() { int a; a = 'c' + 1; return a; }").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn builtins_register_from_includes() {
        let warnings = analyze_source("#include <stdio.h>\nint main() { printf(\"%d\", 1); return 0; }").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_library_is_fatal() {
        let err = analyze_source("#include <conio.h>\nint main() { return 0; }").unwrap_err();
        assert!(err.message.contains("Unknown library"));
    }

    #[test]
    fn undeclared_variable_inside_variadic_call_is_caught() {
        let err = analyze_source("#include <stdio.h>\nint main() { printf(\"%d\", missing); return 0; }").unwrap_err();
        assert!(err.message.contains("not found 'missing'"));
    }

    #[test]
    fn struct_fields_resolve_through_paths() {
        let source = "struct P { int x; };\nstruct Q { struct P p; };\nint main() { struct Q q; q.p.x = 1; return q.p.x; }";
        let warnings = analyze_source(source).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_struct_field_is_fatal() {
        let err = analyze_source("struct P { int x; };\nint main() { struct P p; p.y = 1; return 0; }").unwrap_err();
        assert!(err.message.contains("has no field 'y'"));
    }
}
