//! The abstract syntax tree shared by the analyzer and the interpreter.
//!
//! Statements and expressions are plain sum types; every node carries the
//! source position of the first token of the production that built it. The
//! tree is immutable after parsing and is shared by reference between the
//! evaluator thread and anything inspecting it.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CodeLoc;

/// A type keyword as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum TypeName {
    Char,
    Int,
    Float,
    Double,
    Void,
}

/// Binary operators for arithmetic, comparison, bitwise, and boolean operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Operator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mult,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtE,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtE,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
}

/// Assignment operators. Compound forms desugar to the matching [`Operator`]
/// applied to the target's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AssignOp {
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    AddAssign,
    #[strum(serialize = "-=")]
    SubAssign,
    #[strum(serialize = "*=")]
    MulAssign,
    #[strum(serialize = "/=")]
    DivAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for plain `=`.
    #[must_use]
    pub fn operator(self) -> Option<Operator> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(Operator::Add),
            Self::SubAssign => Some(Operator::Sub),
            Self::MulAssign => Some(Operator::Mult),
            Self::DivAssign => Some(Operator::Div),
        }
    }
}

/// Unary operators. `Inc`/`Dec` appear in both prefix and postfix position;
/// the surrounding [`Expr::Unary`] records which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    /// Logical negation `!`, yielding 0 or 1.
    Not,
    /// Address-of `&`, yielding the operand's name as a pseudo-address.
    Addr,
    Inc,
    Dec,
    /// A cast `(type) expr`; the value is preserved, only the tracked type changes.
    Cast(TypeName),
}

/// Target of an assignment: a plain variable or a struct field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignTarget {
    Var(String),
    Field { container: String, path: Vec<String> },
}

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer constant.
    Int(u32),
    /// Character constant.
    Char(u8),
    /// String literal; only valid as a function call argument.
    Str(String),
    Var(String),
    /// Struct field access `container.a.b`.
    StructVar { container: String, field_path: Vec<String> },
    Unary {
        op: UnaryOp,
        prefix: bool,
        operand: Box<ExprLoc>,
    },
    Binary {
        op: Operator,
        left: Box<ExprLoc>,
        right: Box<ExprLoc>,
    },
    /// Conditional expression `cond ? then : otherwise`; only the selected
    /// branch is evaluated.
    Ternary {
        cond: Box<ExprLoc>,
        then_expr: Box<ExprLoc>,
        else_expr: Box<ExprLoc>,
    },
    /// Assignment as an expression; yields the stored value.
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Box<ExprLoc>,
    },
    Call { name: String, args: Vec<ExprLoc> },
    /// Comma expression: children evaluate left to right, value of the last.
    Comma(Vec<ExprLoc>),
}

/// An expression with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprLoc {
    pub position: CodeLoc,
    pub expr: Expr,
}

impl ExprLoc {
    #[must_use]
    pub fn new(position: CodeLoc, expr: Expr) -> Self {
        Self { position, expr }
    }
}

/// A function parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub type_name: TypeName,
    pub name: String,
    pub position: CodeLoc,
}

/// A user function declaration with its body statements.
///
/// The body executes in the function's call frame directly: parameters and
/// top-level locals share the frame's root scope, and nested `{}` blocks push
/// scopes of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub return_type: TypeName,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<StmtLoc>,
}

/// A statement or declaration in the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `#include <library.h>`: imports a named built-in module.
    Include { library: String },
    /// A single-variable declaration. Initializers are desugared by the
    /// parser into a following assignment statement.
    VarDecl { type_name: TypeName, name: String },
    /// `struct T name;`: declares a struct-typed variable.
    StructDecl { struct_type: String, name: String },
    /// `struct T { ... };`: declares a struct layout. The body holds
    /// `VarDecl` and `StructDecl` statements for the fields.
    StructType { name: String, body: Vec<StmtLoc> },
    Function(Box<FunctionDecl>),
    /// An expression statement (assignments, calls, increments, ...).
    Expr(ExprLoc),
    /// A braced block; pushes a scope around its children.
    Compound(Vec<StmtLoc>),
    If {
        cond: ExprLoc,
        then_body: Box<StmtLoc>,
        else_body: Option<Box<StmtLoc>>,
    },
    While { cond: ExprLoc, body: Box<StmtLoc> },
    DoWhile { cond: ExprLoc, body: Box<StmtLoc> },
    /// `for (init; cond; step) body`. All three headers may be empty; a
    /// missing condition is true. The init declarations are scoped to the loop.
    For {
        init: Vec<StmtLoc>,
        cond: Option<ExprLoc>,
        step: Option<ExprLoc>,
        body: Box<StmtLoc>,
    },
    Return { value: Option<ExprLoc> },
    Break,
    Continue,
    /// The empty statement `;`.
    NoOp,
}

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmtLoc {
    pub position: CodeLoc,
    pub stmt: Stmt,
}

impl StmtLoc {
    #[must_use]
    pub fn new(position: CodeLoc, stmt: Stmt) -> Self {
        Self { position, stmt }
    }
}

/// A parsed translation unit: the ordered top-level declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub position: CodeLoc,
    pub body: Vec<StmtLoc>,
}
