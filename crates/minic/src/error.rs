use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail with an interpreter error.
pub(crate) type RunResult<T> = Result<T, Exception>;

/// A position in the source text, 1-based in both coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Classification of fatal errors produced by the pipeline.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `SyntaxError` -> "SyntaxError"), which is what diagnostics print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unrecognized byte in the input stream.
    LexicalError,
    /// Token mismatch during parsing.
    SyntaxError,
    /// Undeclared identifier, duplicate declaration, missing `main`, bad call.
    SemanticError,
    /// Division by zero, I/O format mismatch, and similar execution failures.
    RuntimeError,
}

/// A fatal diagnostic raised by any stage of the pipeline.
///
/// Lexical, syntactic, and semantic errors abort before execution begins;
/// runtime errors abort execution with a nonzero status. No error is caught
/// internally and resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub kind: ErrorKind,
    pub message: String,
    /// Position of the token or AST node the error is attached to, when known.
    pub position: Option<CodeLoc>,
}

impl Exception {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>, position: Option<CodeLoc>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    pub(crate) fn lexical(message: impl Into<String>, position: CodeLoc) -> Self {
        Self::new(ErrorKind::LexicalError, message, Some(position))
    }

    /// Builds the canonical token-mismatch syntax error.
    pub(crate) fn syntax(expected: impl fmt::Display, found: impl fmt::Display, line: u32) -> Self {
        Self::new(
            ErrorKind::SyntaxError,
            format!("Expected token <{expected}> but found <{found}> at line {line}."),
            Some(CodeLoc::new(line, 1)),
        )
    }

    pub(crate) fn syntax_msg(message: impl Into<String>, line: u32) -> Self {
        Self::new(ErrorKind::SyntaxError, message, Some(CodeLoc::new(line, 1)))
    }

    pub(crate) fn semantic(message: impl Into<String>, position: Option<CodeLoc>) -> Self {
        Self::new(ErrorKind::SemanticError, message, position)
    }

    pub(crate) fn runtime(message: impl Into<String>, position: CodeLoc) -> Self {
        Self::new(ErrorKind::RuntimeError, message, Some(position))
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}

/// A non-fatal type diagnostic from the semantic analyzer.
///
/// Warnings are collected during analysis and handed to the host; execution
/// proceeds regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeWarning {
    pub message: String,
    pub position: CodeLoc,
}

impl TypeWarning {
    pub(crate) fn new(message: impl Into<String>, position: CodeLoc) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for TypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[TypeWarning] {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_diagnostic_prefixes() {
        assert_eq!(ErrorKind::LexicalError.to_string(), "LexicalError");
        assert_eq!(ErrorKind::RuntimeError.to_string(), "RuntimeError");
    }

    #[test]
    fn syntax_error_message_shape() {
        let err = Exception::syntax("SEMICOLON", "RBRACE", 3);
        assert_eq!(err.to_string(), "[SyntaxError] Expected token <SEMICOLON> but found <RBRACE> at line 3.");
    }
}
