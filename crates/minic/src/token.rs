use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// The kind of a lexical token.
///
/// The string representation (via strum `Display`) is the screaming-snake name
/// used in syntax diagnostics, e.g. `Expected token <SEMICOLON> but found <RBRACE>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // type keywords
    Char,
    Int,
    Float,
    Double,
    Void,
    // control keywords
    If,
    Else,
    While,
    Do,
    For,
    Return,
    Break,
    Continue,
    Struct,
    // identifiers and literals
    Ident,
    IntConst,
    CharConst,
    StrLit,
    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
    Amp,
    Pipe,
    Caret,
    Bang,
    Inc,
    Dec,
    Question,
    Colon,
    // punctuators
    Comma,
    Semicolon,
    #[strum(serialize = "LPAREN")]
    LParen,
    #[strum(serialize = "RPAREN")]
    RParen,
    #[strum(serialize = "LBRACE")]
    LBrace,
    #[strum(serialize = "RBRACE")]
    RBrace,
    Dot,
    Hash,
    Eof,
}

impl TokenKind {
    /// Whether this token starts a type specifier.
    #[must_use]
    pub fn is_type(self) -> bool {
        matches!(self, Self::Char | Self::Int | Self::Float | Self::Double | Self::Void)
    }
}

/// Decoded payload of a literal token.
///
/// The raw source text (escapes included) lives in `Token::lexeme`; this is
/// the value after escape processing, produced once by the lexer so the
/// parser never re-scans literal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenValue {
    None,
    /// Integer literal value. Negative literals are built by the parser from
    /// a unary minus, so the lexer only ever produces the magnitude.
    Int(u32),
    /// Character literal after escape decoding.
    Byte(u8),
    /// String literal content after escape decoding, quotes stripped.
    Text(String),
}

/// A lexical token with its exact source text and starting position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact slice of source text this token was produced from.
    pub lexeme: String,
    pub value: TokenValue,
    /// 1-based source line of the first byte.
    pub line: u32,
    /// 1-based source column of the first byte.
    pub column: u32,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            value: TokenValue::None,
            line,
            column,
        }
    }

    pub(crate) fn with_value(mut self, value: TokenValue) -> Self {
        self.value = value;
        self
    }

    /// Decoded integer payload.
    ///
    /// # Panics
    /// Panics if called on a token that is not an `IntConst`; the parser only
    /// calls this after matching the kind.
    #[must_use]
    pub fn int_value(&self) -> u32 {
        match self.value {
            TokenValue::Int(v) => v,
            _ => panic!("int_value on non-integer token"),
        }
    }
}
