//! On-demand tokenizer for the C subset.
//!
//! Tokens are produced one at a time; whitespace and `//` / `/* */` comments
//! are skipped without producing tokens but still advance the line/column
//! counters. The lexer's position state can be saved and restored, which the
//! parser uses to disambiguate constructs with a speculative look-ahead.

use crate::{
    error::{CodeLoc, Exception, RunResult},
    token::{Token, TokenKind, TokenValue},
};

/// A saved lexer position, restorable with [`Lexer::restore`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct LexerState {
    position: usize,
    line: u32,
    column: u32,
}

pub(crate) struct Lexer<'src> {
    source: &'src str,
    /// Current byte position in the source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Captures the current position so the parser can rewind after a
    /// speculative token sequence.
    pub fn state(&self) -> LexerState {
        LexerState {
            position: self.position,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.line = state.line;
        self.column = state.column;
    }

    /// Returns the byte at the given offset from the current position, or
    /// `\0` past the end. Source text is ASCII apart from comments and string
    /// contents, so byte-wise scanning is sufficient.
    fn char_at(&self, offset: usize) -> u8 {
        *self.source.as_bytes().get(self.position + offset).unwrap_or(&0)
    }

    fn current(&self) -> u8 {
        self.char_at(0)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    fn advance(&mut self) {
        if let Some(&b) = self.source.as_bytes().get(self.position) {
            self.position += 1;
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> RunResult<()> {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                b'/' if self.char_at(1) == b'/' => {
                    while !self.is_at_end() && self.current() != b'\n' {
                        self.advance();
                    }
                }
                b'/' if self.char_at(1) == b'*' => {
                    let start = self.loc();
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(Exception::lexical("Unterminated block comment", start));
                        }
                        if self.current() == b'*' && self.char_at(1) == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.column)
    }

    /// Produces the next token.
    ///
    /// # Errors
    /// Returns a `LexicalError` on an unrecognized byte, an unterminated
    /// literal, or an invalid escape sequence, citing the position.
    pub fn next_token(&mut self) -> RunResult<Token> {
        self.skip_whitespace_and_comments()?;

        let line = self.line;
        let column = self.column;
        let start = self.position;

        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, "", line, column));
        }

        let kind = match self.current() {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => return self.lex_identifier(line, column),
            b'0'..=b'9' => return self.lex_number(line, column),
            b'\'' => return self.lex_char(line, column),
            b'"' => return self.lex_string(line, column),
            b'+' => match self.char_at(1) {
                b'+' => self.take2(TokenKind::Inc),
                b'=' => self.take2(TokenKind::PlusAssign),
                _ => self.take1(TokenKind::Plus),
            },
            b'-' => match self.char_at(1) {
                b'-' => self.take2(TokenKind::Dec),
                b'=' => self.take2(TokenKind::MinusAssign),
                _ => self.take1(TokenKind::Minus),
            },
            b'*' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::StarAssign),
                _ => self.take1(TokenKind::Star),
            },
            b'/' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::SlashAssign),
                _ => self.take1(TokenKind::Slash),
            },
            b'%' => self.take1(TokenKind::Percent),
            b'=' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::Eq),
                _ => self.take1(TokenKind::Assign),
            },
            b'!' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::Ne),
                _ => self.take1(TokenKind::Bang),
            },
            b'<' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::Le),
                _ => self.take1(TokenKind::Lt),
            },
            b'>' => match self.char_at(1) {
                b'=' => self.take2(TokenKind::Ge),
                _ => self.take1(TokenKind::Gt),
            },
            b'&' => match self.char_at(1) {
                b'&' => self.take2(TokenKind::LogAnd),
                _ => self.take1(TokenKind::Amp),
            },
            b'|' => match self.char_at(1) {
                b'|' => self.take2(TokenKind::LogOr),
                _ => self.take1(TokenKind::Pipe),
            },
            b'^' => self.take1(TokenKind::Caret),
            b'?' => self.take1(TokenKind::Question),
            b':' => self.take1(TokenKind::Colon),
            b',' => self.take1(TokenKind::Comma),
            b';' => self.take1(TokenKind::Semicolon),
            b'(' => self.take1(TokenKind::LParen),
            b')' => self.take1(TokenKind::RParen),
            b'{' => self.take1(TokenKind::LBrace),
            b'}' => self.take1(TokenKind::RBrace),
            b'.' => self.take1(TokenKind::Dot),
            b'#' => self.take1(TokenKind::Hash),
            other => {
                return Err(Exception::lexical(
                    format!("Unrecognized character '{}'", char::from(other)),
                    CodeLoc::new(line, column),
                ));
            }
        };

        Ok(Token::new(kind, &self.source[start..self.position], line, column))
    }

    fn take1(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn take2(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        self.advance();
        kind
    }

    fn lex_identifier(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let start = self.position;
        while matches!(self.current(), b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_') {
            self.advance();
        }
        let text = &self.source[start..self.position];
        let kind = match text {
            "char" => TokenKind::Char,
            "int" => TokenKind::Int,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "void" => TokenKind::Void,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "struct" => TokenKind::Struct,
            _ => TokenKind::Ident,
        };
        Ok(Token::new(kind, text, line, column))
    }

    fn lex_number(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let start = self.position;
        while self.current().is_ascii_digit() {
            self.advance();
        }
        let text = &self.source[start..self.position];
        // Decimal literals wider than 32 bits wrap, matching the value model.
        let value = text.bytes().fold(0u32, |acc, b| {
            acc.wrapping_mul(10).wrapping_add(u32::from(b - b'0'))
        });
        Ok(Token::new(TokenKind::IntConst, text, line, column).with_value(TokenValue::Int(value)))
    }

    fn lex_escape(&mut self, start: CodeLoc) -> RunResult<u8> {
        self.advance(); // consume the backslash
        let decoded = match self.current() {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'0' => 0,
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            other => {
                return Err(Exception::lexical(
                    format!("Unknown escape sequence '\\{}'", char::from(other)),
                    start,
                ));
            }
        };
        self.advance();
        Ok(decoded)
    }

    fn lex_char(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let start = self.position;
        let loc = CodeLoc::new(line, column);
        self.advance(); // opening quote
        let value = match self.current() {
            b'\\' => self.lex_escape(loc)?,
            b'\'' | 0 => return Err(Exception::lexical("Empty character literal", loc)),
            other => {
                self.advance();
                other
            }
        };
        if self.current() != b'\'' {
            return Err(Exception::lexical("Unterminated character literal", loc));
        }
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::CharConst, &self.source[start..self.position], line, column)
            .with_value(TokenValue::Byte(value)))
    }

    fn lex_string(&mut self, line: u32, column: u32) -> RunResult<Token> {
        let start = self.position;
        let loc = CodeLoc::new(line, column);
        self.advance(); // opening quote
        let mut decoded = String::new();
        loop {
            match self.current() {
                0 | b'\n' => return Err(Exception::lexical("Unterminated string literal", loc)),
                b'"' => {
                    self.advance();
                    break;
                }
                b'\\' => decoded.push(char::from(self.lex_escape(loc)?)),
                other => {
                    decoded.push(char::from(other));
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::StrLit, &self.source[start..self.position], line, column)
            .with_value(TokenValue::Text(decoded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token().unwrap();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = all_tokens("int a;\n  a = 3;");
        assert_eq!((tokens[0].kind, tokens[0].line, tokens[0].column), (TokenKind::Int, 1, 1));
        assert_eq!((tokens[3].kind, tokens[3].line, tokens[3].column), (TokenKind::Ident, 2, 3));
    }

    #[test]
    fn comments_do_not_produce_tokens() {
        let tokens = all_tokens("a // line\n/* block\nstill */ b");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn two_char_operators_win_over_single() {
        let kinds: Vec<_> = all_tokens("++ += + == = <= < && &").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Inc,
                TokenKind::PlusAssign,
                TokenKind::Plus,
                TokenKind::Eq,
                TokenKind::Assign,
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::LogAnd,
                TokenKind::Amp,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn char_and_string_escapes_decode() {
        let tokens = all_tokens(r#"'\n' "hi\tthere""#);
        assert_eq!(tokens[0].value, TokenValue::Byte(b'\n'));
        assert_eq!(tokens[0].lexeme, r"'\n'");
        assert_eq!(tokens[1].value, TokenValue::Text("hi\tthere".to_owned()));
    }

    #[test]
    fn lexemes_reproduce_non_comment_text() {
        let source = "int main() { /* noise */ return 40 + 2; } // done";
        let rebuilt: String = all_tokens(source).iter().map(|t| t.lexeme.as_str()).collect();
        let stripped: String = "int main() { return 40 + 2; }".split_whitespace().collect();
        assert_eq!(rebuilt, stripped);
    }

    #[test]
    fn unrecognized_byte_is_a_lexical_error() {
        let mut lexer = Lexer::new("int a @;");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::LexicalError);
        assert_eq!(err.position, Some(CodeLoc::new(1, 7)));
    }

    #[test]
    fn save_restore_rewinds_exactly() {
        let mut lexer = Lexer::new("foo ( bar");
        let state = lexer.state();
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::LParen);
        lexer.restore(state);
        let again = lexer.next_token().unwrap();
        assert_eq!((again.kind, again.column), (TokenKind::Ident, 1));
    }
}
