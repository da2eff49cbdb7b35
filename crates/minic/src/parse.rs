//! Predictive recursive-descent parser for the C subset.
//!
//! Single-token lookahead, with a restorable save/restore of the lexer state
//! to disambiguate `ID (` (a call) from a plain identifier. Every produced
//! node records the position of the first token of its production. Binary
//! operator productions build left-associative trees; `else` binds to the
//! nearest unmatched `if`.

use crate::{
    ast::{AssignOp, AssignTarget, Expr, ExprLoc, FunctionDecl, Operator, Param, Program, Stmt, StmtLoc, TypeName, UnaryOp},
    error::{CodeLoc, Exception, RunResult},
    lexer::{Lexer, LexerState},
    token::{Token, TokenKind, TokenValue},
};

/// Parses a full translation unit.
///
/// # Errors
/// Returns the first `LexicalError` or `SyntaxError` encountered.
pub(crate) fn parse(source: &str) -> RunResult<Program> {
    Parser::new(source)?.parse()
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
}

/// A saved parser position for speculative lookahead.
struct ParserState {
    lexer: LexerState,
    current: Token,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> RunResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.current.line, self.current.column)
    }

    fn save(&self) -> ParserState {
        ParserState {
            lexer: self.lexer.state(),
            current: self.current.clone(),
        }
    }

    fn restore(&mut self, state: ParserState) {
        self.lexer.restore(state.lexer);
        self.current = state.current;
    }

    /// Compares the current token kind with `expected`; on a match consumes
    /// it and returns it, otherwise fails with the canonical mismatch error.
    fn eat(&mut self, expected: TokenKind) -> RunResult<Token> {
        if self.current.kind == expected {
            let mut token = self.lexer.next_token()?;
            std::mem::swap(&mut token, &mut self.current);
            Ok(token)
        } else {
            Err(Exception::syntax(expected, self.current.kind, self.current.line))
        }
    }

    /// Restorable lookahead: does an `ID (` sequence start here?
    fn check_function(&mut self) -> RunResult<bool> {
        let state = self.save();
        self.eat(TokenKind::Ident)?;
        let result = self.current.kind == TokenKind::LParen;
        self.restore(state);
        Ok(result)
    }

    /// Restorable lookahead for top-level `TYPE ID (` function declarations.
    fn check_function_declaration(&mut self) -> RunResult<bool> {
        let state = self.save();
        self.type_spec()?;
        let result = self.current.kind == TokenKind::Ident && {
            self.eat(TokenKind::Ident)?;
            self.current.kind == TokenKind::LParen
        };
        self.restore(state);
        Ok(result)
    }

    fn parse(&mut self) -> RunResult<Program> {
        let position = self.loc();
        let body = self.declarations()?;
        if self.current.kind != TokenKind::Eof {
            return Err(Exception::syntax(TokenKind::Eof, self.current.kind, self.current.line));
        }
        Ok(Program { position, body })
    }

    fn declarations(&mut self) -> RunResult<Vec<StmtLoc>> {
        let mut declarations = vec![];
        loop {
            match self.current.kind {
                TokenKind::Hash => declarations.push(self.include_library()?),
                TokenKind::Struct => declarations.push(self.struct_declaration()?),
                kind if kind.is_type() => {
                    if self.check_function_declaration()? {
                        declarations.push(self.function_declaration()?);
                    } else {
                        self.var_declaration_list(&mut declarations)?;
                    }
                }
                _ => return Ok(declarations),
            }
        }
    }

    /// `# include < name . h >`, the only accepted preprocessor form.
    fn include_library(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::Hash)?;
        let directive = self.eat(TokenKind::Ident)?;
        if directive.lexeme != "include" {
            return Err(Exception::syntax_msg(
                format!("Expected token \"include\" but found \"{}\" at line {}.", directive.lexeme, directive.line),
                directive.line,
            ));
        }
        self.eat(TokenKind::Lt)?;
        let library = self.eat(TokenKind::Ident)?;
        self.eat(TokenKind::Dot)?;
        let extension = self.eat(TokenKind::Ident)?;
        if extension.lexeme != "h" {
            return Err(Exception::syntax_msg(
                format!("You can include only *.h files [line {}]", extension.line),
                extension.line,
            ));
        }
        self.eat(TokenKind::Gt)?;
        Ok(StmtLoc::new(position, Stmt::Include { library: library.lexeme }))
    }

    /// `struct T { fields };` or `struct T name;`
    fn struct_declaration(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::Struct)?;
        let type_name = self.eat(TokenKind::Ident)?.lexeme;
        if self.current.kind == TokenKind::LBrace {
            self.eat(TokenKind::LBrace)?;
            let body = self.struct_body()?;
            self.eat(TokenKind::RBrace)?;
            self.eat(TokenKind::Semicolon)?;
            Ok(StmtLoc::new(position, Stmt::StructType { name: type_name, body }))
        } else {
            let name = self.eat(TokenKind::Ident)?.lexeme;
            self.eat(TokenKind::Semicolon)?;
            Ok(StmtLoc::new(position, Stmt::StructDecl { struct_type: type_name, name }))
        }
    }

    fn struct_body(&mut self) -> RunResult<Vec<StmtLoc>> {
        let mut fields = vec![];
        loop {
            match self.current.kind {
                TokenKind::Struct => {
                    let position = self.loc();
                    self.eat(TokenKind::Struct)?;
                    let struct_type = self.eat(TokenKind::Ident)?.lexeme;
                    let name = self.eat(TokenKind::Ident)?.lexeme;
                    self.eat(TokenKind::Semicolon)?;
                    fields.push(StmtLoc::new(position, Stmt::StructDecl { struct_type, name }));
                }
                kind if kind.is_type() => {
                    let position = self.loc();
                    let type_name = self.type_spec()?;
                    let name = self.eat(TokenKind::Ident)?.lexeme;
                    self.eat(TokenKind::Semicolon)?;
                    fields.push(StmtLoc::new(position, Stmt::VarDecl { type_name, name }));
                }
                _ => return Ok(fields),
            }
        }
    }

    fn function_declaration(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        let return_type = self.type_spec()?;
        let name = self.eat(TokenKind::Ident)?.lexeme;
        self.eat(TokenKind::LParen)?;
        let params = self.parameters()?;
        self.eat(TokenKind::RParen)?;
        self.eat(TokenKind::LBrace)?;
        let body = self.statement_list(true)?;
        self.eat(TokenKind::RBrace)?;
        Ok(StmtLoc::new(
            position,
            Stmt::Function(Box::new(FunctionDecl { return_type, name, params, body })),
        ))
    }

    fn parameters(&mut self) -> RunResult<Vec<Param>> {
        let mut params = vec![];
        if self.current.kind == TokenKind::RParen {
            return Ok(params);
        }
        loop {
            let position = self.loc();
            let type_name = self.type_spec()?;
            let name = self.eat(TokenKind::Ident)?.lexeme;
            params.push(Param { type_name, name, position });
            if self.current.kind != TokenKind::Comma {
                return Ok(params);
            }
            self.eat(TokenKind::Comma)?;
        }
    }

    /// `type a = 1, b, c = f(x);`: each declarator expands to a `VarDecl`
    /// plus an optional assignment statement, in source order.
    fn var_declaration_list(&mut self, out: &mut Vec<StmtLoc>) -> RunResult<()> {
        let list_position = self.loc();
        let type_name = self.type_spec()?;
        self.declarator(type_name, Some(list_position), out)?;
        while self.current.kind == TokenKind::Comma {
            self.eat(TokenKind::Comma)?;
            self.declarator(type_name, None, out)?;
        }
        self.eat(TokenKind::Semicolon)?;
        Ok(())
    }

    fn declarator(&mut self, type_name: TypeName, list_position: Option<CodeLoc>, out: &mut Vec<StmtLoc>) -> RunResult<()> {
        let var_position = self.loc();
        let name = self.eat(TokenKind::Ident)?.lexeme;
        out.push(StmtLoc::new(
            list_position.unwrap_or(var_position),
            Stmt::VarDecl { type_name, name: name.clone() },
        ));
        if self.current.kind == TokenKind::Assign {
            self.eat(TokenKind::Assign)?;
            let value = self.assignment()?;
            out.push(StmtLoc::new(
                var_position,
                Stmt::Expr(ExprLoc::new(
                    var_position,
                    Expr::Assign {
                        target: AssignTarget::Var(name),
                        op: AssignOp::Assign,
                        value: Box::new(value),
                    },
                )),
            ));
        }
        Ok(())
    }

    fn type_spec(&mut self) -> RunResult<TypeName> {
        let type_name = match self.current.kind {
            TokenKind::Char => TypeName::Char,
            TokenKind::Int => TypeName::Int,
            TokenKind::Float => TypeName::Float,
            TokenKind::Double => TypeName::Double,
            TokenKind::Void => TypeName::Void,
            found => return Err(Exception::syntax("TYPE", found, self.current.line)),
        };
        self.eat(self.current.kind)?;
        Ok(type_name)
    }

    fn statement_list(&mut self, allow_declaration: bool) -> RunResult<Vec<StmtLoc>> {
        let mut nodes = vec![];
        loop {
            match self.current.kind {
                TokenKind::RBrace | TokenKind::Eof => return Ok(nodes),
                kind if kind.is_type() && allow_declaration => self.var_declaration_list(&mut nodes)?,
                TokenKind::Struct if allow_declaration => nodes.push(self.struct_declaration()?),
                _ => nodes.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        match self.current.kind {
            TokenKind::LBrace => {
                self.eat(TokenKind::LBrace)?;
                let children = self.statement_list(true)?;
                self.eat(TokenKind::RBrace)?;
                Ok(StmtLoc::new(position, Stmt::Compound(children)))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Break => {
                self.eat(TokenKind::Break)?;
                self.eat(TokenKind::Semicolon)?;
                Ok(StmtLoc::new(position, Stmt::Break))
            }
            TokenKind::Continue => {
                self.eat(TokenKind::Continue)?;
                self.eat(TokenKind::Semicolon)?;
                Ok(StmtLoc::new(position, Stmt::Continue))
            }
            TokenKind::Semicolon => {
                self.eat(TokenKind::Semicolon)?;
                Ok(StmtLoc::new(position, Stmt::NoOp))
            }
            _ => {
                let expr = self.expression()?;
                self.eat(TokenKind::Semicolon)?;
                Ok(StmtLoc::new(position, Stmt::Expr(expr)))
            }
        }
    }

    /// The body of an `if`/`while`/`for`: either a braced block or a single
    /// statement. Declarations require braces.
    fn stmt_body(&mut self) -> RunResult<StmtLoc> {
        self.statement()
    }

    fn if_statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::If)?;
        self.eat(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.eat(TokenKind::RParen)?;
        let then_body = Box::new(self.stmt_body()?);
        // The nearest unmatched `if` claims the `else`.
        let else_body = if self.current.kind == TokenKind::Else {
            self.eat(TokenKind::Else)?;
            Some(Box::new(self.stmt_body()?))
        } else {
            None
        };
        Ok(StmtLoc::new(position, Stmt::If { cond, then_body, else_body }))
    }

    fn while_statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::While)?;
        self.eat(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.eat(TokenKind::RParen)?;
        let body = Box::new(self.stmt_body()?);
        Ok(StmtLoc::new(position, Stmt::While { cond, body }))
    }

    fn do_while_statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::Do)?;
        let body = Box::new(self.stmt_body()?);
        self.eat(TokenKind::While)?;
        self.eat(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.eat(TokenKind::RParen)?;
        self.eat(TokenKind::Semicolon)?;
        Ok(StmtLoc::new(position, Stmt::DoWhile { cond, body }))
    }

    fn for_statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::For)?;
        self.eat(TokenKind::LParen)?;

        let mut init = vec![];
        if self.current.kind.is_type() {
            self.var_declaration_list(&mut init)?;
        } else if self.current.kind == TokenKind::Semicolon {
            self.eat(TokenKind::Semicolon)?;
        } else {
            let expr_position = self.loc();
            let expr = self.expression()?;
            self.eat(TokenKind::Semicolon)?;
            init.push(StmtLoc::new(expr_position, Stmt::Expr(expr)));
        }

        let cond = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression()?)
        };
        self.eat(TokenKind::Semicolon)?;

        let step = if self.current.kind == TokenKind::RParen {
            None
        } else {
            Some(self.expression()?)
        };
        self.eat(TokenKind::RParen)?;

        let body = Box::new(self.stmt_body()?);
        Ok(StmtLoc::new(position, Stmt::For { init, cond, step, body }))
    }

    fn return_statement(&mut self) -> RunResult<StmtLoc> {
        let position = self.loc();
        self.eat(TokenKind::Return)?;
        let value = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression()?)
        };
        self.eat(TokenKind::Semicolon)?;
        Ok(StmtLoc::new(position, Stmt::Return { value }))
    }

    // === expressions, loosest binding first ===

    /// `assignment (, assignment)*`: the comma operator.
    fn expression(&mut self) -> RunResult<ExprLoc> {
        let first = self.assignment()?;
        if self.current.kind != TokenKind::Comma {
            return Ok(first);
        }
        let position = first.position;
        let mut children = vec![first];
        while self.current.kind == TokenKind::Comma {
            self.eat(TokenKind::Comma)?;
            children.push(self.assignment()?);
        }
        Ok(ExprLoc::new(position, Expr::Comma(children)))
    }

    fn assignment(&mut self) -> RunResult<ExprLoc> {
        let left = self.ternary()?;
        let op = match self.current.kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::AddAssign,
            TokenKind::MinusAssign => AssignOp::SubAssign,
            TokenKind::StarAssign => AssignOp::MulAssign,
            TokenKind::SlashAssign => AssignOp::DivAssign,
            _ => return Ok(left),
        };
        self.eat(self.current.kind)?;
        let target = match left.expr {
            Expr::Var(name) => AssignTarget::Var(name),
            Expr::StructVar { container, field_path } => AssignTarget::Field { container, path: field_path },
            _ => {
                return Err(Exception::syntax_msg(
                    format!("Invalid assignment target at line {}", left.position.line),
                    left.position.line,
                ));
            }
        };
        let value = self.assignment()?;
        Ok(ExprLoc::new(
            left.position,
            Expr::Assign { target, op, value: Box::new(value) },
        ))
    }

    fn ternary(&mut self) -> RunResult<ExprLoc> {
        let cond = self.logical_or()?;
        if self.current.kind != TokenKind::Question {
            return Ok(cond);
        }
        self.eat(TokenKind::Question)?;
        let then_expr = self.expression()?;
        self.eat(TokenKind::Colon)?;
        let else_expr = self.assignment()?;
        Ok(ExprLoc::new(
            cond.position,
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        ))
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> RunResult<ExprLoc>,
        match_op: fn(TokenKind) -> Option<Operator>,
    ) -> RunResult<ExprLoc> {
        let mut node = operand(self)?;
        while let Some(op) = match_op(self.current.kind) {
            self.eat(self.current.kind)?;
            let right = operand(self)?;
            let position = node.position;
            node = ExprLoc::new(
                position,
                Expr::Binary {
                    op,
                    left: Box::new(node),
                    right: Box::new(right),
                },
            );
        }
        Ok(node)
    }

    fn logical_or(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::logical_and, |kind| (kind == TokenKind::LogOr).then_some(Operator::Or))
    }

    fn logical_and(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::bit_or, |kind| (kind == TokenKind::LogAnd).then_some(Operator::And))
    }

    fn bit_or(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::bit_xor, |kind| (kind == TokenKind::Pipe).then_some(Operator::BitOr))
    }

    fn bit_xor(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::bit_and, |kind| (kind == TokenKind::Caret).then_some(Operator::BitXor))
    }

    fn bit_and(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::equality, |kind| (kind == TokenKind::Amp).then_some(Operator::BitAnd))
    }

    fn equality(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::relational, |kind| match kind {
            TokenKind::Eq => Some(Operator::Eq),
            TokenKind::Ne => Some(Operator::NotEq),
            _ => None,
        })
    }

    fn relational(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::additive, |kind| match kind {
            TokenKind::Lt => Some(Operator::Lt),
            TokenKind::Le => Some(Operator::LtE),
            TokenKind::Gt => Some(Operator::Gt),
            TokenKind::Ge => Some(Operator::GtE),
            _ => None,
        })
    }

    fn additive(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::term, |kind| match kind {
            TokenKind::Plus => Some(Operator::Add),
            TokenKind::Minus => Some(Operator::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> RunResult<ExprLoc> {
        self.binary_level(Self::unary, |kind| match kind {
            TokenKind::Star => Some(Operator::Mult),
            TokenKind::Slash => Some(Operator::Div),
            TokenKind::Percent => Some(Operator::Mod),
            _ => None,
        })
    }

    fn unary(&mut self) -> RunResult<ExprLoc> {
        let position = self.loc();
        let op = match self.current.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Inc => UnaryOp::Inc,
            TokenKind::Dec => UnaryOp::Dec,
            TokenKind::Amp => {
                // Address-of applies to a variable, not a general expression.
                self.eat(TokenKind::Amp)?;
                let operand = self.variable()?;
                return Ok(ExprLoc::new(
                    position,
                    Expr::Unary {
                        op: UnaryOp::Addr,
                        prefix: true,
                        operand: Box::new(operand),
                    },
                ));
            }
            TokenKind::LParen => {
                // A parenthesized type is a cast; anything else is grouping,
                // handled by primary().
                let state = self.save();
                self.eat(TokenKind::LParen)?;
                if self.current.kind.is_type() {
                    let type_name = self.type_spec()?;
                    self.eat(TokenKind::RParen)?;
                    let operand = self.unary()?;
                    return Ok(ExprLoc::new(
                        position,
                        Expr::Unary {
                            op: UnaryOp::Cast(type_name),
                            prefix: true,
                            operand: Box::new(operand),
                        },
                    ));
                }
                self.restore(state);
                return self.postfix();
            }
            _ => return self.postfix(),
        };
        self.eat(self.current.kind)?;
        let operand = self.unary()?;
        Ok(ExprLoc::new(
            position,
            Expr::Unary {
                op,
                prefix: true,
                operand: Box::new(operand),
            },
        ))
    }

    fn postfix(&mut self) -> RunResult<ExprLoc> {
        let node = self.primary()?;
        let op = match self.current.kind {
            TokenKind::Inc => UnaryOp::Inc,
            TokenKind::Dec => UnaryOp::Dec,
            _ => return Ok(node),
        };
        self.eat(self.current.kind)?;
        let position = node.position;
        Ok(ExprLoc::new(
            position,
            Expr::Unary {
                op,
                prefix: false,
                operand: Box::new(node),
            },
        ))
    }

    fn primary(&mut self) -> RunResult<ExprLoc> {
        let position = self.loc();
        match self.current.kind {
            TokenKind::IntConst => {
                let token = self.eat(TokenKind::IntConst)?;
                Ok(ExprLoc::new(position, Expr::Int(token.int_value())))
            }
            TokenKind::CharConst => {
                let token = self.eat(TokenKind::CharConst)?;
                let TokenValue::Byte(value) = token.value else {
                    return Err(Exception::syntax_msg("Malformed character literal", token.line));
                };
                Ok(ExprLoc::new(position, Expr::Char(value)))
            }
            TokenKind::StrLit => Err(Exception::syntax_msg(
                format!(
                    "String literals are only allowed as function call arguments [line {}]",
                    self.current.line
                ),
                self.current.line,
            )),
            TokenKind::LParen => {
                self.eat(TokenKind::LParen)?;
                let inner = self.expression()?;
                self.eat(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident => {
                if self.check_function()? {
                    self.function_call()
                } else {
                    self.variable()
                }
            }
            found => Err(Exception::syntax_msg(
                format!("Unexpected token <{found}> in expression at line {}", self.current.line),
                self.current.line,
            )),
        }
    }

    /// `ID (. ID)*`: a variable or a struct field path.
    fn variable(&mut self) -> RunResult<ExprLoc> {
        let position = self.loc();
        let name = self.eat(TokenKind::Ident)?.lexeme;
        if self.current.kind != TokenKind::Dot {
            return Ok(ExprLoc::new(position, Expr::Var(name)));
        }
        let mut field_path = vec![];
        while self.current.kind == TokenKind::Dot {
            self.eat(TokenKind::Dot)?;
            field_path.push(self.eat(TokenKind::Ident)?.lexeme);
        }
        Ok(ExprLoc::new(position, Expr::StructVar { container: name, field_path }))
    }

    fn function_call(&mut self) -> RunResult<ExprLoc> {
        let position = self.loc();
        let name = self.eat(TokenKind::Ident)?.lexeme;
        self.eat(TokenKind::LParen)?;
        let mut args = vec![];
        while self.current.kind != TokenKind::RParen {
            if self.current.kind == TokenKind::StrLit {
                let string_position = self.loc();
                let token = self.eat(TokenKind::StrLit)?;
                let TokenValue::Text(text) = token.value else {
                    return Err(Exception::syntax_msg("Malformed string literal", token.line));
                };
                args.push(ExprLoc::new(string_position, Expr::Str(text)));
            } else {
                args.push(self.assignment()?);
            }
            if self.current.kind == TokenKind::Comma {
                self.eat(TokenKind::Comma)?;
            }
        }
        self.eat(TokenKind::RParen)?;
        Ok(ExprLoc::new(position, Expr::Call { name, args }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source).unwrap()
    }

    fn main_body(program: &Program) -> &[StmtLoc] {
        for stmt in &program.body {
            if let Stmt::Function(func) = &stmt.stmt {
                if func.name == "main" {
                    return &func.body;
                }
            }
        }
        panic!("no main in program");
    }

    #[test]
    fn node_positions_come_from_first_token() {
        let program = parse_ok("int main() {\n  int s;\n  s = 1 + 2;\n  return s;\n}");
        let body = main_body(&program);
        assert_eq!(body[0].position, CodeLoc::new(2, 3)); // int s;
        assert_eq!(body[1].position, CodeLoc::new(3, 3)); // s = 1 + 2;
        let Stmt::Expr(assign) = &body[1].stmt else { panic!("expected assignment") };
        let Expr::Assign { value, .. } = &assign.expr else { panic!("expected assign expr") };
        // The binary production starts at its first token, `1`.
        assert_eq!(value.position, CodeLoc::new(3, 7));
        assert_eq!(body[2].position, CodeLoc::new(4, 3)); // return s;
    }

    #[test]
    fn additive_chains_are_left_associative() {
        let program = parse_ok("int main() { int a; a = 1 - 2 - 3; }");
        let Stmt::Expr(expr) = &main_body(&program)[1].stmt else { panic!() };
        let Expr::Assign { value, .. } = &expr.expr else { panic!() };
        let Expr::Binary { op: Operator::Sub, left, .. } = &value.expr else { panic!() };
        assert!(matches!(left.expr, Expr::Binary { op: Operator::Sub, .. }));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let program = parse_ok("int main() { if (1) if (0) return 1; else return 2; return 3; }");
        let Stmt::If { then_body, else_body, .. } = &main_body(&program)[0].stmt else { panic!() };
        assert!(else_body.is_none());
        let Stmt::If { else_body: inner_else, .. } = &then_body.stmt else { panic!() };
        assert!(inner_else.is_some());
    }

    #[test]
    fn call_and_variable_are_disambiguated() {
        let program = parse_ok("int f() { return 1; } int main() { int f2; f2 = f(); return f2; }");
        let Stmt::Expr(expr) = &main_body(&program)[1].stmt else { panic!() };
        let Expr::Assign { value, .. } = &expr.expr else { panic!() };
        assert!(matches!(&value.expr, Expr::Call { name, .. } if name == "f"));
    }

    #[test]
    fn initializers_desugar_to_assignments() {
        let program = parse_ok("int main() { int a = 1, b, c = 2; }");
        let kinds: Vec<_> = main_body(&program)
            .iter()
            .map(|s| match &s.stmt {
                Stmt::VarDecl { name, .. } => format!("decl {name}"),
                Stmt::Expr(_) => "assign".to_owned(),
                _ => panic!("unexpected statement"),
            })
            .collect();
        assert_eq!(kinds, vec!["decl a", "assign", "decl b", "decl c", "assign"]);
    }

    #[test]
    fn cast_versus_grouping() {
        let program = parse_ok("int main() { int a; a = (int) 'x'; a = (a + 1); }");
        let Stmt::Expr(first) = &main_body(&program)[1].stmt else { panic!() };
        let Expr::Assign { value, .. } = &first.expr else { panic!() };
        assert!(matches!(value.expr, Expr::Unary { op: UnaryOp::Cast(TypeName::Int), .. }));
    }

    #[test]
    fn struct_field_paths_parse() {
        let program = parse_ok("struct P { int x; };\nint main() { struct P p; p.x = 3; return p.x; }");
        let Stmt::Expr(assign) = &main_body(&program)[1].stmt else { panic!() };
        let Expr::Assign { target, .. } = &assign.expr else { panic!() };
        assert_eq!(
            target,
            &AssignTarget::Field { container: "p".to_owned(), path: vec!["x".to_owned()] }
        );
    }

    #[test]
    fn only_include_directives_are_accepted() {
        let err = parse("#define X 1\nint main() { return 0; }").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::SyntaxError);
    }

    #[test]
    fn mismatch_reports_expected_and_found() {
        let err = parse("int main() { return 0 }").unwrap_err();
        assert_eq!(
            err.message,
            "Expected token <SEMICOLON> but found <RBRACE> at line 1."
        );
    }
}
