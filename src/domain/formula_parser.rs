//! Formula DSL parser.
//!
//! Recursive descent over the token stream from [`formula_lexer`]. Precedence,
//! lowest first:
//!
//! ```text
//! or         := and ( OR and )*
//! and        := not ( AND not )*
//! not        := NOT not | comparison
//! comparison := additive ( cmp additive )?        -- non-associative
//! additive   := term ( ('+' | '-') term )*
//! term       := unary ( ('*' | '/') unary )*
//! unary      := '-' unary | primary
//! primary    := number | IDENT | IDENT '(' args ')' | '(' or ')'
//! ```
//!
//! The parser only recognises shapes. Whether an identifier or function name
//! exists is decided by the evaluator.
//!
//! Input is bounded: at most [`MAX_TOKENS`] tokens and [`MAX_NESTING`] levels of
//! parentheses, call arguments, `NOT` and unary minus. Both limits keep the
//! recursive parser and evaluator within a worker thread's stack.
//!
//! [`formula_lexer`]: crate::domain::formula_lexer

use crate::domain::error::FormulaError;
use crate::domain::formula::{BinaryOp, Expr, UnaryOp};
use crate::domain::formula_lexer::{tokenize, Token, TokenKind};
use crate::domain::ohlcv::PriceField;

/// Deepest accepted nesting of groups, call arguments and prefix operators.
pub const MAX_NESTING: usize = 64;

/// Longest accepted formula, in tokens.
pub const MAX_TOKENS: usize = 1024;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        // tokenize() guarantees a trailing Eof, and advance() never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn syntax_error(token: &Token, message: String) -> FormulaError {
        FormulaError::Syntax {
            message,
            token: match token.kind {
                TokenKind::Eof => String::new(),
                _ => token.text.clone(),
            },
            position: token.position,
        }
    }

    /// Run `rule` one nesting level deeper, rejecting `token` once the limit is hit.
    fn nested<T>(
        &mut self,
        token: &Token,
        rule: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(Self::syntax_error(
                token,
                format!(
                    "formula nested too deeply at {} (limit {})",
                    token.describe(),
                    MAX_NESTING
                ),
            ));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_and()?;
        while self.peek().kind == TokenKind::Or {
            let op_token = self.advance();
            let right = self.parse_operand_after(&op_token, Self::parse_and)?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_not()?;
        while self.peek().kind == TokenKind::And {
            let op_token = self.advance();
            let right = self.parse_operand_after(&op_token, Self::parse_not)?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FormulaError> {
        if self.peek().kind == TokenKind::Not {
            let op_token = self.advance();
            let operand =
                self.nested(&op_token, |p| p.parse_operand_after(&op_token, Self::parse_not))?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FormulaError> {
        let left = self.parse_additive()?;
        let Some(op) = Self::comparison_op(&self.peek().kind) else {
            return Ok(left);
        };
        let op_token = self.advance();
        let right = self.parse_operand_after(&op_token, Self::parse_additive)?;

        let next = self.peek();
        if Self::comparison_op(&next.kind).is_some() {
            return Err(Self::syntax_error(
                next,
                format!(
                    "comparison operators cannot be chained: unexpected {}",
                    next.describe()
                ),
            ));
        }
        Ok(Expr::binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let op_token = self.advance();
            let right = self.parse_operand_after(&op_token, Self::parse_term)?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            let op_token = self.advance();
            let right = self.parse_operand_after(&op_token, Self::parse_unary)?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek().kind == TokenKind::Minus {
            let op_token = self.advance();
            let operand =
                self.nested(&op_token, |p| p.parse_operand_after(&op_token, Self::parse_unary))?;
            return Ok(Expr::unary(UnaryOp::Neg, operand));
        }
        self.parse_primary()
    }

    /// Run `rule` for the operand that must follow `op_token`, reporting a missing
    /// operand in terms of the operator that needed it.
    fn parse_operand_after(
        &mut self,
        op_token: &Token,
        rule: fn(&mut Self) -> Result<Expr, FormulaError>,
    ) -> Result<Expr, FormulaError> {
        if !Self::starts_operand(&self.peek().kind) {
            let found = self.peek();
            return Err(Self::syntax_error(
                found,
                format!(
                    "expected operand after '{}', found {}",
                    op_token.text,
                    found.describe()
                ),
            ));
        }
        rule(self)
    }

    fn starts_operand(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Number(_)
                | TokenKind::Ident(_)
                | TokenKind::LParen
                | TokenKind::Minus
                | TokenKind::Not
        )
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(v) => Ok(Expr::Literal(v)),
            TokenKind::Ident(name) => {
                if self.peek().kind == TokenKind::LParen {
                    let open = self.advance();
                    let args = self.nested(&open, |p| p.parse_arguments(&open))?;
                    return Ok(Expr::Call {
                        name,
                        args,
                        position: token.position,
                    });
                }
                match PriceField::from_identifier(&name) {
                    Some(field) => Ok(Expr::SeriesRef(field)),
                    None => Ok(Expr::Identifier {
                        name,
                        position: token.position,
                    }),
                }
            }
            TokenKind::LParen => {
                if self.peek().kind == TokenKind::RParen {
                    let close = self.peek();
                    return Err(Self::syntax_error(
                        close,
                        "empty parentheses: expected expression".to_string(),
                    ));
                }
                self.nested(&token, |p| {
                    let inner = p.parse_or()?;
                    p.expect_close(&token)?;
                    Ok(inner)
                })
            }
            _ => Err(Self::syntax_error(
                &token,
                format!("expected operand, found {}", token.describe()),
            )),
        }
    }

    fn parse_arguments(&mut self, open: &Token) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            if !Self::starts_operand(&self.peek().kind) {
                let found = self.peek();
                return Err(Self::syntax_error(
                    found,
                    format!("expected argument, found {}", found.describe()),
                ));
            }
            args.push(self.parse_or()?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => {
                    let found = self.peek();
                    return Err(Self::syntax_error(
                        found,
                        format!(
                            "expected ',' or ')' to close '(' at position {}, found {}",
                            open.position,
                            found.describe()
                        ),
                    ));
                }
            }
        }
    }

    fn expect_close(&mut self, open: &Token) -> Result<(), FormulaError> {
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(());
        }
        let found = self.peek();
        Err(Self::syntax_error(
            found,
            format!(
                "expected ')' to close '(' at position {}, found {}",
                open.position,
                found.describe()
            ),
        ))
    }

    fn parse(&mut self) -> Result<Expr, FormulaError> {
        if self.peek().kind == TokenKind::Eof {
            return Err(Self::syntax_error(self.peek(), "empty formula".to_string()));
        }
        let expr = self.parse_or()?;
        let next = self.peek();
        if next.kind != TokenKind::Eof {
            let message = match next.kind {
                TokenKind::RParen => "unbalanced ')'".to_string(),
                _ => format!("unexpected {} after expression", next.describe()),
            };
            return Err(Self::syntax_error(next, message));
        }
        Ok(expr)
    }
}

/// Parse formula text into an expression tree.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(input)?;
    // the trailing Eof does not count
    if let Some(extra) = tokens.get(MAX_TOKENS).filter(|t| t.kind != TokenKind::Eof) {
        return Err(Parser::syntax_error(
            extra,
            format!("formula too long (limit {} tokens)", MAX_TOKENS),
        ));
    }
    let mut parser = Parser::new(tokens);
    parser.parse()
}
