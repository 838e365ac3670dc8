//! Formula tokenizer.
//!
//! Splits formula text into tokens tagged with their zero-based character
//! position. Keywords `AND`, `OR` and `NOT` are recognised only as whole words
//! (case-insensitive), so `ORDER` or `NOTE` stay identifiers.

use crate::domain::error::FormulaError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Gt,
    Ge,
    Lt,
    Le,
    EqEq,
    Ne,
    And,
    Or,
    Not,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, empty for `Eof`.
    pub text: String,
    pub position: usize,
}

impl Token {
    /// How the token is named in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(v) => write!(f, "{}", v),
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Le => write!(f, "<="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Ne => write!(f, "!="),
            TokenKind::And => write!(f, "AND"),
            TokenKind::Or => write!(f, "OR"),
            TokenKind::Not => write!(f, "NOT"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    /// Byte offset into `input`.
    pos: usize,
    /// Character offset, reported in tokens and errors.
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            column: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        self.column += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize, start_column: usize) -> Token {
        Token {
            kind,
            text: self.input[start..self.pos].to_string(),
            position: start_column,
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, FormulaError> {
        let start = self.pos;
        let start_column = self.column;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        if digits == 0 {
            return Err(FormulaError::Syntax {
                message: format!("invalid number '{}'", text),
                token: text.to_string(),
                position: start_column,
            });
        }

        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| FormulaError::Syntax {
                message: format!("invalid number '{}'", text),
                token: text.to_string(),
                position: start_column,
            })
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let word = self.input[start..self.pos].to_ascii_uppercase();
        match word.as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            _ => TokenKind::Ident(word),
        }
    }

    /// Consume `second` if it follows the current character.
    fn two_char(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        self.advance();
        if self.peek() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    fn next_token(&mut self) -> Result<Token, FormulaError> {
        self.skip_whitespace();
        let start = self.pos;
        let start_column = self.column;

        let Some(ch) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, start, start_column));
        };

        let kind = match ch {
            '0'..='9' => self.lex_number()?,
            '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.lex_number()?,
            c if c.is_alphabetic() || c == '_' => self.lex_word(),
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '*' => {
                self.advance();
                TokenKind::Star
            }
            '/' => {
                self.advance();
                TokenKind::Slash
            }
            '>' => self.two_char('=', TokenKind::Ge, TokenKind::Gt),
            '<' => self.two_char('=', TokenKind::Le, TokenKind::Lt),
            // `=` alone is the legacy spelling of equality
            '=' => self.two_char('=', TokenKind::EqEq, TokenKind::EqEq),
            '!' => self.two_char('=', TokenKind::Ne, TokenKind::Not),
            '&' if self.peek_second() == Some('&') => {
                self.advance();
                self.advance();
                TokenKind::And
            }
            '|' if self.peek_second() == Some('|') => {
                self.advance();
                self.advance();
                TokenKind::Or
            }
            other => {
                return Err(FormulaError::Syntax {
                    message: format!("unexpected character '{}'", other),
                    token: other.to_string(),
                    position: start_column,
                });
            }
        };

        Ok(self.token(kind, start, start_column))
    }
}

/// Tokenize a whole formula. The returned vector always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
