//! Arithmetic expressions over numbers, `+ - * /` and parentheses.
//!
//! PIPELINE: formula body --> reference substitution --> Lexer (whitelist)
//! --> Parser --> Expr --> value
//!
//! GRAMMAR:
//!   expression     --> additive
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("+" | "-") unary | primary
//!   primary        --> NUMBER | "(" expression ")"
//!
//! Input is checked against a character whitelist (digits, whitespace, `.`,
//! the four operators and parentheses) before lexing. Any other character
//! fails the whole expression, so text that survives substitution
//! (identifiers, quotes, `;`) is never evaluated.

use regex::{Captures, Regex};
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

use super::error::FormulaError;

const MAX_NESTING: usize = 256;

/// Reference-shaped tokens inside an arithmetic expression.
fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]+[0-9]+\b").expect("reference regex must compile"))
}

/// Reference-shaped tokens in order of appearance.
pub(crate) fn reference_tokens(expr: &str) -> impl Iterator<Item = &str> {
    reference_re().find_iter(expr).map(|m| m.as_str())
}

/// Replace every reference-shaped token with the number `resolve` returns for it.
///
/// Negative values are parenthesized so `2-A1` with `A1 = -5` becomes `2-(-5)`.
pub fn substitute_references<F>(expr: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> f64,
{
    reference_re()
        .replace_all(expr, |caps: &Captures| number_literal(resolve(&caps[0])))
        .into_owned()
}

fn number_literal(n: f64) -> String {
    if n < 0.0 {
        format!("({})", n)
    } else {
        // `Display` for f64 never uses exponent notation.
        n.to_string()
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token, FormulaError> {
        while self.input.next_if(|ch| ch.is_whitespace()).is_some() {}

        match self.input.next() {
            Some('+') => Ok(Token::Plus),
            Some('-') => Ok(Token::Minus),
            Some('*') => Ok(Token::Star),
            Some('/') => Ok(Token::Slash),
            Some('(') => Ok(Token::LParen),
            Some(')') => Ok(Token::RParen),
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),
            Some(ch) => Err(FormulaError::InvalidCharacter(ch)),
            None => Ok(Token::Eof),
        }
    }

    fn read_number(&mut self, first: char) -> Result<Token, FormulaError> {
        let mut text = String::from(first);
        while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_digit() || *ch == '.') {
            text.push(ch);
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Syntax(format!("invalid number literal {:?}", text)))
    }
}

/// Parsed arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Negate(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, FormulaError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), FormulaError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn parse(mut self) -> Result<Expr, FormulaError> {
        if self.current == Token::Eof {
            return Err(FormulaError::Syntax("empty expression".into()));
        }
        let expr = self.parse_additive()?;
        if self.current != Token::Eof {
            return Err(FormulaError::Syntax(format!(
                "unexpected token after expression: {:?}",
                self.current
            )));
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        match self.current {
            Token::Plus | Token::Minus => {
                let negate = self.current == Token::Minus;
                self.enter()?;
                self.advance()?;
                let operand = self.parse_unary()?;
                self.depth -= 1;
                Ok(if negate {
                    Expr::Negate(Box::new(operand))
                } else {
                    operand
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        match self.current {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::LParen => {
                self.enter()?;
                self.advance()?;
                let inner = self.parse_additive()?;
                if self.current != Token::RParen {
                    return Err(FormulaError::Syntax(format!(
                        "expected ')', found {:?}",
                        self.current
                    )));
                }
                self.advance()?;
                self.depth -= 1;
                Ok(inner)
            }
            other => Err(FormulaError::Syntax(format!("unexpected token {:?}", other))),
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(FormulaError::Syntax("expression nested too deeply".into()));
        }
        Ok(())
    }
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_digit() || ch.is_whitespace() || "+-*/.()".contains(ch)
}

/// Parse a substituted expression. Fails on any character outside the whitelist.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    if let Some(ch) = input.chars().find(|ch| !is_allowed(*ch)) {
        return Err(FormulaError::InvalidCharacter(ch));
    }
    Parser::new(input)?.parse()
}

impl Expr {
    /// Evaluate with standard precedence. Division by zero yields `0` and
    /// records [`FormulaError::DivisionByZero`].
    pub fn eval(&self, errors: &mut Vec<FormulaError>) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Negate(inner) => -inner.eval(errors),
            Expr::Binary { left, op, right } => {
                let l = left.eval(errors);
                let r = right.eval(errors);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Subtract => l - r,
                    BinaryOp::Multiply => l * r,
                    BinaryOp::Divide if r == 0.0 => {
                        errors.push(FormulaError::DivisionByZero);
                        0.0
                    }
                    BinaryOp::Divide => l / r,
                }
            }
        }
    }
}

/// Parse and evaluate an already-substituted expression. Any failure reads as `0`.
pub fn evaluate(input: &str, errors: &mut Vec<FormulaError>) -> f64 {
    match parse(input) {
        Ok(expr) => expr.eval(errors),
        Err(err) => {
            log::trace!("arithmetic rejected {:?}: {}", input, err);
            errors.push(err);
            0.0
        }
    }
}
