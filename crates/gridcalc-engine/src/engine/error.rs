//! Formula error taxonomy.
//!
//! None of these ever escape a recompute pass. They are recorded as
//! [`Diagnostic`]s and the failing sub-expression reads as `0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cell_ref::CellRef;

/// A non-fatal failure encountered while evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormulaError {
    #[error("malformed reference: {0}")]
    MalformedReference(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("circular reference at {0}")]
    Circular(CellRef),

    #[error("reference {0} is outside the grid")]
    OutOfRange(CellRef),

    #[error("invalid character {0:?} in expression")]
    InvalidCharacter(char),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    Overflow,

    #[error("evaluation depth exceeded at {0}")]
    DepthLimit(CellRef),
}

/// Coarse classification of a [`FormulaError`], used for tagged error values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Reference,
    Circular,
    Value,
    DivisionByZero,
    Number,
    Depth,
}

impl ErrorKind {
    /// Display marker used when errors are surfaced as values.
    pub fn marker(self) -> &'static str {
        match self {
            ErrorKind::Reference => "#REF!",
            ErrorKind::Circular => "#CIRC!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::DivisionByZero => "#DIV/0!",
            ErrorKind::Number => "#NUM!",
            ErrorKind::Depth => "#DEPTH!",
        }
    }
}

impl FormulaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::MalformedReference(_) | FormulaError::OutOfRange(_) => {
                ErrorKind::Reference
            }
            FormulaError::Circular(_) => ErrorKind::Circular,
            FormulaError::InvalidToken(_)
            | FormulaError::InvalidCharacter(_)
            | FormulaError::Syntax(_) => ErrorKind::Value,
            FormulaError::DivisionByZero => ErrorKind::DivisionByZero,
            FormulaError::Overflow => ErrorKind::Number,
            FormulaError::DepthLimit(_) => ErrorKind::Depth,
        }
    }

    /// Whether this failure should turn the owning cell into an error value
    /// under a tagged error policy. Out-of-range reads behave like empty cells.
    pub fn taints_value(&self) -> bool {
        !matches!(self, FormulaError::OutOfRange(_))
    }
}

/// A `(coordinate, error)` pair: `cell` is the formula cell whose evaluation
/// request hit `error`, possibly several references deep.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub cell: CellRef,
    pub error: FormulaError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.cell, self.error)
    }
}
