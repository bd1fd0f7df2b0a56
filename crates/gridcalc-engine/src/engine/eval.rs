//! Formula evaluation against a grid snapshot.
//!
//! Dispatch order for a formula body:
//! 1. whole-formula built-in call (`SUM(A1:A3, 4)`), see [`match_call`]
//! 2. otherwise arithmetic: substitute references, then parse and evaluate
//!
//! Referenced formula cells are evaluated recursively under a [`CycleGuard`].
//! When a formula reads a cell that is already on the evaluation path, that
//! formula stops and yields the cycle sentinel `0`; the formulas further up
//! the path carry on with that `0` as an operand.

use std::collections::HashMap;

use super::arith;
use super::cell::{CellClass, Grid};
use super::cell_ref::CellRef;
use super::cycle::{CycleGuard, Refusal};
use super::error::FormulaError;
use super::functions::{Builtin, Operands, match_call};
use super::range::{Resolved, resolve_token};

/// Default bound on nested cell evaluations per request.
///
/// Recompute evaluates acyclic cells in dependency order, so nesting only
/// grows inside a reference cycle.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Largest accepted nesting bound. Each level costs several native stack
/// frames, and this stays inside a 2 MiB thread stack in debug builds.
pub const MAX_DEPTH_LIMIT: usize = 128;

/// Marker that a read re-entered a cell on the active evaluation path.
struct Reentered;

#[derive(Debug, Clone)]
struct Memo {
    value: f64,
    errors: Vec<FormulaError>,
}

/// The value of one evaluation request and every error hit along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub errors: Vec<FormulaError>,
}

/// Evaluates formulas against one grid snapshot.
pub struct Evaluator<'g> {
    grid: &'g Grid,
    max_depth: usize,
    memo: HashMap<CellRef, Memo>,
    errors: Vec<FormulaError>,
}

impl<'g> Evaluator<'g> {
    /// `max_depth` is clamped to [`MAX_DEPTH_LIMIT`].
    pub fn new(grid: &'g Grid, max_depth: usize) -> Evaluator<'g> {
        Evaluator {
            grid,
            max_depth: max_depth.min(MAX_DEPTH_LIMIT),
            memo: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Numeric value of `cell` as a top-level request with a fresh guard.
    pub fn evaluate_cell(&mut self, cell: CellRef) -> Evaluation {
        let mut guard = CycleGuard::new(self.max_depth);
        let value = self.read_cell(cell, &mut guard).unwrap_or(0.0);
        self.finish(value)
    }

    /// Evaluate free-standing formula text (with or without the leading `=`)
    /// that does not live in any cell.
    pub fn evaluate_formula(&mut self, formula: &str) -> Evaluation {
        let body = formula.strip_prefix('=').unwrap_or(formula);
        let mut guard = CycleGuard::new(self.max_depth);
        let value = self.formula_value(body, &mut guard);
        self.finish(value)
    }

    /// Record the result of `cell` so later reads skip re-evaluation.
    ///
    /// Only sound for cells whose references are acyclic: their value does
    /// not depend on which cells are already on the evaluation path.
    pub fn memoize(&mut self, cell: CellRef, evaluation: &Evaluation) {
        self.memo.insert(
            cell,
            Memo {
                value: evaluation.value,
                errors: evaluation.errors.clone(),
            },
        );
    }

    fn finish(&mut self, value: f64) -> Evaluation {
        Evaluation {
            value,
            errors: std::mem::take(&mut self.errors),
        }
    }

    /// Numeric reading of a coordinate. Out-of-grid, empty and text cells
    /// read as `0`; formula cells are evaluated.
    fn read_cell(&mut self, cell: CellRef, guard: &mut CycleGuard) -> Result<f64, Reentered> {
        if let Some(memo) = self.memo.get(&cell) {
            self.errors.extend(memo.errors.iter().cloned());
            return Ok(memo.value);
        }

        let grid = self.grid;
        let Some(value) = grid.get(cell) else {
            log::trace!("{} is outside the grid, reading 0", cell);
            self.errors.push(FormulaError::OutOfRange(cell));
            return Ok(0.0);
        };

        match value.classify() {
            CellClass::Empty | CellClass::Text(_) => Ok(0.0),
            CellClass::Numeric(n) => Ok(n),
            CellClass::Formula(body) => match guard.enter(cell) {
                Ok(()) => {
                    let result = self.formula_value(body, guard);
                    guard.leave(cell);
                    Ok(result)
                }
                Err(Refusal::Reentry) => {
                    log::trace!("circular reference through {}", cell);
                    self.errors.push(FormulaError::Circular(cell));
                    Err(Reentered)
                }
                Err(Refusal::TooDeep) => {
                    log::trace!("evaluation depth {} exceeded at {}", guard.depth(), cell);
                    self.errors.push(FormulaError::DepthLimit(cell));
                    Ok(0.0)
                }
            },
        }
    }

    /// Value of a formula body. A re-entrant read anywhere in it makes the
    /// whole formula `0`, as does a non-finite result.
    fn formula_value(&mut self, body: &str, guard: &mut CycleGuard) -> f64 {
        let result = match match_call(body) {
            Some((builtin, args)) => self.function_value(builtin, &args, guard),
            None => self.arithmetic_value(body, guard),
        };
        match result {
            Ok(value) if value.is_finite() => value,
            Ok(_) => {
                self.errors.push(FormulaError::Overflow);
                0.0
            }
            Err(Reentered) => 0.0,
        }
    }

    fn function_value(
        &mut self,
        builtin: Builtin,
        args: &[&str],
        guard: &mut CycleGuard,
    ) -> Result<f64, Reentered> {
        let mut operands = Operands::default();
        for arg in args {
            match resolve_token(arg) {
                Ok(Resolved::Literal(n)) => operands.push(n),
                Ok(Resolved::Cell(cell)) => operands.push(self.read_cell(cell, guard)?),
                Ok(Resolved::Range(range)) => {
                    let grid = self.grid;
                    let mut inside: u128 = 0;
                    for cell in range.cells_within(grid) {
                        operands.push(self.read_cell(cell, guard)?);
                        inside += 1;
                    }
                    if let Some(cell) = range.first_outside(grid) {
                        log::trace!("{} extends past the grid at {}", range, cell);
                        self.errors.push(FormulaError::OutOfRange(cell));
                        operands.push_zeros(range.cell_count() - inside);
                    }
                }
                Err(err) => {
                    log::trace!("{}: argument {:?} reads as 0: {}", builtin.name(), arg, err);
                    self.errors.push(err);
                    operands.push(0.0);
                }
            }
        }
        Ok(operands.finish(builtin))
    }

    fn arithmetic_value(&mut self, body: &str, guard: &mut CycleGuard) -> Result<f64, Reentered> {
        let mut reentered = false;
        let substituted = arith::substitute_references(body, |token| {
            if reentered {
                return 0.0;
            }
            match CellRef::decode(token) {
                Some(cell) => self.read_cell(cell, guard).unwrap_or_else(|Reentered| {
                    reentered = true;
                    0.0
                }),
                None => {
                    self.errors
                        .push(FormulaError::MalformedReference(token.to_string()));
                    0.0
                }
            }
        });
        if reentered {
            return Err(Reentered);
        }
        Ok(arith::evaluate(&substituted, &mut self.errors))
    }
}
