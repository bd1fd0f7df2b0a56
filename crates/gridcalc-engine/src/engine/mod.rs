//! Spreadsheet formula engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`CellValue`], [`Grid`], [`ComputedValue`], [`ComputedGrid`] - Raw and computed cell storage
//! - [`CellRef`] - Cell reference encoding (A1 notation ↔ row/col indices)
//! - [`resolve_token`], [`CellRange`] - Range / reference / literal argument resolution
//! - [`Builtin`] - `SUM`, `AVERAGE`, `COUNT`, `MIN`, `MAX`
//! - [`arith`] - Whitelisted arithmetic parser and evaluator
//! - [`CycleGuard`] - Re-entry guard for recursive evaluation
//! - [`DependencyGraph`] - Formula dependency graph and its strongly connected components
//! - [`recompute`] / [`recompute_with`] - Whole-grid recompute
//! - [`format_display`] - Format values for display

pub mod arith;
mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod error;
mod eval;
mod format;
mod functions;
mod range;
mod recompute;

pub use cell::{CellClass, CellValue, ComputedGrid, ComputedValue, Grid};
pub use cell_ref::CellRef;
pub use cycle::{CycleGuard, Refusal};
pub use deps::{Condensation, DependencyGraph, extract_dependencies};
pub use error::{Diagnostic, ErrorKind, FormulaError};
pub use eval::{DEFAULT_MAX_DEPTH, Evaluation, Evaluator, MAX_DEPTH_LIMIT};
pub use format::{format_display, format_number};
pub use functions::{BUILTINS, Builtin, BuiltinInfo, Operands, match_call};
pub use range::{CellRange, Resolved, expand_range, parse_range, resolve_token};
pub use recompute::{
    ErrorPolicy, RecomputeOptions, Recomputed, Strategy, evaluate_formula, recompute,
    recompute_with,
};
