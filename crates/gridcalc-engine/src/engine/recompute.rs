//! Whole-grid recompute.
//!
//! [`recompute`] is a pure function of the raw grid: no cache survives
//! between calls, and every failure resolves to a fallback value instead of
//! aborting the pass.
//!
//! Formula cells are evaluated one strongly connected component at a time,
//! after every component they read, and each finished component is memoized
//! for the rest of the pass. Acyclic chains therefore never nest; only the
//! members of a reference cycle are evaluated recursively under a
//! [`CycleGuard`](super::CycleGuard).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::cell::{CellValue, ComputedGrid, ComputedValue, Grid};
use super::cell_ref::CellRef;
use super::deps::{Condensation, DependencyGraph};
use super::error::{Diagnostic, FormulaError};
use super::eval::{DEFAULT_MAX_DEPTH, Evaluation, Evaluator};

/// Order in which components are scheduled within one pass. Both orders
/// produce identical results.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Formula cells are visited row-major; each one first pulls in the
    /// components it depends on, depth-first, on an explicit work stack.
    #[default]
    Recursive,
    /// Every component is evaluated up front in one topological sweep.
    Memoized,
}

/// What a formula cell shows when its evaluation hit an error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// The computed fallback number (usually `0`).
    #[default]
    Zero,
    /// A [`ComputedValue::Error`] naming the first value-tainting error.
    Tagged,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecomputeOptions {
    pub strategy: Strategy,
    pub errors: ErrorPolicy,
    /// Nesting bound inside reference cycles, clamped to
    /// [`MAX_DEPTH_LIMIT`](super::MAX_DEPTH_LIMIT).
    pub max_depth: usize,
}

impl Default for RecomputeOptions {
    fn default() -> Self {
        RecomputeOptions {
            strategy: Strategy::default(),
            errors: ErrorPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of one recompute pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recomputed {
    pub values: ComputedGrid,
    /// Row-major by formula cell; duplicates within a cell are dropped.
    pub diagnostics: Vec<Diagnostic>,
}

/// Evaluation state of one pass over a grid snapshot.
struct Pass<'g> {
    evaluator: Evaluator<'g>,
    condensed: Condensation,
    done: Vec<bool>,
    results: Vec<(CellRef, Evaluation)>,
}

impl<'g> Pass<'g> {
    fn new(grid: &'g Grid, max_depth: usize) -> Pass<'g> {
        let condensed = DependencyGraph::build(grid).condense();
        Pass {
            evaluator: Evaluator::new(grid, max_depth),
            done: vec![false; condensed.components.len()],
            condensed,
            results: Vec::new(),
        }
    }

    fn run(&mut self, grid: &Grid, strategy: Strategy) {
        match strategy {
            Strategy::Recursive => {
                for (cell, value) in grid.iter() {
                    if !value.is_formula() {
                        continue;
                    }
                    if let Some(component) = self.condensed.component_of(cell) {
                        self.resolve(component);
                    }
                }
            }
            Strategy::Memoized => {
                for component in 0..self.condensed.components.len() {
                    self.evaluate_component(component);
                }
            }
        }
    }

    /// Evaluate `root` after everything it reads.
    fn resolve(&mut self, root: usize) {
        let mut work = vec![(root, false)];
        while let Some((component, ready)) = work.pop() {
            if self.done[component] {
                continue;
            }
            if ready {
                self.evaluate_component(component);
                continue;
            }
            work.push((component, true));
            work.extend(
                self.condensed
                    .dependencies(component)
                    .filter(|&dep| !self.done[dep])
                    .map(|dep| (dep, false)),
            );
        }
    }

    /// Evaluate each member from a fresh guard, then memoize the lot. Members
    /// of one cycle must not see each other's memo: their values depend on
    /// where the cycle was entered.
    fn evaluate_component(&mut self, component: usize) {
        let evaluations: Vec<(CellRef, Evaluation)> = self.condensed.components[component]
            .iter()
            .map(|&cell| (cell, self.evaluator.evaluate_cell(cell)))
            .collect();
        for (cell, evaluation) in &evaluations {
            self.evaluator.memoize(*cell, evaluation);
        }
        self.results.extend(evaluations);
        self.done[component] = true;
    }
}

/// Recompute every cell with default options.
pub fn recompute(grid: &Grid) -> ComputedGrid {
    recompute_with(grid, &RecomputeOptions::default()).values
}

/// Recompute every cell and collect diagnostics.
pub fn recompute_with(grid: &Grid, options: &RecomputeOptions) -> Recomputed {
    let mut pass = Pass::new(grid, options.max_depth);
    pass.run(grid, options.strategy);
    let mut results = pass.results;
    results.sort_by_key(|(cell, _)| *cell);

    let mut values: Vec<Vec<ComputedValue>> = grid
        .rows()
        .iter()
        .map(|row| row.iter().map(ComputedValue::from_literal).collect())
        .collect();
    let mut diagnostics = Vec::new();

    for (cell, evaluation) in results {
        values[cell.row][cell.col] = to_computed(&evaluation, options.errors);
        let mut seen: HashSet<&FormulaError> = HashSet::new();
        for error in &evaluation.errors {
            if seen.insert(error) {
                diagnostics.push(Diagnostic {
                    cell,
                    error: error.clone(),
                });
            }
        }
    }

    log::debug!(
        "recomputed {} rows, {} components ({:?}, {} diagnostics)",
        grid.row_count(),
        pass.condensed.components.len(),
        options.strategy,
        diagnostics.len()
    );

    Recomputed {
        values: ComputedGrid::from_rows(values),
        diagnostics,
    }
}

/// Evaluate formula text that is not stored in the grid, e.g. from a
/// formula bar preview. A non-formula string is returned as its literal value.
/// The grid is recomputed first so references read settled values.
pub fn evaluate_formula(
    grid: &Grid,
    input: &str,
    options: &RecomputeOptions,
) -> (ComputedValue, Vec<FormulaError>) {
    match CellValue::from_input(input) {
        CellValue::Formula(body) => {
            let mut pass = Pass::new(grid, options.max_depth);
            pass.run(grid, Strategy::Memoized);
            let evaluation = pass.evaluator.evaluate_formula(&body);
            let value = to_computed(&evaluation, options.errors);
            (value, evaluation.errors)
        }
        literal => (ComputedValue::from_literal(&literal), Vec::new()),
    }
}

fn to_computed(evaluation: &Evaluation, policy: ErrorPolicy) -> ComputedValue {
    if policy == ErrorPolicy::Tagged {
        if let Some(error) = evaluation.errors.iter().find(|e| e.taints_value()) {
            return ComputedValue::Error(error.kind());
        }
    }
    ComputedValue::Number(evaluation.value)
}
