use std::path::PathBuf;

use gridcalc_engine::engine::{
    CellRef, CellValue, ComputedGrid, Diagnostic, Grid, RecomputeOptions, recompute_with,
};

/// Maximum number of undo entries to keep
pub(crate) const MAX_UNDO_STACK: usize = 100;

/// Sheet limits for edits. Writes past them are refused before the grid grows.
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;

/// Represents an undoable edit of a single cell
#[derive(Clone, Debug, PartialEq)]
pub struct UndoAction {
    pub cell_ref: CellRef,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

/// UI-agnostic document state for the spreadsheet.
///
/// Holds the raw grid together with the values of the last recompute pass.
/// Computed values are derived state: they are replaced on every write and
/// never saved.
#[derive(Debug)]
pub struct Document {
    pub(crate) grid: Grid,
    pub(crate) computed: ComputedGrid,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) options: RecomputeOptions,
    /// Current file path
    pub file_path: Option<PathBuf>,
    /// Whether the grid has been modified since the last load or save
    pub modified: bool,
    pub(crate) undo_stack: Vec<UndoAction>,
    pub(crate) redo_stack: Vec<UndoAction>,
}

impl Document {
    /// Create an empty document.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::from_grid(Grid::new())
    }

    pub fn from_grid(grid: Grid) -> Self {
        Self::with_options(grid, RecomputeOptions::default())
    }

    pub fn with_options(grid: Grid, options: RecomputeOptions) -> Self {
        let mut doc = Document {
            grid,
            computed: ComputedGrid::default(),
            diagnostics: Vec::new(),
            options,
            file_path: None,
            modified: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        };
        doc.recalculate();
        doc
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn options(&self) -> &RecomputeOptions {
        &self.options
    }

    /// Change evaluation options and recompute.
    pub fn set_options(&mut self, options: RecomputeOptions) {
        self.options = options;
        self.recalculate();
    }

    /// Replace the grid wholesale, dropping history.
    pub(crate) fn replace_grid(&mut self, grid: Grid) {
        self.grid = grid;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.recalculate();
    }

    /// Recompute every cell from the raw grid.
    pub(crate) fn recalculate(&mut self) {
        let result = recompute_with(&self.grid, &self.options);
        self.computed = result.values;
        self.diagnostics = result.diagnostics;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
