use gridcalc_engine::engine::{
    CellRef, CellValue, ComputedGrid, ComputedValue, DependencyGraph, Diagnostic, FormulaError,
    evaluate_formula, format_display,
};

use super::Document;
use super::state::{MAX_COLS, MAX_ROWS, MAX_UNDO_STACK, UndoAction};
use crate::error::{GridcalcError, Result};

impl Document {
    fn push_undo(&mut self, cell_ref: CellRef, old_value: CellValue, new_value: CellValue) {
        self.undo_stack.push(UndoAction {
            cell_ref,
            old_value,
            new_value,
        });
        if self.undo_stack.len() > MAX_UNDO_STACK {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Store `value` without touching history. Empty values never grow the grid.
    fn write_cell(&mut self, cell_ref: CellRef, value: CellValue) {
        match value {
            CellValue::Empty => {
                self.grid.clear(cell_ref);
            }
            value => self.grid.set(cell_ref, value),
        }
        self.modified = true;
        self.recalculate();
    }

    /// Set a cell's raw value and recompute the grid.
    ///
    /// Writing the value a cell already holds records no history.
    pub fn set_cell(&mut self, cell_ref: CellRef, value: CellValue) -> Result<()> {
        if cell_ref.row >= MAX_ROWS || cell_ref.col >= MAX_COLS {
            return Err(GridcalcError::CellOutOfBounds {
                cell: cell_ref.to_string(),
                max_rows: MAX_ROWS,
                max_cols: MAX_COLS,
            });
        }
        let old_value = self.grid.get(cell_ref).cloned().unwrap_or_default();
        if old_value == value {
            return Ok(());
        }
        self.push_undo(cell_ref, old_value, value.clone());
        self.write_cell(cell_ref, value);
        Ok(())
    }

    /// Set a cell from user input: `=` starts a formula, numbers become numbers,
    /// blank input clears the cell.
    pub fn set_cell_from_input(&mut self, cell_ref: CellRef, input: &str) -> Result<()> {
        self.set_cell(cell_ref, CellValue::from_input(input))
    }

    /// Apply an assignment of the form `REF=INPUT`, e.g. `C3==A1*2` or `B2=17`.
    /// Returns the cell that was written.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<CellRef> {
        let (name, input) = assignment
            .split_once('=')
            .ok_or_else(|| GridcalcError::InvalidCellRef(assignment.to_string()))?;
        let cell_ref = CellRef::decode(name.trim())
            .ok_or_else(|| GridcalcError::InvalidCellRef(name.trim().to_string()))?;
        self.set_cell_from_input(cell_ref, input)?;
        Ok(cell_ref)
    }

    pub fn clear_cell(&mut self, cell_ref: CellRef) {
        let old_value = match self.grid.get(cell_ref) {
            None | Some(CellValue::Empty) => return,
            Some(value) => value.clone(),
        };
        self.push_undo(cell_ref, old_value, CellValue::Empty);
        self.write_cell(cell_ref, CellValue::Empty);
    }

    /// Computed value of a cell. Cells outside the grid are empty.
    pub fn computed(&self, cell_ref: CellRef) -> ComputedValue {
        self.computed.get(cell_ref).cloned().unwrap_or_default()
    }

    /// Display string of a cell's computed value.
    pub fn display(&self, cell_ref: CellRef) -> String {
        format_display(&self.computed(cell_ref))
    }

    /// Display strings for the whole grid, keeping its jagged shape.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.computed
            .rows()
            .iter()
            .map(|row| row.iter().map(format_display).collect())
            .collect()
    }

    pub fn computed_grid(&self) -> &ComputedGrid {
        &self.computed
    }

    /// Diagnostics of the last recompute pass.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Evaluate formula text against the current grid without storing it.
    pub fn evaluate(&self, input: &str) -> (ComputedValue, Vec<FormulaError>) {
        evaluate_formula(&self.grid, input, &self.options)
    }

    /// A reference cycle through `cell_ref`, as a path that starts and ends
    /// at `cell_ref`.
    pub fn cycle_through(&self, cell_ref: CellRef) -> Option<Vec<CellRef>> {
        DependencyGraph::build(&self.grid).find_cycle(cell_ref)
    }

    pub fn undo(&mut self) -> Result<CellRef> {
        let action = self.undo_stack.pop().ok_or(GridcalcError::NothingToUndo)?;
        let cell_ref = action.cell_ref;
        self.write_cell(cell_ref, action.old_value.clone());
        self.redo_stack.push(action);
        Ok(cell_ref)
    }

    pub fn redo(&mut self) -> Result<CellRef> {
        let action = self.redo_stack.pop().ok_or(GridcalcError::NothingToRedo)?;
        let cell_ref = action.cell_ref;
        self.write_cell(cell_ref, action.new_value.clone());
        self.undo_stack.push(action);
        Ok(cell_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::document::{MAX_COLS, MAX_ROWS};
    use crate::error::GridcalcError;
    use gridcalc_engine::engine::{
        CellRef, CellValue, ComputedValue, ErrorKind, ErrorPolicy, FormulaError, RecomputeOptions,
    };

    fn cell(name: &str) -> CellRef {
        CellRef::decode(name).unwrap()
    }

    #[test]
    fn test_every_write_recomputes() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "2").unwrap();
        core.set_cell_from_input(cell("B1"), "=A1*10").unwrap();
        assert_eq!(core.display(cell("B1")), "20");

        core.set_cell_from_input(cell("A1"), "3.5").unwrap();
        assert_eq!(core.computed(cell("B1")), ComputedValue::Number(35.0));
        assert!(core.modified);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut core = Document::new();
        core.set_cell(cell("C3"), CellValue::Number(1.0)).unwrap();
        assert_eq!(core.grid().row_count(), 3);
        assert_eq!(core.grid().rows()[2].len(), 3);
        assert_eq!(core.computed(cell("A1")), ComputedValue::Empty);
        assert_eq!(core.computed(cell("Z99")), ComputedValue::Empty);
    }

    #[test]
    fn test_clear_cell() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "5").unwrap();
        core.set_cell_from_input(cell("A2"), "=A1+1").unwrap();
        core.clear_cell(cell("A1"));
        assert_eq!(core.display(cell("A2")), "1");

        // Clearing outside the grid is a no-op and records no history.
        let before = core.undo_stack.len();
        core.clear_cell(cell("H8"));
        assert_eq!(core.undo_stack.len(), before);
        assert_eq!(core.grid().row_count(), 2);
    }

    #[test]
    fn test_apply_assignment() {
        let mut core = Document::new();
        assert_eq!(core.apply_assignment("B2=17").unwrap(), cell("B2"));
        assert_eq!(core.apply_assignment("C1==B2*2").unwrap(), cell("C1"));
        assert_eq!(core.display(cell("C1")), "34");

        assert!(matches!(
            core.apply_assignment("b2=1"),
            Err(GridcalcError::InvalidCellRef(_))
        ));
        assert!(matches!(
            core.apply_assignment("no equals sign"),
            Err(GridcalcError::InvalidCellRef(_))
        ));
    }

    #[test]
    fn test_undo_redo_restores_values() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "1").unwrap();
        core.set_cell_from_input(cell("B1"), "=A1+1").unwrap();
        core.set_cell_from_input(cell("A1"), "10").unwrap();
        assert_eq!(core.display(cell("B1")), "11");

        core.undo().unwrap();
        assert_eq!(core.display(cell("B1")), "2");
        core.redo().unwrap();
        assert_eq!(core.display(cell("B1")), "11");

        core.undo().unwrap();
        core.undo().unwrap();
        core.undo().unwrap();
        assert_eq!(core.computed(cell("A1")), ComputedValue::Empty);
        assert!(matches!(core.undo(), Err(GridcalcError::NothingToUndo)));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "1").unwrap();
        core.undo().unwrap();
        core.set_cell_from_input(cell("A1"), "2").unwrap();
        assert!(matches!(core.redo(), Err(GridcalcError::NothingToRedo)));
    }

    #[test]
    fn test_diagnostics_and_cycle_path() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "=B1+1").unwrap();
        core.set_cell_from_input(cell("B1"), "=A1+1").unwrap();

        assert_eq!(core.display(cell("A1")), "1");
        assert_eq!(core.display(cell("B1")), "1");
        assert!(
            core.diagnostics()
                .iter()
                .any(|d| d.error == FormulaError::Circular(cell("A1")))
        );

        let path = core.cycle_through(cell("A1")).unwrap();
        assert_eq!(path, vec![cell("A1"), cell("B1"), cell("A1")]);
    }

    #[test]
    fn test_set_options_recomputes() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "=1/0").unwrap();
        assert_eq!(core.display(cell("A1")), "0");

        core.set_options(RecomputeOptions {
            errors: ErrorPolicy::Tagged,
            ..RecomputeOptions::default()
        });
        assert_eq!(
            core.computed(cell("A1")),
            ComputedValue::Error(ErrorKind::DivisionByZero)
        );
        assert_eq!(core.display(cell("A1")), "#DIV/0!");
    }

    #[test]
    fn test_unchanged_write_records_no_history() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "=1+1").unwrap();
        core.set_cell_from_input(cell("A1"), "=1+1").unwrap();
        assert_eq!(core.undo_stack.len(), 1);

        // Blank input over an empty cell is not an edit either.
        core.set_cell_from_input(cell("C5"), "").unwrap();
        assert_eq!(core.undo_stack.len(), 1);
        assert_eq!(core.grid().row_count(), 1);

        core.undo().unwrap();
        assert_eq!(core.redo_stack.len(), 1);
        core.set_cell(cell("A1"), CellValue::Empty).unwrap();
        assert_eq!(core.redo_stack.len(), 1);
    }

    #[test]
    fn test_writes_past_sheet_limits_are_refused() {
        let mut core = Document::new();
        let far = CellRef::new(99_999_999_998, 0);
        assert!(matches!(
            core.set_cell_from_input(far, "1"),
            Err(GridcalcError::CellOutOfBounds { .. })
        ));
        assert!(matches!(
            core.apply_assignment("A99999999999=1"),
            Err(GridcalcError::CellOutOfBounds { .. })
        ));
        assert!(core.set_cell(CellRef::new(0, MAX_COLS), CellValue::Number(1.0)).is_err());
        assert!(core.set_cell(CellRef::new(MAX_ROWS, 0), CellValue::Number(1.0)).is_err());
        assert_eq!(core.grid().row_count(), 0);
        assert!(core.undo_stack.is_empty());
        assert!(!core.modified);

        core.set_cell(CellRef::new(0, MAX_COLS - 1), CellValue::Number(1.0))
            .unwrap();
        assert_eq!(core.grid().rows()[0].len(), MAX_COLS);
    }

    #[test]
    fn test_evaluate_does_not_store() {
        let mut core = Document::new();
        core.set_cell_from_input(cell("A1"), "4").unwrap();
        let (value, errors) = core.evaluate("=SUM(A1, 6)");
        assert_eq!(value, ComputedValue::Number(10.0));
        assert!(errors.is_empty());
        assert_eq!(core.grid().row_count(), 1);
        assert_eq!(core.grid().rows()[0].len(), 1);
    }
}
