//! Cell data structures for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellValue`] - The raw, persisted content of a cell (empty, number, text, or formula)
//! - [`CellClass`] - How a raw value reads when the evaluator looks at it
//! - [`Grid`] - Jagged row-major storage that grows on write
//! - [`ComputedValue`] / [`ComputedGrid`] - Derived values produced by a recompute pass
//!
//! Raw and computed values are deliberately separate types: nothing in this
//! crate writes a computed value back into a [`Grid`].

use serde::{Deserialize, Serialize, Serializer};

use super::cell_ref::CellRef;
use super::error::ErrorKind;

/// The raw content stored in a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<WireCell>", into = "Option<WireCell>")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// Formula body, stored without the leading `=`.
    Formula(String),
}

/// JSON shape of a cell: `null`, a number, or a string.
#[doc(hidden)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCell {
    Number(f64),
    Text(String),
}

impl From<Option<WireCell>> for CellValue {
    fn from(wire: Option<WireCell>) -> Self {
        match wire {
            None => CellValue::Empty,
            Some(WireCell::Number(n)) => CellValue::Number(n),
            Some(WireCell::Text(s)) => CellValue::from_raw_text(s),
        }
    }
}

impl From<CellValue> for Option<WireCell> {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(WireCell::Number(n)),
            CellValue::Text(s) => Some(WireCell::Text(s)),
            CellValue::Formula(f) => Some(WireCell::Text(format!("={}", f))),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_raw_text(s.to_string())
    }
}

/// Classification of a raw value as seen by the evaluator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellClass<'a> {
    Empty,
    /// Formula body without the leading `=`.
    Formula(&'a str),
    Numeric(f64),
    Text(&'a str),
}

impl CellValue {
    /// Interpret a stored string: a leading `=` makes it a formula, anything
    /// else is literal text.
    pub fn from_raw_text(s: String) -> CellValue {
        match s.strip_prefix('=') {
            Some(body) => CellValue::Formula(body.to_string()),
            None => CellValue::Text(s),
        }
    }

    /// Parse user input and create the appropriate cell value.
    /// - Empty string or whitespace -> Empty
    /// - Starts with '=' -> Formula (without the '=')
    /// - Quoted string -> Text (without quotes)
    /// - Valid number -> Number
    /// - Otherwise -> Text
    pub fn from_input(input: &str) -> CellValue {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Some(formula) = trimmed.strip_prefix('=') {
            return CellValue::Formula(formula.to_string());
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            return CellValue::Text(trimmed[1..trimmed.len() - 1].to_string());
        }

        if let Some(n) = parse_finite(trimmed) {
            return CellValue::Number(n);
        }

        CellValue::Text(trimmed.to_string())
    }

    /// Get the editable form of the cell content.
    pub fn to_input_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Formula(f) => format!("={}", f),
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    /// Text that parses as a finite number reads as `Numeric`.
    pub fn classify(&self) -> CellClass<'_> {
        match self {
            CellValue::Empty => CellClass::Empty,
            CellValue::Formula(f) => CellClass::Formula(f),
            CellValue::Number(n) => CellClass::Numeric(*n),
            CellValue::Text(s) => match parse_finite(s.trim()) {
                Some(n) => CellClass::Numeric(n),
                None => CellClass::Text(s),
            },
        }
    }
}

/// Parse a finite decimal number. `inf`/`NaN` spellings are rejected.
pub(crate) fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Row-major, possibly jagged grid of raw cell values.
///
/// Writing beyond the current bounds pads with [`CellValue::Empty`]; the grid
/// never shrinks implicitly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new() -> Grid {
        Grid::default()
    }

    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Grid {
        Grid { rows }
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Bounds-checked read. `None` means the coordinate is outside the grid.
    pub fn get(&self, cell: CellRef) -> Option<&CellValue> {
        self.rows.get(cell.row)?.get(cell.col)
    }

    /// Classify the value at `cell`; out-of-grid coordinates read as empty.
    pub fn classify(&self, cell: CellRef) -> CellClass<'_> {
        self.get(cell).map_or(CellClass::Empty, CellValue::classify)
    }

    /// Write a value, growing the grid as needed.
    pub fn set(&mut self, cell: CellRef, value: CellValue) {
        if self.rows.len() <= cell.row {
            self.rows.resize_with(cell.row + 1, Vec::new);
        }
        let row = &mut self.rows[cell.row];
        if row.len() <= cell.col {
            row.resize_with(cell.col + 1, CellValue::default);
        }
        row[cell.col] = value;
    }

    /// Reset a cell to empty without growing the grid.
    /// Returns the previous value if the cell was inside the grid.
    pub fn clear(&mut self, cell: CellRef) -> Option<CellValue> {
        let slot = self.rows.get_mut(cell.row)?.get_mut(cell.col)?;
        Some(std::mem::take(slot))
    }

    /// Iterate every stored cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, value)| (CellRef::new(r, c), value))
        })
    }
}

impl<T: Into<CellValue>> FromIterator<Vec<T>> for Grid {
    fn from_iter<I: IntoIterator<Item = Vec<T>>>(iter: I) -> Self {
        Grid::from_rows(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// A value derived by evaluation. Discardable; never stored back as raw data.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ComputedValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// Only produced under a tagged error policy.
    Error(ErrorKind),
}

impl ComputedValue {
    /// Numeric reading: numbers and numeric text as-is, everything else `0`.
    pub fn as_number(&self) -> f64 {
        match self {
            ComputedValue::Number(n) => *n,
            ComputedValue::Text(s) => parse_finite(s.trim()).unwrap_or(0.0),
            ComputedValue::Empty | ComputedValue::Error(_) => 0.0,
        }
    }

    /// The computed form of a non-formula raw value.
    pub fn from_literal(value: &CellValue) -> ComputedValue {
        match value {
            CellValue::Empty => ComputedValue::Empty,
            CellValue::Number(n) => ComputedValue::Number(*n),
            CellValue::Text(s) => ComputedValue::Text(s.clone()),
            CellValue::Formula(f) => ComputedValue::Text(format!("={}", f)),
        }
    }
}

impl From<f64> for ComputedValue {
    fn from(n: f64) -> Self {
        ComputedValue::Number(n)
    }
}

impl Serialize for ComputedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ComputedValue::Empty => serializer.serialize_none(),
            ComputedValue::Number(n) => serializer.serialize_f64(*n),
            ComputedValue::Text(s) => serializer.serialize_str(s),
            ComputedValue::Error(kind) => serializer.serialize_str(kind.marker()),
        }
    }
}

/// Parallel view of a [`Grid`] holding computed values, same (jagged) shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComputedGrid {
    rows: Vec<Vec<ComputedValue>>,
}

impl ComputedGrid {
    pub fn from_rows(rows: Vec<Vec<ComputedValue>>) -> ComputedGrid {
        ComputedGrid { rows }
    }

    pub fn rows(&self) -> &[Vec<ComputedValue>] {
        &self.rows
    }

    pub fn get(&self, cell: CellRef) -> Option<&ComputedValue> {
        self.rows.get(cell.row)?.get(cell.col)
    }
}

impl<T: Into<ComputedValue>> FromIterator<Vec<T>> for ComputedGrid {
    fn from_iter<I: IntoIterator<Item = Vec<T>>>(iter: I) -> Self {
        ComputedGrid::from_rows(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_classifies() {
        assert_eq!(CellValue::from_input("   "), CellValue::Empty);
        assert_eq!(CellValue::from_input("=A1+1"), CellValue::Formula("A1+1".into()));
        assert_eq!(CellValue::from_input("\"42\""), CellValue::Text("42".into()));
        assert_eq!(CellValue::from_input(" 2.5 "), CellValue::Number(2.5));
        assert_eq!(CellValue::from_input("inf"), CellValue::Text("inf".into()));
        assert_eq!(CellValue::from_input("hello"), CellValue::Text("hello".into()));
    }

    #[test]
    fn test_to_input_string_restores_formula_prefix() {
        assert_eq!(CellValue::Formula("SUM(A1:A2)".into()).to_input_string(), "=SUM(A1:A2)");
        assert_eq!(CellValue::Empty.to_input_string(), "");
    }

    #[test]
    fn test_numeric_text_classifies_as_numeric() {
        assert_eq!(CellValue::Text(" 7 ".into()).classify(), CellClass::Numeric(7.0));
        assert_eq!(CellValue::Text("text".into()).classify(), CellClass::Text("text"));
        assert_eq!(CellValue::Text("NaN".into()).classify(), CellClass::Text("NaN"));
    }

    #[test]
    fn test_set_grows_and_pads() {
        let mut grid = Grid::new();
        grid.set(CellRef::new(2, 3), CellValue::Number(1.0));
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows()[0].len(), 0);
        assert_eq!(grid.rows()[2].len(), 4);
        assert_eq!(grid.get(CellRef::new(2, 1)), Some(&CellValue::Empty));
        assert_eq!(grid.get(CellRef::new(2, 3)), Some(&CellValue::Number(1.0)));
        assert_eq!(grid.get(CellRef::new(5, 0)), None);
    }

    #[test]
    fn test_clear_does_not_grow() {
        let mut grid: Grid = vec![vec![1.0]].into_iter().collect();
        assert_eq!(grid.clear(CellRef::new(4, 4)), None);
        assert_eq!(grid.row_count(), 1);
        assert_eq!(grid.clear(CellRef::new(0, 0)), Some(CellValue::Number(1.0)));
        assert_eq!(grid.get(CellRef::new(0, 0)), Some(&CellValue::Empty));
    }

    #[test]
    fn test_out_of_grid_classifies_empty() {
        let grid = Grid::new();
        assert_eq!(grid.classify(CellRef::new(10, 10)), CellClass::Empty);
    }

    #[test]
    fn test_iter_is_row_major() {
        let grid: Grid = vec![vec![1.0, 2.0], vec![3.0]].into_iter().collect();
        let coords: Vec<_> = grid.iter().map(|(cell, _)| cell.to_string()).collect();
        assert_eq!(coords, vec!["A1", "B1", "A2"]);
    }
}
