//! Range and argument token resolution.
//!
//! A token is one function argument, already isolated from the surrounding
//! formula: a range (`A1:C3`), a single reference (`B2`), or a number.
//!
//! Ranges are never materialized in full. Evaluation walks only the part
//! that overlaps the grid and counts the remainder, so `A1:ZZZ1048576` over
//! a ten-cell grid costs ten reads.

use super::cell::{Grid, parse_finite};
use super::cell_ref::CellRef;
use super::error::FormulaError;

/// An inclusive rectangle with normalized corners.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Build a range from two corners given in any order.
    pub fn new(a: CellRef, b: CellRef) -> CellRange {
        CellRange {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Number of coordinates covered, whether or not they exist in a grid.
    pub fn cell_count(&self) -> u128 {
        let rows = (self.end.row - self.start.row) as u128 + 1;
        let cols = (self.end.col - self.start.col) as u128 + 1;
        rows * cols
    }

    /// Every coordinate of the rectangle, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellRef::new(row, col)))
    }

    /// Coordinates of the rectangle that exist in `grid`, row-major.
    /// Jagged rows are respected.
    pub fn cells_within<'g>(&self, grid: &'g Grid) -> impl Iterator<Item = CellRef> + 'g {
        let (start, end) = (self.start, self.end);
        let rows = grid.rows();
        let last_row = end.row.min(rows.len().saturating_sub(1));
        let row_span = if rows.is_empty() || start.row > last_row {
            0..0
        } else {
            start.row..last_row + 1
        };
        row_span.flat_map(move |row| {
            let width = rows[row].len();
            let col_end = if width == 0 { 0 } else { end.col.min(width - 1) + 1 };
            let col_span = if start.col < col_end {
                start.col..col_end
            } else {
                0..0
            };
            col_span.map(move |col| CellRef::new(row, col))
        })
    }

    /// First coordinate of the rectangle, row-major, that lies outside `grid`.
    pub fn first_outside(&self, grid: &Grid) -> Option<CellRef> {
        let rows = grid.rows();
        for row in self.start.row..=self.end.row {
            let Some(cells) = rows.get(row) else {
                return Some(CellRef::new(row, self.start.col));
            };
            if self.end.col >= cells.len() {
                return Some(CellRef::new(row, self.start.col.max(cells.len())));
            }
        }
        None
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// What a token resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Cell(CellRef),
    Range(CellRange),
    Literal(f64),
}

/// Parse a range like "A1:B5". Corners may be given in either order.
pub fn parse_range(range: &str) -> Option<CellRange> {
    let (start, end) = range.split_once(':')?;
    let start = CellRef::decode(start.trim())?;
    let end = CellRef::decode(end.trim())?;
    Some(CellRange::new(start, end))
}

/// Enumerate every coordinate of the inclusive rectangle, row-major.
pub fn expand_range(top_left: CellRef, bottom_right: CellRef) -> Vec<CellRef> {
    CellRange::new(top_left, bottom_right).cells().collect()
}

/// Resolve an argument token.
pub fn resolve_token(token: &str) -> Result<Resolved, FormulaError> {
    let token = token.trim();

    if token.contains(':') {
        return parse_range(token)
            .map(Resolved::Range)
            .ok_or_else(|| FormulaError::MalformedReference(token.to_string()));
    }

    if let Some(cell) = CellRef::decode(token) {
        return Ok(Resolved::Cell(cell));
    }

    if let Some(n) = parse_finite(token) {
        return Ok(Resolved::Literal(n));
    }

    Err(FormulaError::InvalidToken(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CellValue;

    fn labels(cells: impl Iterator<Item = CellRef>) -> Vec<String> {
        cells.map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_range_normalizes_corners() {
        let expected = Some(CellRange {
            start: CellRef::new(0, 0),
            end: CellRef::new(4, 1),
        });
        assert_eq!(parse_range("A1:B5"), expected);
        assert_eq!(parse_range("B5:A1"), expected);
        assert_eq!(parse_range("A5:B1"), expected);
    }

    #[test]
    fn test_parse_range_rejects_non_ranges() {
        assert_eq!(parse_range("A1"), None);
        assert_eq!(parse_range("A1:"), None);
        assert_eq!(parse_range("A0:B2"), None);
        assert_eq!(parse_range("invalid"), None);
    }

    #[test]
    fn test_range_cells_are_row_major() {
        let range = parse_range("A1:B3").unwrap();
        assert_eq!(range.cell_count(), 6);
        assert_eq!(
            labels(range.cells()),
            vec!["A1", "B1", "A2", "B2", "A3", "B3"]
        );
    }

    #[test]
    fn test_cells_within_clamps_to_jagged_grid() {
        let grid = Grid::from_rows(vec![
            vec![CellValue::Number(1.0); 3],
            vec![CellValue::Number(1.0)],
            vec![],
            vec![CellValue::Number(1.0); 2],
        ]);
        let range = parse_range("B1:ZZ9").unwrap();
        assert_eq!(labels(range.cells_within(&grid)), vec!["B1", "C1", "B4"]);
        assert_eq!(range.first_outside(&grid), Some(CellRef::new(0, 3)));

        let inside = parse_range("A1:C1").unwrap();
        assert_eq!(inside.first_outside(&grid), None);
        assert_eq!(labels(parse_range("A7:B9").unwrap().cells_within(&grid)), Vec::<String>::new());
        assert_eq!(labels(parse_range("A1:A1").unwrap().cells_within(&Grid::new())), Vec::<String>::new());
    }

    #[test]
    fn test_huge_range_is_counted_not_expanded() {
        let grid = Grid::from_rows(vec![vec![CellValue::Number(1.0)]]);
        let range = parse_range("A1:ZZZ1048576").unwrap();
        assert_eq!(range.cell_count(), 1_048_576u128 * 18_278);
        assert_eq!(range.cells_within(&grid).count(), 1);
        assert_eq!(range.first_outside(&grid), Some(CellRef::new(0, 1)));
    }

    #[test]
    fn test_resolve_single_reference_and_literal() {
        assert_eq!(resolve_token(" C2 "), Ok(Resolved::Cell(CellRef::new(1, 2))));
        assert_eq!(resolve_token("2.5"), Ok(Resolved::Literal(2.5)));
        assert_eq!(resolve_token("-3"), Ok(Resolved::Literal(-3.0)));
        assert_eq!(
            resolve_token("B2:A1"),
            Ok(Resolved::Range(CellRange::new(CellRef::new(0, 0), CellRef::new(1, 1))))
        );
    }

    #[test]
    fn test_resolve_invalid_tokens() {
        assert_eq!(
            resolve_token("a1"),
            Err(FormulaError::InvalidToken("a1".into()))
        );
        assert_eq!(
            resolve_token("A1:zz"),
            Err(FormulaError::MalformedReference("A1:zz".into()))
        );
        assert!(resolve_token("inf").is_err());
        assert!(resolve_token("").is_err());
    }
}
