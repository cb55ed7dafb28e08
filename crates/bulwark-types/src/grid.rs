//! Grid addressing for the emplacement board.
//!
//! The board is a fixed `cols x rows` grid. Column 0 is the defended edge;
//! threats enter at the highest column and advance toward column 0, so a
//! lower column always means a closer threat.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of columns on the board.
pub const DEFAULT_COLS: u32 = 9;

/// Default number of rows on the board.
pub const DEFAULT_ROWS: u32 = 5;

/// A single grid cell, addressed zero-based as `(col, row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column index, 0 is the defended edge.
    pub col: u32,
    /// Row index, 0 is the top row.
    pub row: u32,
}

impl Cell {
    /// Create a cell at `(col, row)`.
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// The cell one column closer to the defended edge.
    ///
    /// Column 0 has nothing in front of it and returns itself.
    pub const fn ahead(self) -> Self {
        Self {
            col: self.col.saturating_sub(1),
            row: self.row,
        }
    }

    /// Absolute column distance to another cell, ignoring rows.
    pub const fn col_distance(self, other: Self) -> u32 {
        self.col.abs_diff(other.col)
    }

    /// Whether `other` lies in the 3x3 neighbourhood centred on `self`.
    pub const fn is_adjacent_or_same(self, other: Self) -> bool {
        self.col.abs_diff(other.col) <= 1 && self.row.abs_diff(other.row) <= 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// Dimensions of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    /// Number of columns.
    pub cols: u32,
    /// Number of rows.
    pub rows: u32,
}

impl Default for GridDims {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl GridDims {
    /// Create grid dimensions.
    pub const fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Whether the cell lies inside the grid.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.col < self.cols && cell.row < self.rows
    }

    /// Index of the last column (0 for a degenerate zero-width grid).
    pub const fn last_col(&self) -> u32 {
        self.cols.saturating_sub(1)
    }

    /// Clamp a raw, possibly negative column into `[0, cols)`.
    pub fn clamp_col(&self, raw: i32) -> u32 {
        u32::try_from(raw).unwrap_or(0).min(self.last_col())
    }

    /// Convert a raw row into a grid row, or `None` if it lies outside
    /// `[0, rows)`.
    pub fn row_index(&self, raw: i32) -> Option<u32> {
        u32::try_from(raw).ok().filter(|row| *row < self.rows)
    }

    /// Iterate every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ahead_saturates_at_edge() {
        assert_eq!(Cell::new(3, 1).ahead(), Cell::new(2, 1));
        assert_eq!(Cell::new(0, 4).ahead(), Cell::new(0, 4));
    }

    #[test]
    fn neighbourhood_is_three_by_three() {
        let centre = Cell::new(4, 2);
        assert!(centre.is_adjacent_or_same(Cell::new(5, 3)));
        assert!(centre.is_adjacent_or_same(Cell::new(4, 2)));
        assert!(!centre.is_adjacent_or_same(Cell::new(6, 2)));
        assert!(!centre.is_adjacent_or_same(Cell::new(4, 0)));
    }

    #[test]
    fn clamp_and_row_validation() {
        let dims = GridDims::default();
        assert_eq!(dims.clamp_col(-3), 0);
        assert_eq!(dims.clamp_col(4), 4);
        assert_eq!(dims.clamp_col(40), 8);
        assert_eq!(dims.row_index(-1), None);
        assert_eq!(dims.row_index(5), None);
        assert_eq!(dims.row_index(4), Some(4));
    }

    #[test]
    fn cells_cover_grid() {
        let dims = GridDims::new(3, 2);
        let cells: Vec<Cell> = dims.cells().collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells.first(), Some(&Cell::new(0, 0)));
        assert_eq!(cells.last(), Some(&Cell::new(2, 1)));
        assert!(cells.iter().all(|c| dims.contains(*c)));
    }

    #[test]
    fn display_is_col_row() {
        assert_eq!(Cell::new(2, 3).to_string(), "(2,3)");
    }
}
