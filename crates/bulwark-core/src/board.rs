//! Occupancy map of the grid.
//!
//! The board is the only owner of [`PlacedEmplacement`] records. At most one
//! emplacement occupies a cell, and [`Board::place`] never overwrites. All
//! counts are derived from the occupancy map on demand so they cannot drift.

use std::collections::{BTreeMap, BTreeSet};

use bulwark_types::{Cell, EmplacementKind, GridDims, KindTag, PlacedEmplacement};

/// Errors that can occur when placing on the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The target cell already holds an emplacement.
    #[error("cell {cell} is already occupied by {occupant}")]
    Occupied {
        /// The contested cell.
        cell: Cell,
        /// What currently occupies it.
        occupant: EmplacementKind,
    },

    /// The target cell lies outside the grid.
    #[error("cell {cell} is outside the {cols}x{rows} grid")]
    OutOfBounds {
        /// The rejected cell.
        cell: Cell,
        /// Grid width.
        cols: u32,
        /// Grid height.
        rows: u32,
    },
}

/// Which cells hold which emplacements, and since when.
#[derive(Debug, Clone, Default)]
pub struct Board {
    dims: GridDims,
    cells: BTreeMap<Cell, PlacedEmplacement>,
}

impl Board {
    /// An empty board of the given dimensions.
    pub const fn new(dims: GridDims) -> Self {
        Self {
            dims,
            cells: BTreeMap::new(),
        }
    }

    /// Board dimensions.
    pub const fn dims(&self) -> GridDims {
        self.dims
    }

    /// Whether `cell` can receive an emplacement.
    ///
    /// Cells outside the grid are never empty.
    pub fn is_empty(&self, cell: Cell) -> bool {
        self.dims.contains(cell) && !self.cells.contains_key(&cell)
    }

    /// Check that `cell` is inside the grid and unoccupied.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfBounds`] or [`BoardError::Occupied`].
    pub fn check_vacant(&self, cell: Cell) -> Result<(), BoardError> {
        if !self.dims.contains(cell) {
            return Err(BoardError::OutOfBounds {
                cell,
                cols: self.dims.cols,
                rows: self.dims.rows,
            });
        }
        match self.cells.get(&cell) {
            Some(existing) => Err(BoardError::Occupied {
                cell,
                occupant: existing.kind,
            }),
            None => Ok(()),
        }
    }

    /// Record `kind` at `cell`.
    ///
    /// # Errors
    ///
    /// Fails without touching the board if the cell is occupied or outside
    /// the grid.
    pub fn place(&mut self, kind: EmplacementKind, cell: Cell, now_ms: u64) -> Result<(), BoardError> {
        self.check_vacant(cell)?;
        self.cells.insert(
            cell,
            PlacedEmplacement {
                kind,
                cell,
                placed_at_ms: now_ms,
            },
        );
        Ok(())
    }

    /// Remove whatever occupies `cell`, returning it.
    pub fn remove(&mut self, cell: Cell) -> Option<PlacedEmplacement> {
        self.cells.remove(&cell)
    }

    /// The emplacement at `cell`, if any.
    pub fn get(&self, cell: Cell) -> Option<&PlacedEmplacement> {
        self.cells.get(&cell)
    }

    /// Number of emplacements tagged `tag` in any of `rows`.
    pub fn count(&self, tag: KindTag, rows: &[u32]) -> usize {
        self.cells
            .values()
            .filter(|placed| placed.kind.tag() == tag && rows.contains(&placed.cell.row))
            .count()
    }

    /// Number of emplacements tagged `tag` anywhere on the board.
    pub fn count_tag(&self, tag: KindTag) -> usize {
        self.cells.values().filter(|placed| placed.kind.tag() == tag).count()
    }

    /// Every occupied cell.
    pub fn all_occupied(&self) -> BTreeSet<Cell> {
        self.cells.keys().copied().collect()
    }

    /// Iterate placed emplacements in cell order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedEmplacement> {
        self.cells.values()
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    /// Remove every emplacement.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
