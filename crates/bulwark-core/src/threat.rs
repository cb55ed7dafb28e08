//! Per-row threat memory with time decay.
//!
//! The tracker ingests one batch of sightings per tick. For every row it
//! remembers when a threat was last seen and how close the nearest one got
//! (lowest column). Rows not seen for longer than the memory window are
//! forgotten; only a fresh sighting brings them back.
//!
//! Comparing this tick's nearest column with the previous tick's also lets
//! the tracker infer which emplacements a threat walked past, i.e. ate.

use std::collections::{BTreeMap, BTreeSet};

use bulwark_types::{Cell, GridDims, KindTag, ThreatSighting};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::board::Board;

/// Default memory window in milliseconds.
pub const DEFAULT_MEMORY_WINDOW_MS: u64 = 20_000;

/// What the tracker remembers about one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowThreatMemory {
    /// The row.
    pub row: u32,
    /// Engine time of the latest sighting in this row.
    pub last_seen_at_ms: u64,
    /// Nearest column seen on the latest tick with a sighting in this row.
    pub nearest_col: u32,
}

/// Outcome of one [`ThreatTracker::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    /// Sightings recorded (including clamped ones).
    pub accepted: usize,
    /// Sightings whose column was clamped into the grid.
    pub clamped: usize,
    /// Sightings dropped because their row lies outside the grid.
    pub discarded: usize,
    /// Occupied cells a threat advanced past since the previous tick. The
    /// caller must evict these from the board.
    pub lost: Vec<Cell>,
    /// Rows forgotten on this update.
    pub expired: Vec<u32>,
}

/// Threat memory across ticks.
#[derive(Debug, Clone)]
pub struct ThreatTracker {
    dims: GridDims,
    memory_window_ms: u64,
    memory: BTreeMap<u32, RowThreatMemory>,
    sightings: Vec<Cell>,
    nearest: BTreeMap<u32, u32>,
    previous_nearest: BTreeMap<u32, u32>,
}

impl ThreatTracker {
    /// Create an empty tracker.
    pub const fn new(dims: GridDims, memory_window_ms: u64) -> Self {
        Self {
            dims,
            memory_window_ms,
            memory: BTreeMap::new(),
            sightings: Vec::new(),
            nearest: BTreeMap::new(),
            previous_nearest: BTreeMap::new(),
        }
    }

    /// Ingest this tick's sightings.
    ///
    /// Rows outside the grid are discarded and columns are clamped, so a
    /// malformed detection can never corrupt the memory. `board` is read to
    /// infer eaten emplacements; it is not modified.
    pub fn update(&mut self, sightings: &[ThreatSighting], now_ms: u64, board: &Board) -> TrackerUpdate {
        let mut outcome = TrackerUpdate::default();

        self.previous_nearest = std::mem::take(&mut self.nearest);
        self.sightings.clear();

        for sighting in sightings {
            let Some(row) = self.dims.row_index(sighting.row) else {
                warn!(col = sighting.col, row = sighting.row, "Discarding sighting outside the grid");
                outcome.discarded = outcome.discarded.saturating_add(1);
                continue;
            };
            let col = self.dims.clamp_col(sighting.col);
            if i64::from(col) != i64::from(sighting.col) {
                outcome.clamped = outcome.clamped.saturating_add(1);
            }
            outcome.accepted = outcome.accepted.saturating_add(1);

            self.sightings.push(Cell::new(col, row));
            let nearest = self.nearest.entry(row).or_insert(col);
            *nearest = (*nearest).min(col);

            let seen_at = sighting.observed_at_ms.min(now_ms);
            let memory = self.memory.entry(row).or_insert(RowThreatMemory {
                row,
                last_seen_at_ms: seen_at,
                nearest_col: col,
            });
            memory.last_seen_at_ms = memory.last_seen_at_ms.max(seen_at);
        }

        for (&row, &col) in &self.nearest {
            if let Some(memory) = self.memory.get_mut(&row) {
                memory.nearest_col = col;
            }
        }
        self.sightings.sort_by_key(|cell| (cell.row, cell.col));

        outcome.lost = self.infer_lost(board);

        let window = self.memory_window_ms;
        self.memory.retain(|&row, memory| {
            let keep = now_ms.saturating_sub(memory.last_seen_at_ms) <= window;
            if !keep {
                outcome.expired.push(row);
            }
            keep
        });
        if !outcome.expired.is_empty() {
            debug!(rows = ?outcome.expired, "Threat rows expired");
        }

        outcome
    }

    /// Cells whose non-instant-kill occupant a threat has advanced past.
    ///
    /// A threat that moved from column `p` to column `q < p` has walked over
    /// every cell with `q < col <= p` in its row.
    fn infer_lost(&self, board: &Board) -> Vec<Cell> {
        let mut lost = Vec::new();
        for (&row, &current) in &self.nearest {
            let Some(&previous) = self.previous_nearest.get(&row) else {
                continue;
            };
            if current >= previous {
                continue;
            }
            for placed in board.iter() {
                let cell = placed.cell;
                if cell.row == row
                    && cell.col > current
                    && cell.col <= previous
                    && placed.kind.tag() != KindTag::InstantKill
                {
                    lost.push(cell);
                }
            }
        }
        lost
    }

    /// Rows with a remembered threat.
    pub fn active_rows(&self) -> BTreeSet<u32> {
        self.memory.keys().copied().collect()
    }

    /// Nearest remembered threat column in `row`.
    pub fn nearest_threat(&self, row: u32) -> Option<u32> {
        self.memory.get(&row).map(|memory| memory.nearest_col)
    }

    /// Active rows ordered closest threat first, ties broken by row index.
    pub fn rows_by_danger(&self) -> Vec<u32> {
        let mut rows: Vec<(u32, u32)> = self
            .memory
            .values()
            .map(|memory| (memory.nearest_col, memory.row))
            .collect();
        rows.sort_unstable();
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// This tick's validated sightings, sorted by row then column.
    pub fn current_sightings(&self) -> &[Cell] {
        &self.sightings
    }

    /// The memory record for `row`, if active.
    pub fn memory(&self, row: u32) -> Option<&RowThreatMemory> {
        self.memory.get(&row)
    }

    /// Configured memory window.
    pub const fn memory_window_ms(&self) -> u64 {
        self.memory_window_ms
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.sightings.clear();
        self.nearest.clear();
        self.previous_nearest.clear();
    }
}
