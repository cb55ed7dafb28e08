//! Raw threat sightings.

use serde::{Deserialize, Serialize};

/// One threat observed by the detector at one instant.
///
/// Coordinates are raw and signed: a malformed detection may lie outside
/// the grid. The threat tracker validates them on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSighting {
    /// Raw column of the threat.
    pub col: i32,
    /// Raw row of the threat.
    pub row: i32,
    /// Engine time of the observation in milliseconds.
    pub observed_at_ms: u64,
}

impl ThreatSighting {
    /// Create a sighting.
    pub const fn new(col: i32, row: i32, observed_at_ms: u64) -> Self {
        Self {
            col,
            row,
            observed_at_ms,
        }
    }
}
