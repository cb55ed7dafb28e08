//! Decision outputs and board records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::kinds::EmplacementKind;

/// Which rung of the decision ladder produced an action.
///
/// Variants are declared in ladder order: the earlier rung always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    /// A threat came within striking distance of a shooter.
    AreaDamageProximity,
    /// Enough threats bunched into one 3x3 neighbourhood.
    AreaDamageCluster,
    /// A threat crossed the panic column.
    PanicBreach,
    /// Phase-driven producer placement.
    Production,
    /// Shooter placed in a row with a remembered threat.
    ThreatResponse,
    /// Shooter placed to fill gaps before threats arrive.
    Proactive,
    /// Barrier placed in front of an approaching threat.
    Reinforcement,
}

impl ReasonTag {
    /// One-based position of this rung in the ladder.
    pub const fn rung(self) -> u8 {
        match self {
            Self::AreaDamageProximity => 1,
            Self::AreaDamageCluster => 2,
            Self::PanicBreach => 3,
            Self::Production => 4,
            Self::ThreatResponse => 5,
            Self::Proactive => 6,
            Self::Reinforcement => 7,
        }
    }
}

/// A single proposed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The emplacement kind to place.
    pub kind: EmplacementKind,
    /// Target cell.
    pub cell: Cell,
    /// Ladder rung that produced the action.
    pub reason: ReasonTag,
}

impl Action {
    /// Create an action.
    pub const fn new(kind: EmplacementKind, cell: Cell, reason: ReasonTag) -> Self {
        Self { kind, cell, reason }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{:?}]", self.kind, self.cell, self.reason)
    }
}

/// Coarse stage of the board-filling policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Initial producer quota.
    #[default]
    Production,
    /// Fill the primary shooter region.
    DefenseBuild,
    /// Second producer quota.
    Expansion,
    /// Only threat-responsive and reinforcement placement.
    Steady,
}

/// An emplacement committed to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEmplacement {
    /// What was placed.
    pub kind: EmplacementKind,
    /// Where it was placed.
    pub cell: Cell,
    /// Engine time of the placement in milliseconds.
    pub placed_at_ms: u64,
}
