//! Contracts of the external collaborators the core consumes.
//!
//! Detection, the economy, and placement execution are slow, fallible, and
//! environment-specific, so the core only sees them through these traits.
//! The controller calls each of them at most once per tick.

use std::collections::{BTreeMap, BTreeSet};

use bulwark_types::{Cell, EmplacementKind};
use serde::{Deserialize, Serialize};

/// Errors reported by an [`Executor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The environment refused the placement (slot not ready, cell
    /// blocked, etc.). Transient; the next tick recomputes.
    #[error("placement rejected: {reason}")]
    Rejected {
        /// Why the environment refused.
        reason: String,
    },

    /// The environment could not be reached at all.
    #[error("environment unreachable: {reason}")]
    Unreachable {
        /// Description of the failure.
        reason: String,
    },
}

/// Produces the threats visible right now.
pub trait ThreatDetector {
    /// Return the `(col, row)` of every currently visible threat.
    ///
    /// No ordering guarantee; may be empty. Coordinates may fall outside
    /// the grid and are validated by the tracker.
    fn detect(&mut self) -> Vec<(i32, i32)>;
}

/// Reports resource income.
pub trait EconomySource {
    /// Units collected since the previous call.
    fn collect(&mut self) -> u32;
}

/// Attempts placements against the live environment.
pub trait Executor {
    /// Place `kind` at `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] if the placement did not happen. The
    /// caller commits nothing in that case.
    fn execute(&mut self, kind: EmplacementKind, cell: Cell) -> Result<(), ExecutionError>;
}

/// Tells which kinds the operator has made usable.
pub trait AvailabilitySource {
    /// Whether `kind` may be placed at all.
    fn is_available(&self, kind: EmplacementKind) -> bool;
}

impl AvailabilitySource for BTreeSet<EmplacementKind> {
    fn is_available(&self, kind: EmplacementKind) -> bool {
        self.contains(&kind)
    }
}

/// Every kind is usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllAvailable;

impl AvailabilitySource for AllAvailable {
    fn is_available(&self, _kind: EmplacementKind) -> bool {
        true
    }
}

/// Which kinds are equipped, and in which input slot.
///
/// A kind appears at most once and a slot holds at most one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Loadout {
    slots: BTreeMap<EmplacementKind, u8>,
}

impl Loadout {
    /// An empty loadout.
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Equip `kind` in `slot`.
    ///
    /// Returns `false` and changes nothing if the kind is already equipped
    /// or the slot is taken.
    pub fn assign(&mut self, kind: EmplacementKind, slot: u8) -> bool {
        if self.slots.contains_key(&kind) || self.slots.values().any(|&s| s == slot) {
            return false;
        }
        self.slots.insert(kind, slot);
        true
    }

    /// The slot `kind` is equipped in.
    pub fn slot(&self, kind: EmplacementKind) -> Option<u8> {
        self.slots.get(&kind).copied()
    }

    /// Equipped kinds in slot order.
    pub fn kinds(&self) -> Vec<EmplacementKind> {
        let mut by_slot: Vec<(u8, EmplacementKind)> =
            self.slots.iter().map(|(&kind, &slot)| (slot, kind)).collect();
        by_slot.sort_unstable();
        by_slot.into_iter().map(|(_, kind)| kind).collect()
    }

    /// Whether no slot holds more than one kind.
    ///
    /// Always true for loadouts built with [`Loadout::assign`]; a
    /// deserialized one may break it.
    pub fn has_unique_slots(&self) -> bool {
        let slots: BTreeSet<u8> = self.slots.values().copied().collect();
        slots.len() == self.slots.len()
    }

    /// Number of equipped kinds.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is equipped.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl AvailabilitySource for Loadout {
    fn is_available(&self, kind: EmplacementKind) -> bool {
        self.slots.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loadout_rejects_duplicates() {
        let mut loadout = Loadout::new();
        assert!(loadout.assign(EmplacementKind::Sunflower, 1));
        assert!(!loadout.assign(EmplacementKind::Sunflower, 2));
        assert!(!loadout.assign(EmplacementKind::Peashooter, 1));
        assert!(loadout.assign(EmplacementKind::Peashooter, 2));
        assert_eq!(loadout.len(), 2);
        assert_eq!(loadout.slot(EmplacementKind::Peashooter), Some(2));
    }

    #[test]
    fn loadout_availability_and_order() {
        let mut loadout = Loadout::new();
        loadout.assign(EmplacementKind::CherryBomb, 3);
        loadout.assign(EmplacementKind::Sunflower, 1);
        assert!(loadout.is_available(EmplacementKind::CherryBomb));
        assert!(!loadout.is_available(EmplacementKind::Jalapeno));
        assert_eq!(
            loadout.kinds(),
            vec![EmplacementKind::Sunflower, EmplacementKind::CherryBomb]
        );
    }

    #[test]
    fn set_and_all_available() {
        let set = BTreeSet::from([EmplacementKind::Squash]);
        assert!(set.is_available(EmplacementKind::Squash));
        assert!(!set.is_available(EmplacementKind::Repeater));
        assert!(AllAvailable.is_available(EmplacementKind::Repeater));
    }
}
