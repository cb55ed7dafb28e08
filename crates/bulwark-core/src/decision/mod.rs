//! Placement decisions.
//!
//! [`DecisionEngine`] is immutable policy: grid, catalog, and the
//! [`PolicyConfig`] knobs. Everything that changes between ticks is either
//! read through a [`TickView`] or lives in the caller-owned [`EngineState`].
//!
//! Each [`DecisionEngine::evaluate`] call:
//!
//! 1. Derives phase inputs from the board and budget and applies every
//!    transition that fires.
//! 2. Walks the placement ladder and returns at most one [`Action`].
//!
//! The only writes are to `EngineState`: phase, the re-derived quota
//! counters (bumped once when a production action is returned), and the
//! emission count.

mod ladder;
pub mod phase;

use bulwark_types::{Action, Cell, GridDims, KindTag, Phase, ReasonTag};
use tracing::{debug, info};

use crate::board::Board;
use crate::catalog::Catalog;
use crate::collaborators::AvailabilitySource;
use crate::config::{BulwarkConfig, PolicyConfig};
use crate::cooldown::CooldownRegistry;
use crate::threat::ThreatTracker;

pub use phase::{EngineState, PhaseInputs};

use self::ladder::Ladder;

/// Read-only snapshot of everything a decision looks at.
pub struct TickView<'a> {
    /// Current occupancy.
    pub board: &'a Board,
    /// Per-kind readiness.
    pub cooldowns: &'a CooldownRegistry,
    /// Threat memory, already updated for this tick.
    pub threats: &'a ThreatTracker,
    /// Spendable budget.
    pub budget: u32,
    /// Which kinds may be placed at all.
    pub availability: &'a dyn AvailabilitySource,
    /// Engine time in milliseconds.
    pub now_ms: u64,
}

/// The layered placement policy.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    dims: GridDims,
    catalog: Catalog,
    policy: PolicyConfig,
}

impl DecisionEngine {
    /// Create an engine from its parts.
    pub const fn new(dims: GridDims, catalog: Catalog, policy: PolicyConfig) -> Self {
        Self {
            dims,
            catalog,
            policy,
        }
    }

    /// Create an engine from a loaded configuration.
    pub fn from_config(config: &BulwarkConfig) -> Self {
        Self::new(config.dims(), config.catalog(), config.policy.clone())
    }

    /// Grid dimensions.
    pub const fn dims(&self) -> GridDims {
        self.dims
    }

    /// Effective kind catalog.
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Policy parameters.
    pub const fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Decide this tick's placement.
    ///
    /// Returns `None` when no rung yields an admissible candidate. Calling
    /// this twice without committing in between returns the same action.
    pub fn evaluate(&self, state: &mut EngineState, view: &TickView<'_>) -> Option<Action> {
        let inputs = self.phase_inputs(view.board, view.budget);
        let from = state.phase;
        for entered in phase::settle(state, &inputs, &self.policy) {
            info!(
                ?from,
                phase = ?entered,
                producers = inputs.producers_total,
                budget = view.budget,
                "Phase advanced"
            );
        }
        state.production_progress = inputs.production_placed;
        state.expansion_progress = inputs.expansion_placed;

        let action = Ladder::new(self, view).run(state.phase)?;

        if action.reason == ReasonTag::Production {
            match state.phase {
                Phase::Production => {
                    state.production_progress = state.production_progress.saturating_add(1);
                }
                Phase::Expansion => {
                    state.expansion_progress = state.expansion_progress.saturating_add(1);
                }
                Phase::DefenseBuild | Phase::Steady => {}
            }
        }
        state.emitted = state.emitted.saturating_add(1);
        debug!(
            phase = ?state.phase,
            kind = %action.kind,
            cell = %action.cell,
            reason = ?action.reason,
            "Action proposed"
        );
        Some(action)
    }

    /// Derive the transition inputs from the board and budget.
    pub fn phase_inputs(&self, board: &Board, budget: u32) -> PhaseInputs {
        let producers_in = |cells: &[Cell]| {
            let placed = cells
                .iter()
                .filter(|&&cell| {
                    board
                        .get(cell)
                        .is_some_and(|placed| placed.kind.tag() == KindTag::Producer)
                })
                .count();
            saturating_u32(placed)
        };
        let has_open = |cells: &[Cell]| cells.iter().any(|&cell| board.is_empty(cell));
        let min_shooters = usize::try_from(self.policy.min_shooters_per_row).unwrap_or(usize::MAX);

        PhaseInputs {
            production_placed: producers_in(&self.policy.production_cells),
            production_open: has_open(&self.policy.production_cells),
            expansion_placed: producers_in(&self.policy.expansion_cells),
            expansion_open: has_open(&self.policy.expansion_cells),
            producers_total: saturating_u32(board.count_tag(KindTag::Producer)),
            min_defense_met: self
                .policy
                .shooter_rows
                .iter()
                .all(|&row| board.count(KindTag::Shooter, &[row]) >= min_shooters),
            primary_region_full: self
                .policy
                .primary_region()
                .into_iter()
                .all(|cell| !board.is_empty(cell)),
            budget,
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
