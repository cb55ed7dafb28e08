//! Phase state machine.
//!
//! Transitions are pure functions of counts derived from the board and the
//! current budget. They only move forward; [`EngineState::reset`] is the one
//! way back to [`Phase::Production`].

use bulwark_types::Phase;
use serde::Serialize;

use crate::config::PolicyConfig;

/// Mutable policy state threaded through
/// [`DecisionEngine::evaluate`](super::DecisionEngine::evaluate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineState {
    /// Current phase.
    pub phase: Phase,
    /// Producers counted toward the production quota.
    pub production_progress: u32,
    /// Producers counted toward the expansion quota.
    pub expansion_progress: u32,
    /// Actions emitted since the last reset.
    pub emitted: u64,
}

impl EngineState {
    /// Fresh state in [`Phase::Production`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to [`Phase::Production`] with every counter cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Board and budget facts the transition rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseInputs {
    /// Producers occupying cells of the production list.
    pub production_placed: u32,
    /// Whether the production list still has an empty cell.
    pub production_open: bool,
    /// Producers occupying cells of the expansion list.
    pub expansion_placed: u32,
    /// Whether the expansion list still has an empty cell.
    pub expansion_open: bool,
    /// Producers anywhere on the board.
    pub producers_total: u32,
    /// Every shooter row holds at least the minimum shooter count.
    pub min_defense_met: bool,
    /// Every cell of the primary shooter region is occupied.
    pub primary_region_full: bool,
    /// Spendable budget.
    pub budget: u32,
}

/// The phase that follows `current`, if its exit condition holds.
pub fn next_phase(current: Phase, inputs: &PhaseInputs, policy: &PolicyConfig) -> Option<Phase> {
    match current {
        Phase::Production => (inputs.production_placed >= policy.production_quota
            || !inputs.production_open)
            .then_some(Phase::DefenseBuild),
        Phase::DefenseBuild => {
            let economy_ready = inputs.budget >= policy.economy_threshold
                && inputs.producers_total < policy.total_producer_quota;
            (inputs.min_defense_met && (inputs.primary_region_full || economy_ready))
                .then_some(Phase::Expansion)
        }
        Phase::Expansion => (inputs.expansion_placed >= policy.expansion_quota()
            || !inputs.expansion_open)
            .then_some(Phase::Steady),
        Phase::Steady => None,
    }
}

/// Apply transitions until none fires.
///
/// Returns the phases entered, in order.
pub fn settle(state: &mut EngineState, inputs: &PhaseInputs, policy: &PolicyConfig) -> Vec<Phase> {
    let mut entered = Vec::new();
    while let Some(next) = next_phase(state.phase, inputs, policy) {
        state.phase = next;
        entered.push(next);
    }
    entered
}
