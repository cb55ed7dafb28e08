//! Tick runner and commit point.
//!
//! The [`Controller`] owns every piece of mutable scheduler state and is the
//! only place where board, cooldowns, and budget change. One call to
//! [`Controller::run_tick`] runs the whole cycle:
//!
//! 1. **Clear** -- remove consumables whose effect has played out.
//! 2. **Earn** -- add income reported by the [`EconomySource`].
//! 3. **Ingest** -- feed detections to the threat tracker and evict any
//!    emplacement a threat walked past.
//! 4. **Decide** -- ask the [`DecisionEngine`] for at most one action.
//! 5. **Execute** -- re-check the budget, hand the action to the
//!    [`Executor`].
//! 6. **Commit** -- on success, occupy the cell, spend, and start the
//!    cooldown, all or nothing. On failure nothing changes and the next
//!    tick recomputes.

use bulwark_types::{Action, Cell, Phase, ThreatSighting};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{Board, BoardError};
use crate::budget::{Budget, BudgetError, BudgetStats};
use crate::collaborators::{AvailabilitySource, EconomySource, Executor, ThreatDetector};
use crate::config::BulwarkConfig;
use crate::cooldown::CooldownRegistry;
use crate::decision::{DecisionEngine, EngineState, TickView};
use crate::threat::{ThreatTracker, TrackerUpdate};

/// Errors that can occur when committing an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// The target cell cannot take the emplacement.
    #[error("board rejected placement: {source}")]
    Board {
        /// The underlying board error.
        #[from]
        source: BoardError,
    },

    /// The budget cannot cover the emplacement.
    #[error("budget rejected placement: {source}")]
    Budget {
        /// The underlying budget error.
        #[from]
        source: BudgetError,
    },
}

/// How a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// No rung produced an action.
    Idle,
    /// The action was executed and committed.
    Committed,
    /// The executor reported a failure; nothing was committed.
    ExecutionFailed,
    /// The budget no longer covered the action at execution time.
    Unaffordable,
    /// The executor succeeded but the commit was refused.
    CommitRejected,
}

/// Summary of a single completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed (one-based).
    pub tick: u64,
    /// Engine time of the tick.
    pub now_ms: u64,
    /// Phase after the decision.
    pub phase: Phase,
    /// Budget at the end of the tick.
    pub budget: u32,
    /// Income collected this tick.
    pub earned: u32,
    /// Sightings accepted by the tracker.
    pub sightings: usize,
    /// Sightings dropped as malformed.
    pub discarded_sightings: usize,
    /// Cells evicted because a threat walked past them.
    pub lost: Vec<Cell>,
    /// Consumable cells cleared this tick.
    pub cleared: Vec<Cell>,
    /// The action decided on, if any.
    pub action: Option<Action>,
    /// How the tick ended.
    pub outcome: TickOutcome,
}

/// Running totals since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Actions proposed by the decision engine.
    pub proposed: u64,
    /// Actions committed to the board.
    pub placements: u64,
    /// Executor failures.
    pub execution_failures: u64,
    /// Actions dropped as unaffordable or refused at commit.
    pub rejected: u64,
    /// Emplacements lost to advancing threats.
    pub lost: u64,
    /// Consumables cleared after use.
    pub cleared: u64,
    /// Budget totals.
    pub budget: BudgetStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingClear {
    cell: Cell,
    due_ms: u64,
}

/// Owner of all scheduler state.
#[derive(Debug, Clone)]
pub struct Controller {
    engine: DecisionEngine,
    state: EngineState,
    board: Board,
    cooldowns: CooldownRegistry,
    threats: ThreatTracker,
    budget: Budget,
    initial_budget: u32,
    consumable_clear_ms: u64,
    pending_clears: Vec<PendingClear>,
    tick: u64,
    stats: ControllerStats,
}

impl Controller {
    /// Build a controller from configuration, with `now_ms` as engine start.
    pub fn new(config: &BulwarkConfig, now_ms: u64) -> Self {
        let dims = config.dims();
        Self {
            engine: DecisionEngine::from_config(config),
            state: EngineState::new(),
            board: Board::new(dims),
            cooldowns: CooldownRegistry::new(config.catalog(), now_ms),
            threats: ThreatTracker::new(dims, config.threat.memory_window_ms),
            budget: Budget::new(config.economy.initial_budget),
            initial_budget: config.economy.initial_budget,
            consumable_clear_ms: config.economy.consumable_clear_ms,
            pending_clears: Vec::new(),
            tick: 0,
            stats: ControllerStats::default(),
        }
    }

    /// Run one full tick against the collaborators.
    pub fn run_tick(
        &mut self,
        now_ms: u64,
        detector: &mut dyn ThreatDetector,
        economy: &mut dyn EconomySource,
        executor: &mut dyn Executor,
        availability: &dyn AvailabilitySource,
    ) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        self.stats.ticks = self.stats.ticks.saturating_add(1);
        let tick = self.tick;

        // --- Clear ---
        let cleared = self.clear_due_consumables(now_ms);

        // --- Earn ---
        let earned = economy.collect();
        self.earn(earned);

        // --- Ingest ---
        let update = self.ingest(&detector.detect(), now_ms);

        // --- Decide ---
        let action = self.evaluate(now_ms, availability);

        // --- Execute / Commit ---
        let outcome = match action {
            None => TickOutcome::Idle,
            Some(action) => self.execute_and_commit(tick, &action, now_ms, executor),
        };

        let summary = TickSummary {
            tick,
            now_ms,
            phase: self.state.phase,
            budget: self.budget.current(),
            earned,
            sightings: update.accepted,
            discarded_sightings: update.discarded,
            lost: update.lost,
            cleared,
            action,
            outcome,
        };
        debug!(
            tick,
            phase = ?summary.phase,
            budget = summary.budget,
            sightings = summary.sightings,
            outcome = ?summary.outcome,
            "Tick completed"
        );
        summary
    }

    fn execute_and_commit(
        &mut self,
        tick: u64,
        action: &Action,
        now_ms: u64,
        executor: &mut dyn Executor,
    ) -> TickOutcome {
        let cost = self.engine.catalog().cost(action.kind);
        if !self.budget.can_afford(cost) {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
            self.discard(action);
            return TickOutcome::Unaffordable;
        }

        if let Err(err) = executor.execute(action.kind, action.cell) {
            self.stats.execution_failures = self.stats.execution_failures.saturating_add(1);
            warn!(tick, kind = %action.kind, cell = %action.cell, %err, "Placement execution failed");
            return TickOutcome::ExecutionFailed;
        }

        match self.commit(action, now_ms) {
            Ok(()) => TickOutcome::Committed,
            Err(err) => {
                self.stats.rejected = self.stats.rejected.saturating_add(1);
                warn!(tick, kind = %action.kind, cell = %action.cell, %err, "Commit rejected");
                TickOutcome::CommitRejected
            }
        }
    }

    /// Feed this tick's detections to the tracker.
    ///
    /// Emplacements the tracker reports as lost are evicted from the board.
    pub fn ingest(&mut self, detections: &[(i32, i32)], now_ms: u64) -> TrackerUpdate {
        let sightings: Vec<ThreatSighting> = detections
            .iter()
            .map(|&(col, row)| ThreatSighting::new(col, row, now_ms))
            .collect();
        let update = self.threats.update(&sightings, now_ms, &self.board);

        for &cell in &update.lost {
            if let Some(placed) = self.board.remove(cell) {
                self.pending_clears.retain(|pending| pending.cell != cell);
                self.stats.lost = self.stats.lost.saturating_add(1);
                info!(kind = %placed.kind, %cell, "Emplacement lost to advancing threat");
            }
        }
        update
    }

    /// Decide this tick's action without committing anything.
    pub fn evaluate(&mut self, now_ms: u64, availability: &dyn AvailabilitySource) -> Option<Action> {
        let view = TickView {
            board: &self.board,
            cooldowns: &self.cooldowns,
            threats: &self.threats,
            budget: self.budget.current(),
            availability,
            now_ms,
        };
        let action = self.engine.evaluate(&mut self.state, &view);
        if action.is_some() {
            self.stats.proposed = self.stats.proposed.saturating_add(1);
        }
        action
    }

    /// Apply a successfully executed action.
    ///
    /// Occupancy and budget are validated before anything changes, so a
    /// failed commit leaves every piece of state untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Board`] if the cell is out of bounds or
    /// occupied, or [`CommitError::Budget`] if the balance is too low.
    pub fn commit(&mut self, action: &Action, now_ms: u64) -> Result<(), CommitError> {
        let cost = self.engine.catalog().cost(action.kind);
        self.board.check_vacant(action.cell)?;
        if !self.budget.can_afford(cost) {
            return Err(BudgetError::Insufficient {
                cost,
                available: self.budget.current(),
            }
            .into());
        }

        self.board.place(action.kind, action.cell, now_ms)?;
        self.budget.spend(cost)?;
        self.cooldowns.mark_used(action.kind, now_ms);
        if action.kind.is_consumable() {
            self.pending_clears.push(PendingClear {
                cell: action.cell,
                due_ms: now_ms.saturating_add(self.consumable_clear_ms),
            });
        }
        self.stats.placements = self.stats.placements.saturating_add(1);

        info!(
            kind = %action.kind,
            cell = %action.cell,
            reason = ?action.reason,
            cost,
            budget = self.budget.current(),
            "Placement committed"
        );
        Ok(())
    }

    /// Drop an uncommitted action. Nothing changes.
    pub fn discard(&self, action: &Action) {
        debug!(
            tick = self.tick,
            kind = %action.kind,
            cell = %action.cell,
            reason = ?action.reason,
            "Action discarded"
        );
    }

    /// Remove consumables whose clear time has passed.
    pub fn clear_due_consumables(&mut self, now_ms: u64) -> Vec<Cell> {
        let (due, pending): (Vec<PendingClear>, Vec<PendingClear>) =
            std::mem::take(&mut self.pending_clears)
                .into_iter()
                .partition(|pending| pending.due_ms <= now_ms);
        self.pending_clears = pending;

        let mut cleared = Vec::new();
        for PendingClear { cell, .. } in due {
            if self.board.remove(cell).is_some() {
                self.stats.cleared = self.stats.cleared.saturating_add(1);
                debug!(%cell, "Consumable cleared");
                cleared.push(cell);
            }
        }
        cleared
    }

    /// Add income.
    pub fn earn(&mut self, amount: u32) {
        self.budget.earn(amount);
    }

    /// Emergency abort: forget the board, cooldowns, threats, and phase.
    ///
    /// The budget returns to its initial value. Statistics are kept.
    pub fn reset(&mut self, now_ms: u64) {
        self.board.clear();
        self.cooldowns.reset(now_ms);
        self.threats.reset();
        self.state.reset();
        self.budget.reset(self.initial_budget);
        self.pending_clears.clear();
        info!(now_ms, "Controller reset");
    }

    /// Current occupancy.
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Per-kind readiness.
    pub const fn cooldowns(&self) -> &CooldownRegistry {
        &self.cooldowns
    }

    /// Threat memory.
    pub const fn threats(&self) -> &ThreatTracker {
        &self.threats
    }

    /// Spendable budget.
    pub const fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Phase and quota counters.
    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// The decision engine.
    pub const fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Ticks run so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Running totals, with current budget figures.
    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            budget: self.budget.stats(),
            ..self.stats
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bulwark_types::{EmplacementKind, ReasonTag};

    use super::*;
    use crate::collaborators::{AllAvailable, ExecutionError};

    struct Scripted {
        threats: Vec<(i32, i32)>,
        income: u32,
        fail: bool,
        executed: Vec<(EmplacementKind, Cell)>,
    }

    impl Scripted {
        fn new(income: u32) -> Self {
            Self {
                threats: Vec::new(),
                income,
                fail: false,
                executed: Vec::new(),
            }
        }
    }

    impl ThreatDetector for Scripted {
        fn detect(&mut self) -> Vec<(i32, i32)> {
            self.threats.clone()
        }
    }

    impl EconomySource for Scripted {
        fn collect(&mut self) -> u32 {
            self.income
        }
    }

    impl Executor for Scripted {
        fn execute(&mut self, kind: EmplacementKind, cell: Cell) -> Result<(), ExecutionError> {
            if self.fail {
                return Err(ExecutionError::Rejected {
                    reason: "scripted".to_owned(),
                });
            }
            self.executed.push((kind, cell));
            Ok(())
        }
    }

    fn tick(controller: &mut Controller, env: &mut Scripted, now_ms: u64) -> TickSummary {
        let mut detector = Scripted {
            threats: env.threats.clone(),
            ..Scripted::new(0)
        };
        let mut economy = Scripted::new(env.income);
        controller.run_tick(now_ms, &mut detector, &mut economy, env, &AllAvailable)
    }

    #[test]
    fn tick_commits_first_producer() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        let mut env = Scripted::new(0);
        let summary = tick(&mut controller, &mut env, 0);

        assert_eq!(summary.tick, 1);
        assert_eq!(summary.outcome, TickOutcome::Committed);
        assert_eq!(env.executed, vec![(EmplacementKind::Sunflower, Cell::new(0, 2))]);
        assert_eq!(controller.budget().current(), 0);
        assert!(!controller.board().is_empty(Cell::new(0, 2)));
        assert!(!controller.cooldowns().can_use(EmplacementKind::Sunflower, 0));
    }

    #[test]
    fn execution_failure_commits_nothing() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        let mut env = Scripted::new(0);
        env.fail = true;
        let summary = tick(&mut controller, &mut env, 0);

        assert_eq!(summary.outcome, TickOutcome::ExecutionFailed);
        assert_eq!(controller.board().occupied_count(), 0);
        assert_eq!(controller.budget().current(), 50);
        assert!(controller.cooldowns().can_use(EmplacementKind::Sunflower, 0));
        assert_eq!(controller.stats().execution_failures, 1);

        env.fail = false;
        let summary = tick(&mut controller, &mut env, 500);
        assert_eq!(summary.outcome, TickOutcome::Committed);
        assert_eq!(summary.action.unwrap().cell, Cell::new(0, 2));
    }

    #[test]
    fn idle_when_nothing_is_affordable() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        controller.commit(
            &Action::new(EmplacementKind::Sunflower, Cell::new(0, 2), ReasonTag::Production),
            0,
        )
        .unwrap();
        let mut env = Scripted::new(0);
        let summary = tick(&mut controller, &mut env, 10_000);
        assert_eq!(summary.outcome, TickOutcome::Idle);
        assert_eq!(summary.action, None);
    }

    #[test]
    fn commit_is_atomic() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        let action = Action::new(EmplacementKind::Peashooter, Cell::new(1, 2), ReasonTag::Proactive);
        let err = controller.commit(&action, 0).unwrap_err();
        assert!(matches!(err, CommitError::Budget { .. }));
        assert_eq!(controller.board().occupied_count(), 0);
        assert!(controller.cooldowns().can_use(EmplacementKind::Peashooter, 0));

        controller.earn(200);
        controller.commit(&action, 0).unwrap();
        let err = controller.commit(&action, 0).unwrap_err();
        assert!(matches!(err, CommitError::Board { .. }));
        assert_eq!(controller.budget().current(), 150);
    }

    #[test]
    fn consumables_clear_after_delay() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        controller.earn(500);
        let action = Action::new(EmplacementKind::CherryBomb, Cell::new(5, 2), ReasonTag::AreaDamageCluster);
        controller.commit(&action, 40_000).unwrap();

        assert!(controller.clear_due_consumables(42_999).is_empty());
        assert_eq!(controller.clear_due_consumables(43_000), vec![Cell::new(5, 2)]);
        assert!(controller.board().is_empty(Cell::new(5, 2)));
        assert_eq!(controller.stats().cleared, 1);
    }

    #[test]
    fn advancing_threat_evicts_emplacement() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        controller.earn(500);
        controller
            .commit(&Action::new(EmplacementKind::Peashooter, Cell::new(5, 0), ReasonTag::Proactive), 0)
            .unwrap();

        controller.ingest(&[(6, 0)], 1_000);
        let update = controller.ingest(&[(4, 0)], 2_000);
        assert_eq!(update.lost, vec![Cell::new(5, 0)]);
        assert!(controller.board().is_empty(Cell::new(5, 0)));
        assert_eq!(controller.stats().lost, 1);
    }

    #[test]
    fn stats_serialize_with_budget_totals() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        controller.earn(100);
        let json = serde_json::to_value(controller.stats()).unwrap();
        assert_eq!(json["ticks"], 0);
        assert_eq!(json["budget"]["current"], 150);
        assert_eq!(json["budget"]["total_earned"], 100);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut controller = Controller::new(&BulwarkConfig::default(), 0);
        let mut env = Scripted::new(25);
        env.threats = vec![(8, 2)];
        tick(&mut controller, &mut env, 0);
        assert_eq!(controller.board().occupied_count(), 1);

        controller.reset(5_000);
        assert_eq!(controller.board().occupied_count(), 0);
        assert!(controller.threats().active_rows().is_empty());
        assert_eq!(controller.phase(), Phase::Production);
        assert_eq!(controller.budget().current(), 50);
        assert_eq!(controller.cooldowns().engine_start_ms(), 5_000);
        assert_eq!(controller.stats().placements, 1);
    }
}
