//! The seven-rung placement ladder.
//!
//! Rungs are tried strictly in order and the first admissible candidate
//! wins. Every candidate goes through [`Ladder::admissible`]; nothing here
//! mutates board, cooldown, or budget state.

use std::cmp::Reverse;

use bulwark_types::{Action, Cell, EmplacementKind, InstantKillScope, KindTag, Phase, ReasonTag};
use tracing::{debug, trace};

use super::{DecisionEngine, TickView};

/// One tick's walk down the ladder.
pub(super) struct Ladder<'a> {
    engine: &'a DecisionEngine,
    view: &'a TickView<'a>,
}

impl<'a> Ladder<'a> {
    pub(super) const fn new(engine: &'a DecisionEngine, view: &'a TickView<'a>) -> Self {
        Self { engine, view }
    }

    /// First admissible action for `phase`, if any.
    pub(super) fn run(&self, phase: Phase) -> Option<Action> {
        self.proximity()
            .or_else(|| self.cluster())
            .or_else(|| self.panic())
            .or_else(|| self.production(phase))
            .or_else(|| self.shooters(phase))
            .or_else(|| self.reinforcement())
    }

    // -----------------------------------------------------------------------
    // Gate
    // -----------------------------------------------------------------------

    /// Available, in grid, empty, affordable, and off cooldown.
    fn admissible(&self, kind: EmplacementKind, cell: Cell) -> bool {
        let view = self.view;
        if !view.availability.is_available(kind) {
            trace!(%kind, "Kind not available");
            return false;
        }
        if !view.board.is_empty(cell) {
            trace!(%kind, %cell, "Cell not placeable");
            return false;
        }
        let cost = self.engine.catalog.cost(kind);
        if view.budget < cost {
            debug!(%kind, %cell, cost, budget = view.budget, "Skipping unaffordable candidate");
            return false;
        }
        if !view.cooldowns.can_use(kind, view.now_ms) {
            let remaining_ms = view.cooldowns.time_remaining(kind, view.now_ms);
            debug!(%kind, %cell, remaining_ms, "Skipping candidate on cooldown");
            return false;
        }
        true
    }

    fn first_admissible(
        &self,
        kinds: impl IntoIterator<Item = EmplacementKind>,
        cell: Cell,
        reason: ReasonTag,
    ) -> Option<Action> {
        kinds
            .into_iter()
            .find(|&kind| self.admissible(kind, cell))
            .map(|kind| Action::new(kind, cell, reason))
    }

    // -----------------------------------------------------------------------
    // Rungs
    // -----------------------------------------------------------------------

    /// Rung 1: a threat within striking distance of a placed shooter.
    fn proximity(&self) -> Option<Action> {
        let distance = self.engine.policy.proximity_distance;
        let dims = self.engine.dims;
        let sightings = self.view.threats.current_sightings();
        let shooters = self
            .view
            .board
            .iter()
            .filter(|placed| placed.kind.tag() == KindTag::Shooter);

        for placed in shooters {
            let shooter = placed.cell;
            for threat in sightings.iter().filter(|t| t.row == shooter.row) {
                let gap = threat.col_distance(shooter);
                if gap > distance {
                    continue;
                }
                let midpoint = threat.col.min(shooter.col).saturating_add(gap / 2);
                let cell = Cell::new(midpoint.min(dims.last_col()), shooter.row);
                let action = self.first_admissible(
                    EmplacementKind::with_tag(KindTag::AreaDamage),
                    cell,
                    ReasonTag::AreaDamageProximity,
                );
                if action.is_some() {
                    return action;
                }
            }
        }
        None
    }

    /// Rung 2: enough threats inside one 3x3 neighbourhood.
    fn cluster(&self) -> Option<Action> {
        let threshold = self.engine.policy.cluster_threshold;
        let sightings = self.view.threats.current_sightings();

        for &center in sightings {
            let around = sightings
                .iter()
                .filter(|other| center.is_adjacent_or_same(**other))
                .count();
            if u32::try_from(around).unwrap_or(u32::MAX) < threshold {
                continue;
            }
            let action = self.first_admissible(
                EmplacementKind::with_tag(KindTag::AreaDamage),
                center,
                ReasonTag::AreaDamageCluster,
            );
            if action.is_some() {
                return action;
            }
        }
        None
    }

    /// Rung 3: a threat at or past the panic column.
    ///
    /// Row-clearing kinds target the threat's own cell; localized kinds
    /// target the cell one column in front of it.
    fn panic(&self) -> Option<Action> {
        let panic_column = self.engine.policy.panic_column;
        let mut breaches: Vec<Cell> = self
            .view
            .threats
            .current_sightings()
            .iter()
            .copied()
            .filter(|threat| threat.col <= panic_column)
            .collect();
        breaches.sort_unstable_by_key(|threat| (threat.col, threat.row));
        breaches.dedup();

        for threat in breaches {
            let row_kills = EmplacementKind::with_tag(KindTag::InstantKill)
                .filter(|kind| kind.instant_kill_scope() == Some(InstantKillScope::Row));
            if let Some(action) = self.first_admissible(row_kills, threat, ReasonTag::PanicBreach) {
                return Some(action);
            }

            let local_kills = EmplacementKind::with_tag(KindTag::InstantKill)
                .filter(|kind| kind.instant_kill_scope() == Some(InstantKillScope::Local));
            if let Some(action) =
                self.first_admissible(local_kills, threat.ahead(), ReasonTag::PanicBreach)
            {
                return Some(action);
            }
        }
        None
    }

    /// Rung 4: next producer cell of the phase's priority list.
    fn production(&self, phase: Phase) -> Option<Action> {
        let cells = match phase {
            Phase::Production => &self.engine.policy.production_cells,
            Phase::Expansion => &self.engine.policy.expansion_cells,
            Phase::DefenseBuild | Phase::Steady => return None,
        };
        let cell = cells
            .iter()
            .copied()
            .find(|&cell| self.view.board.is_empty(cell))?;
        self.first_admissible(
            EmplacementKind::with_tag(KindTag::Producer),
            cell,
            ReasonTag::Production,
        )
    }

    /// Rungs 5 and 6, behind the minimum shooter budget.
    fn shooters(&self, phase: Phase) -> Option<Action> {
        if !matches!(phase, Phase::DefenseBuild | Phase::Steady) {
            return None;
        }
        if self.view.budget < self.engine.policy.min_budget_for_shooters {
            trace!(budget = self.view.budget, "Below minimum shooter budget");
            return None;
        }
        let kinds = self.cheapest_shooters();
        self.threat_response(&kinds)
            .or_else(|| self.proactive(&kinds))
    }

    /// Rung 5: shooters in remembered threat rows, closest threat first.
    fn threat_response(&self, kinds: &[EmplacementKind]) -> Option<Action> {
        let policy = &self.engine.policy;
        let columns = policy.allowed_columns();
        self.view
            .threats
            .rows_by_danger()
            .into_iter()
            .filter(|row| policy.shooter_rows.contains(row))
            .find_map(|row| self.fill_row(row, &columns, kinds, ReasonTag::ThreatResponse))
    }

    /// Rung 6: fill gaps in preference-ordered shooter rows.
    fn proactive(&self, kinds: &[EmplacementKind]) -> Option<Action> {
        let columns = self.proactive_columns();
        self.engine
            .policy
            .shooter_rows
            .iter()
            .find_map(|&row| self.fill_row(row, &columns, kinds, ReasonTag::Proactive))
    }

    fn fill_row(
        &self,
        row: u32,
        columns: &[u32],
        kinds: &[EmplacementKind],
        reason: ReasonTag,
    ) -> Option<Action> {
        columns
            .iter()
            .find_map(|&col| self.first_admissible(kinds.iter().copied(), Cell::new(col, row), reason))
    }

    /// Bands up to and including the first one not yet full in every
    /// shooter row, ascending.
    fn proactive_columns(&self) -> Vec<u32> {
        let policy = &self.engine.policy;
        let board = self.view.board;
        let mut columns = Vec::new();
        for band in &policy.column_bands {
            columns.extend(band.iter().copied());
            let full = policy
                .shooter_rows
                .iter()
                .all(|&row| band.iter().all(|&col| !board.is_empty(Cell::new(col, row))));
            if !full {
                break;
            }
        }
        columns.sort_unstable();
        columns.dedup();
        columns
    }

    /// Shooter kinds by effective cost, then declaration order.
    fn cheapest_shooters(&self) -> Vec<EmplacementKind> {
        let mut kinds: Vec<EmplacementKind> = EmplacementKind::with_tag(KindTag::Shooter).collect();
        kinds.sort_by_key(|&kind| (self.engine.catalog.cost(kind), kind));
        kinds
    }

    /// Rung 7: barrier one column in front of an approaching threat.
    ///
    /// Only this tick's sightings count; a remembered row with nothing in
    /// it right now draws no barrier.
    fn reinforcement(&self) -> Option<Action> {
        let trigger = self.engine.policy.defense_trigger_column;
        // Sightings are sorted by row then column, so the first per row is nearest.
        let mut approaching: Vec<Cell> = self.view.threats.current_sightings().to_vec();
        approaching.dedup_by_key(|threat| threat.row);
        approaching.retain(|threat| threat.col <= trigger);
        approaching.sort_unstable_by_key(|threat| (threat.col, threat.row));

        let mut barriers: Vec<EmplacementKind> =
            EmplacementKind::with_tag(KindTag::Barrier).collect();
        barriers.sort_by_key(|&kind| (Reverse(kind.sturdiness()), kind));

        approaching.into_iter().find_map(|threat| {
            self.first_admissible(barriers.iter().copied(), threat.ahead(), ReasonTag::Reinforcement)
        })
    }
}
