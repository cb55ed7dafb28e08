//! End-to-end decision scenarios and ladder properties.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use bulwark_core::collaborators::AllAvailable;
use bulwark_core::config::BulwarkConfig;
use bulwark_core::{
    Board, CooldownRegistry, DecisionEngine, EngineState, ThreatTracker, TickView,
};
use bulwark_types::{Action, Cell, EmplacementKind, Phase, ReasonTag, ThreatSighting};

/// Every initial delay has elapsed by then.
const LATE: u64 = 60_000;

struct Harness {
    engine: DecisionEngine,
    board: Board,
    cooldowns: CooldownRegistry,
    threats: ThreatTracker,
    state: EngineState,
}

impl Harness {
    fn new() -> Self {
        let config = BulwarkConfig::default();
        Self {
            engine: DecisionEngine::from_config(&config),
            board: Board::new(config.dims()),
            cooldowns: CooldownRegistry::new(config.catalog(), 0),
            threats: ThreatTracker::new(config.dims(), config.threat.memory_window_ms),
            state: EngineState::new(),
        }
    }

    fn place(&mut self, kind: EmplacementKind, col: u32, row: u32) {
        self.board.place(kind, Cell::new(col, row), 0).unwrap();
    }

    fn see(&mut self, threats: &[(i32, i32)], now_ms: u64) {
        let sightings: Vec<ThreatSighting> = threats
            .iter()
            .map(|&(col, row)| ThreatSighting::new(col, row, now_ms))
            .collect();
        let _ = self.threats.update(&sightings, now_ms, &self.board);
    }

    fn decide(&mut self, budget: u32, now_ms: u64) -> Option<Action> {
        let view = TickView {
            board: &self.board,
            cooldowns: &self.cooldowns,
            threats: &self.threats,
            budget,
            availability: &AllAvailable,
            now_ms,
        };
        self.engine.evaluate(&mut self.state, &view)
    }

    fn commit(&mut self, action: &Action, now_ms: u64) {
        self.board.place(action.kind, action.cell, now_ms).unwrap();
        self.cooldowns.mark_used(action.kind, now_ms);
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_board_starts_with_first_production_cell() {
    let mut h = Harness::new();
    let action = h.decide(200, 0).unwrap();
    assert_eq!(action.kind, EmplacementKind::Sunflower);
    assert_eq!(action.cell, Cell::new(0, 2));
    assert_eq!(action.reason, ReasonTag::Production);
}

#[test]
fn panic_breach_preempts_production() {
    let mut h = Harness::new();
    h.see(&[(2, 3)], 20_000);
    let action = h.decide(150, 20_000).unwrap();
    assert_eq!(action.reason, ReasonTag::PanicBreach);
    assert_eq!(action.kind, EmplacementKind::Jalapeno);
    assert_eq!(action.cell, Cell::new(2, 3));
}

#[test]
fn threat_near_shooter_gets_area_damage_at_midpoint() {
    let mut h = Harness::new();
    h.place(EmplacementKind::Peashooter, 3, 1);
    h.see(&[(1, 1)], LATE);
    let action = h.decide(150, LATE).unwrap();
    assert_eq!(action.reason, ReasonTag::AreaDamageProximity);
    assert_eq!(action.kind, EmplacementKind::CherryBomb);
    assert_eq!(action.cell, Cell::new(2, 1));
}

#[test]
fn filled_primary_region_moves_on_to_expansion() {
    let mut h = Harness::new();
    for row in [2, 1, 3] {
        h.place(EmplacementKind::Sunflower, 0, row);
        h.place(EmplacementKind::Peashooter, 1, row);
        h.place(EmplacementKind::Peashooter, 2, row);
    }
    h.state.phase = Phase::DefenseBuild;

    let action = h.decide(200, LATE).unwrap();
    assert_eq!(h.state.phase, Phase::Expansion);
    assert_eq!(action.reason, ReasonTag::Production);
    assert_eq!(action.kind, EmplacementKind::Sunflower);
    assert_eq!(action.cell, Cell::new(0, 0));
}

#[test]
fn full_run_walks_every_phase() {
    let mut h = Harness::new();
    let mut now = LATE;
    let mut seen = vec![h.state.phase];
    for _ in 0..40 {
        if let Some(action) = h.decide(1_000, now) {
            h.commit(&action, now);
        }
        if seen.last() != Some(&h.state.phase) {
            seen.push(h.state.phase);
        }
        now += 60_000;
    }
    assert_eq!(
        seen,
        vec![
            Phase::Production,
            Phase::DefenseBuild,
            Phase::Expansion,
            Phase::Steady
        ]
    );
    assert_eq!(h.board.count_tag(bulwark_types::KindTag::Producer), 5);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn nothing_affordable_means_no_action() {
    let mut h = Harness::new();
    h.see(&[(1, 0), (2, 1), (2, 2), (3, 2), (4, 4)], LATE);
    assert_eq!(h.decide(0, LATE), None);
    assert_eq!(h.decide(24, LATE), None);
}

#[test]
fn cooldown_window_is_exact() {
    let catalog = BulwarkConfig::default().catalog();
    let mut cooldowns = CooldownRegistry::new(catalog.clone(), 0);
    let kind = EmplacementKind::Peashooter;
    let recharge = catalog.profile(kind).recharge_delay_ms;
    cooldowns.mark_used(kind, 1_000);
    for t in [1_000, 1_001, 1_000 + recharge - 1] {
        assert!(!cooldowns.can_use(kind, t), "ready too early at {t}");
    }
    assert!(cooldowns.can_use(kind, 1_000 + recharge));
    assert!(cooldowns.can_use(kind, 1_000 + recharge * 3));
}

#[test]
fn occupied_cells_are_never_proposed() {
    let mut h = Harness::new();
    h.place(EmplacementKind::WallNut, 0, 2);
    h.place(EmplacementKind::WallNut, 2, 3);
    let blocked = [Cell::new(0, 2), Cell::new(2, 3)];

    let threat_sets: [&[(i32, i32)]; 4] = [&[], &[(2, 3)], &[(3, 3), (3, 2), (2, 2)], &[(4, 3)]];
    for threats in threat_sets {
        h.see(threats, LATE);
        for budget in [50, 100, 150, 300, 1_000] {
            if let Some(action) = h.decide(budget, LATE) {
                assert!(!blocked.contains(&action.cell), "{action} targets an occupied cell");
                assert!(h.board.is_empty(action.cell));
                assert!(h.engine.catalog().cost(action.kind) <= budget);
            }
        }
    }
}

#[test]
fn repeated_evaluation_is_stable() {
    let mut h = Harness::new();
    h.place(EmplacementKind::Sunflower, 0, 2);
    h.see(&[(7, 1), (5, 3)], LATE);
    let first = h.decide(400, LATE);
    let second = h.decide(400, LATE);
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(h.state.production_progress, 2);
}

#[test]
fn earlier_rung_always_wins() {
    let mut h = Harness::new();
    h.place(EmplacementKind::Peashooter, 4, 2);
    // Cluster, panic, production, and proximity candidates all present.
    h.see(&[(3, 2), (2, 1), (3, 1), (2, 2)], LATE);
    let action = h.decide(1_000, LATE).unwrap();
    assert_eq!(action.reason, ReasonTag::AreaDamageProximity);
    assert_eq!(action.reason.rung(), 1);
}
