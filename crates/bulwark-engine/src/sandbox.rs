//! Seeded sandbox environment the engine drives the controller against.
//!
//! The [`Field`] holds simulated threats that spawn at the far column,
//! walk one column toward the base every few ticks, and die to shooters
//! in their row or to committed instant-kill and area-damage placements.
//! Three thin adapters expose the field through the collaborator traits:
//!
//! - [`SandboxDetector`] reports threats, dropping a fraction of them.
//! - [`SandboxEconomy`] pays a base income plus a bonus per producer.
//! - [`SandboxExecutor`] applies placements, failing a fraction of them.
//!
//! All randomness comes from one [`StdRng`] seeded from configuration, so a
//! run is reproducible.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use bulwark_core::Board;
use bulwark_core::collaborators::{EconomySource, ExecutionError, Executor, ThreatDetector};
use bulwark_types::{Cell, EmplacementKind, GridDims, InstantKillScope, KindTag};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Sandbox tuning, read from the `sandbox` section of `bulwark-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SandboxConfig {
    /// Tick of the first threat spawn.
    #[serde(default = "default_first_spawn_tick")]
    pub first_spawn_tick: u64,

    /// Ticks between spawns (0 disables spawning).
    #[serde(default = "default_spawn_every_ticks")]
    pub spawn_every_ticks: u64,

    /// Ticks between threat advances (0 freezes threats).
    #[serde(default = "default_advance_every_ticks")]
    pub advance_every_ticks: u64,

    /// Kill chance per shooter in the threat's row on each advance.
    #[serde(default = "default_shooter_kill_chance")]
    pub shooter_kill_chance: f64,

    /// Fraction of threats the detector misses each tick.
    #[serde(default = "default_detector_drop_rate")]
    pub detector_drop_rate: f64,

    /// Fraction of placements the executor fails.
    #[serde(default = "default_executor_failure_rate")]
    pub executor_failure_rate: f64,

    /// Income per tick.
    #[serde(default = "default_base_income")]
    pub base_income: u32,

    /// Extra income per tick for every producer placed.
    #[serde(default = "default_producer_bonus")]
    pub producer_bonus: u32,

    /// Breaches after which the controller is reset (0 never resets).
    #[serde(default = "default_breach_reset_threshold")]
    pub breach_reset_threshold: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            first_spawn_tick: default_first_spawn_tick(),
            spawn_every_ticks: default_spawn_every_ticks(),
            advance_every_ticks: default_advance_every_ticks(),
            shooter_kill_chance: default_shooter_kill_chance(),
            detector_drop_rate: default_detector_drop_rate(),
            executor_failure_rate: default_executor_failure_rate(),
            base_income: default_base_income(),
            producer_bonus: default_producer_bonus(),
            breach_reset_threshold: default_breach_reset_threshold(),
        }
    }
}

impl SandboxConfig {
    /// Reject probabilities outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("shooter_kill_chance", self.shooter_kill_chance),
            ("detector_drop_rate", self.detector_drop_rate),
            ("executor_failure_rate", self.executor_failure_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Sandbox {
                    message: format!("{name} must lie in [0, 1], got {value}"),
                });
            }
        }
        Ok(())
    }
}

const fn default_first_spawn_tick() -> u64 {
    24
}

const fn default_spawn_every_ticks() -> u64 {
    10
}

const fn default_advance_every_ticks() -> u64 {
    4
}

const fn default_shooter_kill_chance() -> f64 {
    0.2
}

const fn default_detector_drop_rate() -> f64 {
    0.1
}

const fn default_executor_failure_rate() -> f64 {
    0.05
}

const fn default_base_income() -> u32 {
    10
}

const fn default_producer_bonus() -> u32 {
    4
}

const fn default_breach_reset_threshold() -> u32 {
    3
}

// -----------------------------------------------------------------------
// Field
// -----------------------------------------------------------------------

/// Counters describing what happened in the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    /// Threats spawned.
    pub spawned: u64,
    /// Threats killed by shooters.
    pub shot: u64,
    /// Threats killed by consumables.
    pub blasted: u64,
    /// Threats that walked off the near edge.
    pub breaches: u64,
    /// Placements the executor failed on purpose.
    pub misfires: u64,
}

/// Events of one [`Field::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    /// Threats killed by shooters this step.
    pub shot: u32,
    /// Threats that breached this step.
    pub breached: u32,
}

/// The simulated battlefield.
#[derive(Debug)]
pub struct Field {
    config: SandboxConfig,
    dims: GridDims,
    rng: StdRng,
    threats: Vec<Cell>,
    shooters_per_row: BTreeMap<u32, u32>,
    producers: u32,
    breaches_since_reset: u32,
    stats: FieldStats,
}

impl Field {
    /// Create an empty field.
    pub fn new(config: SandboxConfig, dims: GridDims, seed: u64) -> Self {
        Self {
            config,
            dims,
            rng: StdRng::seed_from_u64(seed),
            threats: Vec::new(),
            shooters_per_row: BTreeMap::new(),
            producers: 0,
            breaches_since_reset: 0,
            stats: FieldStats::default(),
        }
    }

    /// Mirror the controller's board: shooters per row and producer count.
    pub fn observe_board(&mut self, board: &Board) {
        self.shooters_per_row.clear();
        let mut producers: u32 = 0;
        for placed in board.iter() {
            match placed.kind.tag() {
                KindTag::Shooter => {
                    let count = self.shooters_per_row.entry(placed.cell.row).or_insert(0);
                    *count = count.saturating_add(1);
                }
                KindTag::Producer => producers = producers.saturating_add(1),
                KindTag::Barrier | KindTag::AreaDamage | KindTag::InstantKill => {}
            }
        }
        self.producers = producers;
    }

    /// Advance the field to `tick`: move and shoot, then spawn.
    pub fn step(&mut self, tick: u64) -> StepEvents {
        let mut events = StepEvents::default();

        if every(tick, self.config.advance_every_ticks) {
            let threats = std::mem::take(&mut self.threats);
            for threat in threats {
                let shooters = self.shooters_per_row.get(&threat.row).copied().unwrap_or(0);
                let chance =
                    (self.config.shooter_kill_chance * f64::from(shooters)).clamp(0.0, 1.0);
                if shooters > 0 && self.rng.random_bool(chance) {
                    events.shot = events.shot.saturating_add(1);
                    continue;
                }
                if threat.col == 0 {
                    events.breached = events.breached.saturating_add(1);
                    continue;
                }
                self.threats.push(threat.ahead());
            }
            self.stats.shot = self.stats.shot.saturating_add(u64::from(events.shot));
            self.stats.breaches = self.stats.breaches.saturating_add(u64::from(events.breached));
            self.breaches_since_reset = self.breaches_since_reset.saturating_add(events.breached);
        }

        if self.spawn_due(tick) {
            let row = self.rng.random_range(0..self.dims.rows);
            self.threats.push(Cell::new(self.dims.last_col(), row));
            self.stats.spawned = self.stats.spawned.saturating_add(1);
            debug!(tick, row, "Threat spawned");
        }

        events
    }

    fn spawn_due(&self, tick: u64) -> bool {
        tick.checked_sub(self.config.first_spawn_tick)
            .is_some_and(|since| every(since, self.config.spawn_every_ticks))
    }

    /// Whether enough breaches piled up to warrant a controller reset.
    pub const fn needs_reset(&self) -> bool {
        self.config.breach_reset_threshold > 0
            && self.breaches_since_reset >= self.config.breach_reset_threshold
    }

    /// Clear threats and producers after a controller reset.
    pub fn reset(&mut self) {
        self.threats.clear();
        self.shooters_per_row.clear();
        self.producers = 0;
        self.breaches_since_reset = 0;
    }

    /// Live threat positions.
    pub fn threats(&self) -> &[Cell] {
        &self.threats
    }

    /// Running counters.
    pub const fn stats(&self) -> FieldStats {
        self.stats
    }

    fn detect(&mut self) -> Vec<(i32, i32)> {
        let drop_rate = self.config.detector_drop_rate;
        let visible: Vec<Cell> = self.threats.clone();
        visible
            .into_iter()
            .filter(|_| !self.rng.random_bool(drop_rate))
            .map(|cell| (to_i32(cell.col), to_i32(cell.row)))
            .collect()
    }

    fn income(&self) -> u32 {
        self.config
            .base_income
            .saturating_add(self.config.producer_bonus.saturating_mul(self.producers))
    }

    fn apply(&mut self, kind: EmplacementKind, cell: Cell) -> Result<(), ExecutionError> {
        if self.rng.random_bool(self.config.executor_failure_rate) {
            self.stats.misfires = self.stats.misfires.saturating_add(1);
            return Err(ExecutionError::Rejected {
                reason: format!("{kind} missed {cell}"),
            });
        }

        let before = self.threats.len();
        match (kind.tag(), kind.instant_kill_scope()) {
            (KindTag::Producer, _) => self.producers = self.producers.saturating_add(1),
            (KindTag::AreaDamage, _) => {
                self.threats.retain(|threat| !threat.is_adjacent_or_same(cell));
            }
            (KindTag::InstantKill, Some(InstantKillScope::Row)) => {
                self.threats.retain(|threat| threat.row != cell.row);
            }
            (KindTag::InstantKill, _) => {
                let reach = cell.col.saturating_add(1);
                self.threats.retain(|threat| {
                    threat.row != cell.row || threat.col < cell.col || threat.col > reach
                });
            }
            (KindTag::Shooter | KindTag::Barrier, _) => {}
        }
        let blasted = before.saturating_sub(self.threats.len());
        self.stats.blasted = self
            .stats
            .blasted
            .saturating_add(u64::try_from(blasted).unwrap_or(u64::MAX));
        Ok(())
    }
}

fn every(tick: u64, period: u64) -> bool {
    tick.checked_rem(period) == Some(0)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// -----------------------------------------------------------------------
// Collaborator adapters
// -----------------------------------------------------------------------

/// Shared handle to the field.
pub type SharedField = Rc<RefCell<Field>>;

/// Noisy threat detector over the field.
pub struct SandboxDetector {
    field: SharedField,
}

impl SandboxDetector {
    /// Wrap a shared field.
    pub const fn new(field: SharedField) -> Self {
        Self { field }
    }
}

impl ThreatDetector for SandboxDetector {
    fn detect(&mut self) -> Vec<(i32, i32)> {
        self.field.borrow_mut().detect()
    }
}

/// Income source over the field.
pub struct SandboxEconomy {
    field: SharedField,
}

impl SandboxEconomy {
    /// Wrap a shared field.
    pub const fn new(field: SharedField) -> Self {
        Self { field }
    }
}

impl EconomySource for SandboxEconomy {
    fn collect(&mut self) -> u32 {
        self.field.borrow().income()
    }
}

/// Unreliable placement executor over the field.
pub struct SandboxExecutor {
    field: SharedField,
}

impl SandboxExecutor {
    /// Wrap a shared field.
    pub const fn new(field: SharedField) -> Self {
        Self { field }
    }
}

impl Executor for SandboxExecutor {
    fn execute(&mut self, kind: EmplacementKind, cell: Cell) -> Result<(), ExecutionError> {
        self.field.borrow_mut().apply(kind, cell)
    }
}

/// A field together with its three adapters.
pub struct Sandbox {
    /// The shared field.
    pub field: SharedField,
    /// Detector over `field`.
    pub detector: SandboxDetector,
    /// Economy over `field`.
    pub economy: SandboxEconomy,
    /// Executor over `field`.
    pub executor: SandboxExecutor,
}

impl Sandbox {
    /// Build a seeded field and wire the adapters to it.
    pub fn new(config: SandboxConfig, dims: GridDims, seed: u64) -> Self {
        let field: SharedField = Rc::new(RefCell::new(Field::new(config, dims, seed)));
        Self {
            detector: SandboxDetector::new(Rc::clone(&field)),
            economy: SandboxEconomy::new(Rc::clone(&field)),
            executor: SandboxExecutor::new(Rc::clone(&field)),
            field,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn quiet() -> SandboxConfig {
        SandboxConfig {
            first_spawn_tick: 1,
            spawn_every_ticks: 2,
            advance_every_ticks: 1,
            shooter_kill_chance: 0.0,
            detector_drop_rate: 0.0,
            executor_failure_rate: 0.0,
            ..SandboxConfig::default()
        }
    }

    fn field(config: SandboxConfig) -> Field {
        Field::new(config, GridDims::default(), 7)
    }

    #[test]
    fn threats_spawn_far_and_walk_in() {
        let mut field = field(quiet());
        field.step(0);
        assert!(field.threats().is_empty());
        field.step(1);
        assert_eq!(field.threats().len(), 1);
        let spawned = *field.threats().first().unwrap();
        assert_eq!(spawned.col, 8);

        field.step(2);
        assert_eq!(field.threats().first().unwrap().col, 7);
        assert_eq!(field.stats().spawned, 1);
    }

    #[test]
    fn threat_past_column_zero_is_a_breach() {
        let config = SandboxConfig {
            spawn_every_ticks: 0,
            breach_reset_threshold: 1,
            ..quiet()
        };
        let mut field = field(config);
        field.threats.push(Cell::new(0, 2));
        let events = field.step(5);
        assert_eq!(events.breached, 1);
        assert!(field.threats().is_empty());
        assert!(field.needs_reset());
        field.reset();
        assert!(!field.needs_reset());
    }

    #[test]
    fn consumables_remove_threats() {
        let mut field = field(quiet());
        field.threats = vec![Cell::new(4, 2), Cell::new(5, 3), Cell::new(7, 2), Cell::new(4, 0)];

        field.apply(EmplacementKind::CherryBomb, Cell::new(4, 2)).unwrap();
        assert_eq!(field.threats(), &[Cell::new(7, 2), Cell::new(4, 0)]);

        field.apply(EmplacementKind::Jalapeno, Cell::new(0, 2)).unwrap();
        assert_eq!(field.threats(), &[Cell::new(4, 0)]);

        field.apply(EmplacementKind::Squash, Cell::new(3, 0)).unwrap();
        assert!(field.threats().is_empty());
        assert_eq!(field.stats().blasted, 4);
    }

    #[test]
    fn income_grows_with_producers() {
        let mut field = field(quiet());
        assert_eq!(field.income(), 10);
        field.apply(EmplacementKind::Sunflower, Cell::new(0, 2)).unwrap();
        assert_eq!(field.income(), 14);
    }

    #[test]
    fn certain_failure_never_applies() {
        let config = SandboxConfig {
            executor_failure_rate: 1.0,
            ..quiet()
        };
        let mut field = field(config);
        let err = field.apply(EmplacementKind::Sunflower, Cell::new(0, 2));
        assert!(matches!(err, Err(ExecutionError::Rejected { .. })));
        assert_eq!(field.income(), 10);
        assert_eq!(field.stats().misfires, 1);
    }

    #[test]
    fn adapters_share_one_field() {
        let mut sandbox = Sandbox::new(quiet(), GridDims::default(), 7);
        sandbox.field.borrow_mut().threats.push(Cell::new(6, 1));

        assert_eq!(sandbox.detector.detect(), vec![(6, 1)]);
        sandbox
            .executor
            .execute(EmplacementKind::Sunflower, Cell::new(0, 1))
            .unwrap();
        assert_eq!(sandbox.economy.collect(), 14);
    }

    #[test]
    fn same_seed_same_run() {
        let run = || {
            let mut field = field(SandboxConfig {
                detector_drop_rate: 0.5,
                ..quiet()
            });
            let mut seen = Vec::new();
            for tick in 0..20 {
                field.step(tick);
                seen.push(field.detect());
            }
            seen
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn probabilities_are_validated() {
        let bad = SandboxConfig {
            detector_drop_rate: 1.5,
            ..SandboxConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(SandboxConfig::default().validate().is_ok());
    }
}
