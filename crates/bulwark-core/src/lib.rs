//! Decision core for the bulwark emplacement scheduler.
//!
//! Once per control tick the core decides which single emplacement, if any,
//! to place on the grid. It never performs I/O: threat detection, the
//! resource economy, and placement execution are collaborators reached
//! through the traits in [`collaborators`].
//!
//! # Modules
//!
//! - [`board`] -- Occupancy map of the grid.
//! - [`budget`] -- The spendable resource counter.
//! - [`catalog`] -- Effective cost and delays per emplacement kind.
//! - [`collaborators`] -- Detector, economy, executor, and availability
//!   traits, plus the [`Loadout`] availability source.
//! - [`config`] -- Configuration loading from `bulwark-config.yaml`.
//! - [`controller`] -- The tick runner that ties everything together and
//!   owns the commit step.
//! - [`cooldown`] -- Per-kind readiness timers.
//! - [`decision`] -- Phase state machine and the strictly ordered placement
//!   ladder.
//! - [`threat`] -- Per-row threat memory with time decay.
//!
//! [`Loadout`]: collaborators::Loadout

pub mod board;
pub mod budget;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod cooldown;
pub mod decision;
pub mod threat;

pub use board::{Board, BoardError};
pub use budget::{Budget, BudgetError, BudgetStats};
pub use catalog::Catalog;
pub use controller::{CommitError, Controller, ControllerStats, TickOutcome, TickSummary};
pub use cooldown::CooldownRegistry;
pub use decision::{DecisionEngine, EngineState, TickView};
pub use threat::{RowThreatMemory, ThreatTracker, TrackerUpdate};
