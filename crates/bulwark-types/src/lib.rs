//! Shared type definitions for the bulwark emplacement scheduler.
//!
//! This crate is the single source of truth for the value types exchanged
//! between the decision core, its collaborators, and the engine binary.
//! Nothing here owns mutable state; every type is a plain value.
//!
//! # Modules
//!
//! - [`grid`] -- Grid addressing ([`Cell`], [`GridDims`]).
//! - [`kinds`] -- The closed emplacement catalog ([`EmplacementKind`],
//!   [`KindTag`], [`KindProfile`]).
//! - [`threat`] -- Raw threat sightings as produced by a detector.
//! - [`action`] -- Decision outputs ([`Action`], [`ReasonTag`]), the policy
//!   [`Phase`], and [`PlacedEmplacement`].

pub mod action;
pub mod grid;
pub mod kinds;
pub mod threat;

// Re-export all public types at crate root for convenience.
pub use action::{Action, Phase, PlacedEmplacement, ReasonTag};
pub use grid::{Cell, GridDims};
pub use kinds::{EmplacementKind, InstantKillScope, KindProfile, KindTag};
pub use threat::ThreatSighting;
