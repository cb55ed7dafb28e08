//! Effective per-kind profiles.
//!
//! Every [`EmplacementKind`] ships with a built-in [`KindProfile`]. The
//! catalog layers configuration overrides on top of those defaults and is
//! the only place the rest of the core reads costs and delays from.

use std::collections::BTreeMap;

use bulwark_types::{EmplacementKind, KindProfile};

/// Built-in profiles plus configured overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    overrides: BTreeMap<EmplacementKind, KindProfile>,
}

impl Catalog {
    /// A catalog using only the built-in profiles.
    pub const fn new() -> Self {
        Self {
            overrides: BTreeMap::new(),
        }
    }

    /// A catalog with the given overrides applied.
    pub const fn with_overrides(overrides: BTreeMap<EmplacementKind, KindProfile>) -> Self {
        Self { overrides }
    }

    /// Replace the profile of one kind.
    pub fn set(&mut self, kind: EmplacementKind, profile: KindProfile) {
        self.overrides.insert(kind, profile);
    }

    /// Effective profile of `kind`.
    pub fn profile(&self, kind: EmplacementKind) -> KindProfile {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_profile())
    }

    /// Effective cost of `kind`.
    pub fn cost(&self, kind: EmplacementKind) -> u32 {
        self.profile(kind).cost
    }
}
