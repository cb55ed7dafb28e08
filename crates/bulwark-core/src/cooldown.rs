//! Per-kind readiness timers.
//!
//! A kind that has never been used becomes ready `initial_delay_ms` after
//! engine start. Once used, it becomes ready again `recharge_delay_ms` after
//! the use. The registry knows nothing about budget or occupancy; those
//! gates live in the decision ladder.

use std::collections::BTreeMap;

use bulwark_types::EmplacementKind;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Readiness of one kind after its first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    /// The kind this entry tracks.
    pub kind: EmplacementKind,
    /// Engine time at which the kind becomes usable again.
    pub ready_at_ms: u64,
}

/// Readiness timers for every emplacement kind.
#[derive(Debug, Clone)]
pub struct CooldownRegistry {
    catalog: Catalog,
    engine_start_ms: u64,
    entries: BTreeMap<EmplacementKind, CooldownEntry>,
}

impl CooldownRegistry {
    /// Create a registry whose initial delays count from `now_ms`.
    pub const fn new(catalog: Catalog, now_ms: u64) -> Self {
        Self {
            catalog,
            engine_start_ms: now_ms,
            entries: BTreeMap::new(),
        }
    }

    /// Engine time the initial delays are measured from.
    pub const fn engine_start_ms(&self) -> u64 {
        self.engine_start_ms
    }

    /// Engine time at which `kind` is (or was) ready.
    pub fn ready_at(&self, kind: EmplacementKind) -> u64 {
        match self.entries.get(&kind) {
            Some(entry) => entry.ready_at_ms,
            None => self
                .engine_start_ms
                .saturating_add(self.catalog.profile(kind).initial_delay_ms),
        }
    }

    /// Whether `kind` is off cooldown at `now_ms`.
    pub fn can_use(&self, kind: EmplacementKind, now_ms: u64) -> bool {
        now_ms >= self.ready_at(kind)
    }

    /// Start the recharge of `kind` after a use at `now_ms`.
    ///
    /// Readiness only ever moves forward: a call with an earlier `now_ms`
    /// than a previous one never shortens the pending recharge.
    pub fn mark_used(&mut self, kind: EmplacementKind, now_ms: u64) {
        let ready_at_ms = now_ms.saturating_add(self.catalog.profile(kind).recharge_delay_ms);
        let entry = self
            .entries
            .entry(kind)
            .or_insert(CooldownEntry { kind, ready_at_ms });
        entry.ready_at_ms = entry.ready_at_ms.max(ready_at_ms);
    }

    /// Milliseconds until `kind` is ready, 0 if it already is.
    pub fn time_remaining(&self, kind: EmplacementKind, now_ms: u64) -> u64 {
        self.ready_at(kind).saturating_sub(now_ms)
    }

    /// The entry for `kind`, if it has been used since the last reset.
    pub fn entry(&self, kind: EmplacementKind) -> Option<&CooldownEntry> {
        self.entries.get(&kind)
    }

    /// Forget every use and restart the initial delays from `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.entries.clear();
        self.engine_start_ms = now_ms;
    }
}
