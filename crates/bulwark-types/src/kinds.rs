//! The closed emplacement catalog.
//!
//! Every placeable emplacement is one [`EmplacementKind`]. A kind fixes its
//! [`KindTag`] (which rung of the decision ladder may place it) and its
//! default [`KindProfile`] (cost and readiness delays). Costs and delays may
//! be overridden by configuration; tags may not.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Role of an emplacement kind within the decision ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    /// Generates resource income over time.
    Producer,
    /// Damages threats in its row from a distance.
    Shooter,
    /// Absorbs threat advance in front of other emplacements.
    Barrier,
    /// One-shot explosion clearing a 3x3 neighbourhood.
    AreaDamage,
    /// One-shot removal of a threat, either localized or a whole row.
    InstantKill,
}

/// Reach of an instant-kill emplacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantKillScope {
    /// Clears every threat in the row it is placed in.
    Row,
    /// Removes the threat directly in front of it.
    Local,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Cost and readiness delays of an emplacement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindProfile {
    /// Resource units spent on a successful placement.
    pub cost: u32,
    /// Milliseconds after engine start before the kind is first usable.
    pub initial_delay_ms: u64,
    /// Milliseconds after a placement before the kind is usable again.
    pub recharge_delay_ms: u64,
}

impl KindProfile {
    /// Create a profile from its parts.
    pub const fn new(cost: u32, initial_delay_ms: u64, recharge_delay_ms: u64) -> Self {
        Self {
            cost,
            initial_delay_ms,
            recharge_delay_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// A type of emplacement that can be placed on the board.
///
/// Declaration order is the tie-break order whenever several kinds of the
/// same tag compete for one candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmplacementKind {
    /// Basic resource producer.
    Sunflower,
    /// Cheapest shooter.
    Peashooter,
    /// Shooter that slows its target.
    SnowPea,
    /// Shooter firing two projectiles per volley.
    Repeater,
    /// Area-damage explosive.
    CherryBomb,
    /// Basic barrier.
    WallNut,
    /// Sturdy barrier.
    TallNut,
    /// Localized instant kill that leaps onto the threat in front.
    Squash,
    /// Localized instant kill that needs arming time.
    PotatoMine,
    /// Row-clearing instant kill.
    Jalapeno,
}

impl EmplacementKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Sunflower,
        Self::Peashooter,
        Self::SnowPea,
        Self::Repeater,
        Self::CherryBomb,
        Self::WallNut,
        Self::TallNut,
        Self::Squash,
        Self::PotatoMine,
        Self::Jalapeno,
    ];

    /// Decision-ladder role of this kind.
    pub const fn tag(self) -> KindTag {
        match self {
            Self::Sunflower => KindTag::Producer,
            Self::Peashooter | Self::SnowPea | Self::Repeater => KindTag::Shooter,
            Self::CherryBomb => KindTag::AreaDamage,
            Self::WallNut | Self::TallNut => KindTag::Barrier,
            Self::PotatoMine | Self::Squash | Self::Jalapeno => KindTag::InstantKill,
        }
    }

    /// Reach of an instant-kill kind, `None` for every other tag.
    pub const fn instant_kill_scope(self) -> Option<InstantKillScope> {
        match self {
            Self::Jalapeno => Some(InstantKillScope::Row),
            Self::PotatoMine | Self::Squash => Some(InstantKillScope::Local),
            _ => None,
        }
    }

    /// Relative sturdiness of a barrier kind (higher holds longer), 0 for
    /// non-barriers.
    pub const fn sturdiness(self) -> u8 {
        match self {
            Self::TallNut => 2,
            Self::WallNut => 1,
            _ => 0,
        }
    }

    /// Whether the emplacement disappears by itself shortly after use.
    pub const fn is_consumable(self) -> bool {
        matches!(self.tag(), KindTag::AreaDamage | KindTag::InstantKill)
    }

    /// Built-in cost and delays, before configuration overrides.
    pub const fn default_profile(self) -> KindProfile {
        match self {
            Self::Sunflower => KindProfile::new(50, 0, 7_500),
            Self::Peashooter => KindProfile::new(100, 0, 8_500),
            Self::SnowPea => KindProfile::new(175, 0, 8_500),
            Self::Repeater => KindProfile::new(200, 0, 10_000),
            Self::CherryBomb => KindProfile::new(150, 37_500, 50_500),
            Self::WallNut => KindProfile::new(50, 20_500, 33_500),
            Self::TallNut => KindProfile::new(125, 30_000, 40_000),
            Self::PotatoMine => KindProfile::new(25, 0, 5_000),
            Self::Squash => KindProfile::new(50, 0, 10_000),
            Self::Jalapeno => KindProfile::new(125, 20_000, 30_000),
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sunflower => "sunflower",
            Self::Peashooter => "peashooter",
            Self::SnowPea => "snow pea",
            Self::Repeater => "repeater",
            Self::CherryBomb => "cherry bomb",
            Self::WallNut => "wall-nut",
            Self::TallNut => "tall-nut",
            Self::PotatoMine => "potato mine",
            Self::Squash => "squash",
            Self::Jalapeno => "jalapeno",
        }
    }

    /// Iterate every kind carrying `tag`, in declaration order.
    pub fn with_tag(tag: KindTag) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |kind| kind.tag() == tag)
    }
}

impl fmt::Display for EmplacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_instant_kill_has_a_scope() {
        for kind in EmplacementKind::with_tag(KindTag::InstantKill) {
            assert!(kind.instant_kill_scope().is_some(), "{kind} has no scope");
        }
        assert_eq!(EmplacementKind::Peashooter.instant_kill_scope(), None);
    }

    #[test]
    fn consumables_are_one_shot_tags() {
        let consumables: Vec<EmplacementKind> = EmplacementKind::ALL
            .into_iter()
            .filter(|k| k.is_consumable())
            .collect();
        assert_eq!(
            consumables,
            vec![
                EmplacementKind::CherryBomb,
                EmplacementKind::Squash,
                EmplacementKind::PotatoMine,
                EmplacementKind::Jalapeno,
            ]
        );
    }

    #[test]
    fn tall_nut_is_sturdier_than_wall_nut() {
        assert!(EmplacementKind::TallNut.sturdiness() > EmplacementKind::WallNut.sturdiness());
        assert_eq!(EmplacementKind::Sunflower.sturdiness(), 0);
    }

    #[test]
    fn shooters_in_declaration_order() {
        let shooters: Vec<EmplacementKind> = EmplacementKind::with_tag(KindTag::Shooter).collect();
        assert_eq!(
            shooters,
            vec![
                EmplacementKind::Peashooter,
                EmplacementKind::SnowPea,
                EmplacementKind::Repeater,
            ]
        );
    }

    #[test]
    fn kinds_use_snake_case_keys() {
        let json = serde_json::to_string(&EmplacementKind::CherryBomb).unwrap();
        assert_eq!(json, "\"cherry_bomb\"");
        let parsed: EmplacementKind = serde_yml::from_str("tall_nut").unwrap();
        assert_eq!(parsed, EmplacementKind::TallNut);
    }
}
