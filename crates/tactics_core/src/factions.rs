//! Faction definitions, identifiers and the relation table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactionId {
    /// The Aurora Empire - disciplined legions sworn to protect their lords.
    AuroraEmpire,
    /// The Moon Archon Dominion - conquerors that press every advantage.
    MoonArchonDominion,
    /// The Golden Hand - mercenary companies that fight in tight formation.
    GoldenHand,
    /// Unaligned locals defending their ground.
    Neutral,
    /// Bandits and monsters hostile to everyone.
    EvilNeutral,
}

impl FactionId {
    /// All factions in canonical order.
    pub const ALL: [Self; 5] = [
        Self::AuroraEmpire,
        Self::MoonArchonDominion,
        Self::GoldenHand,
        Self::Neutral,
        Self::EvilNeutral,
    ];

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::AuroraEmpire => "The Aurora Empire",
            Self::MoonArchonDominion => "The Moon Archon Dominion",
            Self::GoldenHand => "The Golden Hand",
            Self::Neutral => "Neutral",
            Self::EvilNeutral => "Evil Neutral",
        }
    }

    /// Get the short name for this faction.
    #[must_use]
    pub const fn short_name(&self) -> &'static str {
        match self {
            Self::AuroraEmpire => "Aurora",
            Self::MoonArchonDominion => "Moon",
            Self::GoldenHand => "Golden",
            Self::Neutral => "Neutral",
            Self::EvilNeutral => "Evil",
        }
    }
}

/// Stance of one faction toward another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    /// Same side. Never targeted.
    Ally,
    /// Hostile. Targeted by AI and eligible for attack commands.
    Enemy,
    /// Neither. Not targeted.
    #[default]
    Neutral,
}

/// Directed relation table `(from, to) -> Relation`.
///
/// Total: pairs without an entry resolve to [`Relation::Neutral`], and a
/// faction is always [`Relation::Ally`] to itself regardless of entries.
/// Not required to be symmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRelations {
    entries: HashMap<(FactionId, FactionId), Relation>,
}

impl FactionRelations {
    /// Empty table: everyone Neutral to everyone else.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How `from` regards `to`.
    #[must_use]
    pub fn relation(&self, from: FactionId, to: FactionId) -> Relation {
        if from == to {
            return Relation::Ally;
        }
        self.entries
            .get(&(from, to))
            .copied()
            .unwrap_or_default()
    }

    /// Set a directed relation. Self-relations are ignored.
    pub fn set(&mut self, from: FactionId, to: FactionId, relation: Relation) {
        if from != to {
            self.entries.insert((from, to), relation);
        }
    }

    /// Set the same relation in both directions.
    pub fn set_mutual(&mut self, a: FactionId, b: FactionId, relation: Relation) {
        self.set(a, b, relation);
        self.set(b, a, relation);
    }

    /// True if `from` regards `to` as an enemy.
    #[must_use]
    pub fn is_enemy(&self, from: FactionId, to: FactionId) -> bool {
        self.relation(from, to) == Relation::Enemy
    }

    /// True if `from` regards `to` as an ally (always true for itself).
    #[must_use]
    pub fn is_ally(&self, from: FactionId, to: FactionId) -> bool {
        self.relation(from, to) == Relation::Ally
    }

    /// The standard table for the five factions.
    ///
    /// The three great powers are mutually hostile. Neutral only fights
    /// EvilNeutral, and EvilNeutral fights everyone.
    #[must_use]
    pub fn default_relations() -> Self {
        use FactionId::{AuroraEmpire, EvilNeutral, GoldenHand, MoonArchonDominion, Neutral};

        let mut table = Self::new();
        table.set_mutual(AuroraEmpire, MoonArchonDominion, Relation::Enemy);
        table.set_mutual(AuroraEmpire, GoldenHand, Relation::Enemy);
        table.set_mutual(MoonArchonDominion, GoldenHand, Relation::Enemy);
        for other in [AuroraEmpire, MoonArchonDominion, GoldenHand, Neutral] {
            table.set_mutual(EvilNeutral, other, Relation::Enemy);
        }
        table
    }
}
