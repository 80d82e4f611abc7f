//! Unit classification: combat class, movement kind and AI temperament.
//!
//! - [`UnitClass`]: rock-paper-scissors class used by combat and terrain bonuses
//! - [`MovementType`]: terrain interaction rules for pathfinding
//! - [`Temperament`]: bitflags selecting AI behaviours for a faction

use serde::{Deserialize, Serialize};

/// Combat class of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitClass {
    /// Line infantry. Beats spearmen, and archers at melee range.
    #[default]
    Infantry,
    /// Mounted. Beats infantry.
    Cavalry,
    /// Pike line. Beats cavalry.
    Spearman,
    /// Ranged. Beats flyers, gains range on high ground.
    Archer,
    /// Airborne.
    Flyer,
    /// Caster.
    Mage,
}

impl UnitClass {
    /// True if this class has a 1.5x matchup against `defender`.
    ///
    /// `melee` is true when the attacker's effective range is 1.
    #[must_use]
    pub const fn beats(self, defender: Self, melee: bool) -> bool {
        matches!(
            (self, defender),
            (Self::Spearman, Self::Cavalry)
                | (Self::Cavalry, Self::Infantry)
                | (Self::Infantry, Self::Spearman)
                | (Self::Archer, Self::Flyer)
        ) || (melee && matches!((self, defender), (Self::Infantry, Self::Archer)))
    }
}

/// How a unit interacts with terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementType {
    /// Standard ground movement.
    #[default]
    Foot,
    /// Ground movement with extra cost on rough terrain.
    Cavalry,
    /// Ignores terrain: everything passable at cost 1.
    Flyer,
}

impl MovementType {
    /// True for flyers.
    #[must_use]
    pub const fn is_flyer(self) -> bool {
        matches!(self, Self::Flyer)
    }
}

/// Behaviour flags combined per faction to form an AI policy.
///
/// # Example
///
/// ```
/// use tactics_core::unit_kind::Temperament;
///
/// let t = Temperament::CAUTIOUS.union(Temperament::PACK);
/// assert!(t.contains(Temperament::PACK));
/// assert!(!t.contains(Temperament::RUTHLESS));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperament(u8);

impl Temperament {
    /// Wounded commanders hold to heal; wounded soldiers fall back to
    /// their commander.
    pub const CAUTIOUS: Self = Self(1 << 0);
    /// Protect wounded allied commanders; refuse suicidal non-lethal attacks.
    pub const HONOR_BOUND: Self = Self(1 << 1);
    /// Always engage the best target, no self-preservation.
    pub const RUTHLESS: Self = Self(1 << 2);
    /// Idle soldiers close on the nearest ally.
    pub const PACK: Self = Self(1 << 3);
    /// Isolated soldiers regroup on their commander before engaging.
    pub const COHESIVE: Self = Self(1 << 4);

    /// No flags set: the plain default policy.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags in `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flags in `other` are set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Combine two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Parse flag names such as `"cautious"` or `"pack"`.
    ///
    /// Unknown names are ignored.
    #[must_use]
    pub fn from_names(names: &[String]) -> Self {
        names
            .iter()
            .fold(Self::empty(), |acc, name| match name.to_lowercase().as_str() {
                "cautious" => acc | Self::CAUTIOUS,
                "honor_bound" | "honour_bound" => acc | Self::HONOR_BOUND,
                "ruthless" => acc | Self::RUTHLESS,
                "pack" => acc | Self::PACK,
                "cohesive" => acc | Self::COHESIVE,
                _ => acc,
            })
    }
}

impl std::ops::BitOr for Temperament {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Temperament {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}
