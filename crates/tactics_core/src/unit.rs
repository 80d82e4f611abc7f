//! Per-unit mutable state.
//!
//! Units are referenced everywhere by [`UnitId`]. Cells, squads and
//! commander links hold ids, never owning pointers, so removing a unit
//! from the [`Roster`](crate::roster::Roster) is the only step needed to
//! end its lifetime; stale ids simply resolve to "not found".

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::UnitData;
use crate::experience::{exp_to_next_level, MAX_LEVEL};
use crate::factions::FactionId;
use crate::math::GridPos;

/// Starting morale. Also the neutral point of the morale factor.
pub const DEFAULT_MORALE: i32 = 50;

/// Upper morale bound.
pub const MAX_MORALE: i32 = 100;

/// Unique identifier for a unit, assigned in spawn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct UnitId(u32);

impl UnitId {
    /// Create a new unit ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Actions spent during the current own-faction turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TurnFlags {
    /// Moved this turn.
    pub has_moved: bool,
    /// Attacked this turn.
    pub has_attacked: bool,
    /// Done for this turn.
    pub has_acted: bool,
}

impl TurnFlags {
    /// True if any action was taken.
    #[must_use]
    pub const fn any(self) -> bool {
        self.has_moved || self.has_attacked || self.has_acted
    }

    /// Clear all flags.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stat increments accumulated through level-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LevelBonuses {
    /// Added to attack.
    pub attack: i32,
    /// Added to defense.
    pub defense: i32,
    /// Added to magic attack.
    pub magic_attack: i32,
    /// Added to magic defense.
    pub magic_defense: i32,
    /// Added to max HP.
    pub max_hp: i32,
    /// Added to max MP.
    pub max_mp: i32,
}

/// Squad membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquadLink {
    /// Leads a squad. Ids are membership only.
    Commander {
        /// Linked soldiers, in link order.
        squad: Vec<UnitId>,
    },
    /// Follows a commander, or nobody once the commander has died.
    Soldier {
        /// The commander, if still alive.
        commander: Option<UnitId>,
    },
}

impl Default for SquadLink {
    fn default() -> Self {
        Self::Soldier { commander: None }
    }
}

/// A live unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identity.
    pub id: UnitId,
    /// Owning faction.
    pub faction: FactionId,
    /// Template this unit was spawned from.
    pub template: UnitData,
    /// Last committed cell.
    pub position: GridPos,
    /// Current HP, `0..=max_hp()`.
    pub hp: i32,
    /// Current MP, `0..=max_mp()`.
    pub mp: i32,
    /// `1..=MAX_LEVEL`.
    pub level: u32,
    /// Progress toward the next level.
    pub experience: i32,
    /// `0..=MAX_MORALE`.
    pub morale: i32,
    /// Per-turn action flags.
    pub flags: TurnFlags,
    /// Level-up increments.
    pub bonus: LevelBonuses,
    /// Squad role.
    pub link: SquadLink,
}

impl Unit {
    /// Fresh level-1 soldier with full HP/MP and neutral morale.
    #[must_use]
    pub fn new(id: UnitId, faction: FactionId, template: UnitData, position: GridPos) -> Self {
        let hp = template.max_hp.max(1);
        let mp = template.max_mp.max(0);
        Self {
            id,
            faction,
            template,
            position,
            hp,
            mp,
            level: 1,
            experience: 0,
            morale: DEFAULT_MORALE,
            flags: TurnFlags::default(),
            bonus: LevelBonuses::default(),
            link: SquadLink::default(),
        }
    }

    /// Maximum HP including level bonuses.
    #[must_use]
    pub fn max_hp(&self) -> i32 {
        (self.template.max_hp + self.bonus.max_hp).max(1)
    }

    /// Maximum MP including level bonuses.
    #[must_use]
    pub fn max_mp(&self) -> i32 {
        (self.template.max_mp + self.bonus.max_mp).max(0)
    }

    /// Attack including level bonuses.
    #[must_use]
    pub fn attack(&self) -> i32 {
        self.template.attack + self.bonus.attack
    }

    /// Defense including level bonuses.
    #[must_use]
    pub fn defense(&self) -> i32 {
        self.template.defense + self.bonus.defense
    }

    /// Magic attack including level bonuses.
    #[must_use]
    pub fn magic_attack(&self) -> i32 {
        self.template.magic_attack + self.bonus.magic_attack
    }

    /// Magic defense including level bonuses.
    #[must_use]
    pub fn magic_defense(&self) -> i32 {
        self.template.magic_defense + self.bonus.magic_defense
    }

    /// Still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// True for squad leaders.
    #[must_use]
    pub const fn is_commander(&self) -> bool {
        matches!(self.link, SquadLink::Commander { .. })
    }

    /// The linked commander of a soldier.
    #[must_use]
    pub const fn commander(&self) -> Option<UnitId> {
        match self.link {
            SquadLink::Soldier { commander } => commander,
            SquadLink::Commander { .. } => None,
        }
    }

    /// Squad members of a commander, empty for soldiers.
    #[must_use]
    pub fn squad(&self) -> &[UnitId] {
        match &self.link {
            SquadLink::Commander { squad } => squad,
            SquadLink::Soldier { .. } => &[],
        }
    }

    /// HP as a fraction of max, in percent (rounded down).
    #[must_use]
    pub fn hp_percent(&self) -> i32 {
        self.hp * 100 / self.max_hp()
    }

    /// Reduce HP, flooring at zero. Returns the remaining HP.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        self.hp = (self.hp - amount.max(0)).max(0);
        self.hp
    }

    /// Restore HP up to max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp());
        self.hp - before
    }

    /// Shift morale, clamped to `0..=MAX_MORALE`.
    pub fn modify_morale(&mut self, delta: i32) {
        self.morale = self.morale.saturating_add(delta).clamp(0, MAX_MORALE);
    }

    /// Add experience and apply every level-up it pays for.
    ///
    /// Units at [`MAX_LEVEL`] gain nothing. Returns the number of levels
    /// gained.
    pub fn add_experience(&mut self, amount: i32) -> u32 {
        if self.level >= MAX_LEVEL || amount <= 0 {
            return 0;
        }
        self.experience += amount;

        let mut gained = 0;
        while self.level < MAX_LEVEL && self.experience >= exp_to_next_level(self.level) {
            self.experience -= exp_to_next_level(self.level);
            self.level_up();
            gained += 1;
        }
        if self.level >= MAX_LEVEL {
            self.experience = 0;
        }
        gained
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.bonus.attack += 1;
        self.bonus.defense += 1;
        self.bonus.magic_attack += 1;
        self.bonus.magic_defense += 1;
        self.bonus.max_hp += 2;
        self.bonus.max_mp += 2;
        self.hp = (self.hp + 2).min(self.max_hp());
        self.mp = (self.mp + 2).min(self.max_mp());
        debug!(unit = %self.id, level = self.level, "Level up");
    }
}
