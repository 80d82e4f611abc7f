//! The authoritative collection of live units and their squad links.
//!
//! Iteration is always in ascending [`UnitId`] order, which is spawn order.
//! That order is the tie-breaker for every "first found" rule in the
//! simulation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::UnitData;
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::math::GridPos;
use crate::unit::{SquadLink, Unit, UnitId};

/// Storage for live units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Map of unit ID to unit state.
    units: HashMap<UnitId, Unit>,
    /// Next ID to assign.
    next_id: u32,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its ID.
    ///
    /// Does not touch the grid; see
    /// [`Battlefield::spawn_unit`](crate::battlefield::Battlefield::spawn_unit).
    pub fn spawn(&mut self, faction: FactionId, template: UnitData, position: GridPos) -> UnitId {
        let id = UnitId::new(self.next_id.max(1));
        self.next_id = id.raw() + 1;
        self.units
            .insert(id, Unit::new(id, faction, template, position));
        id
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Get a unit or fail with [`GameError::UnitNotFound`].
    pub fn require(&self, id: UnitId) -> Result<&Unit> {
        self.get(id).ok_or(GameError::UnitNotFound(id))
    }

    /// Mutable variant of [`require`](Self::require).
    pub fn require_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.get_mut(id).ok_or(GameError::UnitNotFound(id))
    }

    /// Check if a unit is alive.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if no units remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All unit IDs in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All units in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        let mut units: Vec<&Unit> = self.units.values().collect();
        units.sort_unstable_by_key(|u| u.id);
        units.into_iter()
    }

    /// IDs of a faction's live units, ascending.
    #[must_use]
    pub fn ids_of_faction(&self, faction: FactionId) -> Vec<UnitId> {
        self.iter()
            .filter(|u| u.faction == faction)
            .map(|u| u.id)
            .collect()
    }

    /// Number of live units in a faction.
    #[must_use]
    pub fn count_faction(&self, faction: FactionId) -> usize {
        self.units.values().filter(|u| u.faction == faction).count()
    }

    /// Promote a unit to commander with an empty squad.
    ///
    /// Detaches it from any commander it followed.
    pub fn make_commander(&mut self, id: UnitId) -> Result<()> {
        if let Some(old) = self.require(id)?.commander() {
            self.unlink_soldier(old, id);
        }
        let unit = self.require_mut(id)?;
        if !unit.is_commander() {
            unit.link = SquadLink::Commander { squad: Vec::new() };
        }
        Ok(())
    }

    /// Attach a soldier to a commander's squad.
    pub fn link_soldier(&mut self, commander: UnitId, soldier: UnitId) -> Result<()> {
        if commander == soldier {
            return Err(GameError::InvalidState(format!(
                "unit {soldier} cannot command itself"
            )));
        }
        if !self.require(commander)?.is_commander() {
            return Err(GameError::InvalidState(format!(
                "unit {commander} is not a commander"
            )));
        }
        let current = self.require(soldier)?;
        if current.is_commander() {
            return Err(GameError::InvalidState(format!(
                "commander {soldier} cannot join a squad"
            )));
        }
        if let Some(old) = current.commander() {
            self.unlink_soldier(old, soldier);
        }

        self.require_mut(soldier)?.link = SquadLink::Soldier {
            commander: Some(commander),
        };
        if let SquadLink::Commander { squad } = &mut self.require_mut(commander)?.link {
            if !squad.contains(&soldier) {
                squad.push(soldier);
            }
        }
        Ok(())
    }

    /// Remove a soldier from a commander's squad and clear its back-link.
    ///
    /// Missing units are ignored.
    pub fn unlink_soldier(&mut self, commander: UnitId, soldier: UnitId) {
        if let Some(Unit {
            link: SquadLink::Commander { squad },
            ..
        }) = self.units.get_mut(&commander)
        {
            squad.retain(|&s| s != soldier);
        }
        if let Some(unit) = self.units.get_mut(&soldier) {
            if unit.commander() == Some(commander) {
                unit.link = SquadLink::Soldier { commander: None };
            }
        }
    }

    /// Live commander of a soldier, if any.
    #[must_use]
    pub fn commander_of(&self, id: UnitId) -> Option<&Unit> {
        self.get(id)
            .and_then(Unit::commander)
            .and_then(|c| self.get(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> UnitData {
        UnitData::basic("grunt", 10, 5, 2)
    }

    #[test]
    fn test_spawn_assigns_ascending_ids() {
        let mut roster = Roster::new();
        let a = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(0, 0));
        let b = roster.spawn(FactionId::GoldenHand, template(), GridPos::new(1, 0));
        assert!(a < b);
        assert_eq!(roster.sorted_ids(), vec![a, b]);
        assert_eq!(roster.ids_of_faction(FactionId::GoldenHand), vec![b]);
    }

    #[test]
    fn test_default_roster_starts_at_one() {
        let mut roster = Roster::default();
        let a = roster.spawn(FactionId::Neutral, template(), GridPos::new(0, 0));
        assert_eq!(a, UnitId::new(1));
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut roster = Roster::new();
        let a = roster.spawn(FactionId::Neutral, template(), GridPos::new(0, 0));
        roster.remove(a);
        let b = roster.spawn(FactionId::Neutral, template(), GridPos::new(0, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_link_and_unlink() {
        let mut roster = Roster::new();
        let cmd = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(0, 0));
        let s1 = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(1, 0));
        let s2 = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(2, 0));
        roster.make_commander(cmd).unwrap();
        roster.link_soldier(cmd, s1).unwrap();
        roster.link_soldier(cmd, s2).unwrap();
        roster.link_soldier(cmd, s2).unwrap();

        assert_eq!(roster.get(cmd).unwrap().squad(), &[s1, s2]);
        assert_eq!(roster.commander_of(s1).map(|u| u.id), Some(cmd));

        roster.unlink_soldier(cmd, s1);
        assert_eq!(roster.get(cmd).unwrap().squad(), &[s2]);
        assert_eq!(roster.get(s1).unwrap().commander(), None);
    }

    #[test]
    fn test_link_rejects_non_commander() {
        let mut roster = Roster::new();
        let a = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(0, 0));
        let b = roster.spawn(FactionId::AuroraEmpire, template(), GridPos::new(1, 0));
        assert!(roster.link_soldier(a, b).is_err());
        assert!(roster.link_soldier(a, a).is_err());
        assert_eq!(
            roster.link_soldier(a, UnitId::new(99)),
            Err(GameError::InvalidState(format!("unit {a} is not a commander")))
        );
    }

    #[test]
    fn test_relinking_moves_soldier() {
        let mut roster = Roster::new();
        let c1 = roster.spawn(FactionId::GoldenHand, template(), GridPos::new(0, 0));
        let c2 = roster.spawn(FactionId::GoldenHand, template(), GridPos::new(5, 0));
        let s = roster.spawn(FactionId::GoldenHand, template(), GridPos::new(1, 0));
        roster.make_commander(c1).unwrap();
        roster.make_commander(c2).unwrap();
        roster.link_soldier(c1, s).unwrap();
        roster.link_soldier(c2, s).unwrap();
        assert!(roster.get(c1).unwrap().squad().is_empty());
        assert_eq!(roster.get(c2).unwrap().squad(), &[s]);
    }
}
