//! Match metrics collected from the simulation event log.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use tactics_core::prelude::*;

/// Metrics for a single faction in a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Units on the field when the match started.
    pub units_deployed: u32,
    /// Units killed.
    pub units_lost: u32,
    /// Enemy units this faction killed.
    pub kills: u32,
    /// Damage dealt, counters included.
    pub damage_dealt: i64,
    /// Damage received, counters included.
    pub damage_taken: i64,
    /// HP regained by resting.
    pub hp_healed: i64,
    /// Level-ups gained.
    pub level_ups: u32,
    /// Faction turns played.
    pub turns: u32,
    /// Units alive at the end.
    pub survivors: u32,
}

/// Folds [`SimEvent`]s into per-faction metrics.
///
/// Units never change faction, so ownership is captured once when the
/// collector is created and kept for units that later die.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    owners: HashMap<UnitId, FactionId>,
    factions: BTreeMap<FactionId, FactionMetrics>,
    last_combat: Option<(UnitId, UnitId)>,
    deaths: u32,
}

impl MetricsCollector {
    /// Start collecting for the units currently on the field.
    #[must_use]
    pub fn new(field: &Battlefield) -> Self {
        let mut collector = Self::default();
        for unit in field.roster.iter() {
            collector.owners.insert(unit.id, unit.faction);
            collector.faction_mut(unit.faction).units_deployed += 1;
        }
        collector
    }

    /// Get or create faction metrics.
    pub fn faction_mut(&mut self, faction: FactionId) -> &mut FactionMetrics {
        self.factions.entry(faction).or_default()
    }

    /// Metrics for one faction, if it ever appeared.
    #[must_use]
    pub fn faction(&self, faction: FactionId) -> Option<&FactionMetrics> {
        self.factions.get(&faction)
    }

    /// Total units killed so far.
    #[must_use]
    pub const fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Record a batch of drained events.
    pub fn record_all(&mut self, events: &[SimEvent]) {
        for event in events {
            self.record(event);
        }
    }

    /// Record one event.
    pub fn record(&mut self, event: &SimEvent) {
        match event {
            SimEvent::TurnStarted { faction, .. } => self.faction_mut(*faction).turns += 1,
            SimEvent::CombatResolved {
                attacker,
                defender,
                damage_to_defender,
                damage_to_attacker,
            } => {
                self.last_combat = Some((*attacker, *defender));
                self.add_damage(*attacker, *defender, *damage_to_defender);
                self.add_damage(*defender, *attacker, *damage_to_attacker);
            }
            SimEvent::UnitDied { unit, faction, .. } => {
                self.deaths += 1;
                self.faction_mut(*faction).units_lost += 1;
                let killer = match self.last_combat {
                    Some((a, d)) if d == *unit => Some(a),
                    Some((a, d)) if a == *unit => Some(d),
                    _ => None,
                };
                if let Some(owner) = killer.and_then(|k| self.owners.get(&k).copied()) {
                    self.faction_mut(owner).kills += 1;
                }
            }
            SimEvent::Healed { unit, amount } => {
                if let Some(owner) = self.owners.get(unit).copied() {
                    self.faction_mut(owner).hp_healed += i64::from(*amount);
                }
            }
            SimEvent::LevelUp { unit, .. } => {
                if let Some(owner) = self.owners.get(unit).copied() {
                    self.faction_mut(owner).level_ups += 1;
                }
            }
            SimEvent::UnitMoved { .. }
            | SimEvent::ExitUnlocked { .. }
            | SimEvent::ExitReached { .. }
            | SimEvent::MatchEnded { .. } => {}
        }
    }

    fn add_damage(&mut self, from: UnitId, to: UnitId, amount: i32) {
        if amount == 0 {
            return;
        }
        if let Some(owner) = self.owners.get(&from).copied() {
            self.faction_mut(owner).damage_dealt += i64::from(amount);
        }
        if let Some(owner) = self.owners.get(&to).copied() {
            self.faction_mut(owner).damage_taken += i64::from(amount);
        }
    }

    /// Fill in survivors and hand back the per-faction table.
    #[must_use]
    pub fn finish(mut self, field: &Battlefield) -> BTreeMap<FactionId, FactionMetrics> {
        for metrics in self.factions.values_mut() {
            metrics.survivors = 0;
        }
        for unit in field.roster.iter() {
            self.faction_mut(unit.faction).survivors += 1;
        }
        self.factions
    }
}
