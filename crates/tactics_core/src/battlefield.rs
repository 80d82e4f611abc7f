//! Shared match state and effective stat derivation.
//!
//! [`Battlefield`] bundles the terrain grid, the roster, the relation
//! table, the current weather and the outgoing event log. Effective stats
//! (range, move budget, terrain and aura bonuses) are derived on demand
//! from that state and never cached: they change whenever a unit moves,
//! a commander dies, or the weather turns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{AuraBonuses, UnitData};
use crate::error::{GameError, Result};
use crate::factions::{FactionId, FactionRelations, Relation};
use crate::math::GridPos;
use crate::roster::Roster;
use crate::simulation::MatchOutcome;
use crate::terrain::{TerrainGrid, TerrainKind};
use crate::unit::{SquadLink, Unit, UnitId};
use crate::unit_kind::{MovementType, UnitClass};

/// Morale change for every surviving unit of the dead unit's faction.
pub const DEATH_MORALE_SAME_FACTION: i32 = -10;

/// Morale change for units whose faction regards the dead unit's faction
/// as an enemy.
pub const DEATH_MORALE_ENEMY: i32 = 5;

/// Extra morale change for the squad of a dead commander.
pub const COMMANDER_DEATH_MORALE: i32 = -30;

/// Global weather, chosen by an external collaborator each turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weather {
    /// No effect.
    #[default]
    Clear,
    /// Move range -1 (minimum 1).
    Rain,
    /// Attack range -1 (minimum 1).
    Fog,
}

/// Events emitted for presentation and progression layers.
///
/// The simulation never waits on their consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A faction's turn began.
    TurnStarted {
        /// Active faction.
        faction: FactionId,
        /// Completed rotations so far.
        round: u32,
    },
    /// A unit committed a move. `waypoints` excludes the start cell.
    UnitMoved {
        /// The mover.
        unit: UnitId,
        /// Cell before the move.
        from: GridPos,
        /// Final cell.
        to: GridPos,
        /// Cells entered, in order, for replay by an animator.
        waypoints: Vec<GridPos>,
    },
    /// One engagement was resolved.
    CombatResolved {
        /// Initiator.
        attacker: UnitId,
        /// Target.
        defender: UnitId,
        /// Damage dealt to the defender.
        damage_to_defender: i32,
        /// Counter damage dealt to the attacker (0 if no counter).
        damage_to_attacker: i32,
    },
    /// A unit was removed from play.
    UnitDied {
        /// The dead unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Cell it stood on.
        cell: GridPos,
    },
    /// A resting unit recovered HP.
    Healed {
        /// The unit.
        unit: UnitId,
        /// HP restored.
        amount: i32,
    },
    /// A unit reached a new level.
    LevelUp {
        /// The unit.
        unit: UnitId,
        /// New level.
        level: u32,
    },
    /// The map exit opened.
    ExitUnlocked {
        /// Exit cell.
        cell: GridPos,
    },
    /// A player unit stepped onto the unlocked exit.
    ExitReached {
        /// The unit.
        unit: UnitId,
        /// Exit cell.
        cell: GridPos,
    },
    /// Victory or defeat was decided.
    MatchEnded {
        /// Result from the player's point of view.
        outcome: MatchOutcome,
    },
}

/// Terrain attack modifier for a class standing on a terrain kind.
///
/// First matching rule wins.
#[must_use]
pub const fn terrain_attack_bonus(class: UnitClass, terrain: TerrainKind) -> i32 {
    match (class, terrain) {
        (UnitClass::Cavalry, TerrainKind::Road | TerrainKind::Grass | TerrainKind::Bridge) => 1,
        (UnitClass::Cavalry, TerrainKind::Forest | TerrainKind::Desert | TerrainKind::Snow) => -1,
        (_, TerrainKind::Town) => 1,
        _ => 0,
    }
}

/// Terrain defense modifier. First matching rule wins.
#[must_use]
pub const fn terrain_defense_bonus(
    class: UnitClass,
    movement: MovementType,
    terrain: TerrainKind,
) -> i32 {
    match (class, terrain) {
        (UnitClass::Spearman, TerrainKind::Wall) => 2,
        (_, TerrainKind::Forest) if !movement.is_flyer() => 1,
        (_, TerrainKind::Town) => 1,
        _ => 0,
    }
}

/// Match state shared by combat, AI and the command surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battlefield {
    /// Terrain and occupancy.
    pub grid: TerrainGrid,
    /// Live units.
    pub roster: Roster,
    /// Faction stances.
    pub relations: FactionRelations,
    /// Current weather.
    pub weather: Weather,
    events: Vec<SimEvent>,
}

impl Battlefield {
    /// Empty battlefield on the given grid.
    #[must_use]
    pub fn new(grid: TerrainGrid, relations: FactionRelations) -> Self {
        Self {
            grid,
            roster: Roster::new(),
            relations,
            weather: Weather::Clear,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Append an event to the log.
    pub fn push_event(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Take all pending events.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// True if a unit with this movement kind could be placed on `pos`.
    #[must_use]
    pub fn can_place(&self, movement: MovementType, pos: GridPos) -> bool {
        self.grid.passable(movement, pos) && self.grid.is_free(pos)
    }

    /// Spawn a single unit and claim its cell.
    pub fn spawn_unit(
        &mut self,
        faction: FactionId,
        template: UnitData,
        pos: GridPos,
    ) -> Result<UnitId> {
        if !self.grid.in_bounds(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        if !self.can_place(template.movement_type, pos) {
            return Err(GameError::CellUnavailable(pos));
        }
        let id = self.roster.spawn(faction, template, pos);
        self.grid.set_occupant(pos, Some(id))?;
        Ok(id)
    }

    /// Spawn a commander on `centre` with soldiers on the nearest free
    /// cells around it.
    ///
    /// Soldiers fill the four orthogonal neighbours first, then the
    /// diagonals, then widening square rings. Entry and exit cells are
    /// never used for soldiers.
    pub fn spawn_squad(
        &mut self,
        faction: FactionId,
        commander: UnitData,
        soldiers: &[UnitData],
        centre: GridPos,
    ) -> Result<(UnitId, Vec<UnitId>)> {
        let commander_id = self.spawn_unit(faction, commander, centre)?;
        self.roster.make_commander(commander_id)?;

        let mut squad = Vec::with_capacity(soldiers.len());
        for template in soldiers {
            let cell = self
                .squad_cell_near(centre, template.movement_type)
                .ok_or(GameError::CellUnavailable(centre))?;
            let id = self.spawn_unit(faction, template.clone(), cell)?;
            self.roster.link_soldier(commander_id, id)?;
            squad.push(id);
        }
        debug!(commander = %commander_id, soldiers = squad.len(), %centre, "Spawned squad");
        Ok((commander_id, squad))
    }

    fn squad_cell_near(&self, centre: GridPos, movement: MovementType) -> Option<GridPos> {
        const NEAR: [(i32, i32); 8] = [
            (0, 1),
            (1, 0),
            (0, -1),
            (-1, 0),
            (1, 1),
            (-1, 1),
            (1, -1),
            (-1, -1),
        ];
        let usable = |pos: GridPos| self.can_place(movement, pos) && !self.grid.is_marker(pos);

        let near = NEAR
            .iter()
            .filter_map(|&(dx, dy)| centre.offset(dx, dy))
            .find(|&p| usable(p));
        if near.is_some() {
            return near;
        }

        let max_radius = self.grid.width().max(self.grid.height()) as i32;
        (2..=max_radius).find_map(|r| {
            (-r..=r)
                .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| dx.abs() == r || dy.abs() == r)
                .filter_map(|(dx, dy)| centre.offset(dx, dy))
                .find(|&p| usable(p))
        })
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// How the observer's faction regards the other unit's faction.
    #[must_use]
    pub fn relation_between(&self, observer: &Unit, other: &Unit) -> Relation {
        self.relations.relation(observer.faction, other.faction)
    }

    /// True if `observer` treats `other` as a valid attack target.
    #[must_use]
    pub fn is_enemy(&self, observer: &Unit, other: &Unit) -> bool {
        self.relation_between(observer, other) == Relation::Enemy
    }

    // ------------------------------------------------------------------
    // Aura
    // ------------------------------------------------------------------

    /// The commander whose aura covers this unit, if any.
    ///
    /// A commander is always inside its own aura. A soldier is covered
    /// while its commander lives and is within the commander's radius.
    #[must_use]
    pub fn aura_source(&self, id: UnitId) -> Option<&Unit> {
        let unit = self.roster.get(id)?;
        if unit.is_commander() {
            return Some(unit);
        }
        let commander = self.roster.commander_of(id)?;
        (unit.position.manhattan(commander.position) <= commander.template.aura_radius)
            .then_some(commander)
    }

    /// True if the unit currently benefits from a commander aura.
    #[must_use]
    pub fn in_aura(&self, id: UnitId) -> bool {
        self.aura_source(id).is_some()
    }

    /// Aura bonuses currently applying to the unit (all zero outside).
    #[must_use]
    pub fn aura_bonuses(&self, id: UnitId) -> AuraBonuses {
        self.aura_source(id)
            .map(|c| c.template.aura)
            .unwrap_or_default()
    }

    /// Cells covered by a commander's aura.
    #[must_use]
    pub fn aura_cells(&self, commander: UnitId) -> Vec<GridPos> {
        let Some(unit) = self.roster.get(commander).filter(|u| u.is_commander()) else {
            return Vec::new();
        };
        let radius = unit.template.aura_radius;
        let centre = unit.position;
        let (min_x, max_x) = (
            centre.x.saturating_sub(radius),
            (centre.x + radius).min(self.grid.width() - 1),
        );
        let (min_y, max_y) = (
            centre.y.saturating_sub(radius),
            (centre.y + radius).min(self.grid.height() - 1),
        );
        (min_y..=max_y)
            .flat_map(|y| (min_x..=max_x).map(move |x| GridPos::new(x, y)))
            .filter(|p| p.manhattan(centre) <= radius)
            .collect()
    }

    // ------------------------------------------------------------------
    // Effective stats
    // ------------------------------------------------------------------

    fn terrain_under(&self, unit: &Unit) -> TerrainKind {
        self.grid.terrain(unit.position).unwrap_or_default()
    }

    /// Terrain attack modifier for the unit where it stands.
    #[must_use]
    pub fn terrain_attack_bonus(&self, id: UnitId) -> i32 {
        self.roster.get(id).map_or(0, |u| {
            terrain_attack_bonus(u.template.unit_class, self.terrain_under(u))
        })
    }

    /// Terrain defense modifier for the unit where it stands.
    #[must_use]
    pub fn terrain_defense_bonus(&self, id: UnitId) -> i32 {
        self.roster.get(id).map_or(0, |u| {
            terrain_defense_bonus(
                u.template.unit_class,
                u.template.movement_type,
                self.terrain_under(u),
            )
        })
    }

    /// Effective attack range.
    ///
    /// Fog shortens the base range (never below 1). Archers on a hill or
    /// mountain reach one further, and aura range bonuses are added last.
    #[must_use]
    pub fn attack_range(&self, id: UnitId) -> u32 {
        let Some(unit) = self.roster.get(id) else {
            return 0;
        };
        let mut range = unit.template.attack_range.max(1) as i32;
        if self.weather == Weather::Fog {
            range = (range - 1).max(1);
        }
        if unit.template.unit_class == UnitClass::Archer
            && matches!(
                self.terrain_under(unit),
                TerrainKind::Hill | TerrainKind::Mountain
            )
        {
            range += 1;
        }
        range += self.aura_bonuses(id).range;
        range.max(1) as u32
    }

    /// Effective move budget. Rain costs one point (never below 1).
    #[must_use]
    pub fn move_range(&self, id: UnitId) -> u32 {
        let Some(unit) = self.roster.get(id) else {
            return 0;
        };
        let range = unit.template.move_range;
        if self.weather == Weather::Rain {
            range.saturating_sub(1).max(1)
        } else {
            range.max(1)
        }
    }

    /// Manhattan distance between two live units.
    #[must_use]
    pub fn distance(&self, a: UnitId, b: UnitId) -> Option<u32> {
        let a = self.roster.get(a)?;
        let b = self.roster.get(b)?;
        Some(a.position.manhattan(b.position))
    }

    /// True if `target` is within `attacker`'s effective range.
    #[must_use]
    pub fn in_attack_range(&self, attacker: UnitId, target: UnitId) -> bool {
        self.distance(attacker, target)
            .is_some_and(|d| d >= 1 && d <= self.attack_range(attacker))
    }

    /// Enemy units the attacker could strike from where it stands.
    #[must_use]
    pub fn attackable_targets(&self, attacker: UnitId) -> Vec<UnitId> {
        let Some(unit) = self.roster.get(attacker) else {
            return Vec::new();
        };
        self.roster
            .iter()
            .filter(|other| self.is_enemy(unit, other))
            .filter(|other| self.in_attack_range(attacker, other.id))
            .map(|other| other.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Death
    // ------------------------------------------------------------------

    /// Remove a dead unit and propagate the consequences.
    ///
    /// Clears its cell, detaches it from its squad (or orphans its squad
    /// with a morale penalty if it commanded one), and shifts the morale
    /// of every survivor by relation to the deceased.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        let dead = self.roster.remove(id).ok_or(GameError::UnitNotFound(id))?;

        if self.grid.occupant(dead.position) == Some(id) {
            self.grid.set_occupant(dead.position, None)?;
        }

        match &dead.link {
            SquadLink::Soldier {
                commander: Some(commander),
            } => self.roster.unlink_soldier(*commander, id),
            SquadLink::Commander { squad } => {
                for &member in squad {
                    if let Some(soldier) = self.roster.get_mut(member) {
                        soldier.modify_morale(COMMANDER_DEATH_MORALE);
                        soldier.link = SquadLink::Soldier { commander: None };
                    }
                }
            }
            SquadLink::Soldier { commander: None } => {}
        }

        for survivor in self.roster.sorted_ids() {
            let Some(unit) = self.roster.get(survivor) else {
                continue;
            };
            let delta = if unit.faction == dead.faction {
                DEATH_MORALE_SAME_FACTION
            } else if self.relations.is_enemy(unit.faction, dead.faction) {
                DEATH_MORALE_ENEMY
            } else {
                0
            };
            if delta != 0 {
                if let Some(unit) = self.roster.get_mut(survivor) {
                    unit.modify_morale(delta);
                }
            }
        }

        debug!(unit = %id, faction = ?dead.faction, cell = %dead.position, "Unit died");
        self.push_event(SimEvent::UnitDied {
            unit: id,
            faction: dead.faction,
            cell: dead.position,
        });
        Ok(dead)
    }

    /// Check that every unit stands on a cell that names it, and every
    /// occupied cell names a live unit standing there.
    pub fn validate_occupancy(&self) -> Result<()> {
        for unit in self.roster.iter() {
            if self.grid.occupant(unit.position) != Some(unit.id) {
                return Err(GameError::InconsistentOccupancy {
                    unit: unit.id,
                    cell: unit.position,
                });
            }
        }
        for (cell, id) in self.grid.occupied_cells() {
            match self.roster.get(id) {
                Some(unit) if unit.position == cell => {}
                _ => return Err(GameError::InconsistentOccupancy { unit: id, cell }),
            }
        }
        Ok(())
    }
}
