//! Match owner: turn flow, AI driving and the human command surface.
//!
//! [`SimulationContext`] is constructed once per match and owns the
//! [`Battlefield`] and the [`TurnScheduler`]. Everything that mutates the
//! match goes through it, so AI policies and command handlers receive
//! their state explicitly instead of reaching for globals.
//!
//! # Turn Flow
//!
//! On entering a faction's turn:
//! 1. **Wait healing** - units of that faction that did nothing last turn
//!    rest: commanders always heal, soldiers heal when standing next to
//!    their living commander, and anyone in an aura gains morale.
//! 2. **Flag reset** - per-turn action flags are cleared.
//! 3. **Control** - a human faction suspends until [`end_turn`]; an AI
//!    faction runs its policy over a snapshot of its units and the turn
//!    passes automatically.
//!
//! A victory/defeat check runs after every death.
//!
//! [`end_turn`]: SimulationContext::end_turn
//!
//! # Example
//!
//! ```
//! use tactics_core::prelude::*;
//!
//! let grid = TerrainGrid::new(6, 6);
//! let mut field = Battlefield::new(grid, FactionRelations::default_relations());
//! let hero = field
//!     .spawn_unit(FactionId::AuroraEmpire, UnitData::basic("hero", 20, 8, 3), GridPos::new(0, 0))
//!     .unwrap();
//! field
//!     .spawn_unit(FactionId::GoldenHand, UnitData::basic("foe", 20, 8, 3), GridPos::new(5, 5))
//!     .unwrap();
//!
//! let mut sim = SimulationContext::new(
//!     field,
//!     vec![FactionId::AuroraEmpire, FactionId::GoldenHand],
//!     FactionId::AuroraEmpire,
//! )
//! .unwrap();
//! sim.start().unwrap();
//!
//! let selection = sim.select_unit(hero).unwrap();
//! assert!(selection.reachable.contains(&GridPos::new(2, 0)));
//! sim.request_move(hero, GridPos::new(2, 0)).unwrap();
//! sim.confirm_move().unwrap();
//! sim.end_turn().unwrap();
//! assert_eq!(sim.current_faction(), FactionId::AuroraEmpire);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::{AiTurn, FactionPolicy};
use crate::battlefield::{Battlefield, SimEvent, Weather};
use crate::combat::{self, CombatReport};
use crate::error::{GameError, Result};
use crate::factions::{FactionId, Relation};
use crate::math::GridPos;
use crate::movement::walk_path;
use crate::pathfinding::{find_path, reachable_cells};
use crate::turn::TurnScheduler;
use crate::unit::UnitId;

/// HP restored to a resting unit.
pub const WAIT_HEAL: i32 = 3;

/// Who issues orders for a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// External commands through the command surface.
    Human,
    /// Automated policy.
    Ai(FactionPolicy),
}

/// Result of a finished match, from the player faction's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// No unit of any non-allied faction survives.
    Victory,
    /// No unit of the player faction survives.
    Defeat,
}

/// What a selected unit can still do this turn, for overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The selected unit.
    pub unit: UnitId,
    /// Cells it can end a move on (empty once it has moved).
    pub reachable: Vec<GridPos>,
    /// Cells holding enemies it can strike (empty once it has attacked).
    pub attackable: Vec<GridPos>,
}

/// A previewed move awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    /// The mover.
    pub unit: UnitId,
    /// Destination cell.
    pub destination: GridPos,
    /// Full path including the start cell.
    pub path: Vec<GridPos>,
}

/// One match.
///
/// Serializable as a whole so a match can be saved between turns with
/// [`to_bytes`](Self::to_bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationContext {
    field: Battlefield,
    turns: TurnScheduler,
    controllers: HashMap<FactionId, Controller>,
    player: FactionId,
    outcome: Option<MatchOutcome>,
    cancelled: bool,
    started: bool,
    selected: Option<UnitId>,
    pending: Option<PendingMove>,
}

impl SimulationContext {
    /// Build a match over a populated battlefield.
    ///
    /// `player` is the faction victory and defeat are judged for. It is
    /// human-controlled by default; every other faction in `order` runs
    /// its standard [`FactionPolicy`].
    ///
    /// # Errors
    ///
    /// Fails if the turn order is empty or repeats a faction.
    pub fn new(field: Battlefield, order: Vec<FactionId>, player: FactionId) -> Result<Self> {
        let turns = TurnScheduler::new(order)?;
        let controllers = turns
            .order()
            .iter()
            .map(|&f| {
                let controller = if f == player {
                    Controller::Human
                } else {
                    Controller::Ai(FactionPolicy::for_faction(f))
                };
                (f, controller)
            })
            .collect();
        Ok(Self {
            field,
            turns,
            controllers,
            player,
            outcome: None,
            cancelled: false,
            started: false,
            selected: None,
            pending: None,
        })
    }

    /// Replace a faction's controller. Takes effect from its next action.
    pub fn set_controller(&mut self, faction: FactionId, controller: Controller) {
        self.controllers.insert(faction, controller);
    }

    /// Controller of a faction. Factions outside the rotation default to
    /// their standard AI.
    #[must_use]
    pub fn controller(&self, faction: FactionId) -> Controller {
        self.controllers
            .get(&faction)
            .copied()
            .unwrap_or_else(|| Controller::Ai(FactionPolicy::for_faction(faction)))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Read-only match state.
    #[must_use]
    pub const fn field(&self) -> &Battlefield {
        &self.field
    }

    /// Mutable match state for setup and scripted scenarios.
    pub fn field_mut(&mut self) -> &mut Battlefield {
        &mut self.field
    }

    /// The faction whose turn it is.
    #[must_use]
    pub fn current_faction(&self) -> FactionId {
        self.turns.current()
    }

    /// Completed rotations.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.turns.round()
    }

    /// The faction victory and defeat are judged for.
    #[must_use]
    pub const fn player(&self) -> FactionId {
        self.player
    }

    /// Final result, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// True after victory, defeat or teardown.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some() || self.cancelled
    }

    /// True if the active faction waits for external commands.
    #[must_use]
    pub fn awaiting_input(&self) -> bool {
        !self.is_over() && self.controller(self.current_faction()) == Controller::Human
    }

    /// The move preview awaiting confirmation.
    #[must_use]
    pub const fn pending_move(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    /// The currently selected unit.
    #[must_use]
    pub const fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    /// Cells covered by a commander's aura.
    #[must_use]
    pub fn aura_cells(&self, commander: UnitId) -> Vec<GridPos> {
        self.field.aura_cells(commander)
    }

    /// Cells `unit` could end a move on right now.
    #[must_use]
    pub fn reachable_cells(&self, unit: UnitId) -> Vec<GridPos> {
        let Some(u) = self.field.roster.get(unit) else {
            return Vec::new();
        };
        reachable_cells(
            &self.field.grid,
            u.position,
            self.field.move_range(unit),
            u.template.movement_type,
        )
    }

    /// Cells holding enemies `unit` could strike from where it stands.
    #[must_use]
    pub fn attackable_cells(&self, unit: UnitId) -> Vec<GridPos> {
        self.field
            .attackable_targets(unit)
            .into_iter()
            .filter_map(|id| self.field.roster.get(id).map(|u| u.position))
            .collect()
    }

    /// Check the cell/unit occupancy invariant.
    ///
    /// # Errors
    ///
    /// [`GameError::InconsistentOccupancy`] on the first mismatch.
    pub fn validate_occupancy(&self) -> Result<()> {
        self.field.validate_occupancy()
    }

    /// Take all events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.field.drain_events()
    }

    /// Set the weather for the coming turns.
    pub fn set_weather(&mut self, weather: Weather) {
        self.field.weather = weather;
    }

    /// Hash of every piece of state that affects future play.
    ///
    /// Two contexts that received the same setup and the same commands
    /// hash identically.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.turns.current().hash(&mut hasher);
        self.turns.round().hash(&mut hasher);
        self.field.weather.hash(&mut hasher);
        self.field.grid.exit_unlocked().hash(&mut hasher);
        self.outcome.hash(&mut hasher);

        let ids = self.field.roster.sorted_ids();
        ids.len().hash(&mut hasher);
        for unit in self.field.roster.iter() {
            unit.id.hash(&mut hasher);
            unit.faction.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.hp.hash(&mut hasher);
            unit.mp.hash(&mut hasher);
            unit.level.hash(&mut hasher);
            unit.experience.hash(&mut hasher);
            unit.morale.hash(&mut hasher);
            unit.flags.hash(&mut hasher);
            unit.bonus.hash(&mut hasher);
            unit.link.hash(&mut hasher);
        }

        for (cell, id) in self.field.grid.occupied_cells() {
            cell.hash(&mut hasher);
            id.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the whole match for saving between turns.
    ///
    /// The pending event log is included; drain it first if it has
    /// already been presented.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize match: {e}")))
    }

    /// Restore a match saved with [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Fails on corrupt data or if the restored grid and roster disagree.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let sim: Self = bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize match: {e}")))?;
        sim.validate_occupancy()?;
        Ok(sim)
    }

    // ------------------------------------------------------------------
    // Turn flow
    // ------------------------------------------------------------------

    /// Begin the first faction's turn and run AI turns until input is
    /// needed.
    ///
    /// # Errors
    ///
    /// Fails if called twice.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(GameError::InvalidState("match already started".into()));
        }
        self.started = true;
        info!(
            player = ?self.player,
            units = self.field.roster.len(),
            "Match started"
        );
        self.check_outcome();
        self.begin_turn();
        self.run_until_input()
    }

    /// Run AI turns until a human faction is up, the match ends, or a
    /// full rotation has passed.
    ///
    /// # Errors
    ///
    /// Propagates logic faults from AI actions.
    pub fn run_until_input(&mut self) -> Result<()> {
        for _ in 0..self.turns.order().len() {
            if self.is_over() || self.awaiting_input() {
                break;
            }
            self.step_turn()?;
        }
        Ok(())
    }

    /// Play the active AI faction's whole turn and pass to the next
    /// faction.
    ///
    /// # Errors
    ///
    /// Fails if the active faction is human-controlled or the match is
    /// over.
    pub fn step_turn(&mut self) -> Result<Vec<AiTurn>> {
        if self.is_over() {
            return Err(GameError::MatchFinished);
        }
        let faction = self.current_faction();
        let Controller::Ai(policy) = self.controller(faction) else {
            return Err(GameError::InvalidState(format!(
                "{faction:?} is human-controlled and must end its own turn"
            )));
        };

        let actions = self.run_ai_turn(faction, policy)?;
        if !self.is_over() {
            self.advance_turn();
        }
        Ok(actions)
    }

    /// Human signal that the active faction is done.
    ///
    /// # Errors
    ///
    /// Fails if the match is over or the active faction is AI-controlled.
    pub fn end_turn(&mut self) -> Result<()> {
        self.ensure_running()?;
        if !self.awaiting_input() {
            return Err(GameError::InvalidState(
                "the active faction is AI-controlled".into(),
            ));
        }
        self.selected = None;
        self.pending = None;
        self.advance_turn();
        self.run_until_input()
    }

    /// Stop the match. AI iteration halts before the next unit and every
    /// further command is rejected.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            info!("Match cancelled");
        }
        self.cancelled = true;
        self.pending = None;
        self.selected = None;
    }

    fn advance_turn(&mut self) {
        self.turns.advance();
        self.begin_turn();
    }

    fn begin_turn(&mut self) {
        let faction = self.current_faction();
        self.apply_wait_healing(faction);
        for id in self.field.roster.ids_of_faction(faction) {
            if let Some(unit) = self.field.roster.get_mut(id) {
                unit.flags.reset();
            }
        }
        info!(?faction, round = self.round(), "Turn started");
        self.field.push_event(SimEvent::TurnStarted {
            faction,
            round: self.round(),
        });
    }

    fn apply_wait_healing(&mut self, faction: FactionId) {
        for id in self.field.roster.ids_of_faction(faction) {
            let Some(unit) = self.field.roster.get(id) else {
                continue;
            };
            if unit.flags.any() || !unit.is_alive() {
                continue;
            }

            let rests = unit.is_commander()
                || self
                    .field
                    .roster
                    .commander_of(id)
                    .is_some_and(|c| c.is_alive() && c.position.is_adjacent(unit.position));
            let morale = self
                .field
                .in_aura(id)
                .then(|| self.field.aura_bonuses(id).morale.max(1));

            let Some(unit) = self.field.roster.get_mut(id) else {
                continue;
            };
            let healed = if rests { unit.heal(WAIT_HEAL) } else { 0 };
            if let Some(delta) = morale {
                unit.modify_morale(delta);
            }
            if healed > 0 {
                debug!(unit = %id, healed, "Wait healing");
                self.field.push_event(SimEvent::Healed {
                    unit: id,
                    amount: healed,
                });
            }
        }
    }

    fn run_ai_turn(&mut self, faction: FactionId, policy: FactionPolicy) -> Result<Vec<AiTurn>> {
        let snapshot = self.field.roster.ids_of_faction(faction);
        debug!(?faction, units = snapshot.len(), "AI turn");

        let mut actions = Vec::with_capacity(snapshot.len());
        for id in snapshot {
            if self.is_over() {
                debug!(?faction, "AI turn aborted");
                break;
            }
            if !self.field.roster.contains(id) {
                continue;
            }
            let turn = policy.act(&mut self.field, id)?;
            if turn.combat.as_ref().is_some_and(CombatReport::any_killed) {
                self.check_outcome();
            }
            actions.push(turn);
        }
        Ok(actions)
    }

    /// Decide victory or defeat. Defeat wins if both hold at once.
    fn check_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let player_alive = self.field.roster.count_faction(self.player) > 0;
        let opponents_alive = self
            .field
            .roster
            .iter()
            .any(|u| self.field.relations.relation(self.player, u.faction) != Relation::Ally);

        let outcome = if !player_alive {
            MatchOutcome::Defeat
        } else if !opponents_alive {
            MatchOutcome::Victory
        } else {
            return;
        };

        info!(?outcome, round = self.round(), "Match decided");
        self.outcome = Some(outcome);
        self.pending = None;
        self.selected = None;
        if outcome == MatchOutcome::Victory && self.field.grid.unlock_exit() {
            if let Some(cell) = self.field.grid.exit() {
                self.field.push_event(SimEvent::ExitUnlocked { cell });
            }
        }
        self.field.push_event(SimEvent::MatchEnded { outcome });
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    fn ensure_running(&self) -> Result<()> {
        if self.is_over() {
            return Err(GameError::MatchFinished);
        }
        if !self.started {
            return Err(GameError::InvalidState("match not started".into()));
        }
        Ok(())
    }

    /// Check that `unit` may be commanded now.
    fn ensure_commandable(&self, unit: UnitId) -> Result<()> {
        self.ensure_running()?;
        let u = self.field.roster.require(unit)?;
        if u.faction != self.current_faction() || self.controller(u.faction) != Controller::Human {
            return Err(GameError::NotYourTurn {
                unit,
                faction: u.faction,
            });
        }
        Ok(())
    }

    fn reject<T>(err: GameError) -> Result<T> {
        warn!(%err, "Command rejected");
        Err(err)
    }

    /// Select a unit of the active human faction.
    ///
    /// # Errors
    ///
    /// Fails for unknown units, units of another faction, or units that
    /// are done for the turn.
    pub fn select_unit(&mut self, unit: UnitId) -> Result<Selection> {
        if let Err(err) = self.ensure_commandable(unit) {
            return Self::reject(err);
        }
        let flags = self.field.roster.require(unit)?.flags;
        if flags.has_acted {
            return Self::reject(GameError::AlreadyActed {
                unit,
                action: "acted",
            });
        }

        self.selected = Some(unit);
        Ok(Selection {
            unit,
            reachable: if flags.has_moved {
                Vec::new()
            } else {
                self.reachable_cells(unit)
            },
            attackable: if flags.has_attacked {
                Vec::new()
            } else {
                self.attackable_cells(unit)
            },
        })
    }

    /// Preview a move. Nothing changes until [`confirm_move`].
    ///
    /// Returns the path, start cell included.
    ///
    /// [`confirm_move`]: Self::confirm_move
    ///
    /// # Errors
    ///
    /// Fails if the unit cannot move this turn or `destination` is not
    /// in its reachable set.
    pub fn request_move(&mut self, unit: UnitId, destination: GridPos) -> Result<&[GridPos]> {
        if let Err(err) = self.ensure_commandable(unit) {
            return Self::reject(err);
        }
        let u = self.field.roster.require(unit)?;
        if u.flags.has_acted {
            return Self::reject(GameError::AlreadyActed {
                unit,
                action: "acted",
            });
        }
        if u.flags.has_moved {
            return Self::reject(GameError::AlreadyActed {
                unit,
                action: "moved",
            });
        }
        if !self.field.grid.in_bounds(destination) {
            return Self::reject(GameError::OutOfBounds(destination));
        }
        if !self.reachable_cells(unit).contains(&destination) {
            return Self::reject(GameError::NotReachable {
                unit,
                cell: destination,
            });
        }
        let Some(path) = find_path(
            &self.field.grid,
            u.position,
            destination,
            u.template.movement_type,
        ) else {
            return Self::reject(GameError::NotReachable {
                unit,
                cell: destination,
            });
        };

        self.selected = Some(unit);
        let pending = self.pending.insert(PendingMove {
            unit,
            destination,
            path,
        });
        Ok(&pending.path)
    }

    /// Commit the pending move. Returns the cells entered.
    ///
    /// # Errors
    ///
    /// [`GameError::NoPendingMove`] without a preview.
    pub fn confirm_move(&mut self) -> Result<Vec<GridPos>> {
        self.ensure_running()?;
        let Some(pending) = self.pending.take() else {
            return Self::reject(GameError::NoPendingMove);
        };
        let budget = self.field.move_range(pending.unit);
        let moved = walk_path(&mut self.field, pending.unit, &pending.path, budget)?;

        let position = self.field.roster.require(pending.unit)?.position;
        if self.field.grid.exit_unlocked() && self.field.grid.exit() == Some(position) {
            info!(unit = %pending.unit, cell = %position, "Exit reached");
            self.field.push_event(SimEvent::ExitReached {
                unit: pending.unit,
                cell: position,
            });
        }
        Ok(moved)
    }

    /// Drop the pending move.
    ///
    /// # Errors
    ///
    /// [`GameError::NoPendingMove`] without a preview.
    pub fn cancel_move(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(_) => Ok(()),
            None => Self::reject(GameError::NoPendingMove),
        }
    }

    /// Attack whatever stands on `cell`.
    ///
    /// Every eligibility check happens before any state changes: the unit
    /// must not have attacked, the cell must hold an enemy, and it must
    /// be within effective range.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidTarget`] naming the failed check, or the usual
    /// turn and flag errors.
    pub fn request_attack(&mut self, unit: UnitId, cell: GridPos) -> Result<CombatReport> {
        if let Err(err) = self.ensure_commandable(unit) {
            return Self::reject(err);
        }
        let attacker = self.field.roster.require(unit)?;
        if attacker.flags.has_acted {
            return Self::reject(GameError::AlreadyActed {
                unit,
                action: "acted",
            });
        }
        if attacker.flags.has_attacked {
            return Self::reject(GameError::AlreadyActed {
                unit,
                action: "attacked",
            });
        }
        if !self.field.grid.in_bounds(cell) {
            return Self::reject(GameError::OutOfBounds(cell));
        }
        let Some(target) = self.field.grid.occupant(cell) else {
            return Self::reject(GameError::InvalidTarget {
                cell,
                reason: "no unit there",
            });
        };
        let defender = self.field.roster.require(target)?;
        if !self.field.is_enemy(attacker, defender) {
            return Self::reject(GameError::InvalidTarget {
                cell,
                reason: "not an enemy",
            });
        }
        if !self.field.in_attack_range(unit, target) {
            return Self::reject(GameError::InvalidTarget {
                cell,
                reason: "out of range",
            });
        }

        if self.pending.as_ref().is_some_and(|p| p.unit == unit) {
            self.pending = None;
        }
        let report = combat::resolve(&mut self.field, unit, target)?;
        if report.any_killed() {
            self.check_outcome();
        }
        Ok(report)
    }

    /// End a unit's activity for this turn without acting.
    ///
    /// A waiting unit has still acted, so it does not rest next turn.
    ///
    /// # Errors
    ///
    /// The usual turn errors.
    pub fn wait_unit(&mut self, unit: UnitId) -> Result<()> {
        if let Err(err) = self.ensure_commandable(unit) {
            return Self::reject(err);
        }
        self.field.roster.require_mut(unit)?.flags.has_acted = true;
        if self.pending.as_ref().is_some_and(|p| p.unit == unit) {
            self.pending = None;
        }
        if self.selected == Some(unit) {
            self.selected = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitData;
    use crate::factions::FactionRelations;
    use crate::terrain::TerrainGrid;

    fn grunt() -> UnitData {
        UnitData::basic("grunt", 20, 8, 3)
    }

    fn two_sided(w: u32, h: u32) -> (Battlefield, UnitId, UnitId) {
        let mut field = Battlefield::new(TerrainGrid::new(w, h), FactionRelations::default_relations());
        let hero = field
            .spawn_unit(FactionId::AuroraEmpire, grunt(), GridPos::new(0, 0))
            .unwrap();
        let foe = field
            .spawn_unit(FactionId::GoldenHand, grunt(), GridPos::new(w - 1, h - 1))
            .unwrap();
        (field, hero, foe)
    }

    fn sim(field: Battlefield) -> SimulationContext {
        let mut sim = SimulationContext::new(
            field,
            vec![FactionId::AuroraEmpire, FactionId::GoldenHand],
            FactionId::AuroraEmpire,
        )
        .unwrap();
        sim.set_controller(FactionId::GoldenHand, Controller::Ai(FactionPolicy::default()));
        sim
    }

    #[test]
    fn test_start_waits_for_player() {
        let (field, _, _) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();
        assert!(sim.awaiting_input());
        assert_eq!(sim.current_faction(), FactionId::AuroraEmpire);
        assert!(matches!(
            sim.drain_events().as_slice(),
            [SimEvent::TurnStarted {
                faction: FactionId::AuroraEmpire,
                round: 0
            }]
        ));
        assert!(sim.start().is_err());
    }

    #[test]
    fn test_commands_rejected_before_start() {
        let (field, hero, _) = two_sided(8, 8);
        let mut sim = sim(field);
        assert!(sim.select_unit(hero).is_err());
    }

    #[test]
    fn test_move_preview_then_confirm() {
        let (field, hero, _) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();

        let path = sim.request_move(hero, GridPos::new(3, 0)).unwrap().to_vec();
        assert_eq!(path.len(), 4);
        // Preview does not move anything.
        assert_eq!(sim.field().roster.get(hero).unwrap().position, GridPos::new(0, 0));

        let moved = sim.confirm_move().unwrap();
        assert_eq!(moved.last(), Some(&GridPos::new(3, 0)));
        assert!(sim.validate_occupancy().is_ok());
        assert!(matches!(
            sim.request_move(hero, GridPos::new(4, 0)),
            Err(GameError::AlreadyActed { action: "moved", .. })
        ));
    }

    #[test]
    fn test_cancel_move() {
        let (field, hero, _) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();
        sim.request_move(hero, GridPos::new(1, 1)).unwrap();
        sim.cancel_move().unwrap();
        assert_eq!(sim.cancel_move(), Err(GameError::NoPendingMove));
        assert_eq!(sim.confirm_move(), Err(GameError::NoPendingMove));
        assert_eq!(sim.field().roster.get(hero).unwrap().position, GridPos::new(0, 0));
    }

    #[test]
    fn test_unreachable_move_rejected() {
        let (field, hero, _) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();
        assert_eq!(
            sim.request_move(hero, GridPos::new(5, 0)).map(<[GridPos]>::to_vec),
            Err(GameError::NotReachable {
                unit: hero,
                cell: GridPos::new(5, 0)
            })
        );
        assert!(sim.pending_move().is_none());
    }

    #[test]
    fn test_enemy_units_not_commandable() {
        let (field, _, foe) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();
        assert!(matches!(
            sim.select_unit(foe),
            Err(GameError::NotYourTurn { .. })
        ));
    }

    #[test]
    fn test_attack_eligibility_checked_first() {
        let mut field = Battlefield::new(TerrainGrid::new(6, 6), FactionRelations::default_relations());
        let hero = field
            .spawn_unit(FactionId::AuroraEmpire, grunt(), GridPos::new(2, 2))
            .unwrap();
        let foe = field
            .spawn_unit(FactionId::GoldenHand, grunt(), GridPos::new(2, 3))
            .unwrap();
        field
            .spawn_unit(FactionId::Neutral, grunt(), GridPos::new(1, 2))
            .unwrap();
        let far = field
            .spawn_unit(FactionId::GoldenHand, grunt(), GridPos::new(5, 5))
            .unwrap();
        let mut sim = sim(field);
        sim.start().unwrap();
        let before = sim.state_hash();

        assert!(matches!(
            sim.request_attack(hero, GridPos::new(3, 2)),
            Err(GameError::InvalidTarget { reason: "no unit there", .. })
        ));
        assert!(matches!(
            sim.request_attack(hero, GridPos::new(1, 2)),
            Err(GameError::InvalidTarget { reason: "not an enemy", .. })
        ));
        assert!(matches!(
            sim.request_attack(hero, GridPos::new(5, 5)),
            Err(GameError::InvalidTarget { reason: "out of range", .. })
        ));
        assert_eq!(sim.state_hash(), before);

        let report = sim.request_attack(hero, GridPos::new(2, 3)).unwrap();
        assert_eq!(report.defender, foe);
        assert!(matches!(
            sim.request_attack(hero, GridPos::new(2, 3)),
            Err(GameError::AlreadyActed { action: "acted", .. })
        ));
        assert!(sim.field().roster.contains(far));
    }

    #[test]
    fn test_end_turn_runs_ai_and_returns() {
        let (field, hero, foe) = two_sided(6, 1);
        let mut sim = sim(field);
        sim.start().unwrap();
        sim.end_turn().unwrap();

        assert_eq!(sim.current_faction(), FactionId::AuroraEmpire);
        assert_eq!(sim.round(), 1);
        // The foe advanced four cells and struck.
        assert_eq!(sim.field().roster.get(foe).unwrap().position, GridPos::new(1, 0));
        assert!(sim.field().roster.get(hero).unwrap().hp < 20);
        assert!(sim.validate_occupancy().is_ok());
    }

    #[test]
    fn test_victory_unlocks_exit() {
        let (mut field, hero, foe) = two_sided(6, 6);
        field.grid.set_exit(GridPos::new(0, 1)).unwrap();
        field.roster.get_mut(foe).unwrap().hp = 1;
        // Put the foe next to the hero.
        field.grid.set_occupant(GridPos::new(5, 5), None).unwrap();
        field.grid.set_occupant(GridPos::new(1, 0), Some(foe)).unwrap();
        field.roster.get_mut(foe).unwrap().position = GridPos::new(1, 0);

        let mut sim = sim(field);
        sim.start().unwrap();
        sim.drain_events();
        let report = sim.request_attack(hero, GridPos::new(1, 0)).unwrap();
        assert!(report.defender_killed);
        assert_eq!(sim.outcome(), Some(MatchOutcome::Victory));
        assert!(sim.field().grid.exit_unlocked());

        let events = sim.drain_events();
        assert!(events.contains(&SimEvent::ExitUnlocked {
            cell: GridPos::new(0, 1)
        }));
        assert_eq!(
            events.last(),
            Some(&SimEvent::MatchEnded {
                outcome: MatchOutcome::Victory
            })
        );
        assert_eq!(sim.end_turn(), Err(GameError::MatchFinished));
    }

    #[test]
    fn test_defeat_when_player_wiped() {
        let (mut field, hero, foe) = two_sided(6, 1);
        field.roster.get_mut(hero).unwrap().hp = 1;
        let _ = foe;
        let mut sim = sim(field);
        sim.start().unwrap();
        sim.end_turn().unwrap();
        assert_eq!(sim.outcome(), Some(MatchOutcome::Defeat));
        assert!(!sim.awaiting_input());
        assert_eq!(sim.current_faction(), FactionId::GoldenHand);
    }

    #[test]
    fn test_wait_healing_rules() {
        let mut field = Battlefield::new(TerrainGrid::new(8, 8), FactionRelations::default_relations());
        let (cmd, squad) = field
            .spawn_squad(
                FactionId::AuroraEmpire,
                grunt(),
                &[grunt(), grunt()],
                GridPos::new(2, 2),
            )
            .unwrap();
        let loner = field
            .spawn_unit(FactionId::AuroraEmpire, grunt(), GridPos::new(6, 6))
            .unwrap();
        field
            .spawn_unit(FactionId::GoldenHand, grunt(), GridPos::new(7, 0))
            .unwrap();
        for id in [cmd, squad[0], squad[1], loner] {
            field.roster.get_mut(id).unwrap().hp = 10;
        }

        let mut sim = SimulationContext::new(
            field,
            vec![FactionId::AuroraEmpire],
            FactionId::AuroraEmpire,
        )
        .unwrap();
        sim.start().unwrap();
        // First turn: nobody had acted, so resting applies.
        let hp = |sim: &SimulationContext, id| sim.field().roster.get(id).unwrap().hp;
        assert_eq!(hp(&sim, cmd), 13);
        assert_eq!(hp(&sim, squad[0]), 13);
        assert_eq!(hp(&sim, loner), 10);

        sim.wait_unit(squad[1]).unwrap();
        sim.end_turn().unwrap();
        assert_eq!(hp(&sim, cmd), 16);
        assert_eq!(hp(&sim, squad[0]), 16);
        // Waiting is still acting.
        assert_eq!(hp(&sim, squad[1]), 13);
        assert!(!sim.field().roster.get(squad[1]).unwrap().flags.any());
    }

    #[test]
    fn test_aura_morale_on_rest() {
        let mut field = Battlefield::new(TerrainGrid::new(8, 8), FactionRelations::default_relations());
        let (cmd, squad) = field
            .spawn_squad(FactionId::AuroraEmpire, grunt(), &[grunt()], GridPos::new(2, 2))
            .unwrap();
        let mut sim = SimulationContext::new(field, vec![FactionId::AuroraEmpire], FactionId::AuroraEmpire)
            .unwrap();
        sim.start().unwrap();
        // Aura morale bonus is zero in the template, so the minimum of 1 applies.
        assert_eq!(sim.field().roster.get(cmd).unwrap().morale, 51);
        assert_eq!(sim.field().roster.get(squad[0]).unwrap().morale, 51);
    }

    #[test]
    fn test_cancel_stops_everything() {
        let (field, hero, _) = two_sided(8, 8);
        let mut sim = sim(field);
        sim.start().unwrap();
        sim.cancel();
        assert!(sim.is_over());
        assert_eq!(sim.outcome(), None);
        assert_eq!(sim.select_unit(hero), Err(GameError::MatchFinished));
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let (field, hero, _) = two_sided(8, 8);
        let mut a = sim(field.clone());
        let mut b = sim(field);
        a.start().unwrap();
        b.start().unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        a.request_move(hero, GridPos::new(1, 0)).unwrap();
        a.confirm_move().unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_saved_match_resumes_identically() {
        let (field, hero, _) = two_sided(8, 8);
        let mut original = sim(field);
        original.start().unwrap();
        original.request_move(hero, GridPos::new(1, 0)).unwrap();
        original.confirm_move().unwrap();

        let mut restored = SimulationContext::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.state_hash(), original.state_hash());

        original.end_turn().unwrap();
        restored.end_turn().unwrap();
        assert_eq!(restored.state_hash(), original.state_hash());
        assert_eq!(restored.drain_events(), original.drain_events());
    }

    #[test]
    fn test_corrupt_save_rejected() {
        assert!(matches!(
            SimulationContext::from_bytes(&[1, 2, 3]),
            Err(GameError::InvalidState(_))
        ));
    }
}
