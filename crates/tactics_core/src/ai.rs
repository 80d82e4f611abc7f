//! Faction AI policies.
//!
//! A [`FactionPolicy`] is a set of [`Temperament`] flags plus a
//! [`TargetScoring`] rule. Every behaviour is built from the same helper
//! routines ([`find_best_target`], [`approach_goal`], [`move_toward`]),
//! and the flags only decide which helpers run and in what order:
//!
//! | Flag          | Effect                                                          |
//! |---------------|-----------------------------------------------------------------|
//! | `CAUTIOUS`    | Wounded commanders hold; wounded soldiers fall back to command  |
//! | `HONOR_BOUND` | Guard wounded allied commanders; refuse suicidal attacks        |
//! | `RUTHLESS`    | Overrides every self-preservation check                         |
//! | `PACK`        | Soldiers with no reachable enemy close on the nearest ally      |
//! | `COHESIVE`    | Isolated soldiers regroup on their commander first              |
//!
//! Deciding is read-only ([`FactionPolicy::decide`]); acting commits the
//! move, re-checks range, and resolves combat ([`FactionPolicy::act`]).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battlefield::Battlefield;
use crate::combat::{self, CombatReport};
use crate::error::Result;
use crate::factions::FactionId;
use crate::math::{ratio, Fixed, GridPos, CROSS};
use crate::movement::walk_path;
use crate::pathfinding::{find_path, movement_costs};
use crate::unit::{Unit, UnitId};
use crate::unit_kind::Temperament;

/// Commanders below this HP percentage pull honour-bound allies to them.
pub const GUARD_COMMANDER_BELOW_PERCENT: i32 = 75;

/// Cautious commanders below this HP percentage hold to recover.
pub const CAUTIOUS_COMMANDER_BELOW_PERCENT: i32 = 50;

/// Cautious soldiers below this HP percentage fall back to their commander.
pub const CAUTIOUS_SOLDIER_BELOW_PERCENT: i32 = 70;

/// Minimum allies within one cell for a cohesive soldier to feel safe.
pub const COHESION_MIN_NEIGHBOURS: usize = 2;

/// How enemy targets are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetScoring {
    /// `-distance`, plus 5 for commanders.
    #[default]
    Nearest,
    /// `-distance - 0.1 × HP`, plus 20 if the hit would be lethal and 10
    /// for commanders.
    Weighted,
}

/// One unit's choice for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Stay put and keep flags clear so the unit can rest.
    Hold,
    /// Attack from the current cell.
    Attack(UnitId),
    /// Move toward the target, then attack if it came into range.
    Advance(UnitId),
    /// Move next to a friendly unit without attacking.
    Regroup(UnitId),
}

/// What a unit actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiTurn {
    /// The choice that was made.
    pub decision: Decision,
    /// Cells entered, in order.
    pub path: Vec<GridPos>,
    /// Combat that followed, if any.
    pub combat: Option<CombatReport>,
}

/// Behaviour of one faction's automated units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactionPolicy {
    /// Behaviour flags.
    pub temperament: Temperament,
    /// Target ranking rule.
    pub scoring: TargetScoring,
}

impl FactionPolicy {
    /// Policy from explicit parts.
    #[must_use]
    pub const fn new(temperament: Temperament, scoring: TargetScoring) -> Self {
        Self {
            temperament,
            scoring,
        }
    }

    /// The standard policy of each faction.
    #[must_use]
    pub fn for_faction(faction: FactionId) -> Self {
        match faction {
            FactionId::AuroraEmpire => Self::new(
                Temperament::CAUTIOUS | Temperament::HONOR_BOUND,
                TargetScoring::Weighted,
            ),
            FactionId::MoonArchonDominion => {
                Self::new(Temperament::RUTHLESS, TargetScoring::Weighted)
            }
            FactionId::GoldenHand => Self::new(Temperament::COHESIVE, TargetScoring::Nearest),
            FactionId::Neutral => Self::new(
                Temperament::CAUTIOUS | Temperament::PACK,
                TargetScoring::Weighted,
            ),
            FactionId::EvilNeutral => Self::new(
                Temperament::RUTHLESS | Temperament::PACK,
                TargetScoring::Weighted,
            ),
        }
    }

    fn has(&self, flag: Temperament) -> bool {
        self.temperament.contains(flag)
    }

    /// Self-preservation applies unless ruthless.
    fn is_careful(&self, flag: Temperament) -> bool {
        self.has(flag) && !self.has(Temperament::RUTHLESS)
    }

    /// Choose an action for `id` without touching state.
    #[must_use]
    pub fn decide(&self, field: &Battlefield, id: UnitId) -> Decision {
        let Some(unit) = field.roster.get(id) else {
            return Decision::Hold;
        };
        if unit.flags.has_acted {
            return Decision::Hold;
        }

        if self.has(Temperament::HONOR_BOUND) {
            if let Some(ward) = wounded_allied_commander(field, unit) {
                if field.distance(id, ward).is_some_and(|d| d > 1) {
                    return Decision::Regroup(ward);
                }
            }
        }

        if unit.is_commander() {
            self.decide_commander(field, unit)
        } else {
            self.decide_soldier(field, unit)
        }
    }

    fn decide_commander(&self, field: &Battlefield, unit: &Unit) -> Decision {
        let id = unit.id;
        if self.is_careful(Temperament::CAUTIOUS)
            && unit.hp_percent() < CAUTIOUS_COMMANDER_BELOW_PERCENT
            && field.attackable_targets(id).is_empty()
        {
            return Decision::Hold;
        }

        match find_best_target(field, id, self.scoring) {
            Some(target) if field.in_attack_range(id, target) => Decision::Attack(target),
            Some(target) => Decision::Advance(target),
            None => Decision::Hold,
        }
    }

    fn decide_soldier(&self, field: &Battlefield, unit: &Unit) -> Decision {
        let id = unit.id;
        let commander = field.roster.commander_of(id);

        if self.is_careful(Temperament::CAUTIOUS) {
            if let Some(cmd) = commander {
                if unit.hp_percent() < CAUTIOUS_SOLDIER_BELOW_PERCENT
                    || cmd.hp_percent() < CAUTIOUS_COMMANDER_BELOW_PERCENT
                {
                    return regroup_or_hold(field, id, cmd.id);
                }
            }
        }

        if self.has(Temperament::COHESIVE) {
            if let Some(cmd) = commander {
                if !field.in_aura(id) && allies_within(field, unit, 1) < COHESION_MIN_NEIGHBOURS {
                    return regroup_or_hold(field, id, cmd.id);
                }
            }
        }

        let target = find_best_target(field, id, self.scoring);
        let Some(target) = target else {
            return self.idle(field, unit);
        };

        if field.in_attack_range(id, target) {
            if self.is_careful(Temperament::HONOR_BOUND) && is_suicidal(field, id, target) {
                debug!(unit = %id, %target, "Refusing suicidal attack");
                return commander.map_or(Decision::Hold, |cmd| regroup_or_hold(field, id, cmd.id));
            }
            return Decision::Attack(target);
        }

        if let Some(cmd) = commander {
            if !field.in_aura(id) {
                return regroup_or_hold(field, id, cmd.id);
            }
        }

        if approach_goal(field, id, target).is_none() {
            return self.idle(field, unit);
        }
        Decision::Advance(target)
    }

    /// No reachable enemy: pack animals close ranks, everyone else waits.
    fn idle(&self, field: &Battlefield, unit: &Unit) -> Decision {
        if self.has(Temperament::PACK) {
            if let Some(ally) = nearest_ally(field, unit) {
                return regroup_or_hold(field, unit.id, ally);
            }
        }
        Decision::Hold
    }

    /// Decide and carry out one unit's turn.
    ///
    /// Flags are only set when the unit does something; a held unit
    /// keeps clear flags so it can rest.
    pub fn act(&self, field: &mut Battlefield, id: UnitId) -> Result<AiTurn> {
        let decision = self.decide(field, id);
        debug!(unit = %id, ?decision, "AI decision");

        let mut turn = AiTurn {
            decision,
            path: Vec::new(),
            combat: None,
        };

        match decision {
            Decision::Hold => return Ok(turn),
            Decision::Attack(target) => {
                turn.combat = Some(combat::resolve(field, id, target)?);
            }
            Decision::Advance(target) => {
                turn.path = move_toward(field, id, target)?;
                let can_strike = field.roster.get(id).is_some_and(|u| !u.flags.has_attacked)
                    && field.roster.contains(target)
                    && field.in_attack_range(id, target);
                if can_strike {
                    turn.combat = Some(combat::resolve(field, id, target)?);
                }
            }
            Decision::Regroup(friend) => {
                turn.path = move_toward(field, id, friend)?;
            }
        }

        if let Some(unit) = field.roster.get_mut(id) {
            unit.flags.has_acted = true;
        }
        Ok(turn)
    }
}

/// Regroup on `friend`, or hold if already next to it.
fn regroup_or_hold(field: &Battlefield, id: UnitId, friend: UnitId) -> Decision {
    match field.distance(id, friend) {
        Some(d) if d <= 1 => Decision::Hold,
        Some(_) => Decision::Regroup(friend),
        None => Decision::Hold,
    }
}

/// Score one candidate under a scoring rule.
#[must_use]
pub fn target_score(field: &Battlefield, attacker: UnitId, target: UnitId, scoring: TargetScoring) -> Fixed {
    let (Some(distance), Some(t)) = (field.distance(attacker, target), field.roster.get(target)) else {
        return Fixed::MIN;
    };
    let mut score = -Fixed::from_num(distance);
    match scoring {
        TargetScoring::Nearest => {
            if t.is_commander() {
                score += Fixed::from_num(5);
            }
        }
        TargetScoring::Weighted => {
            score -= ratio(i64::from(t.hp), 10);
            let lethal = combat::predict_damage(field, attacker, target).is_ok_and(|d| d >= t.hp);
            if lethal {
                score += Fixed::from_num(20);
            }
            if t.is_commander() {
                score += Fixed::from_num(10);
            }
        }
    }
    score
}

/// Highest-scoring enemy of `attacker`. Ties go to the lowest unit id.
#[must_use]
pub fn find_best_target(field: &Battlefield, attacker: UnitId, scoring: TargetScoring) -> Option<UnitId> {
    let unit = field.roster.get(attacker)?;
    let mut best: Option<(UnitId, Fixed)> = None;
    for other in field.roster.iter() {
        if other.id == attacker || !other.is_alive() || !field.is_enemy(unit, other) {
            continue;
        }
        let score = target_score(field, attacker, other.id, scoring);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((other.id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Where `mover` should path to in order to engage or join `target`.
///
/// Melee movers (effective range 1) and regrouping units aim for the
/// free orthogonal neighbour of the target that is cheapest to reach.
/// Ranged movers aim at the target's own cell and stop wherever their
/// budget runs out.
#[must_use]
pub fn approach_goal(field: &Battlefield, mover: UnitId, target: UnitId) -> Option<GridPos> {
    let unit = field.roster.get(mover)?;
    let target_unit = field.roster.get(target)?;
    let ranged = field.is_enemy(unit, target_unit) && field.attack_range(mover) > 1;
    if ranged {
        return Some(target_unit.position);
    }
    cheapest_neighbour(field, unit, target_unit.position)
}

/// Free orthogonal neighbour of `centre` with the lowest path cost from
/// the unit. Ties keep the first in (down, right, up, left) order.
fn cheapest_neighbour(field: &Battlefield, unit: &Unit, centre: GridPos) -> Option<GridPos> {
    let costs = movement_costs(&field.grid, unit.position, u32::MAX, unit.template.movement_type);
    let mut best: Option<(GridPos, u32)> = None;
    for &(dx, dy) in &CROSS {
        let Some(cell) = centre.offset(dx, dy) else {
            continue;
        };
        if !field.grid.is_free(cell) {
            continue;
        }
        if let Some(&cost) = costs.get(&cell) {
            if best.map_or(true, |(_, c)| cost < c) {
                best = Some((cell, cost));
            }
        }
    }
    best.map(|(cell, _)| cell)
}

/// Move `mover` toward `target` within its move budget.
///
/// Returns the cells entered. No path means no movement.
pub fn move_toward(field: &mut Battlefield, mover: UnitId, target: UnitId) -> Result<Vec<GridPos>> {
    let Some(goal) = approach_goal(field, mover, target) else {
        return Ok(Vec::new());
    };
    let (start, movement) = {
        let unit = field.roster.require(mover)?;
        (unit.position, unit.template.movement_type)
    };
    if start == goal {
        return Ok(Vec::new());
    }
    let Some(path) = find_path(&field.grid, start, goal, movement) else {
        debug!(unit = %mover, %goal, "No path");
        return Ok(Vec::new());
    };
    let budget = field.move_range(mover);
    walk_path(field, mover, &path, budget)
}

/// Nearest live unit of the same faction, lowest id on ties.
#[must_use]
pub fn nearest_ally(field: &Battlefield, unit: &Unit) -> Option<UnitId> {
    field
        .roster
        .iter()
        .filter(|u| u.id != unit.id && u.faction == unit.faction)
        .min_by_key(|u| (u.position.manhattan(unit.position), u.id))
        .map(|u| u.id)
}

/// Same-faction units within `radius` (Manhattan) of `unit`.
#[must_use]
pub fn allies_within(field: &Battlefield, unit: &Unit, radius: u32) -> usize {
    field
        .roster
        .iter()
        .filter(|u| u.id != unit.id && u.faction == unit.faction)
        .filter(|u| u.position.manhattan(unit.position) <= radius)
        .count()
}

/// A commander friendly to `unit` below the guard threshold.
///
/// The unit's own commander is preferred; otherwise the lowest id wins.
fn wounded_allied_commander(field: &Battlefield, unit: &Unit) -> Option<UnitId> {
    let wounded = |c: &Unit| {
        c.id != unit.id
            && c.is_commander()
            && field.relations.is_ally(unit.faction, c.faction)
            && c.hp_percent() < GUARD_COMMANDER_BELOW_PERCENT
    };
    if let Some(own) = field.roster.commander_of(unit.id).filter(|c| wounded(c)) {
        return Some(own.id);
    }
    field.roster.iter().find(|c| wounded(c)).map(|c| c.id)
}

/// The counter would kill the attacker and the attack would not kill the
/// target.
fn is_suicidal(field: &Battlefield, attacker: UnitId, target: UnitId) -> bool {
    let (Some(a), Some(t)) = (field.roster.get(attacker), field.roster.get(target)) else {
        return false;
    };
    let lethal = combat::predict_damage(field, attacker, target).is_ok_and(|d| d >= t.hp);
    if lethal || !combat::can_counter(field, attacker, target) {
        return false;
    }
    combat::predict_damage(field, target, attacker).is_ok_and(|d| d >= a.hp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitData;
    use crate::factions::FactionRelations;
    use crate::terrain::TerrainGrid;

    fn field(w: u32, h: u32) -> Battlefield {
        Battlefield::new(TerrainGrid::new(w, h), FactionRelations::default_relations())
    }

    fn grunt() -> UnitData {
        UnitData::basic("grunt", 20, 8, 3)
    }

    fn spawn(f: &mut Battlefield, faction: FactionId, data: UnitData, x: u32, y: u32) -> UnitId {
        f.spawn_unit(faction, data, GridPos::new(x, y)).unwrap()
    }

    const PLAIN: FactionPolicy = FactionPolicy::new(Temperament::empty(), TargetScoring::Nearest);

    #[test]
    fn test_standard_policies() {
        assert!(FactionPolicy::for_faction(FactionId::AuroraEmpire)
            .temperament
            .contains(Temperament::HONOR_BOUND));
        assert_eq!(
            FactionPolicy::for_faction(FactionId::MoonArchonDominion).scoring,
            TargetScoring::Weighted
        );
        assert!(FactionPolicy::for_faction(FactionId::EvilNeutral)
            .temperament
            .contains(Temperament::RUTHLESS | Temperament::PACK));
        for faction in [FactionId::AuroraEmpire, FactionId::Neutral, FactionId::EvilNeutral] {
            assert_eq!(
                FactionPolicy::for_faction(faction).scoring,
                TargetScoring::Weighted
            );
        }
        assert_eq!(
            FactionPolicy::for_faction(FactionId::GoldenHand).scoring,
            TargetScoring::Nearest
        );
    }

    #[test]
    fn test_nearest_prefers_commanders() {
        let mut f = field(12, 3);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        let near = spawn(&mut f, FactionId::GoldenHand, grunt(), 3, 0);
        let cmd = spawn(&mut f, FactionId::GoldenHand, grunt(), 9, 0);
        f.roster.make_commander(cmd).unwrap();
        assert_eq!(find_best_target(&f, me, TargetScoring::Nearest), Some(near));

        // Commander bonus (+5) beats a 4-cell gap.
        f.grid.set_occupant(GridPos::new(9, 0), None).unwrap();
        f.grid.set_occupant(GridPos::new(7, 0), Some(cmd)).unwrap();
        f.roster.get_mut(cmd).unwrap().position = GridPos::new(7, 0);
        assert_eq!(find_best_target(&f, me, TargetScoring::Nearest), Some(cmd));
    }

    #[test]
    fn test_weighted_prefers_lethal() {
        let mut f = field(12, 3);
        let me = spawn(&mut f, FactionId::MoonArchonDominion, grunt(), 0, 0);
        let healthy = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 2, 0);
        let weak = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 5, 0);
        f.roster.get_mut(weak).unwrap().hp = 2;
        assert_eq!(find_best_target(&f, me, TargetScoring::Nearest), Some(healthy));
        assert_eq!(find_best_target(&f, me, TargetScoring::Weighted), Some(weak));
    }

    #[test]
    fn test_ignores_neutral_units() {
        let mut f = field(5, 5);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        spawn(&mut f, FactionId::Neutral, grunt(), 1, 0);
        assert_eq!(find_best_target(&f, me, TargetScoring::Nearest), None);
    }

    #[test]
    fn test_attack_in_range() {
        let mut f = field(5, 5);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        let foe = spawn(&mut f, FactionId::GoldenHand, grunt(), 1, 0);
        assert_eq!(PLAIN.decide(&f, me), Decision::Attack(foe));
        let turn = PLAIN.act(&mut f, me).unwrap();
        assert!(turn.combat.is_some());
        assert!(turn.path.is_empty());
    }

    #[test]
    fn test_advance_then_attack() {
        let mut f = field(8, 1);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        let foe = spawn(&mut f, FactionId::GoldenHand, grunt(), 5, 0);
        assert_eq!(PLAIN.decide(&f, me), Decision::Advance(foe));
        let turn = PLAIN.act(&mut f, me).unwrap();
        assert_eq!(turn.path.last(), Some(&GridPos::new(4, 0)));
        assert!(turn.combat.is_some());
        let unit = f.roster.get(me).unwrap();
        assert!(unit.flags.has_moved && unit.flags.has_attacked && unit.flags.has_acted);
        assert!(f.validate_occupancy().is_ok());
    }

    #[test]
    fn test_advance_out_of_reach_moves_only() {
        let mut f = field(12, 1);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        spawn(&mut f, FactionId::GoldenHand, grunt(), 10, 0);
        let turn = PLAIN.act(&mut f, me).unwrap();
        assert_eq!(turn.path.len(), 4);
        assert!(turn.combat.is_none());
        assert!(f.roster.get(me).unwrap().flags.has_acted);
    }

    #[test]
    fn test_hold_keeps_flags_clear() {
        let mut f = field(5, 5);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        let turn = PLAIN.act(&mut f, me).unwrap();
        assert_eq!(turn.decision, Decision::Hold);
        assert!(!f.roster.get(me).unwrap().flags.any());
    }

    #[test]
    fn test_cautious_commander_holds_when_wounded() {
        let mut f = field(10, 1);
        let cmd = spawn(&mut f, FactionId::Neutral, grunt(), 0, 0);
        f.roster.make_commander(cmd).unwrap();
        spawn(&mut f, FactionId::EvilNeutral, grunt(), 6, 0);
        f.roster.get_mut(cmd).unwrap().hp = 5;

        let cautious = FactionPolicy::new(Temperament::CAUTIOUS, TargetScoring::Nearest);
        assert_eq!(cautious.decide(&f, cmd), Decision::Hold);

        let ruthless = FactionPolicy::new(
            Temperament::CAUTIOUS | Temperament::RUTHLESS,
            TargetScoring::Nearest,
        );
        assert!(matches!(ruthless.decide(&f, cmd), Decision::Advance(_)));
    }

    #[test]
    fn test_cautious_soldier_falls_back() {
        let mut f = field(10, 3);
        let (cmd, squad) = f
            .spawn_squad(FactionId::Neutral, grunt(), &[grunt()], GridPos::new(0, 1))
            .unwrap();
        let soldier = squad[0];
        // Pull the soldier away and wound it.
        let old = f.roster.get(soldier).unwrap().position;
        f.grid.set_occupant(old, None).unwrap();
        f.grid.set_occupant(GridPos::new(4, 1), Some(soldier)).unwrap();
        f.roster.get_mut(soldier).unwrap().position = GridPos::new(4, 1);
        f.roster.get_mut(soldier).unwrap().hp = 10;
        spawn(&mut f, FactionId::EvilNeutral, grunt(), 9, 1);

        let cautious = FactionPolicy::new(Temperament::CAUTIOUS, TargetScoring::Nearest);
        assert_eq!(cautious.decide(&f, soldier), Decision::Regroup(cmd));
        cautious.act(&mut f, soldier).unwrap();
        assert_eq!(f.distance(soldier, cmd), Some(1));
        assert!(f.validate_occupancy().is_ok());
    }

    #[test]
    fn test_soldier_outside_aura_regroups_before_advancing() {
        let mut f = field(12, 3);
        let (cmd, squad) = f
            .spawn_squad(FactionId::GoldenHand, grunt(), &[grunt()], GridPos::new(0, 1))
            .unwrap();
        let soldier = squad[0];
        let old = f.roster.get(soldier).unwrap().position;
        f.grid.set_occupant(old, None).unwrap();
        f.grid.set_occupant(GridPos::new(5, 1), Some(soldier)).unwrap();
        f.roster.get_mut(soldier).unwrap().position = GridPos::new(5, 1);
        spawn(&mut f, FactionId::AuroraEmpire, grunt(), 11, 1);

        assert_eq!(PLAIN.decide(&f, soldier), Decision::Regroup(cmd));
    }

    #[test]
    fn test_cohesive_isolated_soldier_regroups() {
        let mut f = field(12, 3);
        let (cmd, squad) = f
            .spawn_squad(
                FactionId::GoldenHand,
                grunt().with_aura(Default::default(), 6),
                &[grunt()],
                GridPos::new(0, 1),
            )
            .unwrap();
        let soldier = squad[0];
        let old = f.roster.get(soldier).unwrap().position;
        f.grid.set_occupant(old, None).unwrap();
        f.grid.set_occupant(GridPos::new(4, 1), Some(soldier)).unwrap();
        f.roster.get_mut(soldier).unwrap().position = GridPos::new(4, 1);
        spawn(&mut f, FactionId::AuroraEmpire, grunt(), 11, 1);

        // In aura (radius 6), so the plain policy advances.
        assert!(matches!(PLAIN.decide(&f, soldier), Decision::Advance(_)));
        // Cohesion wants two neighbours within one cell.
        let cohesive = FactionPolicy::new(Temperament::COHESIVE, TargetScoring::Nearest);
        assert!(matches!(cohesive.decide(&f, soldier), Decision::Advance(_)));

        f.roster.get_mut(cmd).unwrap().template.aura_radius = 2;
        assert_eq!(cohesive.decide(&f, soldier), Decision::Regroup(cmd));
    }

    #[test]
    fn test_honor_bound_guards_wounded_commander() {
        let mut f = field(10, 3);
        let cmd = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        f.roster.make_commander(cmd).unwrap();
        f.roster.get_mut(cmd).unwrap().hp = 10;
        let other = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 5, 0);
        spawn(&mut f, FactionId::GoldenHand, grunt(), 6, 0);

        let honor = FactionPolicy::new(Temperament::HONOR_BOUND, TargetScoring::Nearest);
        assert_eq!(honor.decide(&f, other), Decision::Regroup(cmd));
        assert!(matches!(PLAIN.decide(&f, other), Decision::Attack(_)));
    }

    #[test]
    fn test_honor_bound_guard_beside_commander_still_fights() {
        let mut f = field(4, 4);
        let cmd = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 1, 1);
        f.roster.make_commander(cmd).unwrap();
        f.roster.get_mut(cmd).unwrap().hp = 14;
        let guard = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 1, 2);
        f.roster.link_soldier(cmd, guard).unwrap();
        let enemy = spawn(&mut f, FactionId::GoldenHand, grunt(), 2, 2);

        let aurora = FactionPolicy::for_faction(FactionId::AuroraEmpire);
        assert!(f.in_attack_range(guard, enemy));
        assert_eq!(aurora.decide(&f, guard), Decision::Attack(enemy));
    }

    #[test]
    fn test_honor_bound_refuses_suicide() {
        let mut f = field(6, 1);
        let me = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 0, 0);
        f.roster.get_mut(me).unwrap().hp = 2;
        let brute = spawn(
            &mut f,
            FactionId::GoldenHand,
            UnitData::basic("brute", 40, 20, 3),
            1,
            0,
        );

        let honor = FactionPolicy::new(Temperament::HONOR_BOUND, TargetScoring::Nearest);
        assert_eq!(honor.decide(&f, me), Decision::Hold);

        let ruthless = FactionPolicy::new(
            Temperament::HONOR_BOUND | Temperament::RUTHLESS,
            TargetScoring::Nearest,
        );
        assert_eq!(ruthless.decide(&f, me), Decision::Attack(brute));
    }

    #[test]
    fn test_pack_closes_on_ally() {
        let mut f = field(10, 1);
        let me = spawn(&mut f, FactionId::Neutral, grunt(), 0, 0);
        let friend = spawn(&mut f, FactionId::Neutral, grunt(), 6, 0);
        let pack = FactionPolicy::new(Temperament::PACK, TargetScoring::Nearest);
        assert_eq!(pack.decide(&f, me), Decision::Regroup(friend));
        pack.act(&mut f, me).unwrap();
        assert_eq!(f.roster.get(me).unwrap().position, GridPos::new(4, 0));
        assert_eq!(PLAIN.decide(&f, friend), Decision::Hold);
    }

    #[test]
    fn test_ranged_approach_targets_cell() {
        let mut f = field(10, 1);
        let archer = spawn(&mut f, FactionId::AuroraEmpire, grunt().with_range(2), 0, 0);
        let foe = spawn(&mut f, FactionId::GoldenHand, grunt(), 8, 0);
        assert_eq!(approach_goal(&f, archer, foe), Some(GridPos::new(8, 0)));
        let melee = spawn(&mut f, FactionId::AuroraEmpire, grunt(), 1, 0);
        assert_eq!(approach_goal(&f, melee, foe), Some(GridPos::new(7, 0)));
    }
}
