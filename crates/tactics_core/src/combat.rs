//! Deterministic engagement resolution.
//!
//! One call resolves one attacker/defender exchange atomically:
//!
//! 1. Damage to the defender is computed from pre-combat state.
//! 2. The defender counters iff its effective range is at least the
//!    attacker's and at least the distance between them. Counter damage
//!    also uses pre-combat state, so the exchange is simultaneous.
//! 3. Every side that will drop to 0 HP pays experience and morale to
//!    the other side first, then damage lands. Both units can die in the
//!    same call.
//! 4. The attacker's turn is spent. The defender's flags are untouched.
//!
//! # Damage Formula
//!
//! ```text
//! morale(u) = 1 + (u.morale - 50) / 250
//! power     = attack  × morale(a) × hp_a/max_a + terrain_atk(a) + aura_atk(a) [+2 in aura]
//! guard     = defense × morale(d) × hp_d/max_d + terrain_def(d) + aura_def(d) [+1 in aura]
//! damage    = max(1, round((power - guard) × class_modifier))
//! ```
//!
//! Rounding sends exact halves to the even neighbour.

use tracing::debug;

use crate::battlefield::{Battlefield, SimEvent};
use crate::error::{GameError, Result};
use crate::experience::award_experience;
use crate::math::{ratio, Fixed};
use crate::unit::{UnitId, DEFAULT_MORALE};
use crate::unit_kind::UnitClass;

/// Morale gained for landing a killing blow.
pub const KILL_MORALE: i32 = 10;

/// Flat attack bonus for an attacker standing in an aura.
pub const AURA_FLAT_ATTACK: i32 = 2;

/// Flat defense bonus for a defender standing in an aura.
pub const AURA_FLAT_DEFENSE: i32 = 1;

/// Minimum damage of any hit.
pub const MIN_DAMAGE: i32 = 1;

/// Morale divisor: 250 points of morale swing one whole multiple.
const MORALE_SPAN: i64 = 250;

/// Multiplicative damage modifier from morale, centred on 50.
///
/// Morale 0 gives ×0.8, 50 gives ×1.0 and 100 gives ×1.2.
#[must_use]
pub fn morale_factor(morale: i32) -> Fixed {
    Fixed::ONE + ratio(i64::from(morale - DEFAULT_MORALE), MORALE_SPAN)
}

/// 1.5 on a favourable class matchup, else 1.0.
///
/// `attacker_range` decides whether infantry is fighting an archer in
/// melee.
#[must_use]
pub fn class_modifier(attacker: UnitClass, defender: UnitClass, attacker_range: u32) -> Fixed {
    if attacker.beats(defender, attacker_range == 1) {
        ratio(3, 2)
    } else {
        Fixed::ONE
    }
}

/// Damage `attacker` would deal to `defender` in the current state.
pub fn predict_damage(field: &Battlefield, attacker: UnitId, defender: UnitId) -> Result<i32> {
    let a = field.roster.require(attacker)?;
    let d = field.roster.require(defender)?;

    let mut power = Fixed::from_num(a.attack())
        * morale_factor(a.morale)
        * ratio(i64::from(a.hp), i64::from(a.max_hp()));
    power += Fixed::from_num(field.terrain_attack_bonus(attacker));
    power += Fixed::from_num(field.aura_bonuses(attacker).attack);
    if field.in_aura(attacker) {
        power += Fixed::from_num(AURA_FLAT_ATTACK);
    }

    let mut guard = Fixed::from_num(d.defense())
        * morale_factor(d.morale)
        * ratio(i64::from(d.hp), i64::from(d.max_hp()));
    guard += Fixed::from_num(field.terrain_defense_bonus(defender));
    guard += Fixed::from_num(field.aura_bonuses(defender).defense);
    if field.in_aura(defender) {
        guard += Fixed::from_num(AURA_FLAT_DEFENSE);
    }

    let modifier = class_modifier(
        a.template.unit_class,
        d.template.unit_class,
        field.attack_range(attacker),
    );
    let raw = ((power - guard) * modifier).round_ties_even();
    Ok(raw.to_num::<i32>().max(MIN_DAMAGE))
}

/// True if `defender` would strike back when attacked by `attacker`.
#[must_use]
pub fn can_counter(field: &Battlefield, attacker: UnitId, defender: UnitId) -> bool {
    let Some(distance) = field.distance(attacker, defender) else {
        return false;
    };
    let attacker_range = field.attack_range(attacker);
    let defender_range = field.attack_range(defender);
    defender_range >= attacker_range && defender_range >= distance
}

/// Outcome of one engagement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatReport {
    /// Initiator.
    pub attacker: UnitId,
    /// Target.
    pub defender: UnitId,
    /// Damage dealt to the defender.
    pub damage_to_defender: i32,
    /// Counter damage dealt to the attacker (0 without a counter).
    pub damage_to_attacker: i32,
    /// Whether the defender was eligible to counter.
    pub countered: bool,
    /// Defender removed from play.
    pub defender_killed: bool,
    /// Attacker removed from play.
    pub attacker_killed: bool,
}

impl CombatReport {
    /// True if anyone died.
    #[must_use]
    pub const fn any_killed(&self) -> bool {
        self.defender_killed || self.attacker_killed
    }
}

/// Resolve an engagement and apply every side effect.
///
/// Range and relation checks belong to the caller; this only requires
/// two distinct live units.
pub fn resolve(field: &mut Battlefield, attacker: UnitId, defender: UnitId) -> Result<CombatReport> {
    if attacker == defender {
        return Err(GameError::InvalidTarget {
            cell: field.roster.require(attacker)?.position,
            reason: "a unit cannot attack itself",
        });
    }

    let damage_to_defender = predict_damage(field, attacker, defender)?;
    let countered = can_counter(field, attacker, defender);
    let damage_to_attacker = if countered {
        predict_damage(field, defender, attacker)?
    } else {
        0
    };

    let (attacker_level, attacker_hp) = {
        let a = field.roster.require(attacker)?;
        (a.level, a.hp)
    };
    let (defender_level, defender_hp) = {
        let d = field.roster.require(defender)?;
        (d.level, d.hp)
    };
    let defender_killed = defender_hp - damage_to_defender <= 0;
    let attacker_killed = attacker_hp - damage_to_attacker <= 0;

    debug!(
        %attacker,
        %defender,
        damage_to_defender,
        damage_to_attacker,
        countered,
        "Combat resolved"
    );
    field.push_event(SimEvent::CombatResolved {
        attacker,
        defender,
        damage_to_defender,
        damage_to_attacker,
    });

    if defender_killed {
        reward_kill(field, attacker, defender_level)?;
    }
    if attacker_killed {
        reward_kill(field, defender, attacker_level)?;
    }

    apply_hit(field, defender, damage_to_defender, defender_killed)?;
    apply_hit(field, attacker, damage_to_attacker, attacker_killed)?;

    if let Some(a) = field.roster.get_mut(attacker) {
        a.flags.has_attacked = true;
        a.flags.has_acted = true;
    }

    if defender_killed {
        field.remove_unit(defender)?;
    }
    if attacker_killed {
        field.remove_unit(attacker)?;
    }

    Ok(CombatReport {
        attacker,
        defender,
        damage_to_defender,
        damage_to_attacker,
        countered,
        defender_killed,
        attacker_killed,
    })
}

fn reward_kill(field: &mut Battlefield, killer: UnitId, defeated_level: u32) -> Result<()> {
    field.roster.require_mut(killer)?.modify_morale(KILL_MORALE);
    for (unit, _) in award_experience(&mut field.roster, killer, defeated_level) {
        let level = field.roster.require(unit)?.level;
        field.push_event(SimEvent::LevelUp { unit, level });
    }
    Ok(())
}

/// Land a hit. A hit judged fatal from pre-combat HP stays fatal even if
/// a level-up restored some HP in between.
fn apply_hit(field: &mut Battlefield, target: UnitId, damage: i32, fatal: bool) -> Result<()> {
    let unit = field.roster.require_mut(target)?;
    unit.apply_damage(damage);
    if fatal {
        unit.hp = 0;
    }
    Ok(())
}
