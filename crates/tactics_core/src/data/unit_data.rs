//! Unit template definitions.

use serde::{Deserialize, Serialize};

use crate::unit_kind::{MovementType, UnitClass};

/// Bonuses a commander grants to every unit inside its aura.
///
/// Only read from commanders. A commander is always inside its own aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuraBonuses {
    /// Added to attack power.
    pub attack: i32,
    /// Added to defense.
    pub defense: i32,
    /// Added to magic attack.
    pub magic_attack: i32,
    /// Added to magic defense.
    pub magic_defense: i32,
    /// Added to attack range.
    pub range: i32,
    /// Morale regained per turn by units resting inside the aura.
    pub morale: i32,
}

/// Data-driven unit template.
///
/// Every live unit is spawned from one of these. Level bonuses are kept
/// on the unit itself; the template never changes during a match.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "aurora_knight",
///     name: "Aurora Knight",
///     max_hp: 30,
///     attack: 12,
///     defense: 8,
///     move_range: 5,
///     attack_range: 1,
///     unit_class: Cavalry,
///     movement_type: Cavalry,
///     aura: (attack: 1, defense: 1, morale: 5),
///     aura_radius: 2,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier for this template.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Maximum health points.
    pub max_hp: i32,

    /// Maximum magic points.
    #[serde(default)]
    pub max_mp: i32,

    /// Physical attack.
    pub attack: i32,

    /// Physical defense.
    pub defense: i32,

    /// Magic attack.
    #[serde(default)]
    pub magic_attack: i32,

    /// Magic defense.
    #[serde(default)]
    pub magic_defense: i32,

    /// Movement budget per turn, in cost points.
    pub move_range: u32,

    /// Base attack range in cells (Manhattan).
    #[serde(default = "default_attack_range")]
    pub attack_range: u32,

    /// Combat class.
    #[serde(default)]
    pub unit_class: UnitClass,

    /// Terrain interaction.
    #[serde(default)]
    pub movement_type: MovementType,

    /// Bonuses granted while commanding.
    #[serde(default)]
    pub aura: AuraBonuses,

    /// Aura reach in cells (Manhattan) while commanding.
    #[serde(default = "default_aura_radius")]
    pub aura_radius: u32,
}

const fn default_attack_range() -> u32 {
    1
}

const fn default_aura_radius() -> u32 {
    2
}

impl UnitData {
    /// Minimal template for tests and fixtures.
    #[must_use]
    pub fn basic(id: &str, max_hp: i32, attack: i32, defense: i32) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            max_hp,
            max_mp: 0,
            attack,
            defense,
            magic_attack: 0,
            magic_defense: 0,
            move_range: 4,
            attack_range: default_attack_range(),
            unit_class: UnitClass::Infantry,
            movement_type: MovementType::Foot,
            aura: AuraBonuses::default(),
            aura_radius: default_aura_radius(),
        }
    }

    /// Builder-style class override.
    #[must_use]
    pub fn with_class(mut self, unit_class: UnitClass) -> Self {
        self.unit_class = unit_class;
        self
    }

    /// Builder-style movement override.
    #[must_use]
    pub fn with_movement(mut self, move_range: u32, movement_type: MovementType) -> Self {
        self.move_range = move_range;
        self.movement_type = movement_type;
        self
    }

    /// Builder-style range override.
    #[must_use]
    pub fn with_range(mut self, attack_range: u32) -> Self {
        self.attack_range = attack_range;
        self
    }

    /// Builder-style aura override.
    #[must_use]
    pub fn with_aura(mut self, aura: AuraBonuses, radius: u32) -> Self {
        self.aura = aura;
        self.aura_radius = radius;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_data_ron_defaults() {
        let ron_str = r#"
            UnitData(
                id: "militia",
                name: "Militia",
                max_hp: 20,
                attack: 6,
                defense: 3,
                move_range: 4,
            )
        "#;

        let unit: UnitData = ron::from_str(ron_str).expect("Failed to parse RON");
        assert_eq!(unit.attack_range, 1);
        assert_eq!(unit.aura_radius, 2);
        assert_eq!(unit.unit_class, UnitClass::Infantry);
        assert_eq!(unit.movement_type, MovementType::Foot);
        assert_eq!(unit.aura, AuraBonuses::default());
    }

    #[test]
    fn test_unit_data_ron_full() {
        let ron_str = r#"
            UnitData(
                id: "moon_archer",
                name: "Moon Archer",
                max_hp: 18,
                max_mp: 4,
                attack: 9,
                defense: 3,
                move_range: 4,
                attack_range: 2,
                unit_class: Archer,
                movement_type: Foot,
                aura: (range: 1, morale: 3),
                aura_radius: 3,
            )
        "#;

        let unit: UnitData = ron::from_str(ron_str).expect("Failed to parse RON");
        assert_eq!(unit.unit_class, UnitClass::Archer);
        assert_eq!(unit.aura.range, 1);
        assert_eq!(unit.aura.morale, 3);
        assert_eq!(unit.aura.attack, 0);
        assert_eq!(unit.aura_radius, 3);
    }

    #[test]
    fn test_builders() {
        let unit = UnitData::basic("x", 10, 5, 2)
            .with_class(UnitClass::Spearman)
            .with_range(2)
            .with_movement(6, MovementType::Cavalry);
        assert_eq!(unit.unit_class, UnitClass::Spearman);
        assert_eq!(unit.attack_range, 2);
        assert_eq!(unit.move_range, 6);
        assert_eq!(unit.movement_type, MovementType::Cavalry);
    }
}
