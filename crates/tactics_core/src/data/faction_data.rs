//! Faction definition: identity, AI behaviour and unit templates.

use serde::{Deserialize, Serialize};

use super::unit_data::UnitData;
use crate::ai::{FactionPolicy, TargetScoring};
use crate::factions::FactionId;
use crate::unit_kind::Temperament;

/// Complete faction data definition.
///
/// # Example RON
///
/// ```ron
/// FactionData(
///     id: MoonArchonDominion,
///     display_name: "The Moon Archon Dominion",
///     behaviours: ["ruthless"],
///     targeting: Weighted,
///     units: [...],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionData {
    /// Faction identifier.
    pub id: FactionId,

    /// Display name.
    pub display_name: String,

    /// Behaviour flag names, see [`Temperament::from_names`].
    ///
    /// `None` keeps the faction's standard policy.
    #[serde(default)]
    pub behaviours: Option<Vec<String>>,

    /// Target scoring override. `None` keeps the standard one.
    #[serde(default)]
    pub targeting: Option<TargetScoring>,

    /// Unit templates this faction fields.
    #[serde(default)]
    pub units: Vec<UnitData>,
}

impl FactionData {
    /// Bare definition using the standard policy and no templates.
    #[must_use]
    pub fn new(id: FactionId) -> Self {
        Self {
            id,
            display_name: id.display_name().to_string(),
            behaviours: None,
            targeting: None,
            units: Vec::new(),
        }
    }

    /// Look up a unit template by id.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitData> {
        self.units.iter().find(|u| u.id == id)
    }

    /// The AI policy this definition describes.
    #[must_use]
    pub fn policy(&self) -> FactionPolicy {
        let standard = FactionPolicy::for_faction(self.id);
        FactionPolicy {
            temperament: self
                .behaviours
                .as_deref()
                .map_or(standard.temperament, Temperament::from_names),
            scoring: self.targeting.unwrap_or(standard.scoring),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_data_ron() {
        let ron_str = r#"
            FactionData(
                id: GoldenHand,
                display_name: "The Golden Hand",
                behaviours: Some(["cohesive", "pack"]),
                units: [
                    UnitData(
                        id: "sellsword",
                        name: "Sellsword",
                        max_hp: 22,
                        attack: 8,
                        defense: 4,
                        move_range: 4,
                    ),
                ],
            )
        "#;

        let data: FactionData = ron::from_str(ron_str).expect("Failed to parse RON");
        assert_eq!(data.id, FactionId::GoldenHand);
        assert!(data.unit("sellsword").is_some());
        assert!(data.unit("knight").is_none());

        let policy = data.policy();
        assert_eq!(
            policy.temperament,
            Temperament::COHESIVE | Temperament::PACK
        );
        assert_eq!(policy.scoring, TargetScoring::Nearest);
    }

    #[test]
    fn test_standard_policy_kept_without_overrides() {
        let data = FactionData::new(FactionId::MoonArchonDominion);
        assert_eq!(data.policy(), FactionPolicy::for_faction(FactionId::MoonArchonDominion));
    }
}
