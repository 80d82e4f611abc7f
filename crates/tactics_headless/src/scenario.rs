//! Scenario loading and match construction.
//!
//! Scenarios define the initial match state for headless runs: the terrain
//! map, unit templates, faction setups with their squads, turn order and
//! weather.

use std::path::Path;
// Shadows the prelude's single-parameter `Result`.
use std::result::Result;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tactics_core::ai::TargetScoring;
use tactics_core::data::AuraBonuses;
use tactics_core::prelude::*;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A placement names a template neither the faction nor the scenario
    /// defines.
    #[error("Unknown unit template '{template}' for {faction:?}")]
    UnknownTemplate {
        /// Faction whose setup referenced it.
        faction: FactionId,
        /// Missing template id.
        template: String,
    },
    /// A unit or squad could not be placed.
    #[error("Cannot place '{template}' at {at}: {source}")]
    InvalidPlacement {
        /// Template being placed.
        template: String,
        /// Requested cell.
        at: GridPos,
        /// Why the battlefield refused it.
        #[source]
        source: GameError,
    },
    /// The scenario describes an invalid match.
    #[error("Invalid scenario: {0}")]
    Game(#[from] GameError),
}

/// Who plays a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerKind {
    /// Faction AI policy.
    #[default]
    Ai,
    /// External commands. Headless runs pass this seat's turns.
    Human,
}

/// A commander with soldiers spawned around a centre cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadPlacement {
    /// Commander template id.
    pub commander: String,
    /// Soldier template ids.
    #[serde(default)]
    pub soldiers: Vec<String>,
    /// Commander cell `(x, y)`.
    pub at: (u32, u32),
}

impl SquadPlacement {
    /// Create a squad placement.
    #[must_use]
    pub fn new(commander: &str, soldiers: &[&str], x: u32, y: u32) -> Self {
        Self {
            commander: commander.to_string(),
            soldiers: soldiers.iter().map(ToString::to_string).collect(),
            at: (x, y),
        }
    }
}

/// A unit placed on its own, outside any squad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Template id.
    pub template: String,
    /// Cell `(x, y)`.
    pub at: (u32, u32),
}

impl UnitPlacement {
    /// Create a unit placement.
    #[must_use]
    pub fn new(template: &str, x: u32, y: u32) -> Self {
        Self {
            template: template.to_string(),
            at: (x, y),
        }
    }
}

/// Setup for one faction in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionSetup {
    /// Faction identifier.
    pub id: FactionId,
    /// Who plays it.
    #[serde(default)]
    pub controller: ControllerKind,
    /// Behaviour overrides, see [`Temperament::from_names`].
    #[serde(default)]
    pub behaviours: Option<Vec<String>>,
    /// Target scoring override.
    #[serde(default)]
    pub targeting: Option<TargetScoring>,
    /// Templates only this faction fields. Checked before the shared ones.
    #[serde(default)]
    pub templates: Vec<UnitData>,
    /// Squads to spawn.
    #[serde(default)]
    pub squads: Vec<SquadPlacement>,
    /// Lone units to spawn.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
}

impl FactionSetup {
    /// Empty AI-controlled setup with the standard policy.
    #[must_use]
    pub fn new(id: FactionId) -> Self {
        Self {
            id,
            controller: ControllerKind::Ai,
            behaviours: None,
            targeting: None,
            templates: Vec::new(),
            squads: Vec::new(),
            units: Vec::new(),
        }
    }

    /// The faction definition this setup describes.
    #[must_use]
    pub fn data(&self) -> FactionData {
        FactionData {
            behaviours: self.behaviours.clone(),
            targeting: self.targeting,
            units: self.templates.clone(),
            ..FactionData::new(self.id)
        }
    }

    /// Controller to install on the simulation.
    #[must_use]
    pub fn controller(&self) -> Controller {
        match self.controller {
            ControllerKind::Ai => Controller::Ai(self.data().policy()),
            ControllerKind::Human => Controller::Human,
        }
    }

    fn template(&self, shared: &[UnitData], id: &str) -> Result<UnitData, ScenarioError> {
        self.templates
            .iter()
            .chain(shared)
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownTemplate {
                faction: self.id,
                template: id.to_string(),
            })
    }

    /// Spawn every squad and lone unit of this faction.
    pub fn deploy(&self, field: &mut Battlefield, shared: &[UnitData]) -> Result<(), ScenarioError> {
        for squad in &self.squads {
            let commander = self.template(shared, &squad.commander)?;
            let soldiers = squad
                .soldiers
                .iter()
                .map(|id| self.template(shared, id))
                .collect::<Result<Vec<_>, _>>()?;
            let at = GridPos::new(squad.at.0, squad.at.1);
            field
                .spawn_squad(self.id, commander, &soldiers, at)
                .map_err(|source| ScenarioError::InvalidPlacement {
                    template: squad.commander.clone(),
                    at,
                    source,
                })?;
        }
        for unit in &self.units {
            let template = self.template(shared, &unit.template)?;
            let at = GridPos::new(unit.at.0, unit.at.1);
            field
                .spawn_unit(self.id, template, at)
                .map_err(|source| ScenarioError::InvalidPlacement {
                    template: unit.template.clone(),
                    at,
                    source,
                })?;
        }
        debug!(faction = ?self.id, units = field.roster.count_faction(self.id), "Deployed faction");
        Ok(())
    }
}

/// One entry of the relation table to override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationOverride {
    /// Observing faction.
    pub from: FactionId,
    /// Observed faction.
    pub to: FactionId,
    /// New stance.
    pub relation: Relation,
    /// Also set the reverse direction.
    #[serde(default)]
    pub mutual: bool,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Terrain rows, top row first, using the map symbols of
    /// [`TerrainKind::from_symbol`].
    pub map: Vec<String>,
    /// Entry cell `(x, y)`.
    #[serde(default)]
    pub entry: Option<(u32, u32)>,
    /// Exit cell `(x, y)`, unlocked on victory.
    #[serde(default)]
    pub exit: Option<(u32, u32)>,
    /// Templates any faction may field.
    #[serde(default)]
    pub templates: Vec<UnitData>,
    /// Faction setups.
    pub factions: Vec<FactionSetup>,
    /// Changes to the standard relation table.
    #[serde(default)]
    pub relations: Vec<RelationOverride>,
    /// Rotation order. Empty means the order of `factions`.
    #[serde(default)]
    pub turn_order: Vec<FactionId>,
    /// Faction whose survival decides victory or defeat.
    pub player: FactionId,
    /// Weather per round, cycled. Empty means always clear.
    #[serde(default)]
    pub weather: Vec<Weather>,
    /// Round limit for headless runs.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

const fn default_max_rounds() -> u32 {
    50
}

impl Default for Scenario {
    fn default() -> Self {
        Self::border_skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Built-in two-faction skirmish across a road with some cover.
    #[must_use]
    pub fn border_skirmish() -> Self {
        let map = [
            "................",
            "....FF..........",
            "....FF.....h....",
            "...........h....",
            "......==........",
            "......==........",
            "......==........",
            "......==........",
            "..........FF....",
            "..h.......FF....",
            "..h.............",
            "................",
        ];
        let aurora = FactionSetup {
            squads: vec![SquadPlacement::new(
                "captain",
                &["footman", "pikeman", "bowman"],
                2,
                5,
            )],
            ..FactionSetup::new(FactionId::AuroraEmpire)
        };
        let golden = FactionSetup {
            squads: vec![SquadPlacement::new(
                "captain",
                &["footman", "pikeman", "bowman"],
                13,
                6,
            )],
            units: vec![UnitPlacement::new("rider", 13, 2)],
            ..FactionSetup::new(FactionId::GoldenHand)
        };

        Self {
            name: "Border Skirmish".to_string(),
            description: "Two mixed squads meet across the old road".to_string(),
            map: map.iter().map(ToString::to_string).collect(),
            entry: Some((0, 11)),
            exit: Some((15, 0)),
            templates: standard_templates(),
            factions: vec![aurora, golden],
            relations: Vec::new(),
            turn_order: Vec::new(),
            player: FactionId::AuroraEmpire,
            weather: Vec::new(),
            max_rounds: default_max_rounds(),
        }
    }

    /// The turn order this scenario plays in.
    #[must_use]
    pub fn order(&self) -> Vec<FactionId> {
        if self.turn_order.is_empty() {
            self.factions.iter().map(|f| f.id).collect()
        } else {
            self.turn_order.clone()
        }
    }

    /// Weather for a given round.
    #[must_use]
    pub fn weather_for_round(&self, round: u32) -> Weather {
        if self.weather.is_empty() {
            return Weather::Clear;
        }
        self.weather[round as usize % self.weather.len()]
    }

    /// Build a ready-to-start simulation.
    ///
    /// The match is not started; call [`SimulationContext::start`].
    pub fn build(&self) -> Result<SimulationContext, ScenarioError> {
        let mut grid = TerrainGrid::from_rows(&self.map)?;
        if let Some((x, y)) = self.entry {
            grid.set_entry(GridPos::new(x, y))?;
        }
        if let Some((x, y)) = self.exit {
            grid.set_exit(GridPos::new(x, y))?;
        }

        let mut relations = FactionRelations::default_relations();
        for o in &self.relations {
            if o.mutual {
                relations.set_mutual(o.from, o.to, o.relation);
            } else {
                relations.set(o.from, o.to, o.relation);
            }
        }

        let mut field = Battlefield::new(grid, relations);
        for setup in &self.factions {
            setup.deploy(&mut field, &self.templates)?;
        }

        let mut sim = SimulationContext::new(field, self.order(), self.player)?;
        for setup in &self.factions {
            sim.set_controller(setup.id, setup.controller());
        }
        sim.set_weather(self.weather_for_round(0));
        debug!(scenario = %self.name, units = sim.field().roster.len(), "Built scenario");
        Ok(sim)
    }
}

/// Templates shared by the built-in scenario.
#[must_use]
pub fn standard_templates() -> Vec<UnitData> {
    vec![
        UnitData::basic("captain", 30, 10, 5).with_aura(
            AuraBonuses {
                attack: 1,
                defense: 1,
                morale: 2,
                ..AuraBonuses::default()
            },
            2,
        ),
        UnitData::basic("footman", 20, 8, 3),
        UnitData::basic("pikeman", 20, 7, 4).with_class(UnitClass::Spearman),
        UnitData::basic("bowman", 16, 7, 2)
            .with_class(UnitClass::Archer)
            .with_range(2),
        UnitData::basic("rider", 22, 9, 2)
            .with_class(UnitClass::Cavalry)
            .with_movement(5, MovementType::Cavalry),
    ]
}
