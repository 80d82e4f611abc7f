//! # Tactics Core
//!
//! Deterministic turn-based tactical simulation engine.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in combat (uses fixed-point)
//!
//! Map generation, rendering, UI, asset loading and weather selection
//! are external collaborators. They feed the core a populated
//! [`terrain::TerrainGrid`], read its query methods, and drain the
//! [`battlefield::SimEvent`] log for presentation.
//!
//! ## Crate Structure
//!
//! - [`terrain`] - Terrain grid, cost model and cell occupancy
//! - [`pathfinding`] - A* and budgeted reachability
//! - [`unit`] / [`roster`] - Per-unit state and the live unit collection
//! - [`battlefield`] - Shared match state and effective stat derivation
//! - [`combat`] / [`experience`] - Engagement resolution and its side effects
//! - [`ai`] - Per-faction decision policies
//! - [`turn`] / [`simulation`] - Faction rotation and the match owner

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battlefield;
pub mod combat;
pub mod data;
pub mod error;
pub mod experience;
pub mod factions;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod roster;
pub mod simulation;
pub mod terrain;
pub mod turn;
pub mod unit;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{FactionPolicy, TargetScoring};
    pub use crate::battlefield::{Battlefield, SimEvent, Weather};
    pub use crate::combat::CombatReport;
    pub use crate::data::{FactionData, UnitData};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{FactionId, FactionRelations, Relation};
    pub use crate::math::{Fixed, GridPos};
    pub use crate::roster::Roster;
    pub use crate::simulation::{Controller, MatchOutcome, SimulationContext};
    pub use crate::terrain::{TerrainGrid, TerrainKind};
    pub use crate::turn::TurnScheduler;
    pub use crate::unit::{Unit, UnitId};
    pub use crate::unit_kind::{MovementType, Temperament, UnitClass};
}
