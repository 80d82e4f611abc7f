//! Data structures for unit templates and faction configuration.
//!
//! This module contains pure data structures designed to be deserialized
//! from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `tactics_headless`.

mod faction_data;
mod unit_data;

pub use faction_data::FactionData;
pub use unit_data::{AuraBonuses, UnitData};
