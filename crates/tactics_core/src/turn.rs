//! Fixed cyclic faction rotation.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::FactionId;

/// Which faction acts, and how many full rotations have completed.
///
/// The order is fixed for the whole match. Factions with no surviving
/// units keep their slot; their turns simply pass with nothing to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnScheduler {
    order: Vec<FactionId>,
    index: usize,
    round: u32,
}

impl TurnScheduler {
    /// Scheduler starting on the first faction of `order`.
    ///
    /// # Errors
    ///
    /// Fails if `order` is empty or names a faction twice.
    pub fn new(order: Vec<FactionId>) -> Result<Self> {
        if order.is_empty() {
            return Err(GameError::InvalidState("turn order is empty".into()));
        }
        for (i, faction) in order.iter().enumerate() {
            if order[..i].contains(faction) {
                return Err(GameError::InvalidState(format!(
                    "faction {faction:?} appears twice in the turn order"
                )));
            }
        }
        Ok(Self {
            order,
            index: 0,
            round: 0,
        })
    }

    /// Faction whose turn it is.
    #[must_use]
    pub fn current(&self) -> FactionId {
        self.order[self.index]
    }

    /// Completed rotations.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// The rotation.
    #[must_use]
    pub fn order(&self) -> &[FactionId] {
        &self.order
    }

    /// Hand the turn to the next faction and return it.
    ///
    /// Wrapping back to the first faction completes a round.
    pub fn advance(&mut self) -> FactionId {
        self.index += 1;
        if self.index == self.order.len() {
            self.index = 0;
            self.round += 1;
        }
        self.current()
    }
}
