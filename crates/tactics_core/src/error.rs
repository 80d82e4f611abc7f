//! Error types for the tactical simulation.
//!
//! Only command-boundary rejections and logic faults are errors. A missing
//! path is an ordinary `None` from [`crate::pathfinding`], and a soldier
//! without a commander is a normal state.

use thiserror::Error;

use crate::factions::FactionId;
use crate::math::GridPos;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// No live unit with this identifier.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Coordinates outside the grid.
    #[error("Cell {0} is outside the grid")]
    OutOfBounds(GridPos),

    /// The cell cannot host a unit (impassable terrain or occupied).
    #[error("Cell {0} cannot be claimed")]
    CellUnavailable(GridPos),

    /// Attack or move target failed its eligibility check.
    #[error("Invalid target at {cell}: {reason}")]
    InvalidTarget {
        /// Requested cell.
        cell: GridPos,
        /// Which check failed.
        reason: &'static str,
    },

    /// Destination is not in the unit's reachable set this turn.
    #[error("Cell {cell} is not reachable by unit {unit}")]
    NotReachable {
        /// The mover.
        unit: UnitId,
        /// Requested destination.
        cell: GridPos,
    },

    /// The unit's faction is not the one currently acting.
    #[error("Unit {unit} belongs to {faction:?}, which is not the active faction")]
    NotYourTurn {
        /// The unit that was commanded.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
    },

    /// The unit has already spent the requested action this turn.
    #[error("Unit {unit} has already {action} this turn")]
    AlreadyActed {
        /// The unit that was commanded.
        unit: UnitId,
        /// "moved", "attacked" or "acted".
        action: &'static str,
    },

    /// Confirm or cancel with nothing pending.
    #[error("No pending move to confirm")]
    NoPendingMove,

    /// Commands after victory, defeat or teardown.
    #[error("The match has already finished")]
    MatchFinished,

    /// A cell and a unit disagree about where the unit stands.
    #[error("Occupancy mismatch for unit {unit} at {cell}")]
    InconsistentOccupancy {
        /// The unit involved.
        unit: UnitId,
        /// The cell involved.
        cell: GridPos,
    },

    /// Invalid simulation state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
