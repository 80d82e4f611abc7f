//! Grid coordinates and fixed-point math for deterministic simulation.
//!
//! Combat arithmetic (morale factors, HP ratios, class modifiers) uses
//! fixed-point numbers so identical inputs give identical damage on every
//! platform. Grid geometry is plain integers.

use std::fmt;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all combat math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build `num / den` as a fixed-point value.
///
/// Returns zero when `den` is zero.
#[must_use]
pub fn ratio(num: i64, den: i64) -> Fixed {
    if den == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Integer cell coordinate on the terrain grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

/// Orthogonal neighbour offsets (no diagonals).
pub const CROSS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

impl GridPos {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True if `other` shares an edge with `self`.
    #[must_use]
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.manhattan(other) == 1
    }

    /// Offset by a signed delta, `None` on underflow.
    ///
    /// Upper bounds are the grid's concern, see
    /// [`TerrainGrid::in_bounds`](crate::terrain::TerrainGrid::in_bounds).
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self { x, y })
    }

    /// The four orthogonal neighbours that do not underflow.
    pub fn cross_neighbors(self) -> impl Iterator<Item = GridPos> {
        CROSS
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(dx, dy))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for GridPos {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(GridPos::new(0, 0).manhattan(GridPos::new(2, 3)), 5);
        assert_eq!(GridPos::new(4, 1).manhattan(GridPos::new(1, 1)), 3);
        assert_eq!(GridPos::new(7, 7).manhattan(GridPos::new(7, 7)), 0);
    }

    #[test]
    fn test_offset_underflow() {
        assert_eq!(GridPos::new(0, 0).offset(-1, 0), None);
        assert_eq!(GridPos::new(1, 0).offset(-1, 0), Some(GridPos::new(0, 0)));
    }

    #[test]
    fn test_cross_neighbors_at_corner() {
        let n: Vec<_> = GridPos::new(0, 0).cross_neighbors().collect();
        assert_eq!(n, vec![GridPos::new(0, 1), GridPos::new(1, 0)]);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 2), Fixed::from_num(0.5));
        assert_eq!(ratio(5, 0), Fixed::ZERO);
    }
}
