//! Terrain grid, per-movement cost model and cell occupancy.
//!
//! The grid is authored elsewhere (map generation is an external
//! collaborator) and handed to the core fully populated. During a match
//! only occupancy and the exit lock change.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::GridPos;
use crate::unit::UnitId;
use crate::unit_kind::MovementType;

/// Cost that makes a cell effectively blocking inside cost-based search.
pub const BLOCKING_COST: u32 = 99;

/// Terrain kind of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground.
    #[default]
    Grass,
    /// Woodland. Slows cavalry, gives cover.
    Forest,
    /// High ground. Extends archer range.
    Hill,
    /// Impassable except to flyers.
    Mountain,
    /// Fast travel. Cavalry attack bonus.
    Road,
    /// River crossing.
    Bridge,
    /// Impassable except to flyers.
    River,
    /// Castle wall. A separate walkable layer reached via ladders and gates.
    Wall,
    /// Opening in a wall.
    Gate,
    /// Climbs from the ground onto a wall.
    Ladder,
    /// Settlement. Bonus to attack and defense.
    Town,
    /// Marsh.
    Swamp,
    /// Sand.
    Desert,
    /// Snowfield.
    Snow,
    /// Impassable except to flyers.
    Cliff,
    /// Impassable except to flyers.
    Ocean,
}

impl TerrainKind {
    /// Cost a freshly authored cell of this kind starts with.
    #[must_use]
    pub const fn default_cost(self) -> u32 {
        match self {
            Self::Grass | Self::Road | Self::Bridge | Self::Town | Self::Gate | Self::Ocean => 1,
            Self::Forest | Self::Hill | Self::Desert | Self::Snow | Self::Ladder => 2,
            Self::Mountain | Self::Swamp => 3,
            Self::River | Self::Cliff | Self::Wall => BLOCKING_COST,
        }
    }

    /// Blocks ground movers.
    #[must_use]
    pub const fn is_impassable_ground(self) -> bool {
        matches!(
            self,
            Self::Ocean | Self::Wall | Self::River | Self::Cliff | Self::Mountain
        )
    }

    /// Part of the castle wall layer.
    #[must_use]
    pub const fn is_wall_class(self) -> bool {
        matches!(self, Self::Wall | Self::Ladder | Self::Gate)
    }

    /// Wall-class cell that connects the wall layer to the ground.
    #[must_use]
    pub const fn is_wall_access(self) -> bool {
        matches!(self, Self::Ladder | Self::Gate)
    }

    /// Single-character map symbol.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Forest => 'F',
            Self::Hill => 'h',
            Self::Mountain => 'M',
            Self::Road => '=',
            Self::Bridge => 'b',
            Self::River => '~',
            Self::Wall => '#',
            Self::Gate => 'G',
            Self::Ladder => 'L',
            Self::Town => 'T',
            Self::Swamp => 's',
            Self::Desert => 'd',
            Self::Snow => '*',
            Self::Cliff => '^',
            Self::Ocean => 'O',
        }
    }

    /// Inverse of [`symbol`](Self::symbol).
    #[must_use]
    pub const fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '.' => Self::Grass,
            'F' => Self::Forest,
            'h' => Self::Hill,
            'M' => Self::Mountain,
            '=' => Self::Road,
            'b' => Self::Bridge,
            '~' => Self::River,
            '#' => Self::Wall,
            'G' => Self::Gate,
            'L' => Self::Ladder,
            'T' => Self::Town,
            's' => Self::Swamp,
            'd' => Self::Desert,
            '*' => Self::Snow,
            '^' => Self::Cliff,
            'O' => Self::Ocean,
            _ => return None,
        })
    }
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Terrain kind.
    pub terrain: TerrainKind,
    /// Authored cost, used for terrain the cost table does not cover.
    pub base_cost: u32,
    /// Unit standing here, if any. Weak: the roster owns units.
    pub occupant: Option<UnitId>,
}

impl Cell {
    /// A fresh cell of the given kind.
    #[must_use]
    pub const fn new(terrain: TerrainKind) -> Self {
        Self {
            terrain,
            base_cost: terrain.default_cost(),
            occupant: None,
        }
    }

    /// True unless the terrain blocks ground movers and the mover walks.
    #[must_use]
    pub const fn passable(&self, movement: MovementType) -> bool {
        movement.is_flyer() || !self.terrain.is_impassable_ground()
    }

    /// Positive cost of entering this cell.
    #[must_use]
    pub const fn move_cost(&self, movement: MovementType) -> u32 {
        let cavalry = matches!(movement, MovementType::Cavalry);
        match (movement, self.terrain) {
            (MovementType::Flyer, _) => 1,
            (_, TerrainKind::Forest | TerrainKind::Desert | TerrainKind::Snow) => {
                if cavalry {
                    3
                } else {
                    2
                }
            }
            (_, TerrainKind::Mountain | TerrainKind::Swamp) => {
                if cavalry {
                    4
                } else {
                    3
                }
            }
            (_, TerrainKind::Road | TerrainKind::Bridge | TerrainKind::Town | TerrainKind::Gate) => 1,
            (_, TerrainKind::Grass) => 1,
            (_, TerrainKind::Hill | TerrainKind::Ladder) => 2,
            (_, TerrainKind::River | TerrainKind::Cliff | TerrainKind::Wall) => BLOCKING_COST,
            (_, TerrainKind::Ocean) => self.base_cost,
        }
    }
}

/// Row-major terrain grid with entry/exit markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    entry: Option<GridPos>,
    exit: Option<GridPos>,
    exit_unlocked: bool,
}

impl TerrainGrid {
    /// Create an all-grass grid.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "TerrainGrid width must be positive");
        assert!(height > 0, "TerrainGrid height must be positive");

        Self {
            width,
            height,
            cells: vec![Cell::new(TerrainKind::Grass); (width as usize) * (height as usize)],
            entry: None,
            exit: None,
            exit_unlocked: false,
        }
    }

    /// Build a grid from rows of map symbols, top row first.
    ///
    /// Rows must be equally long and use symbols from
    /// [`TerrainKind::from_symbol`].
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count()) as u32;
        if width == 0 || height == 0 {
            return Err(GameError::InvalidState("empty terrain map".to_string()));
        }

        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() as u32 != width {
                return Err(GameError::InvalidState(format!(
                    "terrain row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, c) in row.chars().enumerate() {
                let kind = TerrainKind::from_symbol(c).ok_or_else(|| {
                    GameError::InvalidState(format!("unknown terrain symbol '{c}' at ({x}, {y})"))
                })?;
                grid.set_terrain(GridPos::new(x as u32, y as u32), kind)?;
            }
        }
        Ok(grid)
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Check if a coordinate is inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Cell at a coordinate, `None` if out of bounds.
    #[must_use]
    pub fn cell(&self, pos: GridPos) -> Option<&Cell> {
        if self.in_bounds(pos) {
            Some(&self.cells[self.index(pos)])
        } else {
            None
        }
    }

    fn cell_mut(&mut self, pos: GridPos) -> Result<&mut Cell> {
        if !self.in_bounds(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        let index = self.index(pos);
        Ok(&mut self.cells[index])
    }

    /// Terrain at a coordinate.
    #[must_use]
    pub fn terrain(&self, pos: GridPos) -> Option<TerrainKind> {
        self.cell(pos).map(|c| c.terrain)
    }

    /// Set terrain (and reset the base cost) at a coordinate.
    pub fn set_terrain(&mut self, pos: GridPos, terrain: TerrainKind) -> Result<()> {
        let cell = self.cell_mut(pos)?;
        cell.terrain = terrain;
        cell.base_cost = terrain.default_cost();
        Ok(())
    }

    /// Whether a mover can stand on the cell. Out of bounds is never passable.
    #[must_use]
    pub fn passable(&self, movement: MovementType, pos: GridPos) -> bool {
        self.cell(pos).is_some_and(|c| c.passable(movement))
    }

    /// Cost of entering the cell, `None` out of bounds.
    #[must_use]
    pub fn move_cost(&self, movement: MovementType, pos: GridPos) -> Option<u32> {
        self.cell(pos).map(|c| c.move_cost(movement))
    }

    /// Cost of the single orthogonal step `from -> to`, or `None` if the
    /// step is not allowed.
    ///
    /// Walls form their own layer: stepping between wall-class and
    /// ground terrain is only possible through a ladder or gate. Cells on
    /// the wall layer connect to each other at their normal cost. Flyers
    /// ignore the layer entirely.
    #[must_use]
    pub fn step_cost(&self, movement: MovementType, from: GridPos, to: GridPos) -> Option<u32> {
        let source = self.cell(from)?;
        let target = self.cell(to)?;

        if movement.is_flyer() {
            return Some(1);
        }

        let from_wall = source.terrain.is_wall_class();
        let to_wall = target.terrain.is_wall_class();
        match (from_wall, to_wall) {
            (true, true) => Some(target.move_cost(movement)),
            (true, false) if source.terrain.is_wall_access() && target.passable(movement) => {
                Some(target.move_cost(movement))
            }
            (false, true) if target.terrain.is_wall_access() => Some(target.move_cost(movement)),
            (false, false) if target.passable(movement) => Some(target.move_cost(movement)),
            _ => None,
        }
    }

    /// Unit standing on the cell.
    #[must_use]
    pub fn occupant(&self, pos: GridPos) -> Option<UnitId> {
        self.cell(pos).and_then(|c| c.occupant)
    }

    /// True if in bounds and nobody stands there.
    #[must_use]
    pub fn is_free(&self, pos: GridPos) -> bool {
        self.cell(pos).is_some_and(|c| c.occupant.is_none())
    }

    /// Claim or clear a cell.
    ///
    /// Claiming a cell held by a different unit fails with
    /// [`GameError::CellUnavailable`]; callers must clear first.
    pub fn set_occupant(&mut self, pos: GridPos, unit: Option<UnitId>) -> Result<()> {
        let cell = self.cell_mut(pos)?;
        match (cell.occupant, unit) {
            (Some(current), Some(new)) if current != new => Err(GameError::CellUnavailable(pos)),
            _ => {
                cell.occupant = unit;
                Ok(())
            }
        }
    }

    /// All cells with an occupant, in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (GridPos, UnitId)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            let i = i as u32;
            c.occupant
                .map(|unit| (GridPos::new(i % width, i / width), unit))
        })
    }

    /// Where reinforcements enter the map.
    #[must_use]
    pub const fn entry(&self) -> Option<GridPos> {
        self.entry
    }

    /// Where the player leaves the map once it is unlocked.
    #[must_use]
    pub const fn exit(&self) -> Option<GridPos> {
        self.exit
    }

    /// Set the entry cell.
    pub fn set_entry(&mut self, pos: GridPos) -> Result<()> {
        if !self.in_bounds(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        self.entry = Some(pos);
        Ok(())
    }

    /// Set the exit cell. Clears the unlock flag.
    pub fn set_exit(&mut self, pos: GridPos) -> Result<()> {
        if !self.in_bounds(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        self.exit = Some(pos);
        self.exit_unlocked = false;
        Ok(())
    }

    /// True once the exit has been unlocked.
    #[must_use]
    pub const fn exit_unlocked(&self) -> bool {
        self.exit_unlocked
    }

    /// Unlock the exit. Returns `false` if there is no exit or it was
    /// already unlocked.
    pub fn unlock_exit(&mut self) -> bool {
        if self.exit.is_none() || self.exit_unlocked {
            return false;
        }
        self.exit_unlocked = true;
        true
    }

    /// True for the entry and exit cells.
    #[must_use]
    pub fn is_marker(&self, pos: GridPos) -> bool {
        self.entry == Some(pos) || self.exit == Some(pos)
    }

    /// Render terrain as map symbols, one row per line.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|c| c.terrain.symbol()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passable_rules() {
        let grid = TerrainGrid::from_rows(&["M~#O^.F"]).unwrap();
        for x in 0..5 {
            let pos = GridPos::new(x, 0);
            assert!(!grid.passable(MovementType::Foot, pos));
            assert!(!grid.passable(MovementType::Cavalry, pos));
            assert!(grid.passable(MovementType::Flyer, pos));
        }
        assert!(grid.passable(MovementType::Foot, GridPos::new(5, 0)));
        assert!(grid.passable(MovementType::Foot, GridPos::new(6, 0)));
        assert!(!grid.passable(MovementType::Foot, GridPos::new(7, 0)));
    }

    #[test]
    fn test_move_cost_table() {
        let grid = TerrainGrid::from_rows(&[".FhM=sdL~"]).unwrap();
        let foot: Vec<_> = (0..9)
            .map(|x| grid.move_cost(MovementType::Foot, GridPos::new(x, 0)).unwrap())
            .collect();
        assert_eq!(foot, vec![1, 2, 2, 3, 1, 3, 2, 2, 99]);

        let cav: Vec<_> = (0..9)
            .map(|x| grid.move_cost(MovementType::Cavalry, GridPos::new(x, 0)).unwrap())
            .collect();
        assert_eq!(cav, vec![1, 3, 2, 4, 1, 4, 3, 2, 99]);

        for x in 0..9 {
            assert_eq!(grid.move_cost(MovementType::Flyer, GridPos::new(x, 0)), Some(1));
        }
    }

    #[test]
    fn test_occupancy_single_claim() {
        let mut grid = TerrainGrid::new(3, 3);
        let pos = GridPos::new(1, 1);
        grid.set_occupant(pos, Some(UnitId::new(1))).unwrap();
        assert_eq!(
            grid.set_occupant(pos, Some(UnitId::new(2))),
            Err(GameError::CellUnavailable(pos))
        );
        grid.set_occupant(pos, None).unwrap();
        grid.set_occupant(pos, Some(UnitId::new(2))).unwrap();
        assert_eq!(grid.occupant(pos), Some(UnitId::new(2)));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = TerrainGrid::new(2, 2);
        let pos = GridPos::new(2, 0);
        assert!(grid.cell(pos).is_none());
        assert!(!grid.passable(MovementType::Flyer, pos));
        assert_eq!(grid.set_occupant(pos, None), Err(GameError::OutOfBounds(pos)));
    }

    #[test]
    fn test_wall_layer_steps() {
        // Ladder at (1,0) connects ground (0,0) to wall (2,0).
        let grid = TerrainGrid::from_rows(&[".L#", ".##"]).unwrap();
        let foot = MovementType::Foot;
        assert_eq!(grid.step_cost(foot, GridPos::new(0, 0), GridPos::new(1, 0)), Some(2));
        assert_eq!(grid.step_cost(foot, GridPos::new(1, 0), GridPos::new(2, 0)), Some(99));
        assert_eq!(grid.step_cost(foot, GridPos::new(2, 0), GridPos::new(2, 1)), Some(99));
        // Ground straight onto a wall is refused.
        assert_eq!(grid.step_cost(foot, GridPos::new(0, 1), GridPos::new(1, 1)), None);
        // Wall straight down to ground is refused.
        assert_eq!(grid.step_cost(foot, GridPos::new(1, 1), GridPos::new(0, 1)), None);
        assert_eq!(
            grid.step_cost(MovementType::Flyer, GridPos::new(0, 1), GridPos::new(1, 1)),
            Some(1)
        );
    }

    #[test]
    fn test_exit_unlock() {
        let mut grid = TerrainGrid::new(4, 4);
        assert!(!grid.unlock_exit());
        grid.set_exit(GridPos::new(3, 3)).unwrap();
        assert!(grid.unlock_exit());
        assert!(!grid.unlock_exit());
        assert!(grid.exit_unlocked());
        assert!(grid.is_marker(GridPos::new(3, 3)));
    }

    #[test]
    fn test_symbol_roundtrip_rows() {
        let rows = vec!["..F".to_string(), "T#G".to_string()];
        let grid = TerrainGrid::from_rows(&rows).unwrap();
        assert_eq!(grid.to_rows(), rows);
        assert!(TerrainGrid::from_rows(&["..", "."]).is_err());
        assert!(TerrainGrid::from_rows(&["?"]).is_err());
    }
}
