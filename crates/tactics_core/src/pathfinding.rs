//! Grid pathfinding: A* for routes and budgeted Dijkstra for reachability.
//!
//! Both searches use the 4-neighbourhood and share one edge rule,
//! [`TerrainGrid::step_cost`], so a route found by [`find_path`] always
//! costs exactly what [`movement_costs`] reports for its goal.
//!
//! Occupied cells are never expanded. [`find_path`] still accepts an
//! occupied goal, so a path can end on a unit but never pass through one.
//! "No path" is `None` or an empty result, never an error.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::math::GridPos;
use crate::terrain::TerrainGrid;
use crate::unit_kind::MovementType;

/// A node in the open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct SearchNode {
    pos: GridPos,
    /// Accumulated cost at push time, used to skip stale entries.
    cost: u32,
    /// Priority: f-score for A*, g-score for Dijkstra.
    priority: u32,
    /// Insertion counter. Earlier discoveries win ties.
    sequence: u64,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for min-heap behaviour.
        match other.priority.cmp(&self.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Open set with a monotonic insertion counter.
///
/// Decrease-key is a re-push; the older entry is discarded when popped.
#[derive(Default)]
struct OpenSet {
    heap: BinaryHeap<SearchNode>,
    next_sequence: u64,
}

impl OpenSet {
    fn push(&mut self, pos: GridPos, cost: u32, priority: u32) {
        self.heap.push(SearchNode {
            pos,
            cost,
            priority,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop()
    }
}

/// Neighbours of `pos` that are inside the grid.
fn neighbors(grid: &TerrainGrid, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
    pos.cross_neighbors().filter(|n| grid.in_bounds(*n))
}

/// Find the cheapest 4-connected route from `start` to `goal`.
///
/// Returns the cells from `start` to `goal` inclusive, or `None` if the
/// goal cannot be reached. An occupied goal is still a valid endpoint;
/// every intermediate cell must be free.
#[must_use]
pub fn find_path(
    grid: &TerrainGrid,
    start: GridPos,
    goal: GridPos,
    movement: MovementType,
) -> Option<Vec<GridPos>> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open = OpenSet::default();
    let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();
    let mut g_score: HashMap<GridPos, u32> = HashMap::new();

    g_score.insert(start, 0);
    open.push(start, 0, start.manhattan(goal));

    while let Some(current) = open.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, goal));
        }
        if g_score.get(&current.pos).is_some_and(|&g| current.cost > g) {
            continue;
        }

        for next in neighbors(grid, current.pos) {
            let Some(step) = edge_cost(grid, movement, current.pos, next, Some(goal)) else {
                continue;
            };

            let tentative = current.cost.saturating_add(step);
            if g_score.get(&next).map_or(true, |&g| tentative < g) {
                came_from.insert(next, current.pos);
                g_score.insert(next, tentative);
                open.push(next, tentative, tentative + next.manhattan(goal));
            }
        }
    }

    None
}

/// Cost of stepping `from -> to`, honouring occupancy.
///
/// The goal (if any) may be occupied.
fn edge_cost(
    grid: &TerrainGrid,
    movement: MovementType,
    from: GridPos,
    to: GridPos,
    goal: Option<GridPos>,
) -> Option<u32> {
    if goal != Some(to) && !grid.is_free(to) {
        return None;
    }
    grid.step_cost(movement, from, to)
}

/// Walk `came_from` back from the goal.
fn reconstruct_path(came_from: &HashMap<GridPos, GridPos>, goal: GridPos) -> Vec<GridPos> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Total entry cost of a path, excluding its first cell.
///
/// `None` if any step is not allowed.
#[must_use]
pub fn path_cost(grid: &TerrainGrid, path: &[GridPos], movement: MovementType) -> Option<u32> {
    path.windows(2).try_fold(0u32, |acc, pair| {
        grid.step_cost(movement, pair[0], pair[1])
            .map(|step| acc + step)
    })
}

/// Minimum cost to every cell reachable from `start` within `budget`.
///
/// Includes `start` at cost 0. Occupied cells are never entered.
#[must_use]
pub fn movement_costs(
    grid: &TerrainGrid,
    start: GridPos,
    budget: u32,
    movement: MovementType,
) -> HashMap<GridPos, u32> {
    let mut best: HashMap<GridPos, u32> = HashMap::new();
    if !grid.in_bounds(start) {
        return best;
    }

    let mut open = OpenSet::default();
    best.insert(start, 0);
    open.push(start, 0, 0);

    while let Some(current) = open.pop() {
        if best.get(&current.pos).is_some_and(|&c| current.cost > c) {
            continue;
        }
        for next in neighbors(grid, current.pos) {
            let Some(step) = edge_cost(grid, movement, current.pos, next, None) else {
                continue;
            };
            let cost = current.cost.saturating_add(step);
            if cost > budget {
                continue;
            }
            if best.get(&next).map_or(true, |&c| cost < c) {
                best.insert(next, cost);
                open.push(next, cost, cost);
            }
        }
    }

    best
}

/// Cells a mover can end its move on: minimum cost ≤ `budget`, not the
/// start, unoccupied. Sorted by (y, x).
#[must_use]
pub fn reachable_cells(
    grid: &TerrainGrid,
    start: GridPos,
    budget: u32,
    movement: MovementType,
) -> Vec<GridPos> {
    let mut cells: Vec<GridPos> = movement_costs(grid, start, budget, movement)
        .into_keys()
        .filter(|&pos| pos != start && grid.is_free(pos))
        .collect();
    cells.sort_by_key(|p| (p.y, p.x));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainKind;
    use crate::unit::UnitId;

    const FOOT: MovementType = MovementType::Foot;

    #[test]
    fn test_straight_path() {
        let grid = TerrainGrid::new(10, 10);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(3, 0), FOOT).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.first(), Some(&GridPos::new(0, 0)));
        assert_eq!(path.last(), Some(&GridPos::new(3, 0)));
        assert_eq!(path_cost(&grid, &path, FOOT), Some(3));
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = TerrainGrid::new(3, 3);
        let p = GridPos::new(1, 1);
        assert_eq!(find_path(&grid, p, p, FOOT), Some(vec![p]));
    }

    #[test]
    fn test_path_avoids_expensive_terrain() {
        let cavalry = MovementType::Cavalry;
        let grid = TerrainGrid::from_rows(&["..s..", ".....", "....."]).unwrap();
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(4, 0), cavalry).unwrap();
        assert!(!path.contains(&GridPos::new(2, 0)));
        assert_eq!(path_cost(&grid, &path, cavalry), Some(6));
    }

    #[test]
    fn test_no_path_through_river() {
        let grid = TerrainGrid::from_rows(&[".~.", ".~.", ".~."]).unwrap();
        assert!(find_path(&grid, GridPos::new(0, 1), GridPos::new(2, 1), FOOT).is_none());
        assert!(
            find_path(&grid, GridPos::new(0, 1), GridPos::new(2, 1), MovementType::Flyer).is_some()
        );
    }

    #[test]
    fn test_occupied_goal_allowed_but_not_passed_through() {
        let mut grid = TerrainGrid::from_rows(&["...", "###"]).unwrap();
        grid.set_occupant(GridPos::new(1, 0), Some(UnitId::new(7))).unwrap();

        // Target the occupant directly.
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(1, 0), FOOT).unwrap();
        assert_eq!(path, vec![GridPos::new(0, 0), GridPos::new(1, 0)]);

        // Corridor is blocked by the occupant.
        assert!(find_path(&grid, GridPos::new(0, 0), GridPos::new(2, 0), FOOT).is_none());
    }

    #[test]
    fn test_reachable_budget() {
        let grid = TerrainGrid::new(10, 10);
        let cells = reachable_cells(&grid, GridPos::new(0, 0), 3, FOOT);
        assert!(cells.contains(&GridPos::new(3, 0)));
        assert!(cells.contains(&GridPos::new(1, 2)));
        assert!(!cells.contains(&GridPos::new(4, 0)));
        assert!(!cells.contains(&GridPos::new(0, 0)));
        // Diamond of radius 3 clipped to one quadrant, minus the start.
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn test_reachable_excludes_occupied() {
        let mut grid = TerrainGrid::new(5, 1);
        grid.set_occupant(GridPos::new(2, 0), Some(UnitId::new(1))).unwrap();
        let cells = reachable_cells(&grid, GridPos::new(0, 0), 4, FOOT);
        assert_eq!(cells, vec![GridPos::new(1, 0)]);
    }

    #[test]
    fn test_reachable_costs_cavalry_forest() {
        let mut grid = TerrainGrid::new(4, 1);
        grid.set_terrain(GridPos::new(1, 0), TerrainKind::Forest).unwrap();
        let foot = movement_costs(&grid, GridPos::new(0, 0), 10, FOOT);
        let cav = movement_costs(&grid, GridPos::new(0, 0), 10, MovementType::Cavalry);
        assert_eq!(foot[&GridPos::new(1, 0)], 2);
        assert_eq!(cav[&GridPos::new(1, 0)], 3);
        assert_eq!(cav[&GridPos::new(3, 0)], 5);
    }

    #[test]
    fn test_ladder_reaches_wall_layer() {
        let grid = TerrainGrid::from_rows(&[".L#", "..#"]).unwrap();
        let path = find_path(&grid, GridPos::new(0, 1), GridPos::new(2, 1), FOOT).unwrap();
        assert!(path.contains(&GridPos::new(1, 0)));
        assert_eq!(path_cost(&grid, &path, FOOT), Some(1 + 2 + 99 + 99));
    }

    #[test]
    fn test_astar_matches_dijkstra() {
        let grid = TerrainGrid::from_rows(&[
            "..F..h",
            ".~~=..",
            "..s.FF",
            "T....d",
        ])
        .unwrap();
        let start = GridPos::new(0, 0);
        let costs = movement_costs(&grid, start, 50, FOOT);
        for (&cell, &cost) in &costs {
            let path = find_path(&grid, start, cell, FOOT).unwrap();
            assert_eq!(path_cost(&grid, &path, FOOT), Some(cost), "mismatch at {cell}");
        }
    }
}
