//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical
//! results given identical setup and commands.
//!
//! # Testing Strategy
//!
//! Replays, AI regression tests and headless CI runs all assume that the
//! same match played twice ends in the same state. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: damage uses fixed-point via
//!   [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The roster always iterates in ascending unit id.
//!
//! - **System randomness**: the core has none. Weather is chosen outside
//!   and fed in.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: pathfinding, combat and AI decisions in isolation
//! 2. **Property tests**: random inputs must still satisfy invariants
//! 3. **Integration tests**: full matches are reproducible
//! 4. **Parallel tests**: N matches on N threads all agree

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::error::GameError;
use tactics_core::simulation::SimulationContext;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// All distinct hashes (1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run agreed, with a detailed message.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine several times and compare final hashes.
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Advance an all-AI match by one faction turn, ignoring a finished match.
///
/// # Panics
///
/// Panics on any other error, such as a human seat coming up.
pub fn step_match(sim: &mut SimulationContext) {
    if sim.is_over() {
        return;
    }
    match sim.step_turn() {
        Ok(_) | Err(GameError::MatchFinished) => {}
        Err(e) => panic!("step_turn failed: {e}"),
    }
}

/// Play an all-AI match twice for `turns` faction turns and compare.
pub fn verify_match_determinism<F>(setup_fn: F, turns: u64) -> bool
where
    F: Fn() -> SimulationContext,
{
    verify_determinism(2, turns, &setup_fn, step_match, SimulationContext::state_hash)
        .is_deterministic
}

/// Final hashes of N matches played on N scoped threads.
#[derive(Debug, Clone)]
pub struct ParallelMatchResult {
    /// Final state hash of each match.
    pub hashes: Vec<u64>,
    /// Faction turns each match ran.
    pub turns: u64,
}

impl ParallelMatchResult {
    /// True if every match ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Play `num_matches` copies of a match in parallel.
///
/// Catches non-determinism that only shows under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_matches<F>(setup_fn: F, num_matches: usize, turns: u64) -> ParallelMatchResult
where
    F: Fn() -> SimulationContext + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_matches)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..turns {
                        step_match(&mut sim);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelMatchResult { hashes, turns }
}

/// Play two copies turn by turn and report the first turn at which they
/// diverge (0 means the setups already differ).
pub fn find_first_divergence<F>(setup_fn: F, turns: u64) -> Option<u64>
where
    F: Fn() -> SimulationContext,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        step_match(&mut a);
        step_match(&mut b);
        if a.state_hash() != b.state_hash() {
            tracing::warn!(turn, "Matches diverged");
            return Some(turn);
        }
    }

    None
}

/// Compute a hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for grid and stat inputs.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::data::UnitData;
    use tactics_core::math::GridPos;
    use tactics_core::terrain::{TerrainGrid, TerrainKind};
    use tactics_core::unit_kind::{MovementType, UnitClass};

    /// Any terrain kind.
    pub fn arb_terrain() -> impl Strategy<Value = TerrainKind> {
        prop_oneof![
            Just(TerrainKind::Grass),
            Just(TerrainKind::Forest),
            Just(TerrainKind::Hill),
            Just(TerrainKind::Mountain),
            Just(TerrainKind::Road),
            Just(TerrainKind::Bridge),
            Just(TerrainKind::River),
            Just(TerrainKind::Wall),
            Just(TerrainKind::Gate),
            Just(TerrainKind::Ladder),
            Just(TerrainKind::Town),
            Just(TerrainKind::Swamp),
            Just(TerrainKind::Desert),
            Just(TerrainKind::Snow),
            Just(TerrainKind::Cliff),
            Just(TerrainKind::Ocean),
        ]
    }

    /// Terrain biased toward open ground so most maps stay connected.
    pub fn arb_open_terrain() -> impl Strategy<Value = TerrainKind> {
        prop_oneof![
            6 => Just(TerrainKind::Grass),
            2 => Just(TerrainKind::Forest),
            1 => Just(TerrainKind::Hill),
            1 => Just(TerrainKind::Road),
            1 => Just(TerrainKind::Swamp),
            1 => Just(TerrainKind::River),
        ]
    }

    /// Any movement kind.
    pub fn arb_movement() -> impl Strategy<Value = MovementType> {
        prop_oneof![
            Just(MovementType::Foot),
            Just(MovementType::Cavalry),
            Just(MovementType::Flyer),
        ]
    }

    /// Any unit class.
    pub fn arb_class() -> impl Strategy<Value = UnitClass> {
        prop_oneof![
            Just(UnitClass::Infantry),
            Just(UnitClass::Cavalry),
            Just(UnitClass::Spearman),
            Just(UnitClass::Archer),
            Just(UnitClass::Flyer),
            Just(UnitClass::Mage),
        ]
    }

    /// A `width × height` grid with random open-biased terrain.
    pub fn arb_grid(width: u32, height: u32) -> impl Strategy<Value = TerrainGrid> {
        proptest::collection::vec(arb_open_terrain(), (width * height) as usize).prop_map(
            move |kinds| {
                let mut grid = TerrainGrid::new(width, height);
                for (i, kind) in kinds.into_iter().enumerate() {
                    let pos = GridPos::new(i as u32 % width, i as u32 / width);
                    // In bounds by construction.
                    let _ = grid.set_terrain(pos, kind);
                }
                grid
            },
        )
    }

    /// A cell inside a `width × height` grid.
    pub fn arb_cell(width: u32, height: u32) -> impl Strategy<Value = GridPos> {
        (0..width, 0..height).prop_map(|(x, y)| GridPos::new(x, y))
    }

    /// Morale deltas, including extremes.
    pub fn arb_morale_delta() -> impl Strategy<Value = i32> {
        prop_oneof![-1000i32..1000i32, Just(i32::MIN), Just(i32::MAX)]
    }

    /// A unit template with arbitrary but sane combat stats.
    pub fn arb_unit_data() -> impl Strategy<Value = UnitData> {
        (1i32..200, 0i32..120, 0i32..120, arb_class(), 1u32..4).prop_map(
            |(hp, attack, defense, class, range)| {
                UnitData::basic("arb", hp, attack, defense)
                    .with_class(class)
                    .with_range(range)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tactics_core::prelude::{Controller, FactionId};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_divergence() {
        use std::cell::Cell;
        let counter = Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        assert!(verify_match_determinism(fixtures::started_skirmish, 20));
        assert_eq!(find_first_divergence(fixtures::started_skirmish, 20), None);
    }

    #[test]
    fn test_parallel_skirmish() {
        let result = run_parallel_matches(fixtures::started_skirmish, 4, 12);
        assert!(result.is_deterministic());
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    #[should_panic(expected = "human-controlled")]
    fn test_step_match_rejects_human_seat() {
        let mut sim = fixtures::skirmish();
        sim.set_controller(FactionId::AuroraEmpire, Controller::Human);
        sim.start().unwrap();
        assert!(sim.awaiting_input());
        step_match(&mut sim);
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, 2u32)), compute_hash(&(1u32, 2u32)));
    }
}
