//! Headless match runner.
//!
//! Plays a scenario to completion without any presentation layer and
//! summarises it as a [`MatchReport`]. Human seats pass their turns, so
//! every scenario runs unattended.

use std::collections::BTreeMap;
// Shadows the prelude's single-parameter `Result`.
use std::result::Result;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tactics_core::prelude::*;

use crate::metrics::{FactionMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Summary of one headless match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Scenario name.
    pub scenario: String,
    /// Faction victory and defeat are judged for.
    pub player: FactionId,
    /// `None` if the round limit was reached first.
    pub outcome: Option<MatchOutcome>,
    /// Completed rotations.
    pub rounds: u32,
    /// Faction turns started, including the first.
    pub faction_turns: u32,
    /// Units killed across all factions.
    pub deaths: u32,
    /// Whether the map exit was unlocked.
    pub exit_unlocked: bool,
    /// Per-faction metrics.
    pub factions: BTreeMap<FactionId, FactionMetrics>,
    /// Final simulation state hash (for determinism validation).
    pub state_hash: u64,
}

impl MatchReport {
    /// True if the match was decided before the round limit.
    #[must_use]
    pub const fn is_decided(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Drives one scenario to completion.
pub struct MatchRunner<'a> {
    scenario: &'a Scenario,
    max_rounds: u32,
}

impl<'a> MatchRunner<'a> {
    /// Runner using the scenario's own round limit.
    #[must_use]
    pub const fn new(scenario: &'a Scenario) -> Self {
        Self {
            scenario,
            max_rounds: scenario.max_rounds,
        }
    }

    /// Override the round limit.
    #[must_use]
    pub const fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Build, start and play the match.
    pub fn run(&self) -> Result<MatchReport, ScenarioError> {
        self.play().map(|(report, _)| report)
    }

    /// Like [`run`](Self::run), also handing back the final match state.
    pub fn play(&self) -> Result<(MatchReport, SimulationContext), ScenarioError> {
        let mut sim = self.scenario.build()?;
        let mut metrics = MetricsCollector::new(sim.field());

        sim.start()?;
        metrics.record_all(&sim.drain_events());

        while !sim.is_over() && sim.round() < self.max_rounds {
            let round = sim.round();
            if sim.awaiting_input() {
                debug!(faction = ?sim.current_faction(), "Human seat passes");
                sim.end_turn()?;
            } else {
                sim.step_turn()?;
            }
            metrics.record_all(&sim.drain_events());
            sim.validate_occupancy()?;

            if sim.round() != round {
                sim.set_weather(self.scenario.weather_for_round(sim.round()));
            }
        }

        if !sim.is_over() {
            warn!(rounds = sim.round(), "Round limit reached without a result");
            sim.cancel();
        }

        let deaths = metrics.deaths();
        let factions = metrics.finish(sim.field());
        let report = MatchReport {
            scenario: self.scenario.name.clone(),
            player: sim.player(),
            outcome: sim.outcome(),
            rounds: sim.round(),
            faction_turns: factions.values().map(|f| f.turns).sum(),
            deaths,
            exit_unlocked: sim.field().grid.exit_unlocked(),
            factions,
            state_hash: sim.state_hash(),
        };
        info!(
            scenario = %report.scenario,
            outcome = ?report.outcome,
            rounds = report.rounds,
            deaths = report.deaths,
            "Match finished"
        );
        Ok((report, sim))
    }
}

/// Play a scenario with its own round limit.
pub fn run_match(scenario: &Scenario) -> Result<MatchReport, ScenarioError> {
    MatchRunner::new(scenario).run()
}

/// Result of replaying a scenario several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run agreed.
    pub is_deterministic: bool,
}

/// Play a scenario `runs` times and compare final state hashes.
pub fn verify_scenario(scenario: &Scenario, runs: u32) -> Result<VerifyResult, ScenarioError> {
    let hashes = (0..runs)
        .map(|_| run_match(scenario).map(|r| r.state_hash))
        .collect::<Result<Vec<_>, _>>()?;
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyResult {
        hashes,
        is_deterministic,
    })
}
