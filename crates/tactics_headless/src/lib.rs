//! Headless match runner for AI testing and CI verification.
//!
//! Loads a scenario from RON, plays it to completion with every faction
//! under AI control and reports the result as JSON. This enables:
//!
//! - **AI regression tests**: the same scenario must keep ending the same way
//! - **CI verification**: automated determinism checks across runs
//! - **Balance review**: per-faction damage, kills and losses
//!
//! Output goes to stdout as JSON; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # Run the built-in scenario
//! cargo run -p tactics_headless -- run
//!
//! # Run a scenario file with a tighter round limit
//! cargo run -p tactics_headless -- run --scenario scenarios/skirmish.ron --max-rounds 20
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --runs 5
//! ```

#![forbid(unsafe_code)]

pub mod ascii;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use ascii::{render_battlefield, AsciiConfig};
pub use metrics::{FactionMetrics, MetricsCollector};
pub use runner::{run_match, verify_scenario, MatchReport, MatchRunner, VerifyResult};
pub use scenario::{ControllerKind, FactionSetup, Scenario, ScenarioError};
