//! Headless tactics match runner.
//!
//! Plays scenarios without graphics and prints JSON reports.
//! Designed for CI testing, AI regression checks and balance review.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in scenario
//! cargo run -p tactics_headless
//!
//! # Run a scenario file and save the report
//! cargo run -p tactics_headless -- run --scenario scenarios/skirmish.ron --output report.json
//!
//! # Show the starting battlefield
//! cargo run -p tactics_headless -- map --scenario scenarios/skirmish.ron
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --runs 5
//! ```
//!
//! Output (stdout): JSON report or ASCII map
//! Logs (stderr): Debug information

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_headless::{
    ascii::{render_battlefield, AsciiConfig},
    runner::{verify_scenario, MatchRunner},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactics match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one match and print its report
    Run {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's round limit
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,

        /// Save the final match state (bincode) to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Verify determinism by playing the same scenario several times
    Verify {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Print the starting battlefield as ASCII
    Map {
        /// Scenario file to load (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for reports
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            max_rounds,
            output,
            pretty,
            save,
        }) => cmd_run(
            scenario.as_deref(),
            max_rounds,
            output.as_deref(),
            pretty,
            save.as_deref(),
        ),
        Some(Commands::Verify { scenario, runs }) => cmd_verify(scenario.as_deref(), runs),
        Some(Commands::Map { scenario, no_color }) => cmd_map(scenario.as_deref(), no_color),
        None => cmd_run(None, None, None, true, None),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => {
            tracing::info!("Loading scenario from {}", path.display());
            Scenario::load(path)
        }
        None => Ok(Scenario::default()),
    }
}

/// Play one match
fn cmd_run(
    scenario: Option<&Path>,
    max_rounds: Option<u32>,
    output: Option<&Path>,
    pretty: bool,
    save: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let scenario = load_scenario(scenario)?;
    tracing::info!("Running scenario: {}", scenario.name);

    let mut runner = MatchRunner::new(&scenario);
    if let Some(limit) = max_rounds {
        runner = runner.with_max_rounds(limit);
    }
    let (report, sim) = runner.play()?;

    if let Some(path) = save {
        let bytes = sim.to_bytes().map_err(ScenarioError::from)?;
        std::fs::write(path, bytes)?;
        tracing::info!("Match state saved to {}", path.display());
    }

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Verify determinism
fn cmd_verify(scenario: Option<&Path>, runs: u32) -> Result<ExitCode, CliError> {
    let scenario = load_scenario(scenario)?;
    tracing::info!("Verifying '{}' over {} runs", scenario.name, runs);

    let result = verify_scenario(&scenario, runs)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_deterministic {
        tracing::info!("All {} runs produced identical state", runs);
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Non-deterministic: hashes {:?}", result.hashes);
        Ok(ExitCode::FAILURE)
    }
}

/// Print the starting battlefield
fn cmd_map(scenario: Option<&Path>, no_color: bool) -> Result<ExitCode, CliError> {
    let scenario = load_scenario(scenario)?;
    let sim = scenario.build()?;
    let config = AsciiConfig {
        use_color: !no_color,
        ..AsciiConfig::default()
    };
    print!("{}", render_battlefield(sim.field(), &config));
    Ok(ExitCode::SUCCESS)
}
