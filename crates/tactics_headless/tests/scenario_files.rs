//! Scenario files loaded from disk and played to completion.

use std::fs;

use tactics_core::prelude::*;
use tactics_headless::{run_match, MatchRunner, Scenario, ScenarioError};
use tactics_test_utils::determinism::{step_match, verify_determinism};

const RIVER_CROSSING: &str = include_str!("../scenarios/skirmish.ron");

#[test]
fn test_bundled_scenario_builds() {
    let scenario = Scenario::from_ron_str(RIVER_CROSSING).unwrap();
    assert_eq!(scenario.factions.len(), 4);
    assert_eq!(scenario.max_rounds, 40);

    let sim = scenario.build().unwrap();
    let roster = &sim.field().roster;
    assert_eq!(roster.count_faction(FactionId::AuroraEmpire), 4);
    assert_eq!(roster.count_faction(FactionId::GoldenHand), 4);
    assert_eq!(roster.count_faction(FactionId::MoonArchonDominion), 3);
    assert_eq!(roster.count_faction(FactionId::EvilNeutral), 2);
    assert!(sim.validate_occupancy().is_ok());
}

#[test]
fn test_load_from_disk_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("river.ron");
    fs::write(&path, RIVER_CROSSING).unwrap();

    let scenario = Scenario::load(&path).unwrap();
    let report = MatchRunner::new(&scenario).with_max_rounds(10).run().unwrap();

    assert_eq!(report.scenario, "River Crossing");
    assert!(report.rounds <= 10);
    let mut lost = 0;
    for metrics in report.factions.values() {
        assert_eq!(metrics.survivors + metrics.units_lost, metrics.units_deployed);
        lost += metrics.units_lost;
    }
    assert_eq!(lost, report.deaths);
}

#[test]
fn test_parse_error_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "Scenario(name: ").unwrap();

    let err = Scenario::load(&path).unwrap_err();
    assert!(matches!(err, ScenarioError::ParseError(_)));
}

#[test]
fn test_bundled_scenario_is_deterministic() {
    let scenario = Scenario::from_ron_str(RIVER_CROSSING).unwrap();
    let setup = || {
        let mut sim = scenario.build().unwrap();
        sim.start().unwrap();
        sim
    };
    let result = verify_determinism(3, 24, setup, step_match, SimulationContext::state_hash);
    result.assert_deterministic();

    let a = run_match(&scenario).unwrap();
    let b = run_match(&scenario).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_final_state_saves_to_disk() {
    let scenario = Scenario::from_ron_str(RIVER_CROSSING).unwrap();
    let (report, sim) = MatchRunner::new(&scenario).with_max_rounds(4).play().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final.bin");
    fs::write(&path, sim.to_bytes().unwrap()).unwrap();

    let restored = SimulationContext::from_bytes(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(restored.state_hash(), report.state_hash);
    assert_eq!(restored.round(), report.rounds);
}
