//! Behaviour-driven step definitions driving the replay CLI scenarios.
//!
//! The scenario fleet is the shared sample: `V1` at `(0, 0)`, `V2` at
//! `(0.05, 0)` and three stops between them, all on one plan.

use super::helpers::{
    PLAN_START_SECS, lines_of_kind, output_lines, report_line, sample_scenario, workspace,
    write_json, write_utf8,
};
use super::*;
use crate::replay::run_replay_with;
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;
use tempfile::TempDir;

struct ReplayWorld {
    _tmp: TempDir,
    scenario_path: Utf8PathBuf,
    reports_path: Utf8PathBuf,
    reports: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl ReplayWorld {
    fn new() -> Self {
        let (tmp, root) = workspace();
        Self {
            _tmp: tmp,
            scenario_path: root.join("scenario.json"),
            reports_path: root.join("reports.jsonl"),
            reports: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn lines(&self) -> Vec<Value> {
        output_lines(&self.stdout.borrow())
    }
}

#[fixture]
fn replay_world() -> ReplayWorld {
    ReplayWorld::new()
}

fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

#[given("a replay scenario with plan {plan} on disk")]
fn replay_scenario_on_disk(#[from(replay_world)] world: &ReplayWorld, plan: String) {
    let mut scenario = sample_scenario();
    for command in &mut scenario.plans {
        command.plan_id = unquote(&plan).into();
    }
    write_json(&world.scenario_path, &scenario);
}

#[given("{vehicle} reports position {position} at {secs:u64} seconds into the plan")]
fn vehicle_reports(
    #[from(replay_world)] world: &ReplayWorld,
    vehicle: String,
    position: String,
    secs: u64,
) {
    let (x, y) = unquote(&position)
        .split_once(',')
        .expect("position as \"x,y\"");
    world.reports.borrow_mut().push(report_line(
        unquote(&vehicle),
        x.trim().parse().expect("longitude"),
        y.trim().parse().expect("latitude"),
        PLAN_START_SECS + secs,
    ));
}

#[given("the reports file contains a malformed line")]
fn reports_contain_malformed_line(#[from(replay_world)] world: &ReplayWorld) {
    world
        .reports
        .borrow_mut()
        .push("{ \"vehicle_id\": \"V1\" ".to_owned());
}

#[when("I run the replay command")]
fn run_replay_command(#[from(replay_world)] world: &ReplayWorld) {
    write_utf8(
        &world.reports_path,
        world.reports.borrow().join("\n").as_bytes(),
    );
    let invocation = [
        "truckify",
        "replay",
        world.scenario_path.as_str(),
        world.reports_path.as_str(),
        "--debounce-ms",
        "10",
    ];
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Replay(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_replay_with(args, &mut *buffer)
        }
        Command::Plan(_) => panic!("expected replay command"),
    });
    world.result.replace(Some(outcome));
}

#[then("the replay succeeds")]
fn replay_succeeds(#[from(replay_world)] world: &ReplayWorld) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    result.as_ref().expect("expected success");
}

#[then("ingest outcome {index:u64} is {outcome}")]
fn ingest_outcome_is(#[from(replay_world)] world: &ReplayWorld, index: u64, outcome: String) {
    let lines = world.lines();
    let position = usize::try_from(index).expect("index fits usize");
    let ingests = lines_of_kind(&lines, "ingest");
    let line = ingests
        .get(position.saturating_sub(1))
        .expect("ingest line present");
    assert_eq!(line["result"]["outcome"], unquote(&outcome));
}

#[then("the replay prints a plan update with revision {revision:u64}")]
fn replay_prints_plan_update(#[from(replay_world)] world: &ReplayWorld, revision: u64) {
    let lines = world.lines();
    let found = lines_of_kind(&lines, "event").iter().any(|line| {
        line["event"]["type"] == "plan_update" && line["event"]["revision"] == revision
    });
    assert!(found, "no plan update with revision {revision} in {lines:?}");
}

#[then("the replay summary counts {commits:u64} committed re-optimization")]
fn replay_summary_counts_commits(#[from(replay_world)] world: &ReplayWorld, commits: u64) {
    let lines = world.lines();
    let summary = lines.last().expect("summary line");
    assert_eq!(summary["kind"], "summary");
    assert_eq!(summary["reoptimization"]["commits"], commits);
}

#[then("the replay fails at report line {line:u64}")]
fn replay_fails_at_line(#[from(replay_world)] world: &ReplayWorld, line: u64) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::ParseReport { line: actual, .. } => {
            assert_eq!(u64::try_from(*actual).expect("line fits u64"), line);
        }
        other => panic!("expected ParseReport, found {other:?}"),
    }
}

macro_rules! register_replay_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/replay_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(replay_world)] world: ReplayWorld) {
            let _ = world;
        }
    };
}

register_replay_scenario!(replay_mixed_outcomes, "replaying accepted and rejected reports");
register_replay_scenario!(replay_off_corridor, "an off-corridor vehicle triggers a re-plan");
register_replay_scenario!(replay_malformed_reports, "rejecting malformed report lines");
