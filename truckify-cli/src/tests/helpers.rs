//! Fixtures for writing CLI inputs to a scratch directory.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use geo::Coord;
use serde::Serialize;
use serde_json::Value;
use tempfile::TempDir;
use truckify_core::{Constraints, PlanRequest, PositionReport, Stop, Timestamp, Vehicle};
use truckify_live::{PlanCommand, StopSelection};

use crate::replay::Scenario;

/// Seconds since the epoch at which the sample plan starts.
pub(super) const PLAN_START_SECS: u64 = 1_000;

pub(super) fn workspace() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write file");
}

pub(super) fn write_json(path: &Utf8Path, value: &impl Serialize) {
    let payload = serde_json::to_string_pretty(value).expect("serialise fixture");
    write_utf8(path, payload.as_bytes());
}

fn sample_vehicles() -> Vec<Vehicle> {
    vec![
        Vehicle::new("V1", 10, Coord { x: 0.0, y: 0.0 }),
        Vehicle::new("V2", 10, Coord { x: 0.05, y: 0.0 }),
    ]
}

fn sample_stops() -> Vec<Stop> {
    vec![
        Stop::new("S1", Coord { x: 0.01, y: 0.0 }, 1),
        Stop::new("S2", Coord { x: 0.02, y: 0.0 }, 1),
        Stop::new("S3", Coord { x: 0.06, y: 0.0 }, 1),
    ]
}

/// Two vehicles on the equator and three stops between them.
pub(super) fn sample_request() -> PlanRequest {
    PlanRequest {
        plan_id: "P1".into(),
        vehicles: sample_vehicles(),
        stops: sample_stops(),
        constraints: Constraints::default(),
    }
}

/// The sample fleet with plan `P1` activated at [`PLAN_START_SECS`].
pub(super) fn sample_scenario() -> Scenario {
    Scenario {
        vehicles: sample_vehicles(),
        plans: vec![PlanCommand {
            plan_id: "P1".into(),
            vehicles: vec!["V1".into(), "V2".into()],
            stops: StopSelection::Explicit(sample_stops()),
            constraints: Constraints::default(),
            started_at: Some(Timestamp::from_secs(PLAN_START_SECS)),
        }],
        ..Scenario::default()
    }
}

pub(super) fn report_line(vehicle_id: &str, x: f64, y: f64, secs: u64) -> String {
    let report = PositionReport::new(vehicle_id, Coord { x, y }, Timestamp::from_secs(secs));
    serde_json::to_string(&report).expect("serialise report")
}

pub(super) fn output_lines(stdout: &[u8]) -> Vec<Value> {
    std::str::from_utf8(stdout)
        .expect("stdout utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON output line"))
        .collect()
}

pub(super) fn lines_of_kind<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines
        .iter()
        .filter(|line| line["kind"] == kind)
        .collect()
}
