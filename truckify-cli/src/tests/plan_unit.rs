//! Focused unit tests covering plan CLI configuration and request loading.

use super::helpers::{sample_request, workspace, write_json, write_utf8};
use super::*;
use crate::plan::{
    DefaultOptimizerBuilder, PlanArgs, PlanConfig, TravelTimeSource, config_from_layers_for_test,
    load_plan_request, run_plan_with,
};
use rstest::rstest;
use truckify_core::{DEFAULT_AVERAGE_SPEED_KMH, PlanId, PlanRequestValidationError, PlanResponse};

#[rstest]
fn converting_plan_without_request_errors() {
    let err = PlanConfig::try_from(PlanArgs::default()).expect_err("missing request should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_PLAN_REQUEST);
            assert_eq!(env, ENV_PLAN_REQUEST);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn plan_config_defaults_to_straight_line_travel_times() {
    let args = PlanArgs {
        request_path: Some("request.json".into()),
        ..PlanArgs::default()
    };
    let config = PlanConfig::try_from(args).expect("config should build");
    assert_eq!(
        config.travel_time,
        TravelTimeSource::StraightLine {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH
        }
    );
}

#[rstest]
fn osrm_and_average_speed_conflict() {
    let args = PlanArgs {
        request_path: Some("request.json".into()),
        osrm_base_url: Some("http://localhost:5000".to_owned()),
        average_speed_kmh: Some(50.0),
    };
    let err = PlanConfig::try_from(args).expect_err("conflicting sources should error");
    assert!(matches!(
        err,
        CliError::ConflictingArguments {
            first: ARG_OSRM_BASE_URL,
            second: ARG_AVERAGE_SPEED_KMH
        }
    ));
}

#[rstest]
#[case::zero(0.0)]
#[case::negative(-30.0)]
#[case::not_a_number(f64::NAN)]
fn non_positive_speeds_are_rejected(#[case] speed: f64) {
    let args = PlanArgs {
        request_path: Some("request.json".into()),
        average_speed_kmh: Some(speed),
        ..PlanArgs::default()
    };
    let err = PlanConfig::try_from(args).expect_err("speed should be rejected");
    assert!(matches!(
        err,
        CliError::InvalidArgument {
            field: ARG_AVERAGE_SPEED_KMH,
            ..
        }
    ));
}

#[rstest]
fn load_plan_request_reports_missing_files() {
    let (_tmp, root) = workspace();
    let request_path = root.join("request.json");

    let err = load_plan_request(&request_path).expect_err("missing request should error");
    match err {
        CliError::ReadInput { path, .. } => assert_eq!(path, request_path),
        other => panic!("expected ReadInput, found {other:?}"),
    }
}

#[rstest]
fn load_plan_request_reports_invalid_json() {
    let (_tmp, root) = workspace();
    let request_path = root.join("request.json");
    write_utf8(&request_path, b"{ \"plan_id\": ");

    let err = load_plan_request(&request_path).expect_err("invalid JSON should error");
    assert!(matches!(err, CliError::ParsePlanRequest { .. }));
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "average_speed_kmh": "fast" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    assert!(matches!(err, CliError::Configuration(_)));
}

#[rstest]
fn merge_layers_honour_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "request_path": "from-file.json",
            "osrm_base_url": "http://from-file:5000",
        }),
        None,
    );
    composer.push_environment(json!({ "request_path": "from-env.json" }));
    composer.push_cli(json!({ "request_path": "from-cli.json" }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.request_path, "from-cli.json");
    assert_eq!(
        config.travel_time,
        TravelTimeSource::Osrm {
            base_url: "http://from-file:5000".to_owned()
        }
    );
}

#[rstest]
fn plan_command_optimizes_with_straight_line_times() {
    let (_tmp, root) = workspace();
    let request_path = root.join("request.json");
    write_json(&request_path, &sample_request());

    let args = PlanArgs {
        request_path: Some(request_path),
        ..PlanArgs::default()
    };
    let mut stdout = Vec::new();
    run_plan_with(args, &DefaultOptimizerBuilder, &mut stdout).expect("plan should succeed");

    let response: PlanResponse = serde_json::from_slice(&stdout).expect("plan response JSON");
    assert!(response.plan.unassigned.is_empty());
    assert_eq!(response.plan.id, PlanId::from("P1"));
    let served: usize = response
        .plan
        .routes
        .iter()
        .map(|route| route.visits.len())
        .sum();
    assert_eq!(served, 3);
}

#[rstest]
fn plan_command_validates_the_request() {
    let (_tmp, root) = workspace();
    let request_path = root.join("request.json");
    let mut request = sample_request();
    request.vehicles.clear();
    write_json(&request_path, &request);

    let args = PlanArgs {
        request_path: Some(request_path.clone()),
        ..PlanArgs::default()
    };
    let err = run_plan_with(args, &DefaultOptimizerBuilder, &mut Vec::new())
        .expect_err("request without vehicles should fail");
    match err {
        CliError::InvalidPlanRequest { path, source } => {
            assert_eq!(path, request_path);
            assert_eq!(source, PlanRequestValidationError::NoVehicles);
        }
        other => panic!("expected InvalidPlanRequest, found {other:?}"),
    }
}
