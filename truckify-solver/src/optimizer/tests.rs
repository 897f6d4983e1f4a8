//! Tests for the `InsertionOptimizer`.

use super::*;
use rstest::{fixture, rstest};
use std::time::Duration;
use truckify_core::test_support::{
    CountingTravelTimeProvider, FailingTravelTimeProvider, GridTravelTimeProvider, stop, vehicle,
};
use truckify_core::{
    Constraints, PlanRequestValidationError, StopId, TimeWindow, TravelTimeError,
    TravelTimeMatrix, VehicleStatus,
};

use crate::test_support::FixedMatrixTravelTimeProvider;

#[fixture]
fn request() -> PlanRequest {
    PlanRequest {
        plan_id: "p".into(),
        vehicles: vec![vehicle("V1", 10, 0.0, 0.0), vehicle("V2", 10, 10.0, 0.0)],
        stops: vec![
            stop("S1", 1.0, 0.0, 2),
            stop("S2", 2.0, 0.0, 2),
            stop("S3", 8.0, 0.0, 2),
            stop("S4", 9.0, 0.0, 2),
        ],
        constraints: Constraints::default(),
    }
}

fn ids(raw: &[&str]) -> Vec<StopId> {
    raw.iter().copied().map(StopId::from).collect()
}

fn route_stops(plan: &Plan, vehicle: &str) -> Vec<StopId> {
    plan.route_for(&vehicle.into())
        .map(|route| route.stop_ids().cloned().collect())
        .unwrap_or_default()
}

#[rstest]
fn clusters_are_served_by_the_nearest_vehicle(request: PlanRequest) {
    let optimizer = InsertionOptimizer::new(GridTravelTimeProvider::default());
    let response = optimizer.optimize(&request).expect("optimize");
    assert_eq!(route_stops(&response.plan, "V1"), ids(&["S1", "S2"]));
    assert_eq!(route_stops(&response.plan, "V2"), ids(&["S4", "S3"]));
    assert_eq!(response.plan.total_cost, Duration::from_secs(240));
    assert_eq!(response.plan.check_coverage(&request.stops), Ok(()));
}

#[rstest]
fn empty_stop_list_skips_the_provider(mut request: PlanRequest) {
    request.stops.clear();
    let provider = CountingTravelTimeProvider::new(GridTravelTimeProvider::default());
    let optimizer = InsertionOptimizer::new(&provider);
    let response = optimizer.optimize(&request).expect("optimize");
    assert_eq!(provider.calls(), 0);
    assert_eq!(response.plan.routes.len(), 2);
    assert!(response.plan.routes.iter().all(Route::is_empty));
    assert!(response.plan.is_feasible());
}

#[rstest]
fn empty_fleet_is_invalid_input(mut request: PlanRequest) {
    request.vehicles.clear();
    let optimizer = InsertionOptimizer::new(GridTravelTimeProvider::default());
    let err = optimizer.optimize(&request).expect_err("no vehicles");
    assert_eq!(
        err,
        OptimizeError::InvalidInput(PlanRequestValidationError::NoVehicles)
    );
}

#[rstest]
fn out_of_service_vehicles_receive_no_route(mut request: PlanRequest) {
    request.vehicles[1] = request.vehicles[1]
        .clone()
        .with_status(VehicleStatus::OutOfService);
    let optimizer = InsertionOptimizer::new(GridTravelTimeProvider::default());
    let response = optimizer.optimize(&request).expect("optimize");
    assert_eq!(response.plan.routes.len(), 1);
    assert_eq!(route_stops(&response.plan, "V1").len(), 4);
}

#[rstest]
fn without_available_vehicles_every_stop_is_unassigned(mut request: PlanRequest) {
    for vehicle in &mut request.vehicles {
        vehicle.status = VehicleStatus::OutOfService;
    }
    let provider = CountingTravelTimeProvider::new(GridTravelTimeProvider::default());
    let response = InsertionOptimizer::new(&provider)
        .optimize(&request)
        .expect("optimize");
    assert_eq!(provider.calls(), 0);
    assert!(response.plan.routes.is_empty());
    assert_eq!(response.plan.unassigned.len(), 4);
    assert!(
        response
            .plan
            .unassigned
            .iter()
            .all(|entry| entry.reason == UnassignedReason::NoAvailableVehicle)
    );
}

#[rstest]
fn provider_failures_surface_as_travel_time_errors(request: PlanRequest) {
    let failure = TravelTimeError::NetworkError {
        url: "http://osrm".to_owned(),
        message: "connection refused".to_owned(),
    };
    let optimizer = InsertionOptimizer::new(FailingTravelTimeProvider(failure.clone()));
    let err = optimizer.optimize(&request).expect_err("provider failure");
    assert_eq!(err, OptimizeError::TravelTime(failure));
}

struct TruncatingProvider;

impl TravelTimeProvider for TruncatingProvider {
    fn get_travel_time_matrix(
        &self,
        _points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        Ok(vec![vec![Duration::ZERO]])
    }
}

#[rstest]
fn malformed_matrices_are_rejected(request: PlanRequest) {
    let err = InsertionOptimizer::new(TruncatingProvider)
        .optimize(&request)
        .expect_err("malformed matrix");
    assert!(matches!(
        err,
        OptimizeError::TravelTime(TravelTimeError::MalformedMatrix { expected: 6, rows: 1 })
    ));
}

#[rstest]
fn unreachable_stops_are_reported() {
    let request = PlanRequest {
        plan_id: "p".into(),
        vehicles: vec![vehicle("V1", 10, 0.0, 0.0)],
        stops: vec![stop("S1", 1.0, 0.0, 1), stop("S2", 2.0, 0.0, 1)],
        constraints: Constraints::default(),
    };
    let provider = FixedMatrixTravelTimeProvider::from_optional_seconds(vec![
        vec![Some(0), Some(60), None],
        vec![Some(60), Some(0), None],
        vec![None, None, Some(0)],
    ]);
    let response = InsertionOptimizer::new(provider)
        .optimize(&request)
        .expect("optimize");
    assert_eq!(route_stops(&response.plan, "V1"), ids(&["S1"]));
    assert_eq!(
        response.plan.unassigned,
        vec![UnassignedStop {
            stop_id: "S2".into(),
            reason: UnassignedReason::Unreachable,
        }]
    );
}

#[rstest]
fn closed_windows_are_reported() {
    let window = TimeWindow::new(Duration::ZERO, Duration::from_secs(30)).expect("window");
    let request = PlanRequest {
        plan_id: "p".into(),
        vehicles: vec![vehicle("V1", 10, 0.0, 0.0)],
        stops: vec![stop("S1", 1.0, 0.0, 1).with_window(window)],
        constraints: Constraints::default(),
    };
    let response = InsertionOptimizer::new(GridTravelTimeProvider::default())
        .optimize(&request)
        .expect("optimize");
    assert_eq!(
        response.plan.unassigned.first().map(|entry| entry.reason),
        Some(UnassignedReason::TimeWindow)
    );
    assert!(response.plan.routes.iter().all(Route::is_empty));
}

#[rstest]
fn depot_return_is_part_of_the_cost(mut request: PlanRequest) {
    request.stops.truncate(1);
    request.constraints.depot = Some(Coord { x: 0.0, y: 0.0 });
    let response = InsertionOptimizer::new(GridTravelTimeProvider::default())
        .optimize(&request)
        .expect("optimize");
    let route = response.plan.route_for(&"V1".into()).expect("V1 route");
    assert_eq!(route.travel_time, Duration::from_secs(120));
    assert_eq!(route.visits[0].arrival, Duration::from_secs(60));
}

#[rstest]
fn iteration_limit_overrides_the_budget(mut request: PlanRequest) {
    request.constraints.iteration_limit = Some(0);
    let response = InsertionOptimizer::new(GridTravelTimeProvider::default())
        .optimize(&request)
        .expect("optimize");
    assert_eq!(response.diagnostics.iterations, 0);
    assert_eq!(
        response.diagnostics.final_cost,
        response.diagnostics.construction_cost
    );
}

#[rstest]
fn runs_are_deterministic(request: PlanRequest) {
    let optimizer = InsertionOptimizer::new(GridTravelTimeProvider::default());
    let first = optimizer.optimize(&request).expect("optimize");
    let second = optimizer.optimize(&request).expect("optimize");
    assert_eq!(first.plan, second.plan);
}

#[rstest]
#[case(OptimizerConfig::default(), 0, 32)]
#[case(OptimizerConfig::default(), 10, 80)]
#[case(OptimizerConfig::default().with_bounds(1, 5), 10, 5)]
#[case(OptimizerConfig::default().with_iterations_per_stop(0), 10, 32)]
fn budgets_are_clamped(#[case] config: OptimizerConfig, #[case] stops: usize, #[case] expected: usize) {
    assert_eq!(config.iteration_budget(stops), expected);
}
