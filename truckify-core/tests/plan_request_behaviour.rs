#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for plan request validation.

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::time::Duration;
use truckify_core::{
    Constraints, PlanRequest, PlanRequestValidationError, Stop, TimeWindow, Vehicle,
};

struct World {
    request: RefCell<PlanRequest>,
    outcome: RefCell<Option<Result<(), PlanRequestValidationError>>>,
}

#[fixture]
fn world() -> World {
    World {
        request: RefCell::new(PlanRequest {
            plan_id: "p".into(),
            vehicles: Vec::new(),
            stops: Vec::new(),
            constraints: Constraints::default(),
        }),
        outcome: RefCell::new(None),
    }
}

#[given("a request with no vehicles and one stop")]
fn no_vehicles(world: &World) {
    let mut request = world.request.borrow_mut();
    request.vehicles.clear();
    request
        .stops
        .push(Stop::new("S1", Coord { x: 0.0, y: 0.0 }, 1));
}

#[given("a request with two vehicles and no stops")]
fn two_vehicles(world: &World) {
    let mut request = world.request.borrow_mut();
    request.vehicles = vec![
        Vehicle::new("V1", 10, Coord { x: 0.0, y: 0.0 }),
        Vehicle::new("V2", 10, Coord { x: 1.0, y: 0.0 }),
    ];
    request.stops.clear();
}

#[given("a stop {id:word} whose window closes before it opens")]
fn inverted_stop(world: &World, id: String) {
    let stop_id = id.trim_matches('"');
    let window = TimeWindow {
        earliest: Duration::from_secs(120),
        latest: Duration::from_secs(60),
    };
    world
        .request
        .borrow_mut()
        .stops
        .push(Stop::new(stop_id, Coord { x: 0.5, y: 0.5 }, 1).with_window(window));
}

#[when("the request is validated")]
fn validate(world: &World) {
    *world.outcome.borrow_mut() = Some(world.request.borrow().validate());
}

#[then("validation succeeds")]
fn succeeds(world: &World) {
    assert_eq!(*world.outcome.borrow(), Some(Ok(())));
}

#[then("validation fails with {message}")]
fn fails_with(world: &World, message: String) {
    let borrow = world.outcome.borrow();
    let err = borrow
        .as_ref()
        .expect("request validated")
        .as_ref()
        .expect_err("expected a validation error");
    assert_eq!(err.to_string(), message.trim_matches('"'));
}

#[scenario(path = "tests/features/plan_request.feature", index = 0)]
fn rejects_empty_fleet(world: World) {
    let _ = world;
}

#[scenario(path = "tests/features/plan_request.feature", index = 1)]
fn accepts_empty_stop_list(world: World) {
    let _ = world;
}

#[scenario(path = "tests/features/plan_request.feature", index = 2)]
fn rejects_inverted_window(world: World) {
    let _ = world;
}
