//! Property-based tests for the insertion optimizer.
//!
//! # Invariants tested
//!
//! - **Coverage:** every stop is in exactly one route or the unassigned set.
//! - **Capacity:** no route's load exceeds its vehicle's capacity.
//! - **Windows:** every arrival lies inside its stop's window.
//! - **Monotone cost:** local search never makes the plan more expensive.
//! - **Determinism:** identical requests yield identical plans.


use proptest::prelude::*;
use truckify_core::test_support::GridTravelTimeProvider;
use truckify_core::{Optimizer, PlanRequest};
use truckify_solver::InsertionOptimizer;

use proptest_support::request_strategy;

fn optimizer() -> InsertionOptimizer<GridTravelTimeProvider> {
    InsertionOptimizer::new(GridTravelTimeProvider::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn every_stop_is_covered_exactly_once(request in request_strategy()) {
        let response = optimizer().optimize(&request).expect("optimize");
        prop_assert_eq!(response.plan.check_coverage(&request.stops), Ok(()));
    }

    #[test]
    fn routes_respect_capacity(request in request_strategy()) {
        let response = optimizer().optimize(&request).expect("optimize");
        for route in &response.plan.routes {
            let capacity = request
                .vehicles
                .iter()
                .find(|vehicle| vehicle.id == route.vehicle_id)
                .map(|vehicle| vehicle.capacity);
            prop_assert!(capacity.is_some_and(|capacity| route.load <= capacity));
        }
    }

    #[test]
    fn arrivals_fall_inside_windows(request in request_strategy()) {
        let response = optimizer().optimize(&request).expect("optimize");
        for visit in response.plan.routes.iter().flat_map(|route| &route.visits) {
            let window = request
                .stops
                .iter()
                .find(|stop| stop.id == visit.stop_id)
                .and_then(|stop| stop.window);
            if let Some(window) = window {
                prop_assert!(visit.arrival <= window.latest);
                prop_assert!(visit.departure >= window.earliest);
            }
        }
    }

    #[test]
    fn local_search_never_increases_cost(request in request_strategy()) {
        let response = optimizer().optimize(&request).expect("optimize");
        let diagnostics = &response.diagnostics;
        prop_assert!(diagnostics.final_cost <= diagnostics.construction_cost);
        prop_assert_eq!(response.plan.total_cost, diagnostics.final_cost);
    }

    #[test]
    fn identical_requests_yield_identical_plans(request in request_strategy()) {
        let first = optimizer().optimize(&request).expect("optimize");
        let replay: PlanRequest = request.clone();
        let second = optimizer().optimize(&replay).expect("optimize");
        prop_assert_eq!(first.plan, second.plan);
    }
}
