use std::collections::HashSet;
use std::time::Duration;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geodesy::is_valid_coordinate;
use crate::time::{duration_secs, option_duration_secs};
use crate::{Plan, PlanId, Stop, StopId, TravelTimeError, Vehicle, VehicleId};

/// Planning constraints shared by every route in a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Upper bound on a route's duration, including waiting and service.
    #[serde(default, with = "option_duration_secs")]
    pub max_route_duration: Option<Duration>,
    /// Where every route ends. The return leg counts towards route cost.
    #[serde(default)]
    pub depot: Option<Coord<f64>>,
    /// Override for the local-search iteration budget.
    #[serde(default)]
    pub iteration_limit: Option<usize>,
}

/// Parameters for an optimization run.
///
/// The fleet snapshot and stop list are immutable for the duration of the
/// run. Capacities come from the vehicles themselves.
///
/// # Examples
/// ```rust
/// use geo::Coord;
/// use truckify_core::{Constraints, PlanRequest, Stop, Vehicle};
///
/// let request = PlanRequest {
///     plan_id: "north".into(),
///     vehicles: vec![Vehicle::new("V1", 10, Coord { x: 0.0, y: 0.0 })],
///     stops: vec![Stop::new("S1", Coord { x: 0.01, y: 0.0 }, 4)],
///     constraints: Constraints::default(),
/// };
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Identifier of the resulting plan.
    pub plan_id: PlanId,
    /// Fleet snapshot.
    pub vehicles: Vec<Vehicle>,
    /// Stops to assign.
    #[serde(default)]
    pub stops: Vec<Stop>,
    /// Shared constraints.
    #[serde(default)]
    pub constraints: Constraints,
}

/// Reasons a [`PlanRequest`] is rejected before optimization starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanRequestValidationError {
    /// The fleet snapshot was empty.
    #[error("at least one vehicle is required")]
    NoVehicles,
    /// Two vehicles share an identifier.
    #[error("vehicle {0} appears more than once")]
    DuplicateVehicle(VehicleId),
    /// Two stops share an identifier.
    #[error("stop {0} appears more than once")]
    DuplicateStop(StopId),
    /// A vehicle position is outside the valid coordinate ranges.
    #[error("vehicle {0} has an invalid position")]
    InvalidVehiclePosition(VehicleId),
    /// A stop location is outside the valid coordinate ranges.
    #[error("stop {0} has an invalid location")]
    InvalidStopLocation(StopId),
    /// The depot is outside the valid coordinate ranges.
    #[error("depot has an invalid location")]
    InvalidDepot,
    /// A stop window closes before it opens.
    #[error("stop {0} has a time window that closes before it opens")]
    InvertedTimeWindow(StopId),
}

impl PlanRequest {
    /// Check the request for malformed input.
    ///
    /// # Errors
    ///
    /// Returns the first [`PlanRequestValidationError`] found.
    pub fn validate(&self) -> Result<(), PlanRequestValidationError> {
        if self.vehicles.is_empty() {
            return Err(PlanRequestValidationError::NoVehicles);
        }
        let mut vehicle_ids = HashSet::with_capacity(self.vehicles.len());
        for vehicle in &self.vehicles {
            if !vehicle_ids.insert(&vehicle.id) {
                return Err(PlanRequestValidationError::DuplicateVehicle(
                    vehicle.id.clone(),
                ));
            }
            if !is_valid_coordinate(vehicle.position) {
                return Err(PlanRequestValidationError::InvalidVehiclePosition(
                    vehicle.id.clone(),
                ));
            }
        }
        let mut stop_ids = HashSet::with_capacity(self.stops.len());
        for stop in &self.stops {
            if !stop_ids.insert(&stop.id) {
                return Err(PlanRequestValidationError::DuplicateStop(stop.id.clone()));
            }
            if !is_valid_coordinate(stop.location) {
                return Err(PlanRequestValidationError::InvalidStopLocation(
                    stop.id.clone(),
                ));
            }
            if stop.window.is_some_and(|window| !window.is_ordered()) {
                return Err(PlanRequestValidationError::InvertedTimeWindow(
                    stop.id.clone(),
                ));
            }
        }
        if self
            .constraints
            .depot
            .is_some_and(|depot| !is_valid_coordinate(depot))
        {
            return Err(PlanRequestValidationError::InvalidDepot);
        }
        Ok(())
    }
}

/// Solver diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Wall-clock time spent optimizing.
    #[serde(with = "duration_secs")]
    pub solve_time: Duration,
    /// Plan cost after the construction phase.
    #[serde(with = "duration_secs")]
    pub construction_cost: Duration,
    /// Plan cost after local search.
    #[serde(with = "duration_secs")]
    pub final_cost: Duration,
    /// Local-search iterations that were run.
    pub iterations: usize,
    /// Improving moves applied.
    pub accepted_moves: usize,
}

/// Result of a successful optimization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// The optimized plan. Infeasible stops are listed as unassigned.
    pub plan: Plan,
    /// How the solver got there.
    pub diagnostics: Diagnostics,
}

/// Errors returned by [`Optimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// The request was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] PlanRequestValidationError),
    /// The travel-time provider failed.
    #[error("travel time lookup failed: {0}")]
    TravelTime(#[from] TravelTimeError),
}

/// Assign stops to vehicles and sequence each route.
///
/// Implementations must be deterministic for fixed inputs and report
/// infeasibility through [`Plan::unassigned`] rather than as an error.
/// Optimizers must be `Send + Sync` so the live pipeline can run them on a
/// blocking worker.
pub trait Optimizer: Send + Sync {
    /// Optimize a request into a plan.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::InvalidInput`] for malformed requests and
    /// [`OptimizeError::TravelTime`] when travel times cannot be fetched.
    fn optimize(&self, request: &PlanRequest) -> Result<PlanResponse, OptimizeError>;
}

impl<T: Optimizer + ?Sized> Optimizer for std::sync::Arc<T> {
    fn optimize(&self, request: &PlanRequest) -> Result<PlanResponse, OptimizeError> {
        (**self).optimize(request)
    }
}
