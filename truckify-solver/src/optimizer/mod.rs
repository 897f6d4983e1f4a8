//! `InsertionOptimizer`: nearest-insertion construction followed by bounded
//! relocate/swap local search.

use std::time::Instant;

use geo::Coord;
use truckify_core::travel_time::validate_matrix;
use truckify_core::{
    Diagnostics, OptimizeError, Optimizer, Plan, PlanRequest, PlanResponse, Route,
    TravelTimeProvider, UnassignedReason, UnassignedStop, Vehicle, Visit,
};

use crate::construction::{Solution, construct};
use crate::local_search::improve;
use crate::model::{Problem, Schedule};

/// Configuration for [`InsertionOptimizer`].
///
/// The local-search budget is `iterations_per_stop × stops`, clamped to
/// `[min_iterations, max_iterations]`. A request may override it through
/// `Constraints::iteration_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Iterations granted per submitted stop.
    pub iterations_per_stop: usize,
    /// Lower bound on the budget.
    pub min_iterations: usize,
    /// Upper bound on the budget.
    pub max_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations_per_stop: 8,
            min_iterations: 32,
            max_iterations: 4_000,
        }
    }
}

impl OptimizerConfig {
    /// Set the per-stop iteration allowance.
    #[must_use]
    pub const fn with_iterations_per_stop(mut self, iterations: usize) -> Self {
        self.iterations_per_stop = iterations;
        self
    }

    /// Set the budget bounds.
    #[must_use]
    pub const fn with_bounds(mut self, min_iterations: usize, max_iterations: usize) -> Self {
        self.min_iterations = min_iterations;
        self.max_iterations = max_iterations;
        self
    }

    /// Budget for a request with `stops` stops.
    ///
    /// # Examples
    /// ```rust
    /// use truckify_solver::OptimizerConfig;
    ///
    /// let config = OptimizerConfig::default();
    /// assert_eq!(config.iteration_budget(2), 32);
    /// assert_eq!(config.iteration_budget(100), 800);
    /// assert_eq!(config.iteration_budget(1_000), 4_000);
    /// ```
    #[must_use]
    pub fn iteration_budget(&self, stops: usize) -> usize {
        let max = self.max_iterations.max(self.min_iterations);
        self.iterations_per_stop
            .saturating_mul(stops)
            .clamp(self.min_iterations, max)
    }
}

/// Deterministic heuristic optimizer.
///
/// The optimizer is generic over the travel-time provider and fetches a
/// single matrix per run covering every available vehicle start, every stop
/// and the depot.
///
/// # Examples
/// ```rust
/// use geo::Coord;
/// use truckify_core::{Constraints, HaversineTravelTimeProvider, Optimizer, PlanRequest, Stop, Vehicle};
/// use truckify_solver::InsertionOptimizer;
///
/// let optimizer = InsertionOptimizer::new(HaversineTravelTimeProvider::default());
/// let request = PlanRequest {
///     plan_id: "north".into(),
///     vehicles: vec![Vehicle::new("V1", 10, Coord { x: -0.10, y: 51.50 })],
///     stops: vec![
///         Stop::new("S1", Coord { x: -0.12, y: 51.51 }, 3),
///         Stop::new("S2", Coord { x: -0.14, y: 51.52 }, 3),
///     ],
///     constraints: Constraints::default(),
/// };
/// let response = optimizer.optimize(&request)?;
/// assert!(response.plan.is_feasible());
/// assert!(response.diagnostics.final_cost <= response.diagnostics.construction_cost);
/// # Ok::<(), truckify_core::OptimizeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct InsertionOptimizer<T>
where
    T: TravelTimeProvider,
{
    travel_time_provider: T,
    config: OptimizerConfig,
}

impl<T> InsertionOptimizer<T>
where
    T: TravelTimeProvider,
{
    /// Construct an optimizer using default configuration.
    pub fn new(travel_time_provider: T) -> Self {
        Self::with_config(travel_time_provider, OptimizerConfig::default())
    }

    /// Construct an optimizer with explicit configuration.
    pub const fn with_config(travel_time_provider: T, config: OptimizerConfig) -> Self {
        Self {
            travel_time_provider,
            config,
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn matrix_points(vehicles: &[&Vehicle], request: &PlanRequest) -> Vec<Coord<f64>> {
        vehicles
            .iter()
            .map(|vehicle| vehicle.position)
            .chain(request.stops.iter().map(|stop| stop.location))
            .chain(request.constraints.depot)
            .collect()
    }
}

impl<T> Optimizer for InsertionOptimizer<T>
where
    T: TravelTimeProvider,
{
    fn optimize(&self, request: &PlanRequest) -> Result<PlanResponse, OptimizeError> {
        request.validate()?;
        let started_at = Instant::now();

        let vehicles: Vec<&Vehicle> = request
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.status.is_available())
            .collect();

        if request.stops.is_empty() || vehicles.is_empty() {
            let plan = trivial_plan(request, &vehicles);
            return Ok(PlanResponse {
                plan,
                diagnostics: Diagnostics {
                    solve_time: started_at.elapsed(),
                    ..Diagnostics::default()
                },
            });
        }

        let points = Self::matrix_points(&vehicles, request);
        let matrix = self.travel_time_provider.get_travel_time_matrix(&points)?;
        validate_matrix(&matrix, points.len())?;

        let problem = Problem::new(vehicles, &request.stops, matrix, &request.constraints);
        let mut solution = construct(&problem);
        let construction_cost = solution.cost();

        let budget = request
            .constraints
            .iteration_limit
            .unwrap_or_else(|| self.config.iteration_budget(request.stops.len()));
        let outcome = improve(&problem, &mut solution, budget);
        let final_cost = solution.cost();
        debug_assert!(final_cost <= construction_cost);

        let plan = assemble_plan(request, &problem, solution);
        log::debug!(
            "optimized plan {} with {} route(s): cost {:?} -> {:?}, {} unassigned, {} move(s) in {} iteration(s)",
            plan.id,
            plan.routes.len(),
            construction_cost,
            final_cost,
            plan.unassigned.len(),
            outcome.accepted_moves,
            outcome.iterations,
        );
        Ok(PlanResponse {
            plan,
            diagnostics: Diagnostics {
                solve_time: started_at.elapsed(),
                construction_cost,
                final_cost,
                iterations: outcome.iterations,
                accepted_moves: outcome.accepted_moves,
            },
        })
    }
}

/// Plan for requests that need no travel times: no stops, or no vehicle to
/// carry them.
fn trivial_plan(request: &PlanRequest, vehicles: &[&Vehicle]) -> Plan {
    let mut unassigned: Vec<UnassignedStop> = request
        .stops
        .iter()
        .map(|stop| UnassignedStop {
            stop_id: stop.id.clone(),
            reason: UnassignedReason::NoAvailableVehicle,
        })
        .collect();
    unassigned.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
    Plan {
        routes: vehicles
            .iter()
            .map(|vehicle| Route::empty(vehicle.id.clone()))
            .collect(),
        unassigned,
        ..Plan::empty(request.plan_id.clone())
    }
}

fn assemble_plan(request: &PlanRequest, problem: &Problem<'_>, solution: Solution) -> Plan {
    let total_cost = solution.cost();
    let routes = problem
        .vehicles
        .iter()
        .zip(solution.routes.iter().zip(solution.schedules))
        .map(|(vehicle, (sequence, schedule))| build_route(problem, vehicle, sequence, schedule))
        .collect();
    let mut unassigned: Vec<UnassignedStop> = solution
        .unassigned
        .into_iter()
        .filter_map(|(stop, violation)| {
            problem.stop(stop).map(|stop| UnassignedStop {
                stop_id: stop.id.clone(),
                reason: violation.into(),
            })
        })
        .collect();
    unassigned.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
    Plan {
        id: request.plan_id.clone(),
        revision: 0,
        routes,
        unassigned,
        total_cost,
    }
}

fn build_route(problem: &Problem<'_>, vehicle: &Vehicle, sequence: &[usize], schedule: Schedule) -> Route {
    let visits = sequence
        .iter()
        .zip(schedule.visits)
        .filter_map(|(&stop, times)| {
            problem.stop(stop).map(|stop| Visit {
                stop_id: stop.id.clone(),
                arrival: times.arrival,
                departure: times.departure,
            })
        })
        .collect();
    Route {
        vehicle_id: vehicle.id.clone(),
        visits,
        load: schedule.load,
        travel_time: schedule.travel_time,
        duration: schedule.duration,
    }
}

#[cfg(test)]
mod tests;
