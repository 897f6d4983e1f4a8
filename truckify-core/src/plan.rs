//! Routes and plans produced by the optimizer.
//!
//! A [`Plan`] assigns every submitted stop either to exactly one [`Route`] or
//! to the unassigned set. Infeasibility is data: stops that cannot be served
//! are listed with an [`UnassignedReason`] for operator review.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::duration_secs;
use crate::{PlanId, Stop, StopId, VehicleId};

/// A scheduled visit to one stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Stop being served.
    pub stop_id: StopId,
    /// Arrival offset from the plan start.
    #[serde(with = "duration_secs")]
    pub arrival: Duration,
    /// Departure offset after any waiting and service.
    #[serde(with = "duration_secs")]
    pub departure: Duration,
}

/// Ordered visits for a single vehicle.
///
/// Invariants upheld by the optimizer: `load` never exceeds the vehicle's
/// capacity and every arrival lies within its stop's time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Vehicle driving the route.
    pub vehicle_id: VehicleId,
    /// Visits in driving order.
    pub visits: Vec<Visit>,
    /// Cumulative demand of all visits.
    pub load: u32,
    /// Sum of travel legs, including any return leg to the depot.
    #[serde(with = "duration_secs")]
    pub travel_time: Duration,
    /// Time from departure to the end of the final leg.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl Route {
    /// An unused route for `vehicle_id`.
    pub fn empty(vehicle_id: impl Into<VehicleId>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            visits: Vec::new(),
            load: 0,
            travel_time: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    /// Stop identifiers in driving order.
    pub fn stop_ids(&self) -> impl Iterator<Item = &StopId> + '_ {
        self.visits.iter().map(|visit| &visit.stop_id)
    }

    /// Whether the route serves no stops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

/// Why a stop could not be placed on any route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// No route had enough spare capacity.
    Capacity,
    /// Every insertion would arrive after the window closes.
    TimeWindow,
    /// Every insertion would exceed the maximum route duration.
    RouteDuration,
    /// The travel-time provider reported no path to the stop.
    Unreachable,
    /// The fleet snapshot had no vehicle in service.
    NoAvailableVehicle,
}

/// A stop the optimizer could not serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedStop {
    /// Stop left unserved.
    pub stop_id: StopId,
    /// Dominant constraint that blocked it.
    pub reason: UnassignedReason,
}

/// Violations of the exactly-once coverage invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    /// A stop appears more than once across routes and the unassigned set.
    #[error("stop {0} appears more than once in the plan")]
    Duplicate(StopId),
    /// A submitted stop appears nowhere in the plan.
    #[error("stop {0} is missing from the plan")]
    Missing(StopId),
    /// The plan references a stop that was never submitted.
    #[error("stop {0} was not part of the request")]
    Unknown(StopId),
}

/// Stops and routes that changed between two revisions of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDiff {
    /// Stops whose vehicle changed, including moves to or from the
    /// unassigned set and stops that disappeared because they were completed.
    pub reassigned: Vec<StopId>,
    /// Vehicles whose visit order changed.
    pub resequenced: Vec<VehicleId>,
}

impl PlanDiff {
    /// Whether the two revisions are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reassigned.is_empty() && self.resequenced.is_empty()
    }
}

/// Assignment of stops to vehicle routes for one planning horizon.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use truckify_core::{Plan, Route, UnassignedReason, UnassignedStop};
///
/// let plan = Plan {
///     id: "north".into(),
///     revision: 1,
///     routes: vec![Route::empty("V1")],
///     unassigned: vec![UnassignedStop {
///         stop_id: "S1".into(),
///         reason: UnassignedReason::Capacity,
///     }],
///     total_cost: Duration::ZERO,
/// };
/// assert!(!plan.is_feasible());
/// assert_eq!(plan.assigned_vehicle(&"S1".into()), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier.
    pub id: PlanId,
    /// Monotonic revision, bumped on every commit.
    #[serde(default)]
    pub revision: u64,
    /// One route per available vehicle, possibly empty.
    pub routes: Vec<Route>,
    /// Stops that could not be served.
    #[serde(default)]
    pub unassigned: Vec<UnassignedStop>,
    /// Sum of route travel times.
    #[serde(with = "duration_secs")]
    pub total_cost: Duration,
}

impl Plan {
    /// A plan without routes, used when there is nothing to schedule.
    pub fn empty(id: impl Into<PlanId>) -> Self {
        Self {
            id: id.into(),
            revision: 0,
            routes: Vec::new(),
            unassigned: Vec::new(),
            total_cost: Duration::ZERO,
        }
    }

    /// Whether every stop was placed on a route.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// Route driven by `vehicle_id`, if the vehicle is part of the plan.
    #[must_use]
    pub fn route_for(&self, vehicle_id: &VehicleId) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| &route.vehicle_id == vehicle_id)
    }

    /// Vehicle serving `stop_id`, if any.
    #[must_use]
    pub fn assigned_vehicle(&self, stop_id: &StopId) -> Option<&VehicleId> {
        self.routes
            .iter()
            .find(|route| route.stop_ids().any(|id| id == stop_id))
            .map(|route| &route.vehicle_id)
    }

    /// Vehicles that hold a route in this plan.
    pub fn vehicle_ids(&self) -> impl Iterator<Item = &VehicleId> + '_ {
        self.routes.iter().map(|route| &route.vehicle_id)
    }

    /// Verify every stop in `stops` is covered exactly once.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoverageError`] found.
    pub fn check_coverage(&self, stops: &[Stop]) -> Result<(), CoverageError> {
        let expected: HashSet<&StopId> = stops.iter().map(|stop| &stop.id).collect();
        let mut seen = HashSet::with_capacity(expected.len());
        let placed = self
            .routes
            .iter()
            .flat_map(Route::stop_ids)
            .chain(self.unassigned.iter().map(|entry| &entry.stop_id));
        for stop_id in placed {
            if !expected.contains(stop_id) {
                return Err(CoverageError::Unknown(stop_id.clone()));
            }
            if !seen.insert(stop_id) {
                return Err(CoverageError::Duplicate(stop_id.clone()));
            }
        }
        match stops.iter().find(|stop| !seen.contains(&stop.id)) {
            Some(stop) => Err(CoverageError::Missing(stop.id.clone())),
            None => Ok(()),
        }
    }

    /// Describe how this plan differs from `previous`.
    #[must_use]
    pub fn diff(&self, previous: &Self) -> PlanDiff {
        let before = assignment_index(previous);
        let after = assignment_index(self);
        let reassigned: BTreeSet<StopId> = before
            .iter()
            .filter(|(stop, vehicle)| after.get(*stop) != Some(*vehicle))
            .map(|(stop, _)| (*stop).clone())
            .chain(
                after
                    .iter()
                    .filter(|(stop, vehicle)| before.get(*stop) != Some(*vehicle))
                    .map(|(stop, _)| (*stop).clone()),
            )
            .collect();

        let resequenced = self
            .routes
            .iter()
            .filter(|route| {
                previous.route_for(&route.vehicle_id).is_none_or(|old| {
                    !old.stop_ids().eq(route.stop_ids())
                })
            })
            .map(|route| route.vehicle_id.clone())
            .collect();

        PlanDiff {
            reassigned: reassigned.into_iter().collect(),
            resequenced,
        }
    }
}

/// Map each stop to its vehicle, or `None` when unassigned.
fn assignment_index(plan: &Plan) -> HashMap<&StopId, Option<&VehicleId>> {
    plan.routes
        .iter()
        .flat_map(|route| route.stop_ids().map(move |id| (id, Some(&route.vehicle_id))))
        .chain(plan.unassigned.iter().map(|entry| (&entry.stop_id, None)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};

    fn visit(id: &str) -> Visit {
        Visit {
            stop_id: id.into(),
            arrival: Duration::ZERO,
            departure: Duration::ZERO,
        }
    }

    fn route(vehicle: &str, stops: &[&str]) -> Route {
        Route {
            visits: stops.iter().map(|id| visit(id)).collect(),
            ..Route::empty(vehicle)
        }
    }

    fn stops(ids: &[&str]) -> Vec<Stop> {
        ids.iter()
            .map(|id| Stop::new(*id, Coord { x: 0.0, y: 0.0 }, 1))
            .collect()
    }

    #[fixture]
    fn plan() -> Plan {
        Plan {
            routes: vec![route("V1", &["S1", "S2"]), route("V2", &["S3"])],
            unassigned: vec![UnassignedStop {
                stop_id: "S4".into(),
                reason: UnassignedReason::TimeWindow,
            }],
            ..Plan::empty("p")
        }
    }

    #[rstest]
    fn complete_plan_passes_coverage(plan: Plan) {
        assert_eq!(plan.check_coverage(&stops(&["S1", "S2", "S3", "S4"])), Ok(()));
    }

    #[rstest]
    fn missing_stop_is_reported(plan: Plan) {
        let err = plan
            .check_coverage(&stops(&["S1", "S2", "S3", "S4", "S5"]))
            .expect_err("S5 missing");
        assert_eq!(err, CoverageError::Missing("S5".into()));
    }

    #[rstest]
    fn duplicated_stop_is_reported(mut plan: Plan) {
        plan.unassigned.push(UnassignedStop {
            stop_id: "S1".into(),
            reason: UnassignedReason::Capacity,
        });
        let err = plan
            .check_coverage(&stops(&["S1", "S2", "S3", "S4"]))
            .expect_err("S1 duplicated");
        assert_eq!(err, CoverageError::Duplicate("S1".into()));
    }

    #[rstest]
    fn unknown_stop_is_reported(plan: Plan) {
        let err = plan
            .check_coverage(&stops(&["S1", "S2", "S4"]))
            .expect_err("S3 unknown");
        assert_eq!(err, CoverageError::Unknown("S3".into()));
    }

    #[rstest]
    fn diff_lists_moved_stops_and_resequenced_routes(plan: Plan) {
        let next = Plan {
            routes: vec![route("V1", &["S2"]), route("V2", &["S3", "S1", "S4"])],
            unassigned: Vec::new(),
            ..Plan::empty("p")
        };
        let diff = next.diff(&plan);
        assert_eq!(diff.reassigned, vec![StopId::from("S1"), StopId::from("S4")]);
        assert_eq!(diff.resequenced, vec![VehicleId::from("V1"), VehicleId::from("V2")]);
        assert!(plan.diff(&plan).is_empty());
    }

    #[rstest]
    fn lookups_find_routes_and_vehicles(plan: Plan) {
        assert_eq!(plan.assigned_vehicle(&"S3".into()), Some(&VehicleId::from("V2")));
        assert!(plan.route_for(&"V9".into()).is_none());
        assert_eq!(plan.vehicle_ids().count(), 2);
    }
}
