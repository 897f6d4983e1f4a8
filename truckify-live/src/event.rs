//! Events pushed to subscribers and the filters that select them.

use std::collections::BTreeSet;

use geo::Coord;
use serde::{Deserialize, Serialize};
use truckify_core::{LocationRecord, Plan, PlanId, Route, StopId, Timestamp, UnassignedStop, VehicleId};

/// Outbound event stream item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FleetEvent {
    /// A position report was accepted.
    LocationUpdate {
        /// Reporting vehicle.
        vehicle_id: VehicleId,
        /// Plan the vehicle is driving, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan_id: Option<PlanId>,
        /// Accepted position.
        position: Coord<f64>,
        /// Report timestamp.
        timestamp: Timestamp,
        /// Per-vehicle sequence number of the accepted record.
        sequence: u64,
        /// Ground speed in metres per second.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        /// Heading in degrees.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heading: Option<f64>,
    },
    /// A plan revision was committed.
    PlanUpdate {
        /// Committed plan.
        plan_id: PlanId,
        /// Revision after the commit.
        revision: u64,
        /// Routes of the new revision.
        routes: Vec<Route>,
        /// Stops left unserved.
        unassigned: Vec<UnassignedStop>,
        /// Stops whose vehicle changed since the previous revision.
        #[serde(default)]
        reassigned: Vec<StopId>,
    },
}

impl FleetEvent {
    /// Location update for an accepted record.
    #[must_use]
    pub fn location(record: &LocationRecord, plan_id: Option<PlanId>) -> Self {
        Self::LocationUpdate {
            vehicle_id: record.vehicle_id.clone(),
            plan_id,
            position: record.position,
            timestamp: record.timestamp,
            sequence: record.sequence,
            speed: record.speed,
            heading: record.heading,
        }
    }

    /// Plan update for a committed revision.
    #[must_use]
    pub fn plan(plan: &Plan, reassigned: Vec<StopId>) -> Self {
        Self::PlanUpdate {
            plan_id: plan.id.clone(),
            revision: plan.revision,
            routes: plan.routes.clone(),
            unassigned: plan.unassigned.clone(),
            reassigned,
        }
    }
}

/// Which events a subscriber wants.
///
/// A location update matches when its vehicle or its plan is selected. A plan
/// update matches when its plan is selected or one of its routes belongs to a
/// selected vehicle.
///
/// # Examples
/// ```
/// use truckify_live::InterestSet;
///
/// let interest = InterestSet::vehicles(["V1"]).with_plan("north");
/// assert!(!interest.is_fleet_wide());
/// assert!(InterestSet::fleet_wide().is_fleet_wide());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum InterestSet {
    /// Every event.
    #[default]
    FleetWide,
    /// Events for specific vehicles or plans.
    Selected {
        /// Selected vehicles.
        #[serde(default)]
        vehicles: BTreeSet<VehicleId>,
        /// Selected plans.
        #[serde(default)]
        plans: BTreeSet<PlanId>,
    },
}

impl InterestSet {
    /// Interest in every event.
    #[must_use]
    pub const fn fleet_wide() -> Self {
        Self::FleetWide
    }

    /// Interest in the given vehicles.
    pub fn vehicles<I, V>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VehicleId>,
    {
        Self::Selected {
            vehicles: vehicles.into_iter().map(Into::into).collect(),
            plans: BTreeSet::new(),
        }
    }

    /// Interest in the given plans.
    pub fn plans<I, P>(plans: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlanId>,
    {
        Self::Selected {
            vehicles: BTreeSet::new(),
            plans: plans.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a vehicle. Fleet-wide interest is unchanged.
    #[must_use]
    pub fn with_vehicle(mut self, vehicle: impl Into<VehicleId>) -> Self {
        if let Self::Selected { vehicles, .. } = &mut self {
            vehicles.insert(vehicle.into());
        }
        self
    }

    /// Add a plan. Fleet-wide interest is unchanged.
    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<PlanId>) -> Self {
        if let Self::Selected { plans, .. } = &mut self {
            plans.insert(plan.into());
        }
        self
    }

    /// Whether every event matches.
    #[must_use]
    pub const fn is_fleet_wide(&self) -> bool {
        matches!(self, Self::FleetWide)
    }

    /// Whether `event` should be delivered.
    #[must_use]
    pub fn matches(&self, event: &FleetEvent) -> bool {
        let Self::Selected { vehicles, plans } = self else {
            return true;
        };
        match event {
            FleetEvent::LocationUpdate {
                vehicle_id,
                plan_id,
                ..
            } => {
                vehicles.contains(vehicle_id)
                    || plan_id.as_ref().is_some_and(|id| plans.contains(id))
            }
            FleetEvent::PlanUpdate {
                plan_id, routes, ..
            } => {
                plans.contains(plan_id)
                    || routes
                        .iter()
                        .any(|route| vehicles.contains(&route.vehicle_id))
            }
        }
    }
}
