//! Re-optimization of an active plan from live state.

use std::sync::Arc;

use truckify_core::{
    Alert, AlertSink, FleetRoster, OptimizeError, Optimizer, PlanId, PlanRequest, PlanResponse,
    Stop, Vehicle,
};

use crate::{BroadcastHub, CommitOutcome, FleetEvent, LocationStore, PlanBook, PlanContext};

/// A re-optimization request captured from live state.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    /// Request handed to the optimizer.
    pub request: PlanRequest,
    /// Context committed alongside the result.
    pub context: PlanContext,
    epoch: u64,
}

/// Builds re-optimization requests and commits their results.
///
/// A request covers the roster vehicles currently driving the plan, each
/// placed at its last accepted position, and the plan's outstanding stops with
/// their windows rebased to the new start. The new start is the latest report
/// among those vehicles, never earlier than the current start.
pub struct Replanner {
    roster: Arc<dyn FleetRoster>,
    store: Arc<LocationStore>,
    plans: Arc<PlanBook>,
    optimizer: Arc<dyn Optimizer>,
    hub: BroadcastHub,
    alerts: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for Replanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replanner").finish_non_exhaustive()
    }
}

impl Replanner {
    /// Wire a replanner to the shared live state.
    pub fn new(
        roster: Arc<dyn FleetRoster>,
        store: Arc<LocationStore>,
        plans: Arc<PlanBook>,
        optimizer: Arc<dyn Optimizer>,
        hub: BroadcastHub,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            roster,
            store,
            plans,
            optimizer,
            hub,
            alerts,
        }
    }

    /// Capture the current state of `plan_id`.
    ///
    /// Returns `None` when the plan is no longer active or none of its
    /// vehicles remain on the roster.
    #[must_use]
    pub fn prepare(&self, plan_id: &PlanId) -> Option<PreparedRun> {
        let snapshot = self.plans.snapshot(plan_id)?;
        let vehicles: Vec<Vehicle> = snapshot
            .vehicle_ids
            .iter()
            .filter_map(|vehicle_id| {
                let vehicle = self.roster.vehicle(vehicle_id);
                if vehicle.is_none() {
                    log::warn!("vehicle {vehicle_id} left the roster; dropping it from plan {plan_id}");
                }
                vehicle
            })
            .map(|vehicle| match self.store.get(&vehicle.id) {
                Some(record) => vehicle.with_position(record.position, record.timestamp),
                None => vehicle,
            })
            .collect();
        if vehicles.is_empty() {
            log::warn!("plan {plan_id} has no vehicles left to re-optimize");
            return None;
        }

        let started_at = vehicles
            .iter()
            .map(|vehicle| vehicle.position_at)
            .fold(snapshot.started_at, Ord::max);
        let elapsed = started_at.saturating_duration_since(snapshot.started_at);
        let stops: Vec<Stop> = snapshot
            .outstanding
            .iter()
            .map(|stop| stop.rebased(elapsed))
            .collect();

        let context = PlanContext {
            stops: stops.clone(),
            origins: vehicles
                .iter()
                .map(|vehicle| (vehicle.id.clone(), vehicle.position))
                .collect(),
            started_at,
            constraints: snapshot.constraints,
        };
        Some(PreparedRun {
            request: PlanRequest {
                plan_id: plan_id.clone(),
                vehicles,
                stops,
                constraints: snapshot.constraints,
            },
            context,
            epoch: snapshot.epoch,
        })
    }

    /// Optimize a prepared request. CPU-bound; call from a blocking context.
    ///
    /// # Errors
    ///
    /// Propagates [`OptimizeError`] from the optimizer.
    pub fn run(&self, prepared: &PreparedRun) -> Result<PlanResponse, OptimizeError> {
        self.optimizer.optimize(&prepared.request)
    }

    /// Commit `response` unless the plan moved on since `prepared` was taken.
    ///
    /// Returns `None` when the plan was committed, reached a stop or was
    /// retired in between; the caller should prepare a fresh run.
    pub fn apply(&self, prepared: PreparedRun, response: PlanResponse) -> Option<CommitOutcome> {
        let plan_id = prepared.request.plan_id;
        let outcome =
            self.plans
                .commit_if_unchanged(response.plan, prepared.context, prepared.epoch);
        match &outcome {
            Some(committed) => self.announce(committed),
            None => log::debug!("plan {plan_id} changed during re-optimization; result discarded"),
        }
        outcome
    }

    /// Raise a failure alert for `plan_id`.
    pub fn report_failure(&self, plan_id: &PlanId, err: &OptimizeError) {
        self.alerts.notify(Alert::ReoptimizationFailed {
            plan_id: plan_id.clone(),
            message: err.to_string(),
        });
    }

    /// Publish a committed revision and alert on unserved stops.
    pub(crate) fn announce(&self, outcome: &CommitOutcome) {
        let plan = &outcome.plan;
        log::info!(
            "committed plan {} revision {} ({} stop(s) reassigned)",
            plan.id,
            plan.revision,
            outcome.reassigned.len()
        );
        self.hub
            .publish(&FleetEvent::plan(plan, outcome.reassigned.clone()));
        if !plan.unassigned.is_empty() {
            self.alerts.notify(Alert::StopsUnassigned {
                plan_id: plan.id.clone(),
                stops: plan
                    .unassigned
                    .iter()
                    .map(|entry| entry.stop_id.clone())
                    .collect(),
            });
        }
    }
}
