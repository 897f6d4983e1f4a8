//! Active plans and the progress of the vehicles driving them.
//!
//! The book is the only place a plan revision is committed. Each plan lives
//! in its own map entry and a commit replaces it whole under that entry's
//! lock, so readers see either the old revision or the new one and progress
//! on one plan never waits for another.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use geo::Coord;
use truckify_core::geodesy::haversine_distance_m;
use truckify_core::{Constraints, Plan, PlanId, Route, Stop, StopId, Timestamp, VehicleId};

use crate::PlanError;

/// What a plan was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanContext {
    /// Stops the plan covers.
    pub stops: Vec<Stop>,
    /// Where each vehicle started.
    pub origins: BTreeMap<VehicleId, Coord<f64>>,
    /// Instant the plan's offsets are measured from.
    pub started_at: Timestamp,
    /// Constraints reused when the plan is re-optimized.
    pub constraints: Constraints,
}

/// Result of committing a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The plan as stored, with its new revision.
    pub plan: Plan,
    /// Stops whose vehicle changed relative to the previous revision.
    pub reassigned: Vec<StopId>,
}

/// The next stop a vehicle is expected to reach.
#[derive(Debug, Clone, PartialEq)]
pub struct NextStop {
    /// Stop identifier.
    pub stop_id: StopId,
    /// Stop location.
    pub location: Coord<f64>,
    /// When the plan expects the vehicle there.
    pub planned_arrival: Timestamp,
}

/// A vehicle's standing on its plan after a position update.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleProgress {
    /// Plan the vehicle drives.
    pub plan_id: PlanId,
    /// Stops reached by this update.
    pub arrived: Vec<StopId>,
    /// Next outstanding stop, if any remain.
    pub next_stop: Option<NextStop>,
    /// Last reached point followed by the outstanding stops in driving order
    /// and the depot, when there is one.
    pub corridor: Vec<Coord<f64>>,
}

/// Inputs for re-optimizing an active plan.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanSnapshot {
    pub(crate) vehicle_ids: Vec<VehicleId>,
    pub(crate) outstanding: Vec<Stop>,
    pub(crate) started_at: Timestamp,
    pub(crate) constraints: Constraints,
    pub(crate) epoch: u64,
}

#[derive(Debug)]
struct ActivePlan {
    plan: Plan,
    outstanding: BTreeMap<StopId, Stop>,
    completed: BTreeSet<StopId>,
    anchors: BTreeMap<VehicleId, Coord<f64>>,
    started_at: Timestamp,
    constraints: Constraints,
    /// Stamp of the last commit or arrival on this plan.
    epoch: u64,
}

/// Registry of active plans.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use truckify_core::{Constraints, Plan, Route, Timestamp};
/// use truckify_live::{PlanBook, PlanContext};
///
/// let book = PlanBook::new();
/// let mut plan = Plan::empty("north");
/// plan.routes.push(Route::empty("V1"));
/// let context = PlanContext {
///     stops: Vec::new(),
///     origins: BTreeMap::new(),
///     started_at: Timestamp::from_secs(0),
///     constraints: Constraints::default(),
/// };
/// let outcome = book.commit(plan, context)?;
/// assert_eq!(outcome.plan.revision, 1);
/// assert_eq!(book.plan_for_vehicle(&"V1".into()), Some("north".into()));
/// # Ok::<(), truckify_live::PlanError>(())
/// ```
#[derive(Debug, Default)]
pub struct PlanBook {
    plans: DashMap<PlanId, ActivePlan>,
    vehicles: DashMap<VehicleId, PlanId>,
    /// Serializes commits and removals so vehicle ownership checks hold
    /// until the install that follows them.
    commits: Mutex<()>,
    /// Source of plan epochs; never reused, even across retirement.
    epochs: AtomicU64,
}

impl PlanBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_epoch(&self) -> u64 {
        self.epochs.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    fn conflict<'a>(
        &self,
        plan_id: &PlanId,
        mut vehicle_ids: impl Iterator<Item = &'a VehicleId>,
    ) -> Option<PlanError> {
        vehicle_ids.find_map(|vehicle_id| {
            self.vehicles
                .get(vehicle_id)
                .filter(|holder| holder.value() != plan_id)
                .map(|holder| PlanError::VehicleOnAnotherPlan {
                    vehicle_id: vehicle_id.clone(),
                    plan_id: holder.value().clone(),
                })
        })
    }

    /// Replace the plan held by `entry`. Callers hold the commit lock.
    fn install(
        &self,
        mut entry: Entry<'_, PlanId, ActivePlan>,
        mut plan: Plan,
        context: PlanContext,
    ) -> CommitOutcome {
        let (reassigned, completed) = match &mut entry {
            Entry::Occupied(occupied) => {
                let previous = occupied.get_mut();
                plan.revision = previous.plan.revision.saturating_add(1);
                let reassigned = plan
                    .diff(&without_stops(&previous.plan, &previous.completed))
                    .reassigned;
                for vehicle_id in previous.plan.vehicle_ids() {
                    self.vehicles
                        .remove_if(vehicle_id, |_, holder| *holder == plan.id);
                }
                (reassigned, std::mem::take(&mut previous.completed))
            }
            Entry::Vacant(_) => {
                plan.revision = 1;
                let reassigned = plan.diff(&Plan::empty(plan.id.clone())).reassigned;
                (reassigned, BTreeSet::new())
            }
        };
        for vehicle_id in plan.vehicle_ids() {
            self.vehicles.insert(vehicle_id.clone(), plan.id.clone());
        }

        let active = ActivePlan {
            plan: plan.clone(),
            outstanding: context
                .stops
                .into_iter()
                .map(|stop| (stop.id.clone(), stop))
                .collect(),
            completed,
            anchors: context.origins,
            started_at: context.started_at,
            constraints: context.constraints,
            epoch: self.next_epoch(),
        };
        match entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(active);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(active);
            }
        }
        CommitOutcome { plan, reassigned }
    }

    /// Commit `plan`, replacing any plan with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::VehicleOnAnotherPlan`] when one of the plan's
    /// vehicles drives a different active plan.
    pub fn commit(&self, plan: Plan, context: PlanContext) -> Result<CommitOutcome, PlanError> {
        let _commits = self.lock_commits();
        if let Some(err) = self.conflict(&plan.id, plan.vehicle_ids()) {
            return Err(err);
        }
        let entry = self.plans.entry(plan.id.clone());
        Ok(self.install(entry, plan, context))
    }

    /// Commit a re-optimized plan if the plan is unchanged since `epoch`.
    ///
    /// Returns `None` when the plan was committed again, reached a stop or
    /// was retired after the snapshot was taken. Activity on other plans
    /// does not count.
    pub(crate) fn commit_if_unchanged(
        &self,
        plan: Plan,
        context: PlanContext,
        epoch: u64,
    ) -> Option<CommitOutcome> {
        let _commits = self.lock_commits();
        if self.conflict(&plan.id, plan.vehicle_ids()).is_some() {
            return None;
        }
        let entry = match self.plans.entry(plan.id.clone()) {
            Entry::Occupied(current) if current.get().epoch == epoch => Entry::Occupied(current),
            _ => return None,
        };
        Some(self.install(entry, plan, context))
    }

    /// Fail if any of `vehicle_ids` drives a plan other than `plan_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::VehicleOnAnotherPlan`] for the first conflict.
    pub fn check_available<'a, I>(&self, plan_id: &PlanId, vehicle_ids: I) -> Result<(), PlanError>
    where
        I: IntoIterator<Item = &'a VehicleId>,
    {
        self.conflict(plan_id, vehicle_ids.into_iter())
            .map_or(Ok(()), Err)
    }

    /// Retire a plan and release its vehicles.
    pub fn remove(&self, plan_id: &PlanId) -> Option<Plan> {
        let _commits = self.lock_commits();
        let (_, active) = self.plans.remove(plan_id)?;
        for vehicle_id in active.plan.vehicle_ids() {
            self.vehicles
                .remove_if(vehicle_id, |_, holder| holder == plan_id);
        }
        Some(active.plan)
    }

    /// Current revision of `plan_id`.
    #[must_use]
    pub fn plan(&self, plan_id: &PlanId) -> Option<Plan> {
        self.plans.get(plan_id).map(|active| active.plan.clone())
    }

    /// Identifiers of all active plans, sorted.
    #[must_use]
    pub fn plan_ids(&self) -> Vec<PlanId> {
        let mut ids: Vec<_> = self.plans.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Plan `vehicle_id` is driving.
    #[must_use]
    pub fn plan_for_vehicle(&self, vehicle_id: &VehicleId) -> Option<PlanId> {
        self.vehicles.get(vehicle_id).map(|holder| holder.value().clone())
    }

    /// Stops of `plan_id` already reached, sorted.
    #[must_use]
    pub fn completed(&self, plan_id: &PlanId) -> Vec<StopId> {
        self.plans
            .get(plan_id)
            .map(|active| active.completed.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record a new position for `vehicle_id` and report its progress.
    ///
    /// Every outstanding stop at the head of the vehicle's route that lies
    /// within `arrival_radius_m` of `position` is marked completed. Returns
    /// `None` when the vehicle drives no active plan. Only the vehicle's own
    /// plan entry is locked.
    pub fn advance(
        &self,
        vehicle_id: &VehicleId,
        position: Coord<f64>,
        arrival_radius_m: f64,
    ) -> Option<VehicleProgress> {
        let plan_id = self.plan_for_vehicle(vehicle_id)?;
        let mut guard = self.plans.get_mut(&plan_id)?;
        let active = &mut *guard;
        let route = active.plan.route_for(vehicle_id)?;

        let mut arrived = Vec::new();
        let mut remaining = route
            .stop_ids()
            .filter(|id| !active.completed.contains(*id))
            .filter_map(|id| active.outstanding.get(id))
            .peekable();
        while let Some(stop) =
            remaining.next_if(|stop| haversine_distance_m(position, stop.location) <= arrival_radius_m)
        {
            arrived.push(stop.clone());
        }
        let upcoming: Vec<Stop> = remaining.cloned().collect();

        let next_stop = upcoming.first().and_then(|stop| {
            planned_arrival(route, &stop.id).map(|offset| NextStop {
                stop_id: stop.id.clone(),
                location: stop.location,
                planned_arrival: active.started_at.saturating_add(offset),
            })
        });

        if let Some(last) = arrived.last() {
            active.anchors.insert(vehicle_id.clone(), last.location);
        }
        let anchor = active.anchors.get(vehicle_id).copied();
        let corridor = anchor
            .into_iter()
            .chain(upcoming.iter().map(|stop| stop.location))
            .chain(active.constraints.depot)
            .collect();

        let arrived_ids: Vec<StopId> = arrived.into_iter().map(|stop| stop.id).collect();
        if !arrived_ids.is_empty() {
            for stop_id in &arrived_ids {
                active.outstanding.remove(stop_id);
                active.completed.insert(stop_id.clone());
            }
            active.epoch = self.next_epoch();
            log::debug!(
                "vehicle {vehicle_id} reached {} stop(s) on plan {plan_id}",
                arrived_ids.len()
            );
        }

        Some(VehicleProgress {
            plan_id,
            arrived: arrived_ids,
            next_stop,
            corridor,
        })
    }

    pub(crate) fn snapshot(&self, plan_id: &PlanId) -> Option<PlanSnapshot> {
        let active = self.plans.get(plan_id)?;
        Some(PlanSnapshot {
            vehicle_ids: active.plan.vehicle_ids().cloned().collect(),
            outstanding: active.outstanding.values().cloned().collect(),
            started_at: active.started_at,
            constraints: active.constraints,
            epoch: active.epoch,
        })
    }
}

fn planned_arrival(route: &Route, stop_id: &StopId) -> Option<std::time::Duration> {
    route
        .visits
        .iter()
        .find(|visit| &visit.stop_id == stop_id)
        .map(|visit| visit.arrival)
}

fn without_stops(plan: &Plan, removed: &BTreeSet<StopId>) -> Plan {
    let mut pruned = plan.clone();
    for route in &mut pruned.routes {
        route.visits.retain(|visit| !removed.contains(&visit.stop_id));
    }
    pruned
        .unassigned
        .retain(|entry| !removed.contains(&entry.stop_id));
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::time::Duration;
    use truckify_core::Visit;

    fn visit(stop: &str, arrival_secs: u64) -> Visit {
        Visit {
            stop_id: stop.into(),
            arrival: Duration::from_secs(arrival_secs),
            departure: Duration::from_secs(arrival_secs),
        }
    }

    fn route(vehicle: &str, visits: Vec<Visit>) -> Route {
        Route {
            visits,
            ..Route::empty(vehicle)
        }
    }

    fn plan(id: &str, routes: Vec<Route>) -> Plan {
        Plan {
            routes,
            ..Plan::empty(id)
        }
    }

    fn context() -> PlanContext {
        PlanContext {
            stops: vec![
                Stop::new("S1", Coord { x: 0.0, y: 0.01 }, 1),
                Stop::new("S2", Coord { x: 0.0, y: 0.02 }, 1),
                Stop::new("S3", Coord { x: 0.1, y: 0.01 }, 1),
            ],
            origins: [
                (VehicleId::from("V1"), Coord { x: 0.0, y: 0.0 }),
                (VehicleId::from("V2"), Coord { x: 0.1, y: 0.0 }),
            ]
            .into_iter()
            .collect(),
            started_at: Timestamp::from_secs(1_000),
            constraints: Constraints::default(),
        }
    }

    #[fixture]
    fn book() -> PlanBook {
        let book = PlanBook::new();
        book.commit(
            plan(
                "north",
                vec![
                    route("V1", vec![visit("S1", 120), visit("S2", 240)]),
                    route("V2", vec![visit("S3", 120)]),
                ],
            ),
            context(),
        )
        .expect("initial commit");
        book
    }

    #[rstest]
    fn commits_bump_revisions_and_report_moves(book: PlanBook) {
        let outcome = book
            .commit(
                plan(
                    "north",
                    vec![
                        route("V1", vec![visit("S1", 120)]),
                        route("V2", vec![visit("S3", 120), visit("S2", 300)]),
                    ],
                ),
                context(),
            )
            .expect("second commit");
        assert_eq!(outcome.plan.revision, 2);
        assert_eq!(outcome.reassigned, vec![StopId::from("S2")]);
        assert_eq!(book.plan(&"north".into()), Some(outcome.plan));
    }

    #[rstest]
    fn vehicles_cannot_drive_two_plans(book: PlanBook) {
        let err = book
            .commit(plan("south", vec![route("V2", Vec::new())]), context())
            .expect_err("conflict");
        assert_eq!(
            err,
            PlanError::VehicleOnAnotherPlan {
                vehicle_id: "V2".into(),
                plan_id: "north".into(),
            }
        );
        assert!(book.check_available(&"south".into(), [&VehicleId::from("V3")]).is_ok());
    }

    #[rstest]
    fn arrival_completes_the_head_of_the_route(book: PlanBook) {
        let progress = book
            .advance(&"V1".into(), Coord { x: 0.0, y: 0.010_5 }, 150.0)
            .expect("V1 is on a plan");
        assert_eq!(progress.arrived, vec![StopId::from("S1")]);
        let next = progress.next_stop.expect("S2 remains");
        assert_eq!(next.stop_id, StopId::from("S2"));
        assert_eq!(next.planned_arrival, Timestamp::from_secs(1_240));
        assert_eq!(
            progress.corridor,
            vec![Coord { x: 0.0, y: 0.01 }, Coord { x: 0.0, y: 0.02 }]
        );
        assert_eq!(book.completed(&"north".into()), vec![StopId::from("S1")]);
    }

    #[rstest]
    fn far_positions_complete_nothing(book: PlanBook) {
        let progress = book
            .advance(&"V1".into(), Coord { x: 0.5, y: 0.5 }, 150.0)
            .expect("V1 is on a plan");
        assert!(progress.arrived.is_empty());
        assert_eq!(progress.corridor.len(), 3);
        assert_eq!(book.advance(&"V9".into(), Coord { x: 0.0, y: 0.0 }, 150.0), None);
    }

    #[rstest]
    fn arrivals_invalidate_snapshots(book: PlanBook) {
        let snapshot = book.snapshot(&"north".into()).expect("snapshot");
        assert_eq!(snapshot.outstanding.len(), 3);
        book.advance(&"V2".into(), Coord { x: 0.1, y: 0.01 }, 150.0);

        let replanned = plan("north", vec![route("V1", Vec::new()), route("V2", Vec::new())]);
        assert!(
            book.commit_if_unchanged(replanned, context(), snapshot.epoch)
                .is_none()
        );
        let fresh = book.snapshot(&"north".into()).expect("snapshot");
        assert_eq!(fresh.outstanding.len(), 2);
    }

    fn south_context() -> PlanContext {
        PlanContext {
            stops: vec![Stop::new("S9", Coord { x: 0.3, y: 0.3 }, 1)],
            origins: [(VehicleId::from("V3"), Coord { x: 0.3, y: 0.29 })]
                .into_iter()
                .collect(),
            started_at: Timestamp::from_secs(1_000),
            constraints: Constraints::default(),
        }
    }

    fn south() -> Plan {
        plan("south", vec![route("V3", vec![visit("S9", 60)])])
    }

    #[rstest]
    fn other_plans_leave_snapshots_valid(book: PlanBook) {
        book.commit(south(), south_context()).expect("south commit");
        let snapshot = book.snapshot(&"north".into()).expect("snapshot");

        let progress = book
            .advance(&"V3".into(), Coord { x: 0.3, y: 0.3 }, 150.0)
            .expect("V3 drives south");
        assert_eq!(progress.arrived, vec![StopId::from("S9")]);
        book.commit(south(), south_context()).expect("south recommit");

        let replanned = plan(
            "north",
            vec![
                route("V1", vec![visit("S1", 120), visit("S2", 240)]),
                route("V2", vec![visit("S3", 120)]),
            ],
        );
        let outcome = book
            .commit_if_unchanged(replanned, context(), snapshot.epoch)
            .expect("north is unchanged");
        assert_eq!(outcome.plan.revision, 2);
    }

    #[rstest]
    fn retired_plans_reject_old_snapshots(book: PlanBook) {
        let snapshot = book.snapshot(&"north".into()).expect("snapshot");
        book.remove(&"north".into());
        let replanned = plan("north", vec![route("V1", Vec::new())]);
        assert!(
            book.commit_if_unchanged(replanned.clone(), context(), snapshot.epoch)
                .is_none()
        );

        book.commit(replanned.clone(), context()).expect("reactivate");
        assert!(
            book.commit_if_unchanged(replanned, context(), snapshot.epoch)
                .is_none()
        );
    }

    #[rstest]
    fn vehicles_on_separate_plans_advance_concurrently(book: PlanBook) {
        book.commit(south(), south_context()).expect("south commit");
        let shared = &book;
        std::thread::scope(|scope| {
            for _ in 0..50 {
                scope.spawn(move || {
                    assert!(
                        shared
                            .advance(&"V2".into(), Coord { x: 0.5, y: 0.5 }, 1.0)
                            .is_some()
                    );
                });
                scope.spawn(move || {
                    assert!(
                        shared
                            .advance(&"V3".into(), Coord { x: 0.0, y: 0.0 }, 1.0)
                            .is_some()
                    );
                });
            }
        });
        assert_eq!(book.plan_for_vehicle(&"V2".into()), Some("north".into()));
        assert_eq!(book.plan_for_vehicle(&"V3".into()), Some("south".into()));
        assert!(book.completed(&"south".into()).is_empty());
    }

    #[rstest]
    fn completed_stops_are_not_reported_as_reassigned(book: PlanBook) {
        book.advance(&"V1".into(), Coord { x: 0.0, y: 0.01 }, 150.0);
        let outcome = book
            .commit(
                plan(
                    "north",
                    vec![
                        route("V1", vec![visit("S2", 60)]),
                        route("V2", vec![visit("S3", 60)]),
                    ],
                ),
                context(),
            )
            .expect("commit");
        assert!(outcome.reassigned.is_empty());
    }

    #[rstest]
    fn removing_a_plan_frees_its_vehicles(book: PlanBook) {
        assert!(book.remove(&"north".into()).is_some());
        assert_eq!(book.plan_for_vehicle(&"V1".into()), None);
        assert!(book.plan_ids().is_empty());
    }
}
