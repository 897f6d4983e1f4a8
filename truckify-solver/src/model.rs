//! Problem model and schedule evaluation shared by both optimizer phases.
//!
//! Nodes in the travel-time matrix are laid out as: one node per available
//! vehicle start, then one node per stop, then the depot when configured.
//! Routes are held as sequences of stop indices.

use std::time::Duration;

use truckify_core::{Constraints, Stop, TravelTimeMatrix, UnassignedReason, Vehicle};

/// Why a candidate route cannot be driven.
///
/// Variants are ordered by precedence when several block a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Violation {
    Capacity,
    TimeWindow,
    RouteDuration,
    Unreachable,
}

impl From<Violation> for UnassignedReason {
    fn from(violation: Violation) -> Self {
        match violation {
            Violation::Capacity => Self::Capacity,
            Violation::TimeWindow => Self::TimeWindow,
            Violation::RouteDuration => Self::RouteDuration,
            Violation::Unreachable => Self::Unreachable,
        }
    }
}

/// Timing of one visit, as offsets from the plan start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VisitTimes {
    pub(crate) arrival: Duration,
    pub(crate) departure: Duration,
}

/// A feasible schedule for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Schedule {
    pub(crate) visits: Vec<VisitTimes>,
    pub(crate) load: u32,
    pub(crate) travel_time: Duration,
    pub(crate) duration: Duration,
}

impl Schedule {
    pub(crate) const EMPTY: Self = Self {
        visits: Vec::new(),
        load: 0,
        travel_time: Duration::ZERO,
        duration: Duration::ZERO,
    };
}

/// Immutable view of a request after vehicle filtering and matrix lookup.
pub(crate) struct Problem<'a> {
    pub(crate) vehicles: Vec<&'a Vehicle>,
    pub(crate) stops: &'a [Stop],
    matrix: TravelTimeMatrix,
    has_depot: bool,
    max_route_duration: Option<Duration>,
}

impl<'a> Problem<'a> {
    pub(crate) fn new(
        vehicles: Vec<&'a Vehicle>,
        stops: &'a [Stop],
        matrix: TravelTimeMatrix,
        constraints: &Constraints,
    ) -> Self {
        Self {
            vehicles,
            stops,
            matrix,
            has_depot: constraints.depot.is_some(),
            max_route_duration: constraints.max_route_duration,
        }
    }

    const fn stop_node(&self, stop: usize) -> usize {
        self.vehicles.len() + stop
    }

    const fn depot_node(&self) -> usize {
        self.vehicles.len() + self.stops.len()
    }

    /// Travel time between two nodes; missing entries read as unreachable.
    fn leg(&self, from: usize, to: usize) -> Duration {
        self.matrix
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(Duration::MAX)
    }

    pub(crate) fn stop(&self, stop: usize) -> Option<&'a Stop> {
        self.stops.get(stop)
    }

    /// Simulate `vehicle` driving `sequence`.
    ///
    /// The vehicle departs its start at offset zero. Arriving before a window
    /// opens waits; arriving after it closes is a violation. Service time is
    /// added after any wait. With a depot the route ends there, except for an
    /// empty route which costs nothing.
    pub(crate) fn evaluate(&self, vehicle: usize, sequence: &[usize]) -> Result<Schedule, Violation> {
        if sequence.is_empty() {
            return Ok(Schedule::EMPTY);
        }
        let capacity = self
            .vehicles
            .get(vehicle)
            .map_or(0, |vehicle| vehicle.capacity);
        let load = sequence
            .iter()
            .filter_map(|&stop| self.stop(stop))
            .try_fold(0_u32, |load, stop| load.checked_add(stop.demand))
            .ok_or(Violation::Capacity)?;
        if load > capacity {
            return Err(Violation::Capacity);
        }

        let mut visits = Vec::with_capacity(sequence.len());
        let mut clock = Duration::ZERO;
        let mut travel_time = Duration::ZERO;
        let mut previous = vehicle;
        for &index in sequence {
            let stop = self.stop(index).ok_or(Violation::Unreachable)?;
            let node = self.stop_node(index);
            let leg = self.drive(previous, node)?;
            let arrival = clock.checked_add(leg).ok_or(Violation::Unreachable)?;
            let start = match stop.window {
                Some(window) if arrival > window.latest => return Err(Violation::TimeWindow),
                Some(window) => arrival.max(window.earliest),
                None => arrival,
            };
            let departure = start.checked_add(stop.service).ok_or(Violation::RouteDuration)?;
            visits.push(VisitTimes { arrival, departure });
            travel_time = travel_time.checked_add(leg).ok_or(Violation::Unreachable)?;
            clock = departure;
            previous = node;
        }
        if self.has_depot {
            let leg = self.drive(previous, self.depot_node())?;
            clock = clock.checked_add(leg).ok_or(Violation::Unreachable)?;
            travel_time = travel_time.checked_add(leg).ok_or(Violation::Unreachable)?;
        }
        if self.max_route_duration.is_some_and(|limit| clock > limit) {
            return Err(Violation::RouteDuration);
        }
        Ok(Schedule {
            visits,
            load,
            travel_time,
            duration: clock,
        })
    }

    fn drive(&self, from: usize, to: usize) -> Result<Duration, Violation> {
        let leg = self.leg(from, to);
        if leg == Duration::MAX {
            Err(Violation::Unreachable)
        } else {
            Ok(leg)
        }
    }
}

/// Signed difference `after - before` in nanoseconds.
pub(crate) fn cost_delta(before: Duration, after: Duration) -> i128 {
    let nanos = |d: Duration| i128::try_from(d.as_nanos()).unwrap_or(i128::MAX);
    nanos(after) - nanos(before)
}

/// Sum of route costs, saturating at [`Duration::MAX`].
pub(crate) fn total_cost<'s>(schedules: impl IntoIterator<Item = &'s Schedule>) -> Duration {
    schedules
        .into_iter()
        .fold(Duration::ZERO, |total, schedule| {
            total.saturating_add(schedule.travel_time)
        })
}
