//! Greedy nearest-insertion construction.
//!
//! Every round evaluates each pending stop at every position of every route
//! and commits the single cheapest feasible insertion across the whole plan.
//! Pending stops are scanned in identifier order and only a strictly cheaper
//! insertion replaces the incumbent, so ties go to the lowest stop id, then
//! the earliest vehicle, then the earliest position.

use std::time::Duration;

use crate::model::{Problem, Schedule, Violation, cost_delta, total_cost};

/// Routes and schedules for every available vehicle plus the stops left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Solution {
    pub(crate) routes: Vec<Vec<usize>>,
    pub(crate) schedules: Vec<Schedule>,
    pub(crate) unassigned: Vec<(usize, Violation)>,
}

impl Solution {
    pub(crate) fn cost(&self) -> Duration {
        total_cost(&self.schedules)
    }

    /// Install a new sequence and schedule for `vehicle`.
    pub(crate) fn replace(&mut self, vehicle: usize, sequence: Vec<usize>, schedule: Schedule) {
        if let (Some(route), Some(slot)) =
            (self.routes.get_mut(vehicle), self.schedules.get_mut(vehicle))
        {
            *route = sequence;
            *slot = schedule;
        }
    }
}

struct Insertion {
    stop: usize,
    vehicle: usize,
    sequence: Vec<usize>,
    schedule: Schedule,
    delta: i128,
}

/// Build the initial plan.
pub(crate) fn construct(problem: &Problem<'_>) -> Solution {
    let vehicle_count = problem.vehicles.len();
    let mut solution = Solution {
        routes: vec![Vec::new(); vehicle_count],
        schedules: vec![Schedule::EMPTY; vehicle_count],
        unassigned: Vec::new(),
    };
    let mut pending: Vec<usize> = (0..problem.stops.len()).collect();
    pending.sort_by(|&a, &b| {
        let id = |index| problem.stop(index).map(|stop| &stop.id);
        id(a).cmp(&id(b))
    });

    while !pending.is_empty() {
        let mut best: Option<Insertion> = None;
        let mut blocked = Vec::new();
        for &stop in &pending {
            match cheapest_insertion(problem, &solution, stop) {
                Ok(candidate) => {
                    if best.as_ref().is_none_or(|incumbent| candidate.delta < incumbent.delta) {
                        best = Some(candidate);
                    }
                }
                Err(violation) => blocked.push((stop, violation)),
            }
        }
        // Routes only grow, so a stop with no feasible slot now never gets one.
        pending.retain(|stop| !blocked.iter().any(|(blocked_stop, _)| blocked_stop == stop));
        solution.unassigned.extend(blocked);

        let Some(insertion) = best else { break };
        pending.retain(|&stop| stop != insertion.stop);
        solution.replace(insertion.vehicle, insertion.sequence, insertion.schedule);
    }
    solution
}

/// Cheapest feasible slot for `stop`, or the most telling violation.
fn cheapest_insertion(
    problem: &Problem<'_>,
    solution: &Solution,
    stop: usize,
) -> Result<Insertion, Violation> {
    let mut best: Option<Insertion> = None;
    let mut violation: Option<Violation> = None;
    for (vehicle, (route, current)) in solution
        .routes
        .iter()
        .zip(&solution.schedules)
        .enumerate()
    {
        for position in 0..=route.len() {
            let mut sequence = route.clone();
            sequence.insert(position, stop);
            match problem.evaluate(vehicle, &sequence) {
                Ok(schedule) => {
                    let delta = cost_delta(current.travel_time, schedule.travel_time);
                    if best.as_ref().is_none_or(|incumbent| delta < incumbent.delta) {
                        best = Some(Insertion {
                            stop,
                            vehicle,
                            sequence,
                            schedule,
                            delta,
                        });
                    }
                }
                Err(found) => violation = Some(violation.map_or(found, |seen| seen.min(found))),
            }
        }
    }
    best.ok_or_else(|| violation.unwrap_or(Violation::Unreachable))
}
