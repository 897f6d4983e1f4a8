//! Bounded best-improvement local search.
//!
//! Each iteration scans the full relocate and swap neighbourhoods and applies
//! the single move with the largest strictly negative cost delta. Moves are
//! only considered when every changed route stays feasible, so capacity and
//! window invariants survive the search.

use crate::construction::Solution;
use crate::model::{Problem, Schedule, cost_delta};

/// Counters reported in the optimizer diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SearchOutcome {
    pub(crate) iterations: usize,
    pub(crate) accepted_moves: usize,
}

/// Replacement routes produced by a move.
struct Move {
    delta: i128,
    changes: Vec<(usize, Vec<usize>, Schedule)>,
}

impl Move {
    fn improves_on(&self, incumbent: Option<&Self>) -> bool {
        self.delta < incumbent.map_or(0, |best| best.delta)
    }

    fn apply(self, solution: &mut Solution) {
        for (vehicle, sequence, schedule) in self.changes {
            solution.replace(vehicle, sequence, schedule);
        }
    }
}

/// Improve `solution` in place for at most `budget` iterations.
pub(crate) fn improve(problem: &Problem<'_>, solution: &mut Solution, budget: usize) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    while outcome.iterations < budget {
        outcome.iterations += 1;
        let relocate = best_relocate(problem, solution);
        let best = best_swap(problem, solution, relocate);
        let Some(chosen) = best else { break };
        chosen.apply(solution);
        outcome.accepted_moves += 1;
    }
    outcome
}

fn travel(solution: &Solution, vehicle: usize) -> Option<std::time::Duration> {
    solution
        .schedules
        .get(vehicle)
        .map(|schedule| schedule.travel_time)
}

/// Move one stop to another position, in the same or a different route.
fn best_relocate(problem: &Problem<'_>, solution: &Solution) -> Option<Move> {
    let mut best: Option<Move> = None;
    for (from, route) in solution.routes.iter().enumerate() {
        let Some(from_before) = travel(solution, from) else { continue };
        for position in 0..route.len() {
            let mut reduced = route.clone();
            let stop = reduced.remove(position);
            for candidate in relocations(problem, solution, from, from_before, &reduced, stop, position) {
                if candidate.improves_on(best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}

/// Every feasible placement of `stop` after removing it from `from`.
fn relocations(
    problem: &Problem<'_>,
    solution: &Solution,
    from: usize,
    from_before: std::time::Duration,
    reduced: &[usize],
    stop: usize,
    removed_at: usize,
) -> Vec<Move> {
    let mut moves = Vec::new();
    for position in (0..=reduced.len()).filter(|&position| position != removed_at) {
        let mut sequence = reduced.to_vec();
        sequence.insert(position, stop);
        if let Ok(schedule) = problem.evaluate(from, &sequence) {
            moves.push(Move {
                delta: cost_delta(from_before, schedule.travel_time),
                changes: vec![(from, sequence, schedule)],
            });
        }
    }

    let Ok(reduced_schedule) = problem.evaluate(from, reduced) else {
        return moves;
    };
    for (to, target) in solution.routes.iter().enumerate() {
        if to == from {
            continue;
        }
        let Some(to_before) = travel(solution, to) else { continue };
        let before = from_before.saturating_add(to_before);
        for position in 0..=target.len() {
            let mut sequence = target.clone();
            sequence.insert(position, stop);
            if let Ok(schedule) = problem.evaluate(to, &sequence) {
                let after = reduced_schedule.travel_time.saturating_add(schedule.travel_time);
                moves.push(Move {
                    delta: cost_delta(before, after),
                    changes: vec![
                        (from, reduced.to_vec(), reduced_schedule.clone()),
                        (to, sequence, schedule),
                    ],
                });
            }
        }
    }
    moves
}

/// Exchange two stops between different routes, keeping `incumbent` unless
/// a swap beats it.
fn best_swap(problem: &Problem<'_>, solution: &Solution, incumbent: Option<Move>) -> Option<Move> {
    let mut best = incumbent;
    for (a, route_a) in solution.routes.iter().enumerate() {
        let Some(a_before) = travel(solution, a) else { continue };
        for (b, route_b) in solution.routes.iter().enumerate().skip(a + 1) {
            let Some(b_before) = travel(solution, b) else { continue };
            let before = a_before.saturating_add(b_before);
            for (i, &stop_a) in route_a.iter().enumerate() {
                for (j, &stop_b) in route_b.iter().enumerate() {
                    let mut sequence_a = route_a.clone();
                    let mut sequence_b = route_b.clone();
                    if let (Some(slot_a), Some(slot_b)) = (sequence_a.get_mut(i), sequence_b.get_mut(j)) {
                        *slot_a = stop_b;
                        *slot_b = stop_a;
                    }
                    let (Ok(schedule_a), Ok(schedule_b)) =
                        (problem.evaluate(a, &sequence_a), problem.evaluate(b, &sequence_b))
                    else {
                        continue;
                    };
                    let after = schedule_a.travel_time.saturating_add(schedule_b.travel_time);
                    let candidate = Move {
                        delta: cost_delta(before, after),
                        changes: vec![(a, sequence_a, schedule_a), (b, sequence_b, schedule_b)],
                    };
                    if candidate.improves_on(best.as_ref()) {
                        best = Some(candidate);
                    }
                }
            }
        }
    }
    best
}
