//! Heuristic route optimizer for Truckify.
//!
//! This crate provides [`InsertionOptimizer`], the default implementation of
//! the [`Optimizer`](truckify_core::Optimizer) trait. It assigns stops to
//! vehicles in two phases: a greedy nearest-insertion construction that
//! respects capacities, time windows and the route-duration cap, followed by
//! a bounded local search over relocate and swap moves that only accepts
//! strict cost improvements.
//!
//! The search is bounded by an iteration budget rather than a timer, so for
//! fixed inputs the resulting plan is fully deterministic. Stops that no
//! vehicle can serve are reported in the plan's unassigned set.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod construction;
mod local_search;
mod model;
mod optimizer;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use optimizer::{InsertionOptimizer, OptimizerConfig};
