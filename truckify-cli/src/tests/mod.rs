//! Shared test harness modules for the truckify CLI.

use super::*;

mod helpers;
mod plan_unit;
mod replay_steps;
