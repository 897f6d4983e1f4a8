//! Core domain types for the Truckify fleet engine.
//!
//! The crate holds the model shared by the optimizer and the live location
//! pipeline: vehicles, stops, plans, position reports and the collaborator
//! seams (travel times, fleet roster, stop source, alerting). Constructors
//! that can fail return `Result` so invalid input surfaces early.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod alert;
pub mod geodesy;
mod ids;
mod optimizer;
mod plan;
mod roster;
mod stop;
mod stop_source;
mod telemetry;
pub mod time;
pub mod travel_time;
mod vehicle;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use alert::{Alert, AlertSink, DeviationKind, LogAlertSink};
pub use ids::{DepotId, PlanId, StopId, VehicleId};
pub use optimizer::{
    Constraints, Diagnostics, OptimizeError, Optimizer, PlanRequest, PlanRequestValidationError,
    PlanResponse,
};
pub use plan::{CoverageError, Plan, PlanDiff, Route, UnassignedReason, UnassignedStop, Visit};
pub use roster::{FleetRoster, InMemoryRoster};
pub use stop::Stop;
pub use stop_source::{InMemoryStopSource, StopSource};
pub use telemetry::{LocationRecord, PositionReport, RejectReason};
pub use time::{TimeWindow, TimeWindowError, Timestamp};
pub use travel_time::{
    DEFAULT_AVERAGE_SPEED_KMH, HaversineTravelTimeProvider, TravelTimeError, TravelTimeMatrix,
    TravelTimeProvider,
};
pub use vehicle::{Vehicle, VehicleStatus};
