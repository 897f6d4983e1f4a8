//! Facade crate for the truckify fleet core.
//!
//! This crate re-exports the domain types and exposes the optimizer, the live
//! location pipeline and the OSRM travel-time provider behind feature flags.

#![forbid(unsafe_code)]

pub use truckify_core::{
    Alert, AlertSink, Constraints, Diagnostics, FleetRoster, HaversineTravelTimeProvider,
    InMemoryRoster, InMemoryStopSource, LocationRecord, OptimizeError, Optimizer, Plan, PlanDiff,
    PlanId, PlanRequest, PlanResponse, PositionReport, RejectReason, Route, Stop, StopId,
    StopSource, TimeWindow, Timestamp, TravelTimeError, TravelTimeMatrix, TravelTimeProvider,
    Vehicle, VehicleId,
};

#[cfg(feature = "solver")]
pub use truckify_solver::{InsertionOptimizer, OptimizerConfig};

#[cfg(feature = "live")]
pub use truckify_live::{
    FleetEvent, FleetService, FleetServiceBuilder, IngestOutcome, InterestSet, LiveConfig,
    PlanCommand, PlanError, StopSelection, Subscription,
};

#[cfg(feature = "routing")]
pub use truckify_routing::{HttpTravelTimeProvider, HttpTravelTimeProviderConfig};
