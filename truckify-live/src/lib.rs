//! Real-time location pipeline for the truckify fleet core.
//!
//! Position reports flow through the [`IngestionPipeline`] into the
//! [`LocationStore`], fan out to subscribers via the [`BroadcastHub`], and
//! raise re-planning requests on the [`ReoptimizationTrigger`] when a vehicle
//! drifts from its plan. [`FleetService`] wires the pieces together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use geo::Coord;
//! use truckify_core::{HaversineTravelTimeProvider, InMemoryRoster, PositionReport, Timestamp, Vehicle};
//! use truckify_live::{FleetService, InterestSet, LiveConfig};
//! use truckify_solver::InsertionOptimizer;
//!
//! # async fn run() {
//! let roster = Arc::new(InMemoryRoster::with_vehicles([
//!     Vehicle::new("V1", 10, Coord { x: -0.1, y: 51.5 }),
//! ]));
//! let optimizer = Arc::new(InsertionOptimizer::new(HaversineTravelTimeProvider::default()));
//! let service = FleetService::builder(roster, optimizer)
//!     .with_config(LiveConfig::default())
//!     .build(tokio::runtime::Handle::current());
//!
//! let mut feed = service.subscribe(InterestSet::fleet_wide());
//! let outcome = service.ingest(&PositionReport::new(
//!     "V1",
//!     Coord { x: -0.11, y: 51.5 },
//!     Timestamp::from_secs(1),
//! ));
//! assert!(outcome.is_accepted());
//! let event = feed.recv().await;
//! assert!(event.is_some());
//! # }
//! ```

mod config;
mod deviation;
mod error;
mod event;
mod hub;
mod ingest;
mod plans;
mod replan;
mod service;
mod store;
mod trigger;

pub use config::{IngestConfig, LiveConfig};
pub use deviation::detect_deviation;
pub use error::PlanError;
pub use event::{FleetEvent, InterestSet};
pub use hub::{BroadcastHub, Subscription, SubscriptionId};
pub use ingest::{Acceptance, IngestOutcome, IngestStats, IngestionPipeline, ReplanSignal};
pub use plans::{CommitOutcome, NextStop, PlanBook, PlanContext, VehicleProgress};
pub use replan::{PreparedRun, Replanner};
pub use service::{FleetService, FleetServiceBuilder, PlanCommand, StopSelection};
pub use store::LocationStore;
pub use trigger::{ReoptimizationTrigger, TriggerStats};
