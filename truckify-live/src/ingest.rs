//! Validation and fan-out of incoming position reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use truckify_core::{
    Alert, AlertSink, DeviationKind, FleetRoster, LocationRecord, PlanId, PositionReport,
    RejectReason, StopId, TravelTimeProvider,
};

use crate::{BroadcastHub, FleetEvent, IngestConfig, LocationStore, PlanBook, detect_deviation};

/// Receiver of per-plan re-planning requests.
pub trait ReplanSignal: Send + Sync {
    /// A vehicle on `plan_id` deviated from its route.
    fn on_deviation(&self, plan_id: &PlanId);
}

impl<T: ReplanSignal + ?Sized> ReplanSignal for Arc<T> {
    fn on_deviation(&self, plan_id: &PlanId) {
        (**self).on_deviation(plan_id);
    }
}

/// Details of an accepted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acceptance {
    /// The record now stored for the vehicle.
    pub record: LocationRecord,
    /// Plan the vehicle drives, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    /// Stops this report completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrived: Vec<StopId>,
    /// Deviation that raised a re-planning request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation: Option<DeviationKind>,
}

/// Result of [`IngestionPipeline::ingest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum IngestOutcome {
    /// The report was stored and published.
    Accepted(Acceptance),
    /// The report was dropped.
    Rejected {
        /// Why the report was dropped.
        reason: RejectReason,
    },
}

impl IngestOutcome {
    /// Whether the report was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Rejection reason, if the report was dropped.
    #[must_use]
    pub const fn rejection(&self) -> Option<RejectReason> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected { reason } => Some(*reason),
        }
    }
}

/// Ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Reports stored.
    pub accepted: u64,
    /// Reports from vehicles missing from the roster.
    pub unknown_vehicle: u64,
    /// Reports not newer than the stored record.
    pub stale: u64,
    /// Reports with out-of-range or non-finite coordinates.
    pub invalid_coordinates: u64,
    /// Accepted reports that raised a re-planning request.
    pub deviations: u64,
    /// Stops completed by accepted reports.
    pub arrivals: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    unknown_vehicle: AtomicU64,
    stale: AtomicU64,
    invalid_coordinates: AtomicU64,
    deviations: AtomicU64,
    arrivals: AtomicU64,
}

impl Counters {
    fn reject(&self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::UnknownVehicle => &self.unknown_vehicle,
            RejectReason::Stale => &self.stale,
            RejectReason::InvalidCoordinates => &self.invalid_coordinates,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            unknown_vehicle: self.unknown_vehicle.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            invalid_coordinates: self.invalid_coordinates.load(Ordering::Relaxed),
            deviations: self.deviations.load(Ordering::Relaxed),
            arrivals: self.arrivals.load(Ordering::Relaxed),
        }
    }
}

/// Validates reports, updates the store and raises re-planning requests.
///
/// Reports are checked in a fixed order: roster membership, then timestamp
/// monotonicity, then coordinate validity. Every accepted report is published
/// as a [`FleetEvent::LocationUpdate`]; publishing never waits on a
/// subscriber.
pub struct IngestionPipeline {
    roster: Arc<dyn FleetRoster>,
    store: Arc<LocationStore>,
    plans: Arc<PlanBook>,
    hub: BroadcastHub,
    provider: Arc<dyn TravelTimeProvider>,
    alerts: Arc<dyn AlertSink>,
    signal: Option<Arc<dyn ReplanSignal>>,
    config: IngestConfig,
    counters: Counters,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Create a pipeline with default thresholds and no re-planning signal.
    pub fn new(
        roster: Arc<dyn FleetRoster>,
        store: Arc<LocationStore>,
        plans: Arc<PlanBook>,
        hub: BroadcastHub,
        provider: Arc<dyn TravelTimeProvider>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            roster,
            store,
            plans,
            hub,
            provider,
            alerts,
            signal: None,
            config: IngestConfig::default(),
            counters: Counters::default(),
        }
    }

    /// Replace the deviation and arrival thresholds.
    #[must_use]
    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward deviations to `signal`.
    #[must_use]
    pub fn with_replan_signal(mut self, signal: Arc<dyn ReplanSignal>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Thresholds in effect.
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    /// Process one report.
    pub fn ingest(&self, report: &PositionReport) -> IngestOutcome {
        let vehicle_id = &report.vehicle_id;
        if !self.roster.contains(vehicle_id) {
            return self.reject(report, RejectReason::UnknownVehicle);
        }
        let record = match self.store.apply(report) {
            Ok(record) => record,
            Err(reason) => return self.reject(report, reason),
        };
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);

        let advanced = self
            .plans
            .advance(vehicle_id, record.position, self.config.arrival_radius_m);
        let plan_id = advanced.as_ref().map(|current| current.plan_id.clone());
        self.hub.publish(&FleetEvent::location(&record, plan_id));

        let Some(progress) = advanced else {
            return IngestOutcome::Accepted(Acceptance {
                record,
                plan_id: None,
                arrived: Vec::new(),
                deviation: None,
            });
        };
        if !progress.arrived.is_empty() {
            self.counters.arrivals.fetch_add(
                u64::try_from(progress.arrived.len()).unwrap_or(u64::MAX),
                Ordering::Relaxed,
            );
        }

        let deviation = detect_deviation(
            &progress,
            record.position,
            record.timestamp,
            self.provider.as_ref(),
            &self.config,
        );
        if let Some(kind) = deviation {
            self.counters.deviations.fetch_add(1, Ordering::Relaxed);
            self.alerts.notify(Alert::RouteDeviation {
                vehicle_id: vehicle_id.clone(),
                plan_id: progress.plan_id.clone(),
                deviation: kind,
            });
            if let Some(signal) = &self.signal {
                signal.on_deviation(&progress.plan_id);
            }
        }

        IngestOutcome::Accepted(Acceptance {
            record,
            plan_id: Some(progress.plan_id),
            arrived: progress.arrived,
            deviation,
        })
    }

    fn reject(&self, report: &PositionReport, reason: RejectReason) -> IngestOutcome {
        self.counters.reject(reason);
        log::debug!(
            "rejected report from {} at {}: {reason:?}",
            report.vehicle_id,
            report.timestamp.as_millis()
        );
        IngestOutcome::Rejected { reason }
    }
}
