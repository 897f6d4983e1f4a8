//! Entry point wiring the live pipeline together.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use truckify_core::{
    AlertSink, Constraints, DepotId, FleetRoster, HaversineTravelTimeProvider, LocationRecord,
    LogAlertSink, Optimizer, Plan, PlanId, PlanRequest, PositionReport, Stop, StopSource,
    Timestamp, TravelTimeProvider, Vehicle, VehicleId,
};

use crate::{
    BroadcastHub, IngestOutcome, IngestStats, IngestionPipeline, InterestSet, LiveConfig,
    LocationStore, PlanBook, PlanContext, PlanError, ReoptimizationTrigger, ReplanSignal,
    Replanner, Subscription, SubscriptionId, TriggerStats,
};

/// Where the stops of a new plan come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSelection {
    /// Stops supplied by the caller.
    Explicit(Vec<Stop>),
    /// Pending stops of a depot, read from the configured stop source.
    Depot(DepotId),
}

/// Request to compute and activate a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCommand {
    /// Plan identifier. Committing an existing id replaces that plan.
    pub plan_id: PlanId,
    /// Roster vehicles that drive the plan.
    pub vehicles: Vec<VehicleId>,
    /// Stops to serve.
    pub stops: StopSelection,
    /// Optimizer constraints, kept for later re-optimization.
    #[serde(default)]
    pub constraints: Constraints,
    /// Instant the plan's offsets are measured from. Defaults to the later
    /// of the wall clock and the freshest vehicle report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
}

/// Assembles a [`FleetService`].
pub struct FleetServiceBuilder {
    roster: Arc<dyn FleetRoster>,
    optimizer: Arc<dyn Optimizer>,
    config: LiveConfig,
    alerts: Arc<dyn AlertSink>,
    stop_source: Option<Arc<dyn StopSource>>,
    provider: Arc<dyn TravelTimeProvider>,
}

impl FleetServiceBuilder {
    /// Start from a roster and an optimizer.
    ///
    /// Defaults: [`LiveConfig::default`], alerts written to the log, no stop
    /// source and haversine travel times for ETA checks.
    pub fn new(roster: Arc<dyn FleetRoster>, optimizer: Arc<dyn Optimizer>) -> Self {
        Self {
            roster,
            optimizer,
            config: LiveConfig::default(),
            alerts: Arc::new(LogAlertSink),
            stop_source: None,
            provider: Arc::new(HaversineTravelTimeProvider::default()),
        }
    }

    /// Replace the live configuration.
    #[must_use]
    pub fn with_config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Send alerts to `alerts`.
    #[must_use]
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Read depot stops from `stop_source`.
    #[must_use]
    pub fn with_stop_source(mut self, stop_source: Arc<dyn StopSource>) -> Self {
        self.stop_source = Some(stop_source);
        self
    }

    /// Estimate ETAs with `provider`.
    #[must_use]
    pub fn with_travel_time_provider(mut self, provider: Arc<dyn TravelTimeProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Build the service. Re-optimization runs are spawned on `runtime`.
    #[must_use]
    pub fn build(self, runtime: Handle) -> FleetService {
        let store = Arc::new(LocationStore::new());
        let plans = Arc::new(PlanBook::new());
        let hub = BroadcastHub::new(self.config.subscriber_queue_capacity);
        let replanner = Replanner::new(
            Arc::clone(&self.roster),
            Arc::clone(&store),
            Arc::clone(&plans),
            Arc::clone(&self.optimizer),
            hub.clone(),
            Arc::clone(&self.alerts),
        );
        let trigger = ReoptimizationTrigger::new(replanner, self.config.debounce, runtime);
        let pipeline = IngestionPipeline::new(
            Arc::clone(&self.roster),
            Arc::clone(&store),
            Arc::clone(&plans),
            hub.clone(),
            self.provider,
            self.alerts,
        )
        .with_config(self.config.ingest)
        .with_replan_signal(Arc::new(trigger.clone()) as Arc<dyn ReplanSignal>);

        FleetService {
            roster: self.roster,
            optimizer: self.optimizer,
            stop_source: self.stop_source,
            store,
            plans,
            hub,
            pipeline,
            trigger,
            config: self.config,
        }
    }
}

/// The fleet core: position ingress, planning and the live event feed.
pub struct FleetService {
    roster: Arc<dyn FleetRoster>,
    optimizer: Arc<dyn Optimizer>,
    stop_source: Option<Arc<dyn StopSource>>,
    store: Arc<LocationStore>,
    plans: Arc<PlanBook>,
    hub: BroadcastHub,
    pipeline: IngestionPipeline,
    trigger: ReoptimizationTrigger,
    config: LiveConfig,
}

impl std::fmt::Debug for FleetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetService")
            .field("config", &self.config)
            .field("plans", &self.plans.plan_ids())
            .field("subscribers", &self.hub.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl FleetService {
    /// Start building a service.
    pub fn builder(
        roster: Arc<dyn FleetRoster>,
        optimizer: Arc<dyn Optimizer>,
    ) -> FleetServiceBuilder {
        FleetServiceBuilder::new(roster, optimizer)
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Validate and apply one position report.
    pub fn ingest(&self, report: &PositionReport) -> IngestOutcome {
        self.pipeline.ingest(report)
    }

    /// Compute a plan, activate it and publish it.
    ///
    /// Runs the optimizer on the calling thread; call from a blocking context
    /// inside async code.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownVehicle`] for vehicles missing from the
    /// roster, [`PlanError::VehicleOnAnotherPlan`] when a vehicle already
    /// drives another plan, [`PlanError::NoStopSource`] for depot selections
    /// without a stop source and [`PlanError::Optimize`] when optimization
    /// fails.
    pub fn plan(&self, command: PlanCommand) -> Result<Plan, PlanError> {
        let vehicles = command
            .vehicles
            .iter()
            .map(|vehicle_id| self.live_vehicle(vehicle_id))
            .collect::<Result<Vec<_>, _>>()?;
        self.plans
            .check_available(&command.plan_id, &command.vehicles)?;
        let stops = match command.stops {
            StopSelection::Explicit(stops) => stops,
            StopSelection::Depot(depot) => self
                .stop_source
                .as_ref()
                .ok_or(PlanError::NoStopSource)?
                .pending_stops(&depot),
        };
        let started_at = command.started_at.unwrap_or_else(|| {
            vehicles
                .iter()
                .map(|vehicle| vehicle.position_at)
                .fold(Timestamp::now(), Ord::max)
        });

        let request = PlanRequest {
            plan_id: command.plan_id,
            vehicles,
            stops,
            constraints: command.constraints,
        };
        let response = self.optimizer.optimize(&request)?;
        log::debug!(
            "optimized plan {} in {:?} ({} iteration(s))",
            request.plan_id,
            response.diagnostics.solve_time,
            response.diagnostics.iterations
        );
        let context = PlanContext {
            origins: request
                .vehicles
                .iter()
                .map(|vehicle| (vehicle.id.clone(), vehicle.position))
                .collect(),
            stops: request.stops,
            started_at,
            constraints: request.constraints,
        };
        let outcome = self.plans.commit(response.plan, context)?;
        self.trigger.replanner().announce(&outcome);
        Ok(outcome.plan)
    }

    fn live_vehicle(&self, vehicle_id: &VehicleId) -> Result<Vehicle, PlanError> {
        let vehicle = self
            .roster
            .vehicle(vehicle_id)
            .ok_or_else(|| PlanError::UnknownVehicle(vehicle_id.clone()))?;
        Ok(match self.store.get(vehicle_id) {
            Some(record) => vehicle.with_position(record.position, record.timestamp),
            None => vehicle,
        })
    }

    /// Ask for a re-optimization of `plan_id` outside the deviation path.
    pub fn request_reoptimization(&self, plan_id: &PlanId) {
        self.trigger.signal(plan_id);
    }

    /// Retire a plan and release its vehicles.
    pub fn retire_plan(&self, plan_id: &PlanId) -> Option<Plan> {
        let retired = self.plans.remove(plan_id);
        self.trigger.forget(plan_id);
        retired
    }

    /// Subscribe to events matching `interest`.
    #[must_use]
    pub fn subscribe(&self, interest: InterestSet) -> Subscription {
        self.hub.subscribe(interest)
    }

    /// Tear down a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Last accepted record for `vehicle_id`.
    #[must_use]
    pub fn location(&self, vehicle_id: &VehicleId) -> Option<LocationRecord> {
        self.store.get(vehicle_id)
    }

    /// Every current location record.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<VehicleId, LocationRecord> {
        self.store.snapshot()
    }

    /// Current revision of `plan_id`.
    #[must_use]
    pub fn active_plan(&self, plan_id: &PlanId) -> Option<Plan> {
        self.plans.plan(plan_id)
    }

    /// Identifiers of the active plans.
    #[must_use]
    pub fn plan_ids(&self) -> Vec<PlanId> {
        self.plans.plan_ids()
    }

    /// Ingestion counters.
    #[must_use]
    pub fn ingest_stats(&self) -> IngestStats {
        self.pipeline.stats()
    }

    /// Re-optimization counters.
    #[must_use]
    pub fn trigger_stats(&self) -> TriggerStats {
        self.trigger.stats()
    }

    /// Wait until no re-optimization is armed or running.
    pub async fn wait_idle(&self) {
        self.trigger.wait_idle().await;
    }
}
