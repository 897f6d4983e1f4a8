//! `replay` command: run recorded position reports through the live pipeline.
//!
//! A scenario file seeds the roster, the pending depot stops and the plans to
//! activate. The reports file holds one JSON `PositionReport` per line. The
//! command prints one JSON line per ingest outcome, then every event the
//! fleet-wide subscriber received once re-optimization settles, then a
//! summary of the pipeline counters.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, Runtime};
use truckify_core::{
    DEFAULT_AVERAGE_SPEED_KMH, DepotId, HaversineTravelTimeProvider, InMemoryRoster,
    InMemoryStopSource, PositionReport, Stop, Vehicle, VehicleId,
};
use truckify_live::{
    FleetEvent, FleetService, IngestConfig, IngestOutcome, IngestStats, InterestSet, LiveConfig,
    PlanCommand, TriggerStats,
};
use truckify_solver::InsertionOptimizer;

use crate::fs::{open_utf8_file, require_existing};
use crate::{
    ARG_DEBOUNCE_MS, ARG_MAX_CORRIDOR_DISTANCE_M, ARG_MAX_ETA_SLIP_SECS, ARG_QUEUE_CAPACITY,
    ARG_REPLAY_REPORTS, ARG_REPLAY_SCENARIO, CliError, ENV_REPLAY_REPORTS, ENV_REPLAY_SCENARIO,
};

/// CLI arguments for the `replay` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Load a roster and initial plans from a JSON scenario, replay \
                 JSON-lines position reports through the ingestion pipeline \
                 and print every outcome and broadcast event as JSON lines.",
    about = "Replay position reports through the live pipeline"
)]
#[ortho_config(prefix = "TRUCKIFY")]
pub(crate) struct ReplayArgs {
    /// Path to the JSON replay scenario.
    #[arg(value_name = "scenario")]
    #[serde(default)]
    pub(crate) scenario_path: Option<Utf8PathBuf>,
    /// Path to the JSON-lines position reports.
    #[arg(value_name = "reports")]
    #[serde(default)]
    pub(crate) reports_path: Option<Utf8PathBuf>,
    /// Re-optimization debounce window in milliseconds.
    #[arg(long = ARG_DEBOUNCE_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) debounce_ms: Option<u64>,
    /// Events buffered for the replay subscriber before the oldest is dropped.
    #[arg(long = ARG_QUEUE_CAPACITY, value_name = "events")]
    #[serde(default)]
    pub(crate) queue_capacity: Option<usize>,
    /// Off-corridor threshold in metres.
    #[arg(long = ARG_MAX_CORRIDOR_DISTANCE_M, value_name = "metres")]
    #[serde(default)]
    pub(crate) max_corridor_distance_m: Option<f64>,
    /// Tolerated lateness at the next stop in seconds.
    #[arg(long = ARG_MAX_ETA_SLIP_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) max_eta_slip_secs: Option<u64>,
}

impl ReplayArgs {
    pub(crate) fn into_config(self) -> Result<ReplayConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReplayConfig::try_from(merged)
    }
}

/// Resolved `replay` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReplayConfig {
    pub(crate) scenario_path: Utf8PathBuf,
    pub(crate) reports_path: Utf8PathBuf,
    pub(crate) live: LiveConfig,
}

impl ReplayConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.scenario_path, ARG_REPLAY_SCENARIO)?;
        require_existing(&self.reports_path, ARG_REPLAY_REPORTS)
    }
}

impl TryFrom<ReplayArgs> for ReplayConfig {
    type Error = CliError;

    fn try_from(args: ReplayArgs) -> Result<Self, Self::Error> {
        let scenario_path = args.scenario_path.ok_or(CliError::MissingArgument {
            field: ARG_REPLAY_SCENARIO,
            env: ENV_REPLAY_SCENARIO,
        })?;
        let reports_path = args.reports_path.ok_or(CliError::MissingArgument {
            field: ARG_REPLAY_REPORTS,
            env: ENV_REPLAY_REPORTS,
        })?;

        let defaults = LiveConfig::default();
        let mut ingest = IngestConfig::default();
        if let Some(metres) = args.max_corridor_distance_m {
            if metres <= 0.0 || !metres.is_finite() {
                return Err(CliError::InvalidArgument {
                    field: ARG_MAX_CORRIDOR_DISTANCE_M,
                    reason: "distance must be a positive number of metres",
                });
            }
            ingest = ingest.with_max_corridor_distance_m(metres);
        }
        if let Some(secs) = args.max_eta_slip_secs {
            ingest = ingest.with_max_eta_slip(Duration::from_secs(secs));
        }
        let queue_capacity = match args.queue_capacity {
            Some(0) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_QUEUE_CAPACITY,
                    reason: "capacity must be at least one event",
                });
            }
            Some(capacity) => capacity,
            None => defaults.subscriber_queue_capacity,
        };
        let debounce = args
            .debounce_ms
            .map_or(defaults.debounce, Duration::from_millis);

        Ok(Self {
            scenario_path,
            reports_path,
            live: defaults
                .with_ingest(ingest)
                .with_debounce(debounce)
                .with_subscriber_queue_capacity(queue_capacity),
        })
    }
}

/// Fleet state a replay starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scenario {
    /// Roster vehicles.
    pub(crate) vehicles: Vec<Vehicle>,
    /// Pending stops per depot, for plans that select a depot.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) depots: BTreeMap<DepotId, Vec<Stop>>,
    /// Plans activated before the first report, in order.
    #[serde(default)]
    pub(crate) plans: Vec<PlanCommand>,
    /// Speed used for straight-line travel times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) average_speed_kmh: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
enum ReplayLine<'a> {
    Ingest {
        line: usize,
        vehicle_id: &'a VehicleId,
        result: &'a IngestOutcome,
    },
    Event {
        event: &'a FleetEvent,
    },
    Summary {
        ingest: IngestStats,
        reoptimization: TriggerStats,
        dropped_events: u64,
    },
}

pub(crate) fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_replay_with(args, &mut stdout)
}

pub(crate) fn run_replay_with(args: ReplayArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let scenario = load_scenario(&config.scenario_path)?;
    let reports = load_reports(&config.reports_path)?;
    let runtime = build_runtime()?;
    replay(&runtime, scenario, &reports, config.live, writer)
}

fn build_runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

fn build_service(
    vehicles: Vec<Vehicle>,
    depots: BTreeMap<DepotId, Vec<Stop>>,
    average_speed_kmh: Option<f64>,
    live: LiveConfig,
    runtime: Handle,
) -> FleetService {
    let provider = Arc::new(HaversineTravelTimeProvider::new(
        average_speed_kmh.unwrap_or(DEFAULT_AVERAGE_SPEED_KMH),
    ));
    let optimizer = Arc::new(InsertionOptimizer::new(Arc::clone(&provider)));
    let roster = Arc::new(InMemoryRoster::with_vehicles(vehicles));
    let mut builder = FleetService::builder(roster, optimizer)
        .with_config(live)
        .with_travel_time_provider(provider);
    if !depots.is_empty() {
        let stop_source = InMemoryStopSource::default();
        for (depot, stops) in depots {
            stop_source.submit(depot, stops);
        }
        builder = builder.with_stop_source(Arc::new(stop_source));
    }
    builder.build(runtime)
}

fn replay(
    runtime: &Runtime,
    scenario: Scenario,
    reports: &[(usize, PositionReport)],
    live: LiveConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let Scenario {
        vehicles,
        depots,
        plans,
        average_speed_kmh,
    } = scenario;
    let service = build_service(
        vehicles,
        depots,
        average_speed_kmh,
        live,
        runtime.handle().clone(),
    );
    let mut feed = service.subscribe(InterestSet::fleet_wide());

    for command in plans {
        let plan_id = command.plan_id.clone();
        let plan = service
            .plan(command)
            .map_err(|source| CliError::ActivatePlan { plan_id, source })?;
        log::info!(
            "activated plan {} revision {} with {} route(s)",
            plan.id,
            plan.revision,
            plan.routes.len()
        );
    }

    for (line, report) in reports {
        let outcome = service.ingest(report);
        write_line(
            writer,
            &ReplayLine::Ingest {
                line: *line,
                vehicle_id: &report.vehicle_id,
                result: &outcome,
            },
        )?;
    }

    runtime.block_on(service.wait_idle());
    while let Some(event) = feed.try_recv() {
        write_line(writer, &ReplayLine::Event { event: &event })?;
    }
    write_line(
        writer,
        &ReplayLine::Summary {
            ingest: service.ingest_stats(),
            reoptimization: service.trigger_stats(),
            dropped_events: feed.dropped_events(),
        },
    )
}

/// Loads a JSON-encoded [`Scenario`] from disk.
pub(crate) fn load_scenario(path: &Utf8Path) -> Result<Scenario, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseScenario {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads JSON-lines position reports, keyed by their one-based line number.
///
/// Blank lines are skipped.
pub(crate) fn load_reports(path: &Utf8Path) -> Result<Vec<(usize, PositionReport)>, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reports = Vec::new();
    for (index, text) in BufReader::new(file).lines().enumerate() {
        let content = text.map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            continue;
        }
        let line = index.saturating_add(1);
        let report =
            serde_json::from_str(&content).map_err(|source| CliError::ParseReport {
                path: path.to_path_buf(),
                line,
                source,
            })?;
        reports.push((line, report));
    }
    Ok(reports)
}

fn write_line(writer: &mut dyn Write, line: &ReplayLine<'_>) -> Result<(), CliError> {
    serde_json::to_writer(&mut *writer, line).map_err(CliError::SerialiseOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ReplayConfig, CliError> {
    let merged = ReplayArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ReplayConfig::try_from(merged)
}
