//! `plan` command: optimize a JSON plan request offline.

use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use truckify_core::{
    DEFAULT_AVERAGE_SPEED_KMH, HaversineTravelTimeProvider, Optimizer, PlanRequest, PlanResponse,
};
use truckify_routing::HttpTravelTimeProvider;
use truckify_solver::InsertionOptimizer;

use crate::fs::{open_utf8_file, require_existing};
use crate::{
    ARG_AVERAGE_SPEED_KMH, ARG_OSRM_BASE_URL, ARG_PLAN_REQUEST, CliError, ENV_PLAN_REQUEST,
};

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Optimize a JSON-encoded PlanRequest and print the PlanResponse. \
                 Travel times come from an OSRM table service when \
                 --osrm-base-url is set, and from straight-line distance at \
                 a fixed average speed otherwise.",
    about = "Optimize a plan request"
)]
#[ortho_config(prefix = "TRUCKIFY")]
pub(crate) struct PlanArgs {
    /// Path to a JSON file containing a PlanRequest.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Base URL for the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Average speed for straight-line travel times.
    #[arg(long = ARG_AVERAGE_SPEED_KMH, value_name = "kmh")]
    #[serde(default)]
    pub(crate) average_speed_kmh: Option<f64>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Where the optimizer gets travel times from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TravelTimeSource {
    /// OSRM table service.
    Osrm { base_url: String },
    /// Great-circle distance at a constant speed.
    StraightLine { average_speed_kmh: f64 },
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) travel_time: TravelTimeSource,
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_PLAN_REQUEST,
            env: ENV_PLAN_REQUEST,
        })?;
        let travel_time = match (args.osrm_base_url, args.average_speed_kmh) {
            (Some(_), Some(_)) => {
                return Err(CliError::ConflictingArguments {
                    first: ARG_OSRM_BASE_URL,
                    second: ARG_AVERAGE_SPEED_KMH,
                });
            }
            (Some(base_url), None) => TravelTimeSource::Osrm { base_url },
            (None, Some(speed)) if speed <= 0.0 || !speed.is_finite() => {
                return Err(CliError::InvalidArgument {
                    field: ARG_AVERAGE_SPEED_KMH,
                    reason: "speed must be a positive number",
                });
            }
            (None, speed) => TravelTimeSource::StraightLine {
                average_speed_kmh: speed.unwrap_or(DEFAULT_AVERAGE_SPEED_KMH),
            },
        };
        Ok(Self {
            request_path,
            travel_time,
        })
    }
}

/// Builds the optimizer for a `plan` invocation.
pub(crate) trait OptimizerBuilder {
    fn build(&self, config: &PlanConfig) -> Result<Box<dyn Optimizer>, CliError>;
}

pub(crate) struct DefaultOptimizerBuilder;

impl OptimizerBuilder for DefaultOptimizerBuilder {
    fn build(&self, config: &PlanConfig) -> Result<Box<dyn Optimizer>, CliError> {
        match &config.travel_time {
            TravelTimeSource::Osrm { base_url } => {
                let provider = HttpTravelTimeProvider::new(base_url.clone()).map_err(|source| {
                    CliError::BuildTravelTimeProvider {
                        base_url: base_url.clone(),
                        source,
                    }
                })?;
                Ok(Box::new(InsertionOptimizer::new(provider)))
            }
            TravelTimeSource::StraightLine { average_speed_kmh } => Ok(Box::new(
                InsertionOptimizer::new(HaversineTravelTimeProvider::new(*average_speed_kmh)),
            )),
        }
    }
}

pub(crate) fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_plan_with(args, &DefaultOptimizerBuilder, &mut stdout)
}

pub(crate) fn run_plan_with(
    args: PlanArgs,
    builder: &dyn OptimizerBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let response = execute_plan(args, builder)?;
    write_plan_response(writer, &response)
}

fn execute_plan(args: PlanArgs, builder: &dyn OptimizerBuilder) -> Result<PlanResponse, CliError> {
    let config = args.into_config()?;
    require_existing(&config.request_path, ARG_PLAN_REQUEST)?;
    let request = load_plan_request(&config.request_path)?;
    request
        .validate()
        .map_err(|source| CliError::InvalidPlanRequest {
            path: config.request_path.clone(),
            source,
        })?;
    let optimizer = builder.build(&config)?;
    let response = optimizer
        .optimize(&request)
        .map_err(|source| CliError::Optimize { source })?;
    log::info!(
        "plan {} covers {} route(s), {} stop(s) unassigned",
        response.plan.id,
        response.plan.routes.len(),
        response.plan.unassigned.len()
    );
    Ok(response)
}

/// Loads a JSON-encoded [`PlanRequest`] from disk.
pub(crate) fn load_plan_request(path: &Utf8Path) -> Result<PlanRequest, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParsePlanRequest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_plan_response(writer: &mut dyn Write, response: &PlanResponse) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(response).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}
