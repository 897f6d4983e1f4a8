//! Error types emitted by the truckify CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use truckify_core::{OptimizeError, PlanId, PlanRequestValidationError};
use truckify_live::PlanError;
use truckify_routing::ProviderBuildError;

/// Errors emitted by the truckify CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass it on the command line or set {env})")]
    MissingArgument {
        /// Argument name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Two options that exclude each other were both set.
    #[error("--{first} cannot be combined with --{second}")]
    ConflictingArguments {
        /// First option.
        first: &'static str,
        /// Second option.
        second: &'static str,
    },
    /// An option holds a value outside its accepted range.
    #[error("invalid --{field}: {reason}")]
    InvalidArgument {
        /// Option name.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Argument that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Argument that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Argument that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// An input file could not be opened or read.
    #[error("failed to read {path:?}: {source}")]
    ReadInput {
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The plan request file is not valid JSON for a plan request.
    #[error("failed to parse plan request {path:?}: {source}")]
    ParsePlanRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// The plan request parsed but failed validation.
    #[error("invalid plan request {path:?}: {source}")]
    InvalidPlanRequest {
        /// Request path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: PlanRequestValidationError,
    },
    /// The replay scenario file is not valid JSON for a scenario.
    #[error("failed to parse replay scenario {path:?}: {source}")]
    ParseScenario {
        /// Scenario path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// A line of the reports file is not a valid position report.
    #[error("failed to parse position report at {path}:{line}: {source}")]
    ParseReport {
        /// Reports path.
        path: Utf8PathBuf,
        /// One-based line number.
        line: usize,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// Building the OSRM travel-time provider failed.
    #[error("failed to initialise travel-time provider for {base_url}: {source}")]
    BuildTravelTimeProvider {
        /// Configured OSRM base URL.
        base_url: String,
        /// Underlying failure.
        #[source]
        source: ProviderBuildError,
    },
    /// Optimization failed.
    #[error("failed to optimize plan: {source}")]
    Optimize {
        /// Underlying failure.
        #[source]
        source: OptimizeError,
    },
    /// A scenario plan could not be activated.
    #[error("failed to activate plan {plan_id}: {source}")]
    ActivatePlan {
        /// Plan that failed.
        plan_id: PlanId,
        /// Underlying failure.
        #[source]
        source: PlanError,
    },
    /// The async runtime backing the live pipeline failed to start.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Serialising command output to JSON failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
