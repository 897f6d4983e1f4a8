//! HTTP `TravelTimeProvider` using OSRM's Table API.
//!
//! The [`TravelTimeProvider`] trait is synchronous so the optimizer can run
//! on a plain blocking worker. This provider bridges the async HTTP call to
//! that interface by blocking on a Tokio runtime.

use std::time::Duration;

use geo::Coord;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use truckify_core::travel_time::validate_matrix;
use truckify_core::{TravelTimeError, TravelTimeMatrix, TravelTimeProvider};

use crate::osrm::TableResponse;

/// Failures building an [`HttpTravelTimeProvider`].
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "truckify-routing/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpTravelTimeProvider`].
#[derive(Debug, Clone)]
pub struct HttpTravelTimeProviderConfig {
    /// Base URL of the OSRM service, e.g. `"http://localhost:5000"`.
    pub base_url: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for HttpTravelTimeProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpTravelTimeProviderConfig {
    /// Configuration for the given base URL with default timeout and agent.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Road travel times from an OSRM `driving` profile.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the provider blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses the caller's handle with
/// [`tokio::task::block_in_place`]. Inside a `current_thread` runtime it falls
/// back to its own runtime, which can stall the caller's runtime for the
/// duration of the request; call it from `spawn_blocking` in that case.
///
/// Null, negative and non-finite durations in the response are reported as
/// [`Duration::MAX`] so the optimizer treats the pair as unreachable.
pub struct HttpTravelTimeProvider {
    client: Client,
    config: HttpTravelTimeProviderConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpTravelTimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTravelTimeProvider")
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpTravelTimeProvider {
    /// Provider for `base_url` with default timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpTravelTimeProviderConfig::new(base_url))
    }

    /// Provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpTravelTimeProviderConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpTravelTimeProviderConfig {
        &self.config
    }

    /// `{base_url}/table/v1/driving/{lon,lat;lon,lat;...}`
    fn build_table_url(&self, points: &[Coord<f64>]) -> String {
        let coords = points
            .iter()
            .map(|point| format!("{},{}", point.x, point.y))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/driving/{}",
            self.config.base_url.trim_end_matches('/'),
            coords
        )
    }

    async fn fetch_matrix_async(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        let url = self.build_table_url(points);
        log::debug!("requesting {}x{} travel-time table", points.len(), points.len());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let table: TableResponse =
            response
                .json()
                .await
                .map_err(|err| TravelTimeError::ParseError {
                    message: err.to_string(),
                })?;

        let matrix = Self::convert_response(table)?;
        validate_matrix(&matrix, points.len())?;
        Ok(matrix)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> TravelTimeError {
        if error.is_timeout() {
            return TravelTimeError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return TravelTimeError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        TravelTimeError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    fn convert_response(response: TableResponse) -> Result<TravelTimeMatrix, TravelTimeError> {
        if !response.is_ok() {
            return Err(TravelTimeError::ServiceError {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }

        let durations = response
            .durations
            .ok_or_else(|| TravelTimeError::ParseError {
                message: "OSRM response missing durations array".to_owned(),
            })?;

        // Null, negative, non-finite and out-of-range cells are unreachable.
        Ok(durations
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                            .unwrap_or(Duration::MAX)
                    })
                    .collect()
            })
            .collect())
    }
}

impl TravelTimeProvider for HttpTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        if points.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }

        let future = self.fetch_matrix_async(points);
        let result = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        };
        if let Err(err) = &result {
            log::warn!("travel-time lookup failed: {err}");
        }
        result
    }
}
