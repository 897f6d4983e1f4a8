//! Tunables for the live pipeline.

use std::time::Duration;

/// Thresholds applied to every accepted position report.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use truckify_live::IngestConfig;
///
/// let config = IngestConfig::default()
///     .with_max_corridor_distance_m(2_000.0)
///     .with_max_eta_slip(Duration::from_secs(600));
/// assert_eq!(config.arrival_radius_m, 150.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestConfig {
    /// Distance from the remaining-route polyline beyond which a vehicle is
    /// considered off its corridor.
    pub max_corridor_distance_m: f64,
    /// Lateness at the next stop beyond which a vehicle is considered late.
    pub max_eta_slip: Duration,
    /// A vehicle within this distance of its next stop has reached it.
    pub arrival_radius_m: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_corridor_distance_m: 5_000.0,
            max_eta_slip: Duration::from_secs(15 * 60),
            arrival_radius_m: 150.0,
        }
    }
}

impl IngestConfig {
    /// Set the corridor threshold in metres.
    #[must_use]
    pub const fn with_max_corridor_distance_m(mut self, metres: f64) -> Self {
        self.max_corridor_distance_m = metres;
        self
    }

    /// Set the ETA slip threshold.
    #[must_use]
    pub const fn with_max_eta_slip(mut self, slip: Duration) -> Self {
        self.max_eta_slip = slip;
        self
    }

    /// Set the arrival radius in metres.
    #[must_use]
    pub const fn with_arrival_radius_m(mut self, metres: f64) -> Self {
        self.arrival_radius_m = metres;
        self
    }
}

/// Configuration for [`crate::FleetService`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveConfig {
    /// Deviation and arrival thresholds.
    pub ingest: IngestConfig,
    /// Signals for the same plan inside this window share one re-planning run.
    pub debounce: Duration,
    /// Events buffered per subscriber before the oldest is dropped.
    pub subscriber_queue_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            debounce: Duration::from_secs(3),
            subscriber_queue_capacity: 256,
        }
    }
}

impl LiveConfig {
    /// Replace the ingestion thresholds.
    #[must_use]
    pub const fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    /// Set the debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the per-subscriber queue bound. Zero is treated as one.
    #[must_use]
    pub const fn with_subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }
}
