//! Straight-line travel times at a constant average speed.

use std::time::Duration;

use geo::Coord;

use super::{TravelTimeError, TravelTimeMatrix, TravelTimeProvider};
use crate::geodesy::haversine_distance_m;

/// Average road speed assumed when no routing service is configured.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 50.0;

/// Estimate travel times from great-circle distance.
///
/// The estimate ignores the road network, so it is symmetric and always
/// finite. It is deterministic, which makes it suitable for tests and for
/// running without an OSRM deployment.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{HaversineTravelTimeProvider, TravelTimeProvider};
///
/// let provider = HaversineTravelTimeProvider::new(60.0);
/// // One degree of latitude is about 111 km: roughly 111 minutes at 60 km/h.
/// let leg = provider.travel_time(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 })?;
/// assert!((6_600..6_700).contains(&leg.as_secs()));
/// # Ok::<(), truckify_core::TravelTimeError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineTravelTimeProvider {
    average_speed_kmh: f64,
}

impl Default for HaversineTravelTimeProvider {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGE_SPEED_KMH)
    }
}

impl HaversineTravelTimeProvider {
    /// Create a provider assuming `average_speed_kmh`.
    ///
    /// Non-positive or non-finite speeds fall back to
    /// [`DEFAULT_AVERAGE_SPEED_KMH`].
    #[must_use]
    pub fn new(average_speed_kmh: f64) -> Self {
        if average_speed_kmh.is_finite() && average_speed_kmh > 0.0 {
            return Self { average_speed_kmh };
        }
        log::warn!(
            "ignoring average speed {average_speed_kmh} km/h; using {DEFAULT_AVERAGE_SPEED_KMH}"
        );
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
        }
    }

    /// Configured average speed.
    #[must_use]
    pub const fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "distance to duration conversion is floating-point"
    )]
    fn leg(&self, from: Coord<f64>, to: Coord<f64>) -> Duration {
        let metres_per_sec = self.average_speed_kmh / 3.6;
        let secs = haversine_distance_m(from, to) / metres_per_sec;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl TravelTimeProvider for HaversineTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        if points.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        Ok(points
            .iter()
            .map(|&from| points.iter().map(|&to| self.leg(from, to)).collect())
            .collect())
    }
}
