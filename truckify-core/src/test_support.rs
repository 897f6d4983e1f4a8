//! Deterministic collaborators and builders used by unit and behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use geo::Coord;

use crate::{Alert, AlertSink, Stop, TravelTimeError, TravelTimeMatrix, TravelTimeProvider, Vehicle};

/// Deterministic `TravelTimeProvider` returning one-second edges.
#[derive(Default, Debug, Copy, Clone)]
pub struct UnitTravelTimeProvider;

impl TravelTimeProvider for UnitTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        if points.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        let n = points.len();
        Ok((0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            Duration::ZERO
                        } else {
                            Duration::from_secs(1)
                        }
                    })
                    .collect()
            })
            .collect())
    }
}

/// Manhattan distance on the coordinate grid, scaled to whole seconds.
///
/// A unit of `x` or `y` costs `secs_per_unit` seconds, which keeps test
/// fixtures readable: a stop at `(3, 4)` is seven units from the origin.
#[derive(Debug, Copy, Clone)]
pub struct GridTravelTimeProvider {
    /// Seconds per coordinate unit.
    pub secs_per_unit: u64,
}

impl Default for GridTravelTimeProvider {
    fn default() -> Self {
        Self { secs_per_unit: 60 }
    }
}

impl GridTravelTimeProvider {
    #[expect(
        clippy::float_arithmetic,
        reason = "grid distance is computed from floating-point coordinates"
    )]
    fn leg(&self, from: Coord<f64>, to: Coord<f64>) -> Duration {
        let units = (from.x - to.x).abs() + (from.y - to.y).abs();
        #[expect(
            clippy::cast_precision_loss,
            reason = "test scales are small integers"
        )]
        let secs = units * self.secs_per_unit as f64;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl TravelTimeProvider for GridTravelTimeProvider {
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

/// Provider that always fails with the configured error.
#[derive(Debug, Clone)]
pub struct FailingTravelTimeProvider(pub TravelTimeError);

impl TravelTimeProvider for FailingTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        _points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        Err(self.0.clone())
    }
}

/// Wraps a provider and counts matrix requests.
#[derive(Debug, Default)]
pub struct CountingTravelTimeProvider<T> {
    inner: T,
    calls: AtomicUsize,
}

impl<T> CountingTravelTimeProvider<T> {
    /// Wrap `inner`.
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of matrix requests so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<T: TravelTimeProvider> TravelTimeProvider for CountingTravelTimeProvider<T> {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.get_travel_time_matrix(points)
    }
}

/// Alert sink that keeps every alert for later inspection.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    /// Alerts received so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertSink for RecordingAlertSink {
    fn notify(&self, alert: Alert) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }
}

/// Vehicle at `(x, y)` with the given capacity.
#[must_use]
pub fn vehicle(id: &str, capacity: u32, x: f64, y: f64) -> Vehicle {
    Vehicle::new(id, capacity, Coord { x, y })
}

/// Stop at `(x, y)` with the given demand and no window.
#[must_use]
pub fn stop(id: &str, x: f64, y: f64, demand: u32) -> Stop {
    Stop::new(id, Coord { x, y }, demand)
}
