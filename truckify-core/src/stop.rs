//! Delivery or service stops submitted to a planning run.

use std::time::Duration;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::time::duration_secs;
use crate::{StopId, TimeWindow};

/// A location that must be visited by exactly one vehicle.
///
/// Stops are immutable once submitted to a planning run. Re-planning builds
/// rebased copies through [`Stop::rebased`].
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use geo::Coord;
/// use truckify_core::{Stop, TimeWindow};
///
/// let window = TimeWindow::new(Duration::from_secs(0), Duration::from_secs(3_600))?;
/// let stop = Stop::new("S1", Coord { x: -0.1, y: 51.5 }, 6)
///     .with_window(window)
///     .with_service(Duration::from_secs(300));
/// assert_eq!(stop.demand, 6);
/// assert_eq!(stop.window, Some(window));
/// # Ok::<(), truckify_core::TimeWindowError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Order-source identifier.
    pub id: StopId,
    /// Where service happens.
    pub location: Coord<f64>,
    /// Load consumed on the serving vehicle.
    #[serde(default)]
    pub demand: u32,
    /// Optional service window, relative to the plan start.
    #[serde(default)]
    pub window: Option<TimeWindow>,
    /// Time spent on site.
    #[serde(default, with = "duration_secs")]
    pub service: Duration,
}

impl Stop {
    /// Construct a stop without a window or service time.
    pub fn new(id: impl Into<StopId>, location: Coord<f64>, demand: u32) -> Self {
        Self {
            id: id.into(),
            location,
            demand,
            window: None,
            service: Duration::ZERO,
        }
    }

    /// Attach a time window.
    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Attach a service duration.
    #[must_use]
    pub fn with_service(mut self, service: Duration) -> Self {
        self.service = service;
        self
    }

    /// Copy of this stop for a plan starting `elapsed` later.
    ///
    /// A window that already closed collapses to the instant the new plan
    /// starts, which only a vehicle already on site can meet. The optimizer
    /// then reports the stop as unassigned instead of silently dropping it.
    #[must_use]
    pub fn rebased(&self, elapsed: Duration) -> Self {
        let window = self.window.map(|w| {
            w.rebased(elapsed).unwrap_or(TimeWindow {
                earliest: Duration::ZERO,
                latest: Duration::ZERO,
            })
        });
        Self {
            window,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rebasing_a_closed_window_collapses_it() {
        let window =
            TimeWindow::new(Duration::from_secs(0), Duration::from_secs(60)).expect("window");
        let stop = Stop::new("S1", Coord { x: 0.0, y: 0.0 }, 1).with_window(window);
        let rebased = stop.rebased(Duration::from_secs(61));
        let closed = rebased.window.expect("window retained");
        assert_eq!(closed.latest, Duration::ZERO);
        assert!(closed.is_ordered());
    }

    #[rstest]
    fn stops_deserialise_with_defaults() {
        let stop: Stop = serde_json::from_str(r#"{"id":"S1","location":{"x":1.0,"y":2.0}}"#)
            .expect("deserialise stop");
        assert_eq!(stop.demand, 0);
        assert_eq!(stop.window, None);
        assert_eq!(stop.service, Duration::ZERO);
    }
}
