//! Route deviation checks for accepted position reports.

use geo::Coord;
use truckify_core::geodesy::distance_to_polyline_m;
use truckify_core::{DeviationKind, Timestamp, TravelTimeProvider};

use crate::{IngestConfig, VehicleProgress};

/// Decide whether a vehicle at `position` has drifted from its plan.
///
/// The corridor check runs first: a vehicle further than
/// [`IngestConfig::max_corridor_distance_m`] from the polyline through its
/// last reached point and remaining stops is off corridor. Otherwise the
/// expected arrival at the next stop is estimated with `provider` and compared
/// to the planned arrival. A provider failure skips the ETA check.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{DeviationKind, HaversineTravelTimeProvider, Timestamp};
/// use truckify_live::{IngestConfig, VehicleProgress, detect_deviation};
///
/// let progress = VehicleProgress {
///     plan_id: "north".into(),
///     arrived: Vec::new(),
///     next_stop: None,
///     corridor: vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.1 }],
/// };
/// let provider = HaversineTravelTimeProvider::default();
/// let config = IngestConfig::default();
/// let at = Timestamp::from_secs(0);
///
/// let on_route = detect_deviation(&progress, Coord { x: 0.0, y: 0.05 }, at, &provider, &config);
/// assert_eq!(on_route, None);
///
/// let far = detect_deviation(&progress, Coord { x: 0.5, y: 0.05 }, at, &provider, &config);
/// assert!(matches!(far, Some(DeviationKind::OffCorridor { .. })));
/// ```
#[must_use]
pub fn detect_deviation(
    progress: &VehicleProgress,
    position: Coord<f64>,
    at: Timestamp,
    provider: &dyn TravelTimeProvider,
    config: &IngestConfig,
) -> Option<DeviationKind> {
    if let Some(distance_m) = distance_to_polyline_m(position, &progress.corridor)
        && distance_m > config.max_corridor_distance_m
    {
        return Some(DeviationKind::OffCorridor { distance_m });
    }

    let next = progress.next_stop.as_ref()?;
    let leg = provider
        .travel_time(position, next.location)
        .inspect_err(|err| {
            log::warn!(
                "skipping ETA check for stop {} on plan {}: {err}",
                next.stop_id,
                progress.plan_id
            );
        })
        .ok()?;
    let slip = at
        .saturating_add(leg)
        .saturating_duration_since(next.planned_arrival);
    (slip > config.max_eta_slip).then_some(DeviationKind::EtaSlip { slip })
}
