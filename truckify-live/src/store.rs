//! Authoritative last-known position per vehicle.
//!
//! Records are replaced whole under the vehicle's shard lock, so a reader
//! never observes a partially written record and vehicles never contend on a
//! shared lock.

use std::collections::BTreeMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use truckify_core::geodesy::is_valid_coordinate;
use truckify_core::{LocationRecord, PositionReport, RejectReason, VehicleId};

/// Concurrent table of [`LocationRecord`]s keyed by vehicle.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{PositionReport, RejectReason, Timestamp};
/// use truckify_live::LocationStore;
///
/// let store = LocationStore::new();
/// let report = PositionReport::new("V1", Coord { x: -0.1, y: 51.5 }, Timestamp::from_secs(10));
/// let record = store.apply(&report)?;
/// assert_eq!(record.sequence, 1);
/// assert_eq!(store.apply(&report), Err(RejectReason::Stale));
/// # Ok::<(), RejectReason>(())
/// ```
#[derive(Debug, Default)]
pub struct LocationStore {
    records: DashMap<VehicleId, LocationRecord>,
}

impl LocationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the vehicle's record with `report`.
    ///
    /// The report must be strictly newer than the stored record and carry a
    /// valid coordinate, checked in that order. Roster membership is the
    /// caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::Stale`] or [`RejectReason::InvalidCoordinates`]
    /// and leaves the stored record untouched.
    pub fn apply(&self, report: &PositionReport) -> Result<LocationRecord, RejectReason> {
        match self.records.entry(report.vehicle_id.clone()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if report.timestamp <= current.timestamp {
                    return Err(RejectReason::Stale);
                }
                if !is_valid_coordinate(report.position) {
                    return Err(RejectReason::InvalidCoordinates);
                }
                let record =
                    LocationRecord::from_report(report, current.sequence.saturating_add(1));
                entry.insert(record.clone());
                Ok(record)
            }
            Entry::Vacant(entry) => {
                if !is_valid_coordinate(report.position) {
                    return Err(RejectReason::InvalidCoordinates);
                }
                let record = LocationRecord::from_report(report, 1);
                entry.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Latest record for `vehicle_id`.
    #[must_use]
    pub fn get(&self, vehicle_id: &VehicleId) -> Option<LocationRecord> {
        self.records.get(vehicle_id).map(|record| record.clone())
    }

    /// Copy of every record, ordered by vehicle.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<VehicleId, LocationRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of vehicles with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no report has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use truckify_core::Timestamp;

    fn report(vehicle: &str, secs: u64, x: f64, y: f64) -> PositionReport {
        PositionReport::new(vehicle, Coord { x, y }, Timestamp::from_secs(secs))
    }

    #[fixture]
    fn store() -> LocationStore {
        let store = LocationStore::new();
        store
            .apply(&report("V1", 10, 0.0, 51.0))
            .expect("first report");
        store
    }

    #[rstest]
    fn newer_reports_bump_the_sequence(store: LocationStore) {
        let record = store
            .apply(&report("V1", 11, 0.1, 51.0))
            .expect("newer report");
        assert_eq!(record.sequence, 2);
        assert_eq!(store.get(&"V1".into()), Some(record));
    }

    #[rstest]
    #[case(10)]
    #[case(9)]
    fn older_or_equal_reports_are_stale(store: LocationStore, #[case] secs: u64) {
        let before = store.get(&"V1".into());
        assert_eq!(
            store.apply(&report("V1", secs, 5.0, 5.0)),
            Err(RejectReason::Stale)
        );
        assert_eq!(store.get(&"V1".into()), before);
    }

    #[rstest]
    fn staleness_is_checked_before_coordinates(store: LocationStore) {
        assert_eq!(
            store.apply(&report("V1", 1, 0.0, 200.0)),
            Err(RejectReason::Stale)
        );
        assert_eq!(
            store.apply(&report("V1", 20, 0.0, 200.0)),
            Err(RejectReason::InvalidCoordinates)
        );
        assert_eq!(
            store.apply(&report("V2", 1, f64::NAN, 0.0)),
            Err(RejectReason::InvalidCoordinates)
        );
        assert_eq!(store.get(&"V2".into()), None);
    }

    #[rstest]
    fn snapshot_lists_vehicles_in_order(store: LocationStore) {
        store
            .apply(&report("V0", 1, 0.0, 0.0))
            .expect("second vehicle");
        let ids: Vec<_> = store.snapshot().into_keys().collect();
        assert_eq!(ids, vec![VehicleId::from("V0"), VehicleId::from("V1")]);
        assert_eq!(store.len(), 2);
    }

    #[rstest]
    fn concurrent_writers_do_not_interfere() {
        let store = LocationStore::new();
        std::thread::scope(|scope| {
            for vehicle in ["A", "B", "C", "D"] {
                let shared = &store;
                scope.spawn(move || {
                    for secs in 1..=200 {
                        shared
                            .apply(&report(vehicle, secs, 0.0, 0.0))
                            .expect("monotonic reports");
                    }
                });
            }
        });
        for record in store.snapshot().values() {
            assert_eq!(record.sequence, 200);
            assert_eq!(record.timestamp, Timestamp::from_secs(200));
        }
    }
}
