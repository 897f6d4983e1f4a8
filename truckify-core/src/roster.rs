//! Read access to the fleet roster.
//!
//! The roster is owned by an external CRUD service. The core only needs to
//! know whether a vehicle exists and what it looks like right now.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::{Vehicle, VehicleId, VehicleStatus};

/// Lookup of roster vehicles.
///
/// Implementations must be `Send + Sync`; the ingestion path calls
/// [`FleetRoster::contains`] for every report.
pub trait FleetRoster: Send + Sync {
    /// Snapshot of one vehicle.
    fn vehicle(&self, id: &VehicleId) -> Option<Vehicle>;

    /// Whether `id` is on the roster.
    fn contains(&self, id: &VehicleId) -> bool {
        self.vehicle(id).is_some()
    }

    /// Load capacity of `id`.
    fn capacity(&self, id: &VehicleId) -> Option<u32> {
        self.vehicle(id).map(|vehicle| vehicle.capacity)
    }
}

/// Roster held in memory, ordered by vehicle id.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{FleetRoster, InMemoryRoster, Vehicle};
///
/// let roster = InMemoryRoster::with_vehicles([Vehicle::new("V1", 10, Coord { x: 0.0, y: 0.0 })]);
/// assert!(roster.contains(&"V1".into()));
/// assert_eq!(roster.capacity(&"V1".into()), Some(10));
/// assert_eq!(roster.capacity(&"V2".into()), None);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    vehicles: RwLock<BTreeMap<VehicleId, Vehicle>>,
}

impl InMemoryRoster {
    /// Create a roster from a collection of vehicles.
    pub fn with_vehicles<I>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = Vehicle>,
    {
        Self {
            vehicles: RwLock::new(
                vehicles
                    .into_iter()
                    .map(|vehicle| (vehicle.id.clone(), vehicle))
                    .collect(),
            ),
        }
    }

    /// Insert or replace a vehicle.
    pub fn upsert(&self, vehicle: Vehicle) {
        self.vehicles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vehicle.id.clone(), vehicle);
    }

    /// Remove a vehicle, returning its last snapshot.
    pub fn remove(&self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Change a vehicle's status. Returns `false` when the vehicle is unknown.
    pub fn set_status(&self, id: &VehicleId, status: VehicleStatus) -> bool {
        let mut vehicles = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        vehicles.get_mut(id).is_some_and(|vehicle| {
            vehicle.status = status;
            true
        })
    }

    /// Every vehicle in id order.
    #[must_use]
    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl FleetRoster for InMemoryRoster {
    fn vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn contains(&self, id: &VehicleId) -> bool {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};

    #[fixture]
    fn roster() -> InMemoryRoster {
        InMemoryRoster::with_vehicles([
            Vehicle::new("V2", 8, Coord { x: 0.0, y: 0.0 }),
            Vehicle::new("V1", 10, Coord { x: 0.0, y: 0.0 }),
        ])
    }

    #[rstest]
    fn vehicles_are_listed_in_id_order(roster: InMemoryRoster) {
        let ids: Vec<_> = roster.vehicles().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![VehicleId::from("V1"), VehicleId::from("V2")]);
    }

    #[rstest]
    fn status_changes_are_visible(roster: InMemoryRoster) {
        assert!(roster.set_status(&"V1".into(), VehicleStatus::OutOfService));
        assert!(!roster.set_status(&"V9".into(), VehicleStatus::Idle));
        let vehicle = roster.vehicle(&"V1".into()).expect("V1");
        assert_eq!(vehicle.status, VehicleStatus::OutOfService);
    }

    #[rstest]
    fn removed_vehicles_are_unknown(roster: InMemoryRoster) {
        assert!(roster.remove(&"V2".into()).is_some());
        assert!(!roster.contains(&"V2".into()));
    }
}
