//! Vehicles as seen by the planning core.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{Timestamp, VehicleId};

/// Operational status reported by the fleet roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Parked and available for work.
    #[default]
    Idle,
    /// Driving an assigned route.
    EnRoute,
    /// Unavailable; never receives a route.
    OutOfService,
}

impl VehicleStatus {
    /// Whether the optimizer may assign stops to a vehicle in this status.
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::OutOfService)
    }
}

/// Read-only snapshot of a roster vehicle.
///
/// `position` is the last known location (`x = longitude`, `y = latitude`)
/// and `position_at` the instant it was observed. The live pipeline overlays
/// fresher positions on top of this snapshot before re-planning.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{Timestamp, Vehicle, VehicleStatus};
///
/// let truck = Vehicle::new("V1", 10, Coord { x: -0.1, y: 51.5 });
/// assert_eq!(truck.capacity, 10);
/// assert_eq!(truck.status, VehicleStatus::Idle);
///
/// let moved = truck.with_position(Coord { x: -0.2, y: 51.6 }, Timestamp::from_secs(60));
/// assert_eq!(moved.position_at, Timestamp::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Roster identifier.
    pub id: VehicleId,
    /// Load capacity in the fleet's load units.
    pub capacity: u32,
    /// Last known position.
    pub position: Coord<f64>,
    /// When `position` was observed.
    #[serde(default)]
    pub position_at: Timestamp,
    /// Operational status.
    #[serde(default)]
    pub status: VehicleStatus,
}

impl Vehicle {
    /// Construct an idle vehicle observed at the epoch.
    pub fn new(id: impl Into<VehicleId>, capacity: u32, position: Coord<f64>) -> Self {
        Self {
            id: id.into(),
            capacity,
            position,
            position_at: Timestamp::default(),
            status: VehicleStatus::Idle,
        }
    }

    /// Replace the status.
    #[must_use]
    pub fn with_status(mut self, status: VehicleStatus) -> Self {
        self.status = status;
        self
    }

    /// Overlay a fresher position.
    #[must_use]
    pub fn with_position(mut self, position: Coord<f64>, observed_at: Timestamp) -> Self {
        self.position = position;
        self.position_at = observed_at;
        self
    }
}
