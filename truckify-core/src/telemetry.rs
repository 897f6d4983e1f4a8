//! Position reports sent by vehicles and the records kept for them.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{Timestamp, VehicleId};

/// A single telemetry sample as delivered by the transport layer.
///
/// Reports arrive at least once and possibly out of order; the location
/// store discards anything not strictly newer than what it already holds.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use truckify_core::{PositionReport, Timestamp};
///
/// let report: PositionReport = serde_json::from_str(
///     r#"{"vehicle_id":"V1","position":{"x":-0.1,"y":51.5},"timestamp":1000,"speed":12.5}"#,
/// )?;
/// assert_eq!(report.timestamp, Timestamp::from_secs(1));
/// assert_eq!(report.heading, None);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    /// Reporting vehicle.
    pub vehicle_id: VehicleId,
    /// Reported position.
    pub position: Coord<f64>,
    /// Device clock at sampling time.
    pub timestamp: Timestamp,
    /// Ground speed in metres per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Course over ground in degrees clockwise from north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl PositionReport {
    /// Construct a report without speed or heading.
    pub fn new(vehicle_id: impl Into<VehicleId>, position: Coord<f64>, timestamp: Timestamp) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            position,
            timestamp,
            speed: None,
            heading: None,
        }
    }
}

/// The latest accepted report for a vehicle.
///
/// `sequence` starts at 1 and increases by one for every accepted report, so
/// subscribers can detect gaps caused by queue overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Vehicle the record belongs to.
    pub vehicle_id: VehicleId,
    /// Last accepted position.
    pub position: Coord<f64>,
    /// Timestamp of the accepted report.
    pub timestamp: Timestamp,
    /// Ground speed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Heading, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Per-vehicle acceptance counter.
    pub sequence: u64,
}

impl LocationRecord {
    /// Build the record stored for an accepted report.
    #[must_use]
    pub fn from_report(report: &PositionReport, sequence: u64) -> Self {
        Self {
            vehicle_id: report.vehicle_id.clone(),
            position: report.position,
            timestamp: report.timestamp,
            speed: report.speed,
            heading: report.heading,
            sequence,
        }
    }
}

/// Why a report was dropped without changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The vehicle is not on the roster.
    UnknownVehicle,
    /// The report is not newer than the stored one.
    Stale,
    /// Latitude or longitude is out of range or not finite.
    InvalidCoordinates,
}
