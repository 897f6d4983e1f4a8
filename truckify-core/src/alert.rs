//! Notifications for operators.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PlanId, StopId, VehicleId};

/// How a vehicle diverged from its plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DeviationKind {
    /// The vehicle is too far from the polyline through its remaining stops.
    OffCorridor {
        /// Distance to the corridor in metres.
        distance_m: f64,
    },
    /// The vehicle will reach its next stop later than planned.
    EtaSlip {
        /// Expected delay.
        #[serde(with = "crate::time::duration_secs")]
        slip: Duration,
    },
}

/// Operator-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Alert {
    /// A vehicle drifted from its plan.
    RouteDeviation {
        /// Vehicle that drifted.
        vehicle_id: VehicleId,
        /// Plan the vehicle is driving.
        plan_id: PlanId,
        /// Measured deviation.
        deviation: DeviationKind,
    },
    /// Re-planning left stops without a vehicle.
    StopsUnassigned {
        /// Affected plan.
        plan_id: PlanId,
        /// Stops left unserved.
        stops: Vec<StopId>,
    },
    /// Re-planning failed outright.
    ReoptimizationFailed {
        /// Affected plan.
        plan_id: PlanId,
        /// Failure detail.
        message: String,
    },
}

/// Receiver of operator notifications.
pub trait AlertSink: Send + Sync {
    /// Deliver an alert. Must not block for long; callers sit on hot paths.
    fn notify(&self, alert: Alert);
}

/// Sink that writes alerts to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, alert: Alert) {
        match alert {
            Alert::RouteDeviation {
                vehicle_id,
                plan_id,
                deviation,
            } => log::warn!("vehicle {vehicle_id} deviated from plan {plan_id}: {deviation:?}"),
            Alert::StopsUnassigned { plan_id, stops } => {
                log::warn!("plan {plan_id} left {} stop(s) unassigned", stops.len());
            }
            Alert::ReoptimizationFailed { plan_id, message } => {
                log::error!("re-optimization of plan {plan_id} failed: {message}");
            }
        }
    }
}
