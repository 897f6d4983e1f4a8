use thiserror::Error;
use truckify_core::{OptimizeError, PlanId, VehicleId};

/// Errors returned by [`crate::FleetService::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A requested vehicle is not on the roster.
    #[error("vehicle {0} is not on the roster")]
    UnknownVehicle(VehicleId),
    /// A requested vehicle already drives another active plan.
    #[error("vehicle {vehicle_id} is already assigned to plan {plan_id}")]
    VehicleOnAnotherPlan {
        /// Vehicle in conflict.
        vehicle_id: VehicleId,
        /// Plan currently holding it.
        plan_id: PlanId,
    },
    /// Stops were requested by depot but no stop source is configured.
    #[error("no stop source is configured")]
    NoStopSource,
    /// The optimizer rejected the request or could not fetch travel times.
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}
