//! Identifier newtypes for fleet entities.
//!
//! Identifiers are opaque strings issued by the fleet roster and the order
//! source. They order lexicographically, which the optimizer relies on when
//! breaking ties between equally cheap insertions.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a vehicle in the fleet roster.
    ///
    /// # Examples
    /// ```
    /// use truckify_core::VehicleId;
    ///
    /// let id = VehicleId::from("V1");
    /// assert_eq!(id.as_str(), "V1");
    /// assert_eq!(id.to_string(), "V1");
    /// ```
    VehicleId
);

string_id!(
    /// Identifier of a stop submitted to a planning run.
    StopId
);

string_id!(
    /// Identifier of a plan covering a fixed set of vehicles.
    PlanId
);

string_id!(
    /// Identifier of the depot that pending orders are grouped under.
    DepotId
);
