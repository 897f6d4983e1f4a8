//! Travel-time providers backed by a road routing service.
//!
//! [`HttpTravelTimeProvider`] implements
//! [`truckify_core::TravelTimeProvider`] on top of the OSRM Table API using
//! the `driving` profile. The synchronous trait is served by blocking on
//! async HTTP calls internally, so the optimizer stays runtime-agnostic.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use geo::Coord;
//! use truckify_core::TravelTimeProvider;
//! use truckify_routing::{HttpTravelTimeProvider, HttpTravelTimeProviderConfig};
//!
//! let config = HttpTravelTimeProviderConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("dispatch/1.0");
//! let provider = HttpTravelTimeProvider::with_config(config)?;
//!
//! let matrix = provider.get_travel_time_matrix(&[
//!     Coord { x: -0.1, y: 51.5 },
//!     Coord { x: -0.2, y: 51.6 },
//! ])?;
//! assert_eq!(matrix.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod osrm;
mod provider;

#[doc(hidden)]
pub mod test_support;

pub use provider::{
    DEFAULT_USER_AGENT, HttpTravelTimeProvider, HttpTravelTimeProviderConfig, ProviderBuildError,
};
