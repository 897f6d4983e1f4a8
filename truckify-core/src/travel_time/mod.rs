//! Pairwise travel times between coordinates.
//!
//! The [`TravelTimeProvider`] trait abstracts road-network routing. Callers
//! pass a slice of coordinates and receive a square matrix of [`Duration`]
//! values. [`Duration::MAX`] marks a pair with no path; the optimizer treats
//! such legs as infeasible.
//!
//! [`HaversineTravelTimeProvider`] is the deterministic fallback used when no
//! routing service is configured.
//!
//! [`Duration`]: std::time::Duration
//! [`Duration::MAX`]: std::time::Duration::MAX

mod error;
mod haversine;
mod provider;

pub use error::TravelTimeError;
pub use haversine::{DEFAULT_AVERAGE_SPEED_KMH, HaversineTravelTimeProvider};
pub use provider::{TravelTimeMatrix, TravelTimeProvider, validate_matrix};
