//! Test-only utilities for `truckify-solver`.
//!
//! The helpers in this module are available to unit tests and behavioural
//! tests. They are gated behind the `test-support` feature (and `cfg(test)`).

use std::time::Duration;

use geo::Coord;
use truckify_core::{TravelTimeError, TravelTimeMatrix, TravelTimeProvider};

/// A [`TravelTimeProvider`] returning a fixed, pre-defined matrix.
///
/// The optimizer requests nodes in the order: available vehicles, stops,
/// depot. Fixtures must lay the matrix out the same way. A dimension
/// mismatch produces a [`TravelTimeError::ServiceError`] with code
/// `DIMENSION_MISMATCH`.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use truckify_core::TravelTimeProvider;
/// use truckify_solver::test_support::FixedMatrixTravelTimeProvider;
///
/// let provider = FixedMatrixTravelTimeProvider::from_seconds(vec![vec![0, 60], vec![60, 0]]);
/// let points = [Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }];
/// assert!(provider.get_travel_time_matrix(&points).is_ok());
/// assert!(provider.get_travel_time_matrix(&points[..1]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FixedMatrixTravelTimeProvider {
    matrix: TravelTimeMatrix,
}

impl FixedMatrixTravelTimeProvider {
    /// Construct a provider from a pre-built travel time matrix.
    #[must_use]
    pub const fn new(matrix: TravelTimeMatrix) -> Self {
        Self { matrix }
    }

    /// Build from integer seconds. `None` cells are unreachable.
    #[must_use]
    pub fn from_optional_seconds(seconds: Vec<Vec<Option<u64>>>) -> Self {
        let matrix = seconds
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map_or(Duration::MAX, Duration::from_secs))
                    .collect()
            })
            .collect();
        Self { matrix }
    }

    /// Build from integer seconds for convenience in test fixtures.
    #[must_use]
    pub fn from_seconds(seconds: Vec<Vec<u64>>) -> Self {
        let matrix = seconds
            .into_iter()
            .map(|row| row.into_iter().map(Duration::from_secs).collect())
            .collect();
        Self { matrix }
    }
}

impl TravelTimeProvider for FixedMatrixTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        if points.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        let expected_dim = points.len();
        if self.matrix.len() != expected_dim {
            return Err(TravelTimeError::ServiceError {
                code: "DIMENSION_MISMATCH".to_owned(),
                message: format!(
                    "matrix has {} rows but {} points provided",
                    self.matrix.len(),
                    expected_dim
                ),
            });
        }
        if let Some((row_idx, row)) = self
            .matrix
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != expected_dim)
        {
            return Err(TravelTimeError::ServiceError {
                code: "DIMENSION_MISMATCH".to_owned(),
                message: format!(
                    "row {row_idx} has {} columns but {expected_dim} expected",
                    row.len()
                ),
            });
        }
        Ok(self.matrix.clone())
    }
}
