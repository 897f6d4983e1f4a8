//! Travel-time provider trait and adjacency-matrix alias.

use std::time::Duration;

use geo::Coord;

use super::error::TravelTimeError;

/// Adjacency matrix of travel times.
pub type TravelTimeMatrix = Vec<Vec<Duration>>;

/// Fetch pairwise travel times for a set of coordinates.
///
/// Implementers must return a square `n×n` matrix where
/// `n == points.len()`. `matrix[i][j]` is the travel time from `points[i]` to
/// `points[j]`, and [`Duration::MAX`] means `j` cannot be reached from `i`.
/// Providers must be `Send + Sync` so a single instance can serve concurrent
/// re-optimization runs.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use geo::Coord;
/// use truckify_core::{TravelTimeError, TravelTimeMatrix, TravelTimeProvider};
///
/// struct TenSeconds;
///
/// impl TravelTimeProvider for TenSeconds {
///     fn get_travel_time_matrix(
///         &self,
///         points: &[Coord<f64>],
///     ) -> Result<TravelTimeMatrix, TravelTimeError> {
///         if points.is_empty() {
///             return Err(TravelTimeError::EmptyInput);
///         }
///         let n = points.len();
///         Ok((0..n)
///             .map(|i| {
///                 (0..n)
///                     .map(|j| if i == j { Duration::ZERO } else { Duration::from_secs(10) })
///                     .collect()
///             })
///             .collect())
///     }
/// }
///
/// let leg = TenSeconds.travel_time(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })?;
/// assert_eq!(leg, Duration::from_secs(10));
/// # Ok::<(), TravelTimeError>(())
/// ```
pub trait TravelTimeProvider: Send + Sync {
    /// Return a matrix of travel times for `points`.
    ///
    /// Implementations must return `Err(TravelTimeError::EmptyInput)` when
    /// `points` is empty.
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError>;

    /// Travel time for a single directed leg.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and reports a malformed matrix when the
    /// provider does not return a 2×2 answer.
    fn travel_time(&self, from: Coord<f64>, to: Coord<f64>) -> Result<Duration, TravelTimeError> {
        let matrix = self.get_travel_time_matrix(&[from, to])?;
        validate_matrix(&matrix, 2)?;
        matrix
            .first()
            .and_then(|row| row.get(1))
            .copied()
            .ok_or(TravelTimeError::MalformedMatrix {
                expected: 2,
                rows: matrix.len(),
            })
    }
}

impl<T: TravelTimeProvider + ?Sized> TravelTimeProvider for &T {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        (**self).get_travel_time_matrix(points)
    }
}

impl<T: TravelTimeProvider + ?Sized> TravelTimeProvider for std::sync::Arc<T> {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        (**self).get_travel_time_matrix(points)
    }
}

/// Check that `matrix` is `expected × expected`.
///
/// # Errors
///
/// Returns [`TravelTimeError::MalformedMatrix`] on any shape mismatch.
pub fn validate_matrix(matrix: &TravelTimeMatrix, expected: usize) -> Result<(), TravelTimeError> {
    if matrix.len() == expected && matrix.iter().all(|row| row.len() == expected) {
        Ok(())
    } else {
        Err(TravelTimeError::MalformedMatrix {
            expected,
            rows: matrix.len(),
        })
    }
}
