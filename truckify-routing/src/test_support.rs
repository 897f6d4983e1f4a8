//! Deterministic stand-in for a routing service.

use std::time::Duration;

use geo::Coord;
use truckify_core::{TravelTimeError, TravelTimeMatrix, TravelTimeProvider};

/// Returns a canned matrix or error without touching the network.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use geo::Coord;
/// use truckify_core::TravelTimeProvider;
/// use truckify_routing::test_support::StubTravelTimeProvider;
///
/// let provider = StubTravelTimeProvider::with_uniform_matrix(2, Duration::from_secs(90));
/// let leg = provider.travel_time(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })?;
/// assert_eq!(leg, Duration::from_secs(90));
/// # Ok::<(), truckify_core::TravelTimeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StubTravelTimeProvider {
    response: StubResponse,
}

#[derive(Debug, Clone)]
enum StubResponse {
    Matrix(TravelTimeMatrix),
    Error(TravelTimeError),
}

impl StubTravelTimeProvider {
    /// Always answer with `matrix`, whatever the input size.
    #[must_use]
    pub const fn with_matrix(matrix: TravelTimeMatrix) -> Self {
        Self {
            response: StubResponse::Matrix(matrix),
        }
    }

    /// Always fail with `error` for non-empty input.
    #[must_use]
    pub const fn with_error(error: TravelTimeError) -> Self {
        Self {
            response: StubResponse::Error(error),
        }
    }

    /// `size × size` matrix with zero on the diagonal and `leg` elsewhere.
    #[must_use]
    pub fn with_uniform_matrix(size: usize, leg: Duration) -> Self {
        Self::with_matrix(
            (0..size)
                .map(|i| {
                    (0..size)
                        .map(|j| if i == j { Duration::ZERO } else { leg })
                        .collect()
                })
                .collect(),
        )
    }
}

impl TravelTimeProvider for StubTravelTimeProvider {
    fn get_travel_time_matrix(
        &self,
        points: &[Coord<f64>],
    ) -> Result<TravelTimeMatrix, TravelTimeError> {
        if points.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }

        match &self.response {
            StubResponse::Matrix(matrix) => Ok(matrix.clone()),
            StubResponse::Error(error) => Err(error.clone()),
        }
    }
}
