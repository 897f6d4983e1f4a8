//! OSRM Table service response body.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#table-service>

use serde::Deserialize;

/// OSRM Table API response.
///
/// `durations` is present when `code` is `"Ok"`; otherwise `message`
/// usually explains the failure.
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    /// Status code such as `"Ok"`, `"InvalidQuery"` or `"NoTable"`.
    pub code: String,

    /// Failure detail.
    pub message: Option<String>,

    /// `durations[i][j]` is the driving time in seconds from source `i` to
    /// destination `j`, or `None` when no route exists.
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

impl TableResponse {
    /// Whether OSRM reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}
