use thiserror::Error;

/// Errors from [`crate::travel_time::TravelTimeProvider::get_travel_time_matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelTimeError {
    /// No coordinates were provided.
    #[error("at least one coordinate is required")]
    EmptyInput,

    /// The request to the routing service timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// URL that was requested.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The routing service answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    HttpError {
        /// URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },

    /// The routing service could not be reached.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// URL that was requested.
        url: String,
        /// Error detail.
        message: String,
    },

    /// The routing service rejected the request.
    #[error("routing service error {code}: {message}")]
    ServiceError {
        /// Service-specific error code.
        code: String,
        /// Error detail.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Error detail.
        message: String,
    },

    /// The provider returned a matrix of the wrong shape.
    #[error("expected a {expected}x{expected} matrix, got {rows} rows")]
    MalformedMatrix {
        /// Number of coordinates requested.
        expected: usize,
        /// Rows actually returned.
        rows: usize,
    },
}
