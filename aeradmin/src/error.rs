//! Error types for the admin sync client

/// Result type alias for admin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a station sync
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service refused the request; the operation must not be retried
    #[error("Sync rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The service asked us to back off
    #[error("Rate limited by the sync endpoint")]
    RateLimited,

    /// A newer sync superseded this one
    #[error("Sync aborted")]
    Aborted,
}
