//! Error types for the library collaborators

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the library service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A mutation was attempted without a signed-in session
    #[error("No active session")]
    NoSession,

    /// The service rejected the request
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
