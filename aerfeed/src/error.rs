//! Error types for the now-playing feed client

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while consuming the now-playing feed
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

    /// Frame decoded as JSON but matched none of the known envelope shapes
    #[error("Unrecognized envelope shape: {0}")]
    UnrecognizedEnvelope(String),

    /// Server closed the stream (clean EOF is still a transport interruption)
    #[error("Feed stream closed by server")]
    StreamClosed,
}
