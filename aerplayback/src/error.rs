//! Error types for local playback

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the audio output
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio device initialization or control failed
    #[error("Audio device error: {0}")]
    Device(String),

    /// Fetching the stream failed
    #[error("Stream fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The fetched stream could not be decoded as audio
    #[error("Audio decoding failed: {0}")]
    Decode(String),

    /// Playback was requested with no stream source configured
    #[error("No stream source configured")]
    NoSource,

    /// The audio thread is gone
    #[error("Audio thread unavailable: {0}")]
    Channel(String),
}

impl Error {
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }
}
