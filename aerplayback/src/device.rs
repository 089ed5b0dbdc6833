//! Audio output abstraction
//!
//! The playback controller drives this trait rather than a concrete audio
//! backend, so platform outputs and test doubles plug in behind the same
//! surface. The production implementation is [`crate::rodio_output::RodioOutput`].

use crate::error::Result;

/// A stream-playing audio device.
///
/// Implementations must be safe to call from any thread. Calls may block on
/// network or device I/O; async callers offload them accordingly.
pub trait AudioOutput: Send + Sync {
    /// Points the device at a stream URL. Does not start playback.
    fn set_source(&self, url: &str) -> Result<()>;

    /// Forgets the current source and discards any prepared stream.
    fn clear_source(&self) -> Result<()>;

    /// Prepares the current source for playback.
    fn load(&self) -> Result<()>;

    /// Starts or resumes playback of the current source.
    ///
    /// Returns only once audio is flowing or the attempt failed.
    fn play(&self) -> Result<()>;

    /// Pauses playback, keeping the source configured.
    fn pause(&self) -> Result<()>;

    /// Applies a volume in `[0, 1]`. Retained across source changes.
    fn set_volume(&self, volume: f32) -> Result<()>;

    /// The currently configured source URL, if any.
    fn source(&self) -> Option<String>;

    /// Whether audio is currently flowing.
    fn is_playing(&self) -> bool;
}
