//! Remote playback facade
//!
//! When a cast session is active the controller hands the stream to the
//! remote endpoint instead of the local device. The transport itself
//! (discovery, session setup) lives in the platform layer; this crate only
//! needs somewhere to forward start/stop/volume.

use crate::error::Result;

/// A remote playback endpoint the controller can hand the stream to.
pub trait CastTransport: Send + Sync {
    /// Starts playing `url` on the remote endpoint.
    fn start(&self, url: &str) -> Result<()>;

    /// Stops remote playback.
    fn stop(&self) -> Result<()>;

    /// Forwards a volume change to the remote endpoint.
    fn set_volume(&self, volume: f32) -> Result<()>;
}
