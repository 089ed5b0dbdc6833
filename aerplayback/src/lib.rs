//! # aerplayback - Local Stream Playback for AetherRadio
//!
//! `aerplayback` turns the station's listen URL into audible audio. It owns
//! the playback state machine, the volume/mute handling, and the audio
//! device itself.
//!
//! The device is dependency-injected: production wires in [`RodioOutput`]
//! (rodio sink on a dedicated OS thread), tests and headless builds provide
//! their own [`AudioOutput`]. A [`CastTransport`] can be attached to hand the
//! stream to a remote endpoint instead.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aerfeed::NowPlayingStore;
//! use aerplayback::{PlaybackController, RodioOutput};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = NowPlayingStore::new();
//!     let device = Arc::new(RodioOutput::new()?);
//!     let controller = PlaybackController::new(device, store, None);
//!
//!     controller.set_volume(0.8)?;
//!     controller.play().await?;
//!     Ok(())
//! }
//! ```

pub mod cast;
pub mod controller;
pub mod device;
pub mod error;
pub mod rodio_output;

// Re-exports for convenience
pub use cast::CastTransport;
pub use controller::{PlaybackController, PlayerState};
pub use device::AudioOutput;
pub use error::{Error, Result};
pub use rodio_output::RodioOutput;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
