//! # aerfeed - Now-Playing Feed Client for AetherRadio
//!
//! `aerfeed` keeps an AetherRadio client in sync with what a station is
//! broadcasting. It maintains a long-lived streaming connection to the
//! station's push feed, decodes the three envelope shapes the service emits,
//! and exposes the resulting state through a watch-based store.
//!
//! ## Features
//!
//! - **Push Feed Client**: Long-lived streaming connection with automatic
//!   reconnection and stale-session suppression
//! - **Protocol Normalization**: The legacy handshake, the multiplexed
//!   handshake and steady-state publications all collapse into one snapshot
//!   model
//! - **Elapsed Clock**: Local 1 Hz progress ticker, overwritten whenever the
//!   server sends an authoritative correction
//! - **Connectivity Gating**: Reconnects park on a pluggable reachability
//!   probe instead of retrying against a dead network
//!
//! ## Quick Start
//!
//! ```no_run
//! use aerfeed::{AlwaysOnline, ElapsedClock, NowPlayingStore, StationFeedClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = NowPlayingStore::new();
//!     let _clock = ElapsedClock::start(store.clone());
//!
//!     let client = StationFeedClient::new(
//!         "https://radio.example/api/live/nowplaying/websocket",
//!         store.clone(),
//!         Arc::new(AlwaysOnline),
//!     )?;
//!     client.connect();
//!
//!     let mut updates = store.subscribe();
//!     while updates.changed().await.is_ok() {
//!         if let Some(snapshot) = &updates.borrow().snapshot {
//!             if let Some(song) = &snapshot.song {
//!                 println!("{} - {}", song.artist, song.title);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`client`]: Streaming connection, reconnect supervisor, generation gate
//! - [`protocol`]: Wire envelope decoding and normalization
//! - [`store`]: Watch-backed shared state
//! - [`clock`]: Local elapsed-time ticker
//! - [`connectivity`]: Reachability probes
//! - [`models`]: Normalized domain types
//! - [`error`]: Error types and result alias

pub mod client;
pub mod clock;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod protocol;
pub mod store;

// Re-exports for convenience
pub use client::{StationFeedClient, RECONNECT_DELAY};
pub use clock::ElapsedClock;
pub use connectivity::{AlwaysOnline, ConnectivityProbe, NetworkMonitor};
pub use error::{Error, Result};
pub use models::{
    ConnectionState, NowPlayingSnapshot, Song, SongHistoryEntry, Station, HISTORY_WINDOW,
};
pub use protocol::{Envelope, FeedUpdate};
pub use store::{NowPlayingStore, StoreState};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
