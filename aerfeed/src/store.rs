//! Shared now-playing state store
//!
//! Single writer-side entry point for server snapshots, clock corrections,
//! connection transitions and local playback flags. Consumers read through
//! [`NowPlayingStore::subscribe`] watch receivers; reads never block behind a
//! slow consumer and a receiver always observes the latest state.

use crate::models::{ConnectionState, NowPlayingSnapshot};
use aerconfig::Config;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Everything a consumer can observe about the engine, as one value.
///
/// Replaced atomically on every change; there is no field-level patching
/// across updates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreState {
    /// Latest server-confirmed snapshot, if any arrived since connect.
    pub snapshot: Option<NowPlayingSnapshot>,
    pub connection: ConnectionState,
    /// Local playback flag, owned by the playback controller.
    pub is_playing: bool,
    /// Current volume in `[0, 1]`.
    pub volume: f32,
}

/// Thread-safe now-playing store backed by a watch channel.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct NowPlayingStore {
    tx: watch::Sender<StoreState>,
    config: Option<Arc<Config>>,
}

impl NowPlayingStore {
    /// Creates a store with no persistence backing (volume starts at 1.0).
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StoreState {
            volume: 1.0,
            ..Default::default()
        });
        Self { tx, config: None }
    }

    /// Creates a store whose volume is read from and persisted to `config`.
    pub fn with_config(config: Arc<Config>) -> Self {
        let (tx, _) = watch::channel(StoreState {
            volume: config.get_playback_volume(),
            ..Default::default()
        });
        Self {
            tx,
            config: Some(config),
        }
    }

    /// Subscribes to state changes.
    ///
    /// The receiver is primed with the current state and is notified on every
    /// subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> StoreState {
        self.tx.borrow().clone()
    }

    /// Returns the current snapshot, if any.
    pub fn snapshot(&self) -> Option<NowPlayingSnapshot> {
        self.tx.borrow().snapshot.clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.tx.borrow().connection
    }

    pub fn is_playing(&self) -> bool {
        self.tx.borrow().is_playing
    }

    pub fn volume(&self) -> f32 {
        self.tx.borrow().volume
    }

    /// Replaces the snapshot wholesale with fresh server data.
    pub fn apply_snapshot(&self, snapshot: NowPlayingSnapshot) {
        let snapshot = snapshot.clamped();
        debug!(
            station = %snapshot.station.name,
            song = snapshot.song.as_ref().map(|s| s.title.as_str()),
            elapsed = snapshot.elapsed,
            duration = snapshot.duration,
            "Applying now-playing snapshot"
        );
        self.tx.send_modify(|state| state.snapshot = Some(snapshot));
    }

    /// Overwrites the elapsed counter with a server correction.
    ///
    /// Server time is authoritative: the value replaces whatever the local
    /// ticker accumulated, in either direction. No-op when no snapshot is
    /// held yet.
    pub fn sync_elapsed(&self, elapsed: u64) {
        self.tx.send_if_modified(|state| {
            let Some(snapshot) = state.snapshot.as_mut() else {
                return false;
            };
            let corrected = if snapshot.duration > 0 {
                elapsed.min(snapshot.duration)
            } else {
                elapsed
            };
            if snapshot.elapsed == corrected {
                return false;
            }
            snapshot.elapsed = corrected;
            true
        });
    }

    /// Advances the elapsed counter by one second.
    ///
    /// Only counts while a finite track is in progress: `duration > 0` and
    /// `elapsed < duration`. Unknown-length streams and completed tracks wait
    /// for the next server snapshot instead.
    pub fn tick(&self) {
        self.tx.send_if_modified(|state| {
            let Some(snapshot) = state.snapshot.as_mut() else {
                return false;
            };
            if snapshot.duration > 0 && snapshot.elapsed < snapshot.duration {
                snapshot.elapsed += 1;
                true
            } else {
                false
            }
        });
    }

    /// Records a connection lifecycle transition.
    pub fn set_connection(&self, connection: ConnectionState) {
        self.tx.send_if_modified(|state| {
            if state.connection == connection {
                return false;
            }
            debug!(from = state.connection.as_str(), to = connection.as_str(),
                "Connection state change");
            state.connection = connection;
            true
        });
    }

    /// Drops the held snapshot (stale data must not survive a disconnect).
    pub fn clear(&self) {
        self.tx.send_if_modified(|state| {
            if state.snapshot.is_none() {
                return false;
            }
            state.snapshot = None;
            true
        });
    }

    /// Records whether local playback is active.
    pub fn set_playing(&self, playing: bool) {
        self.tx.send_if_modified(|state| {
            if state.is_playing == playing {
                return false;
            }
            state.is_playing = playing;
            true
        });
    }

    /// Updates the volume, clamped to `[0, 1]`, and persists it when a
    /// configuration backing is attached.
    ///
    /// Persistence failures are logged and do not roll back the in-memory
    /// value.
    pub fn set_volume(&self, volume: f32) {
        let clamped = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.tx.send_if_modified(|state| {
            if state.volume == clamped {
                return false;
            }
            state.volume = clamped;
            true
        });
        if let Some(config) = &self.config {
            if let Err(e) = config.set_playback_volume(clamped) {
                warn!(error = %e, "Failed to persist playback volume");
            }
        }
    }
}

impl Default for NowPlayingStore {
    fn default() -> Self {
        Self::new()
    }
}
