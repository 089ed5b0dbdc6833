//! Domain model for the now-playing feed
//!
//! These types are the normalized view handed to consumers. The raw wire
//! shapes live in [`crate::protocol`]; nothing outside the normalization
//! step mutates a snapshot field-by-field.

use serde::{Deserialize, Serialize};

/// Number of history entries retained in a snapshot (most-recent-first).
pub const HISTORY_WINDOW: usize = 5;

/// Broadcast source identity. Refreshed wholesale on each server snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Station {
    pub name: String,
    /// Audio stream URL, when the server advertises one.
    pub listen_url: Option<String>,
}

/// Currently playing track. Replaced, never field-patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub art: Option<String>,
    pub album: Option<String>,
}

/// One row of the recent-songs window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongHistoryEntry {
    pub id: u64,
    pub song: Song,
}

/// Authoritative server-confirmed now-playing state.
///
/// Invariant: `elapsed <= duration` whenever `duration > 0`. The server may
/// violate this transiently; [`NowPlayingSnapshot::clamped`] restores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NowPlayingSnapshot {
    pub station: Station,
    pub song: Option<Song>,
    /// Elapsed seconds into the current track.
    pub elapsed: u64,
    /// Track length in seconds; 0 means unknown-length stream.
    pub duration: u64,
    /// Most-recent-first, bounded to [`HISTORY_WINDOW`] entries.
    pub song_history: Vec<SongHistoryEntry>,
}

impl NowPlayingSnapshot {
    /// Enforce the elapsed/duration invariant and the history bound.
    pub fn clamped(mut self) -> Self {
        if self.duration > 0 && self.elapsed > self.duration {
            self.elapsed = self.duration;
        }
        self.song_history.truncate(HISTORY_WINDOW);
        self
    }
}

/// Connection lifecycle of the feed client.
///
/// Owned exclusively by the client; the store holds a read-only mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Returns a human-readable label for the connection state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_caps_elapsed_at_duration() {
        let snap = NowPlayingSnapshot {
            elapsed: 250,
            duration: 200,
            ..Default::default()
        }
        .clamped();
        assert_eq!(snap.elapsed, 200);
    }

    #[test]
    fn clamp_leaves_unknown_length_streams_alone() {
        let snap = NowPlayingSnapshot {
            elapsed: 37,
            duration: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(snap.elapsed, 37);
    }

    #[test]
    fn clamp_bounds_history_window() {
        let entry = |id| SongHistoryEntry {
            id,
            song: Song::default(),
        };
        let snap = NowPlayingSnapshot {
            song_history: (0..8).map(entry).collect(),
            ..Default::default()
        }
        .clamped();
        assert_eq!(snap.song_history.len(), HISTORY_WINDOW);
        assert_eq!(snap.song_history[0].id, 0);
    }
}
