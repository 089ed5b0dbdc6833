//! Wire protocol of the now-playing push feed
//!
//! The broadcast service delivers newline-delimited JSON frames in one of
//! three envelope shapes (two historical handshake formats plus the
//! steady-state publication). This module decodes each shape into the tagged
//! [`Envelope`] union and normalizes it into [`FeedUpdate`] deltas, so the
//! rest of the engine never sees the raw shapes.
//!
//! A frame whose trimmed body is a single `.` is a keepalive: it produces no
//! envelope, no state change, and no error.

use crate::error::{Error, Result};
use crate::models::{NowPlayingSnapshot, Song, SongHistoryEntry, Station};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Body of a heartbeat frame.
pub const HEARTBEAT: &str = ".";

// ============================================================================
// RAW WIRE SHAPES
// ============================================================================

/// Deserialize a string or number into a u64
fn deserialize_string_or_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        String(String),
        Number(u64),
        Float(f64),
    }

    match StringOrU64::deserialize(deserializer)? {
        StringOrU64::String(s) => s.parse::<u64>().map_err(D::Error::custom),
        StringOrU64::Number(n) => Ok(n),
        StringOrU64::Float(f) => Ok(f.max(0.0) as u64),
    }
}

/// Deserialize an optional string or number into Option<u64>
fn deserialize_opt_string_or_u64<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        String(String),
        Number(u64),
        Float(f64),
    }

    match Option::<StringOrU64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrU64::String(s)) => {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<u64>().map(Some).map_err(D::Error::custom)
            }
        }
        Some(StringOrU64::Number(n)) => Ok(Some(n)),
        Some(StringOrU64::Float(f)) => Ok(Some(f.max(0.0) as u64)),
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    connect: Option<RawConnect>,
    #[serde(rename = "pub")]
    publication: Option<RawPublication>,
}

#[derive(Debug, Deserialize)]
struct RawConnect {
    /// Server clock in milliseconds (multiplexed handshake only).
    #[serde(default, deserialize_with = "deserialize_opt_string_or_u64")]
    time: Option<u64>,
    /// Legacy handshake: initial batch of rows.
    data: Option<Vec<RawPayload>>,
    /// Multiplexed handshake: per-subscription backlog.
    subs: Option<HashMap<String, RawSubscription>>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    #[serde(default)]
    publications: Vec<RawPublication>,
}

#[derive(Debug, Deserialize)]
struct RawPublication {
    data: Option<RawPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct RawPayload {
    /// Authoritative elapsed-time correction, in seconds.
    #[serde(default, deserialize_with = "deserialize_opt_string_or_u64")]
    current_time: Option<u64>,
    /// Full now-playing object, replacing the snapshot when present.
    np: Option<RawNowPlaying>,
}

#[derive(Debug, Deserialize)]
struct RawNowPlaying {
    station: Option<RawStation>,
    now_playing: Option<RawCurrent>,
    #[serde(default)]
    song_history: Vec<RawHistoryRow>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    name: Option<String>,
    listen_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCurrent {
    #[serde(default, deserialize_with = "deserialize_string_or_u64")]
    elapsed: u64,
    #[serde(default, deserialize_with = "deserialize_string_or_u64")]
    duration: u64,
    song: Option<RawSong>,
}

#[derive(Debug, Deserialize)]
struct RawSong {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    art: Option<String>,
    album: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryRow {
    #[serde(default, deserialize_with = "deserialize_opt_string_or_u64")]
    sh_id: Option<u64>,
    song: Option<RawSong>,
}

// ============================================================================
// TAGGED ENVELOPE
// ============================================================================

/// Normalized per-frame payload: the two optional pieces a row can carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    /// Elapsed-time correction in seconds.
    pub current_time: Option<u64>,
    /// Wholesale snapshot replacement.
    pub now_playing: Option<NowPlayingSnapshot>,
}

/// The three wire shapes, decoded into an explicit sum type.
///
/// Shape sniffing ends here: every consumer matches on this enum, and a frame
/// matching none of the variants is a decode error, not a silently ignored
/// object.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Legacy handshake: `{"connect":{"data":[...]}}`
    ConnectData { rows: Vec<Payload> },
    /// Multiplexed handshake: `{"connect":{"time":ms,"subs":{...}}}`
    ConnectSubs {
        /// Server clock in milliseconds, when sent.
        server_time_ms: Option<u64>,
        rows: Vec<Payload>,
    },
    /// Steady-state publication: `{"pub":{"data":{...}}}`
    Publication { payload: Payload },
}

/// A single normalized state delta produced from an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Replace the whole snapshot.
    Snapshot(NowPlayingSnapshot),
    /// Overwrite the elapsed counter (server truth wins, no blending).
    ClockSync { elapsed: u64 },
}

impl From<RawSong> for Song {
    fn from(raw: RawSong) -> Self {
        Song {
            title: raw.title,
            artist: raw.artist,
            art: raw.art,
            album: raw.album,
        }
    }
}

impl RawNowPlaying {
    fn normalize(self) -> NowPlayingSnapshot {
        let station = match self.station {
            Some(s) => Station {
                name: s.name.unwrap_or_default(),
                listen_url: s.listen_url.filter(|u| !u.trim().is_empty()),
            },
            None => Station::default(),
        };

        let (elapsed, duration, song) = match self.now_playing {
            Some(current) => (current.elapsed, current.duration, current.song.map(Song::from)),
            None => (0, 0, None),
        };

        let song_history = self
            .song_history
            .into_iter()
            .filter_map(|row| {
                let song = row.song?;
                Some(SongHistoryEntry {
                    id: row.sh_id.unwrap_or_default(),
                    song: song.into(),
                })
            })
            .collect();

        NowPlayingSnapshot {
            station,
            song,
            elapsed,
            duration,
            song_history,
        }
        .clamped()
    }
}

impl RawPayload {
    fn normalize(self) -> Payload {
        Payload {
            current_time: self.current_time,
            now_playing: self.np.map(RawNowPlaying::normalize),
        }
    }
}

impl RawPublication {
    fn normalize(self) -> Option<Payload> {
        self.data.map(RawPayload::normalize)
    }
}

/// Decode one frame body into an envelope.
///
/// Returns `Ok(None)` for heartbeat and empty frames. A body that is valid
/// JSON but matches none of the three shapes yields
/// [`Error::UnrecognizedEnvelope`]; JSON syntax errors surface as
/// [`Error::Json`]. Either way the caller drops the frame and keeps the
/// connection alive.
pub fn parse_frame(body: &str) -> Result<Option<Envelope>> {
    let body = body.trim();
    if body.is_empty() || body == HEARTBEAT {
        return Ok(None);
    }

    let frame: RawFrame = serde_json::from_str(body)?;

    if let Some(connect) = frame.connect {
        if let Some(subs) = connect.subs {
            let rows = subs
                .into_values()
                .flat_map(|sub| sub.publications)
                .filter_map(RawPublication::normalize)
                .collect();
            return Ok(Some(Envelope::ConnectSubs {
                server_time_ms: connect.time,
                rows,
            }));
        }
        let rows = connect
            .data
            .unwrap_or_default()
            .into_iter()
            .map(RawPayload::normalize)
            .collect();
        return Ok(Some(Envelope::ConnectData { rows }));
    }

    if let Some(publication) = frame.publication {
        let payload = publication.normalize().unwrap_or_default();
        return Ok(Some(Envelope::Publication { payload }));
    }

    Err(Error::UnrecognizedEnvelope(truncate_for_log(body)))
}

impl Envelope {
    /// Flatten the envelope into ordered state deltas.
    ///
    /// Ordering encodes the precedence rule: the most recently received
    /// elapsed value is authoritative, so clock corrections are emitted after
    /// the snapshots they accompany. Handshake rows never contribute
    /// `current_time` (the handshake clock is the millisecond `time` field);
    /// steady-state publications contribute both.
    pub fn into_updates(self) -> Vec<FeedUpdate> {
        let mut updates = Vec::new();
        match self {
            Envelope::ConnectData { rows } => {
                for row in rows {
                    if let Some(np) = row.now_playing {
                        updates.push(FeedUpdate::Snapshot(np));
                    }
                }
            }
            Envelope::ConnectSubs {
                server_time_ms,
                rows,
            } => {
                for row in rows {
                    if let Some(np) = row.now_playing {
                        updates.push(FeedUpdate::Snapshot(np));
                    }
                }
                if let Some(ms) = server_time_ms {
                    updates.push(FeedUpdate::ClockSync { elapsed: ms / 1000 });
                }
            }
            Envelope::Publication { payload } => {
                if let Some(np) = payload.now_playing {
                    updates.push(FeedUpdate::Snapshot(np));
                }
                if let Some(elapsed) = payload.current_time {
                    updates.push(FeedUpdate::ClockSync { elapsed });
                }
            }
        }
        updates
    }
}

fn truncate_for_log(body: &str) -> String {
    const MAX: usize = 120;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}
