//! Station sync stream client
//!
//! Triggers a library sync on the station's admin API and follows its
//! progress over the streamed NDJSON response. At most one sync runs at a
//! time: starting a new one aborts the previous via its cancellation token.

use crate::error::{Error, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Progress lines worth surfacing. Everything else is per-item noise
/// ("Skipping...", "Processing query...", "Nothing to delete").
const INTERESTING: &[&str] = &[
    "Started",
    "Finished",
    "Complete",
    "Error",
    "Imported",
    "Deleted",
    "Playlist",
];

/// What to synchronize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    /// Full station library sync.
    All,
    /// Sync of a single playlist.
    Playlist(String),
}

#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(rename = "pub")]
    publication: Option<RawMessage>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message: Option<String>,
}

/// Client for the admin sync endpoint.
pub struct SyncStreamClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    active: Mutex<Option<CancellationToken>>,
}

impl SyncStreamClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
            active: Mutex::new(None),
        })
    }

    fn endpoint(&self, target: &SyncTarget) -> Result<Url> {
        let path = match target {
            SyncTarget::All => "api/admin/sync".to_string(),
            SyncTarget::Playlist(id) => format!("api/admin/sync/playlist/{id}"),
        };
        Ok(self.base_url.join(&path)?)
    }

    /// Registers a fresh token as the active sync, aborting any prior one.
    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            debug!("Aborting previous sync in favor of a new one");
            previous.cancel();
        }
        token
    }

    fn finish(&self, token: &CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        // A replacement always cancels the token it displaces, so an
        // uncancelled token is still the registered one.
        if !token.is_cancelled() {
            *active = None;
        }
    }

    /// Aborts the running sync, if any. Idempotent.
    pub fn abort(&self) {
        if let Some(token) = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }

    /// Runs a sync to completion and returns the interesting progress lines.
    ///
    /// A 4xx status other than 429 aborts the operation with
    /// [`Error::Rejected`]; nothing in here retries automatically.
    pub async fn run(&self, target: SyncTarget) -> Result<Vec<String>> {
        let token = self.begin();
        let result = self.run_inner(&target, &token).await;
        self.finish(&token);
        match &result {
            Ok(lines) => info!(?target, lines = lines.len(), "Sync finished"),
            Err(Error::Aborted) => debug!(?target, "Sync aborted"),
            Err(e) => warn!(?target, error = %e, "Sync failed"),
        }
        result
    }

    async fn run_inner(
        &self,
        target: &SyncTarget,
        token: &CancellationToken,
    ) -> Result<Vec<String>> {
        let url = self.endpoint(target)?;
        info!(url = %url, "Starting station sync");

        let mut request = self.http.post(url);
        if let Some(bearer) = &self.token {
            request = request.bearer_auth(bearer);
        }

        let response = tokio::select! {
            _ = token.cancelled() => return Err(Error::Aborted),
            response = request.send() => response?,
        };

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let mut stream = response.bytes_stream();
        let mut frames = FrameBuffer::new();
        let mut lines = Vec::new();
        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => return Err(Error::Aborted),
                chunk = stream.next() => chunk,
            };
            let chunk = match chunk {
                Some(chunk) => chunk?,
                None => break,
            };
            for line in frames.push(&chunk) {
                if let Some(message) = extract_message(&line) {
                    if is_interesting(&message) {
                        info!(message = %message, "Sync progress");
                        lines.push(message);
                    } else {
                        debug!(message = %message, "Sync progress (filtered)");
                    }
                }
            }
        }
        Ok(lines)
    }
}

/// Largest progress line the framer will buffer while waiting for `\n`.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Accumulates response chunks and yields complete newline-terminated lines.
///
/// A line that exceeds [`MAX_FRAME_BYTES`] without a terminator is discarded
/// once its newline finally arrives, bounding memory against a misbehaving
/// endpoint.
struct FrameBuffer {
    buf: Vec<u8>,
    discarding: bool,
}

impl FrameBuffer {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            lines.push(String::from_utf8_lossy(&raw[..pos]).into_owned());
        }
        if self.buf.len() > MAX_FRAME_BYTES {
            warn!(bytes = self.buf.len(), "Dropping oversized progress line");
            self.buf.clear();
            self.discarding = true;
        }
        lines
    }
}

/// Pulls the human-readable message out of one response line.
///
/// Accepts `{"pub":{"message":...}}`, `{"message":...}`, or a bare text
/// line. Empty lines yield nothing.
fn extract_message(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<RawLine>(line) {
        Ok(raw) => raw
            .publication
            .and_then(|p| p.message)
            .or(raw.message)
            .filter(|m| !m.trim().is_empty()),
        Err(_) => Some(line.to_string()),
    }
}

fn is_interesting(message: &str) -> bool {
    INTERESTING.iter().any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_wrapped_and_bare_messages() {
        assert_eq!(
            extract_message(r#"{"pub":{"message":"Sync Started"}}"#).as_deref(),
            Some("Sync Started")
        );
        assert_eq!(
            extract_message(r#"{"message":"Imported 3 tracks"}"#).as_deref(),
            Some("Imported 3 tracks")
        );
        assert_eq!(
            extract_message("Playlist refresh Complete").as_deref(),
            Some("Playlist refresh Complete")
        );
        assert_eq!(extract_message("   "), None);
    }

    #[test]
    fn noise_lines_are_filtered() {
        assert!(!is_interesting("Skipping track 15 of 900"));
        assert!(!is_interesting("Processing query batch 4"));
        assert!(!is_interesting("Nothing to delete"));
        assert!(is_interesting("Imported 12 new tracks"));
        assert!(is_interesting("Sync Finished"));
    }

    #[test]
    fn oversized_progress_lines_are_dropped() {
        let mut frames = FrameBuffer::new();
        assert!(frames.push(&vec![b'x'; MAX_FRAME_BYTES + 1]).is_empty());
        let lines = frames.push(b"more-garbage\nSync Finished\n");
        assert_eq!(lines, vec!["Sync Finished".to_string()]);
    }

    #[test]
    fn playlist_target_builds_the_scoped_path() {
        let client = SyncStreamClient::new("https://radio.example/", None).unwrap();
        let url = client
            .endpoint(&SyncTarget::Playlist("morning-mix".into()))
            .unwrap();
        assert_eq!(url.path(), "/api/admin/sync/playlist/morning-mix");
    }
}
