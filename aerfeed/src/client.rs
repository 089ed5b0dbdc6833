//! Streaming client for the now-playing push feed
//!
//! Owns the long-lived HTTP connection to the broadcast service, frames the
//! newline-delimited payloads, and feeds normalized updates into the
//! [`NowPlayingStore`]. A supervisor task handles the reconnect policy: a
//! fixed delay while the network is reachable, or parking on the
//! reachability probe while it is not.

use crate::connectivity::ConnectivityProbe;
use crate::error::{Error, Result};
use crate::models::ConnectionState;
use crate::protocol::{parse_frame, FeedUpdate};
use crate::store::NowPlayingStore;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("AetherRadio/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before retrying after a failed or interrupted connection.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Largest frame the line framer will buffer while waiting for `\n`.
const MAX_FRAME_BYTES: usize = 256 * 1024;

/// Accumulates stream chunks and yields complete newline-terminated lines.
///
/// A frame that exceeds [`MAX_FRAME_BYTES`] without a terminator is dropped
/// wholesale once its newline finally arrives, so a server streaming garbage
/// cannot grow the buffer without bound.
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
            warn!(bytes = self.buf.len(), "Dropping oversized feed frame");
            self.buf.clear();
            self.discarding = true;
        }
        lines
    }
}

struct Session {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct FeedInner {
    http: reqwest::Client,
    feed_url: Url,
    store: NowPlayingStore,
    probe: Arc<dyn ConnectivityProbe>,
    /// Bumped on every connection attempt and on disconnect. Updates carry
    /// the generation they were received under; a mismatch at apply time
    /// means the message belongs to a torn-down session and is dropped.
    generation: AtomicU64,
    apply_lock: tokio::sync::Mutex<()>,
    session: Mutex<Option<Session>>,
}

/// Client for the station's now-playing push feed.
///
/// Cheap to clone; all clones drive the same connection. [`connect`] and
/// [`disconnect`] are both idempotent.
///
/// [`connect`]: StationFeedClient::connect
/// [`disconnect`]: StationFeedClient::disconnect
#[derive(Clone)]
pub struct StationFeedClient {
    inner: Arc<FeedInner>,
}

impl StationFeedClient {
    /// Creates a client for `feed_url`, publishing into `store`.
    pub fn new(
        feed_url: &str,
        store: NowPlayingStore,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self> {
        let feed_url = Url::parse(feed_url)?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            inner: Arc::new(FeedInner {
                http,
                feed_url,
                store,
                probe,
                generation: AtomicU64::new(0),
                apply_lock: tokio::sync::Mutex::new(()),
                session: Mutex::new(None),
            }),
        })
    }

    /// Starts the supervisor task.
    ///
    /// Re-entrant: calling while connected tears the previous stream down
    /// first, so there is never more than one logical stream per client.
    pub fn connect(&self) {
        let mut session = self.inner.session.lock().unwrap();
        if let Some(previous) = session.take() {
            debug!("Re-entrant connect, tearing down the previous stream");
            previous.token.cancel();
            previous.task.abort();
            // Anything still in flight from the old stream is now stale.
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }

        let token = CancellationToken::new();
        let inner = self.inner.clone();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            inner.supervise(task_token).await;
        });
        *session = Some(Session { token, task });
    }

    /// Tears down the connection and drops the held snapshot.
    ///
    /// Safe to call repeatedly or while disconnected.
    pub fn disconnect(&self) {
        let session = self.inner.session.lock().unwrap().take();
        if let Some(session) = session {
            session.token.cancel();
            session.task.abort();
        }
        // Invalidate any update still racing through the apply path.
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.store.clear();
        self.inner.store.set_connection(ConnectionState::Disconnected);
        info!("Feed disconnected");
    }
}

impl Drop for FeedInner {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.lock() {
            if let Some(session) = session.take() {
                session.token.cancel();
                session.task.abort();
            }
        }
    }
}

impl FeedInner {
    /// Connect/read/retry loop. Runs until the token is cancelled.
    async fn supervise(self: Arc<Self>, token: CancellationToken) {
        let mut first_attempt = true;
        loop {
            if !self.probe.is_online() {
                info!("Network unreachable, waiting before connecting to feed");
                self.store.set_connection(if first_attempt {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Reconnecting
                });
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = self.probe.wait_online() => {}
                }
            }

            self.store.set_connection(if first_attempt {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });
            first_attempt = false;

            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            match self.run_stream(generation, &token).await {
                Ok(()) => return, // cancelled
                Err(e) => {
                    warn!(error = %e, "Feed stream interrupted");
                }
            }

            self.store.set_connection(ConnectionState::Reconnecting);
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// Opens the stream and pumps frames until cancellation or failure.
    ///
    /// `Ok(())` means the token fired; any transport end, clean or not, is an
    /// error so the supervisor schedules a retry.
    async fn run_stream(&self, generation: u64, token: &CancellationToken) -> Result<()> {
        debug!(url = %self.feed_url, generation, "Opening feed stream");
        let response = self
            .http
            .get(self.feed_url.clone())
            .send()
            .await?
            .error_for_status()?;

        info!(generation, "Feed stream connected");
        self.store.set_connection(ConnectionState::Connected);

        let mut stream = response.bytes_stream();
        let mut frames = FrameBuffer::new();
        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                chunk = stream.next() => chunk,
            };
            let chunk = match chunk {
                Some(chunk) => chunk?,
                None => return Err(Error::StreamClosed),
            };

            for line in frames.push(&chunk) {
                self.handle_frame(generation, &line).await;
            }
        }
    }

    /// Decodes one frame and applies its updates.
    ///
    /// Undecodable frames are logged and dropped; a bad payload never tears
    /// down the connection.
    async fn handle_frame(&self, generation: u64, line: &str) {
        match parse_frame(line) {
            Ok(Some(envelope)) => {
                self.apply(generation, envelope.into_updates()).await;
            }
            Ok(None) => {} // heartbeat
            Err(e) => {
                warn!(error = %e, "Dropping undecodable feed frame");
            }
        }
    }

    /// Applies updates unless the session they came from has been torn down.
    async fn apply(&self, generation: u64, updates: Vec<FeedUpdate>) {
        let _guard = self.apply_lock.lock().await;
        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(generation, "Dropping update from stale feed session");
            return;
        }
        for update in updates {
            match update {
                FeedUpdate::Snapshot(snapshot) => self.store.apply_snapshot(snapshot),
                FeedUpdate::ClockSync { elapsed } => self.store.sync_elapsed(elapsed),
            }
        }
    }
}
