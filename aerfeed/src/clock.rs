//! Local one-second elapsed ticker
//!
//! Between server pushes the elapsed counter advances locally so the UI does
//! not appear frozen. The store decides whether a tick actually counts
//! ([`NowPlayingStore::tick`]); this task only provides the cadence.

use crate::store::NowPlayingStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to the background ticker task.
///
/// The task runs from [`ElapsedClock::start`] until [`ElapsedClock::stop`] or
/// drop. Server corrections arriving through the store are picked up
/// implicitly since every tick re-reads the stored snapshot.
pub struct ElapsedClock {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ElapsedClock {
    /// Spawns the 1 Hz ticker against `store`.
    pub fn start(store: NowPlayingStore) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            debug!("Elapsed clock started");
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Elapsed clock stopped");
                        return;
                    }
                    _ = tokio::time::sleep(TICK_PERIOD) => {
                        store.tick();
                    }
                }
            }
        });
        Self { token, task }
    }

    /// Stops the ticker and waits for the task to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        // The task only awaits sleep and cancellation, it cannot panic.
        let _ = (&mut self.task).await;
    }
}

impl Drop for ElapsedClock {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}
