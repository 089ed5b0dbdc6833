//! Network reachability signal
//!
//! The feed client gates its reconnect loop on a reachability probe instead
//! of hammering a dead network. The probe is injected so tests and headless
//! deployments can substitute their own signal.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::watch;

/// Reachability source consulted by the reconnect loop.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Current best-effort reachability.
    fn is_online(&self) -> bool;

    /// Resolves once the network reports reachable.
    ///
    /// Returns immediately when already online.
    async fn wait_online(&self);
}

/// Probe that always reports reachable.
///
/// Used when no platform network monitor is wired in; the reconnect loop
/// then degrades to plain fixed-delay retries.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }

    async fn wait_online(&self) {}
}

/// Probe driven by an external reachability feed.
///
/// The platform layer owns a [`NetworkMonitor`] and flips it as the OS
/// reports interface changes; the feed client only ever reads it.
#[derive(Clone)]
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Records a reachability change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
    }
}

impl fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("online", &*self.tx.borrow())
            .finish()
    }
}

#[async_trait]
impl ConnectivityProbe for NetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    async fn wait_online(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for also checks the current value first
        let _ = rx.wait_for(|online| *online).await;
    }
}
