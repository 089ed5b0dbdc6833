//! Playback state machine
//!
//! Mediates between the UI surface, the shared now-playing store and the
//! audio device. All intents funnel through here so the device is never
//! driven from two places, and the store's `is_playing` flag always matches
//! what the device is actually doing.

use crate::cast::CastTransport;
use crate::device::AudioOutput;
use crate::error::{Error, Result};
use aerfeed::NowPlayingStore;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Explicit playback states. There is no implicit "source configured but
/// maybe playing" middle ground; transitions happen only in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
}

/// Drives an [`AudioOutput`] from user intents.
pub struct PlaybackController {
    device: Arc<dyn AudioOutput>,
    store: NowPlayingStore,
    /// Stream URL used when the server snapshot does not advertise one.
    fallback_url: Option<String>,
    state: Mutex<PlayerState>,
    /// Volume to restore on unmute. `Some` means currently muted.
    muted_from: Mutex<Option<f32>>,
    /// Active cast session; while set, playback goes to the remote endpoint.
    cast: Mutex<Option<Arc<dyn CastTransport>>>,
}

impl PlaybackController {
    pub fn new(
        device: Arc<dyn AudioOutput>,
        store: NowPlayingStore,
        fallback_url: Option<String>,
    ) -> Self {
        Self {
            device,
            store,
            fallback_url,
            state: Mutex::new(PlayerState::Idle),
            muted_from: Mutex::new(None),
            cast: Mutex::new(None),
        }
    }

    /// Attaches or detaches a cast session.
    ///
    /// Detaching while remote playback is active leaves the controller Idle;
    /// the caller decides whether to resume locally.
    pub fn set_cast_transport(&self, transport: Option<Arc<dyn CastTransport>>) {
        *self.cast.lock().unwrap_or_else(|e| e.into_inner()) = transport;
    }

    fn cast_transport(&self) -> Option<Arc<dyn CastTransport>> {
        self.cast.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn state(&self) -> PlayerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted_from
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn stream_url(&self) -> Option<String> {
        self.store
            .snapshot()
            .and_then(|snapshot| snapshot.station.listen_url)
            .or_else(|| self.fallback_url.clone())
    }

    fn set_state(&self, state: PlayerState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        self.store.set_playing(state == PlayerState::Playing);
    }

    /// Starts playback of the station stream.
    ///
    /// A missing stream URL is not an error: nothing to play yet, the intent
    /// is simply dropped. Already playing is a no-op.
    pub async fn play(&self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        let Some(url) = self.stream_url() else {
            debug!("Play requested but no stream URL is known yet");
            return Ok(());
        };

        if let Some(cast) = self.cast_transport() {
            cast.start(&url)?;
            info!(url = %url, "Remote playback started");
            self.set_state(PlayerState::Playing);
            return Ok(());
        }

        self.device.set_volume(self.effective_volume())?;
        if self.device.source().as_deref() != Some(url.as_str()) {
            self.device.set_source(&url)?;
            self.blocking_device(|device| device.load()).await?;
        }

        match self.blocking_device(|device| device.play()).await {
            Ok(()) => {
                info!(url = %url, "Playback started");
                self.set_state(PlayerState::Playing);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Playback failed to start");
                self.set_state(PlayerState::Idle);
                let _ = self.device.clear_source();
                Err(e)
            }
        }
    }

    /// Stops playback and discards the prepared stream.
    ///
    /// Live audio cannot be resumed from a pause point, so stopping always
    /// tears the stream down; the next play reconnects at the live edge.
    pub async fn stop(&self) -> Result<()> {
        if let Some(cast) = self.cast_transport() {
            cast.stop()?;
        }
        self.device.pause()?;
        self.device.clear_source()?;
        self.set_state(PlayerState::Idle);
        info!("Playback stopped");
        Ok(())
    }

    /// Toggles between playing and stopped.
    pub async fn toggle(&self) -> Result<()> {
        if self.is_playing() {
            self.stop().await
        } else {
            self.play().await
        }
    }

    /// Applies and persists a new volume, clearing any active mute.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        *self.muted_from.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.device.set_volume(volume)?;
        if let Some(cast) = self.cast_transport() {
            cast.set_volume(volume)?;
        }
        self.store.set_volume(volume);
        Ok(())
    }

    /// Silences the device without persisting a zero volume.
    pub fn mute(&self) -> Result<()> {
        let mut muted_from = self.muted_from.lock().unwrap_or_else(|e| e.into_inner());
        if muted_from.is_some() {
            return Ok(());
        }
        *muted_from = Some(self.store.volume());
        drop(muted_from);
        self.device.set_volume(0.0)
    }

    /// Restores the volume active before [`mute`](Self::mute).
    pub fn unmute(&self) -> Result<()> {
        let restored = self
            .muted_from
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match restored {
            Some(volume) => self.device.set_volume(volume),
            None => Ok(()),
        }
    }

    pub fn toggle_mute(&self) -> Result<()> {
        if self.is_muted() {
            self.unmute()
        } else {
            self.mute()
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.is_muted() {
            0.0
        } else {
            self.store.volume()
        }
    }

    /// Runs a potentially network-bound device call off the async runtime.
    async fn blocking_device(
        &self,
        op: impl FnOnce(&dyn AudioOutput) -> Result<()> + Send + 'static,
    ) -> Result<()> {
        let device = self.device.clone();
        tokio::task::spawn_blocking(move || op(device.as_ref()))
            .await
            .map_err(|e| Error::Channel(format!("device task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerfeed::{NowPlayingSnapshot, Station};

    #[derive(Default)]
    struct MockState {
        source: Option<String>,
        playing: bool,
        volume: f32,
        set_source_calls: usize,
        load_calls: usize,
        play_calls: usize,
        fail_play: bool,
    }

    #[derive(Default)]
    struct MockAudioOutput {
        state: Mutex<MockState>,
    }

    impl MockAudioOutput {
        fn failing() -> Self {
            let mock = Self::default();
            mock.state.lock().unwrap().fail_play = true;
            mock
        }

        fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }
    }

    impl AudioOutput for MockAudioOutput {
        fn set_source(&self, url: &str) -> Result<()> {
            let mut state = self.state();
            state.source = Some(url.to_string());
            state.set_source_calls += 1;
            Ok(())
        }

        fn clear_source(&self) -> Result<()> {
            self.state().source = None;
            Ok(())
        }

        fn load(&self) -> Result<()> {
            self.state().load_calls += 1;
            Ok(())
        }

        fn play(&self) -> Result<()> {
            let mut state = self.state();
            state.play_calls += 1;
            if state.fail_play {
                return Err(Error::Decode("not audio".into()));
            }
            state.playing = true;
            Ok(())
        }

        fn pause(&self) -> Result<()> {
            self.state().playing = false;
            Ok(())
        }

        fn set_volume(&self, volume: f32) -> Result<()> {
            self.state().volume = volume;
            Ok(())
        }

        fn source(&self) -> Option<String> {
            self.state().source.clone()
        }

        fn is_playing(&self) -> bool {
            self.state().playing
        }
    }

    fn store_with_listen_url(url: &str) -> NowPlayingStore {
        let store = NowPlayingStore::new();
        store.apply_snapshot(NowPlayingSnapshot {
            station: Station {
                name: "Aether One".into(),
                listen_url: Some(url.to_string()),
            },
            ..Default::default()
        });
        store
    }

    fn controller(
        device: Arc<MockAudioOutput>,
        store: NowPlayingStore,
    ) -> PlaybackController {
        PlaybackController::new(device, store, None)
    }

    #[tokio::test]
    async fn play_without_a_stream_url_is_a_quiet_no_op() {
        let device = Arc::new(MockAudioOutput::default());
        let ctrl = controller(device.clone(), NowPlayingStore::new());

        ctrl.play().await.unwrap();

        assert_eq!(ctrl.state(), PlayerState::Idle);
        assert_eq!(device.state().play_calls, 0);
    }

    #[tokio::test]
    async fn play_configures_the_source_once() {
        let device = Arc::new(MockAudioOutput::default());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store);

        ctrl.play().await.unwrap();
        ctrl.play().await.unwrap(); // already playing, no-op

        assert!(ctrl.is_playing());
        assert_eq!(device.state().set_source_calls, 1);
        assert_eq!(device.state().load_calls, 1);
        assert_eq!(device.state().play_calls, 1);
    }

    #[tokio::test]
    async fn stop_then_play_reconnects() {
        let device = Arc::new(MockAudioOutput::default());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store.clone());

        ctrl.play().await.unwrap();
        ctrl.stop().await.unwrap();
        assert_eq!(ctrl.state(), PlayerState::Idle);
        assert!(!store.is_playing());
        assert!(device.state().source.is_none());

        ctrl.play().await.unwrap();
        assert_eq!(device.state().set_source_calls, 2);
    }

    #[tokio::test]
    async fn play_failure_leaves_the_controller_idle() {
        let device = Arc::new(MockAudioOutput::failing());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store.clone());

        assert!(ctrl.play().await.is_err());
        assert_eq!(ctrl.state(), PlayerState::Idle);
        assert!(!store.is_playing());
    }

    #[tokio::test]
    async fn fallback_url_is_used_without_a_snapshot() {
        let device = Arc::new(MockAudioOutput::default());
        let ctrl = PlaybackController::new(
            device.clone(),
            NowPlayingStore::new(),
            Some("https://radio.example/fallback".into()),
        );

        ctrl.play().await.unwrap();
        assert_eq!(
            device.state().source.as_deref(),
            Some("https://radio.example/fallback")
        );
    }

    #[tokio::test]
    async fn volume_reaches_device_and_store() {
        let device = Arc::new(MockAudioOutput::default());
        let store = NowPlayingStore::new();
        let ctrl = controller(device.clone(), store.clone());

        ctrl.set_volume(0.4).unwrap();
        assert_eq!(device.state().volume, 0.4);
        assert_eq!(store.volume(), 0.4);

        ctrl.set_volume(2.0).unwrap();
        assert_eq!(store.volume(), 1.0);
    }

    #[tokio::test]
    async fn mute_is_transient() {
        let device = Arc::new(MockAudioOutput::default());
        let store = NowPlayingStore::new();
        let ctrl = controller(device.clone(), store.clone());

        ctrl.set_volume(0.7).unwrap();
        ctrl.mute().unwrap();
        assert!(ctrl.is_muted());
        assert_eq!(device.state().volume, 0.0);
        // The persisted volume is untouched while muted.
        assert_eq!(store.volume(), 0.7);

        ctrl.unmute().unwrap();
        assert!(!ctrl.is_muted());
        assert_eq!(device.state().volume, 0.7);
    }

    #[tokio::test]
    async fn setting_volume_clears_mute() {
        let device = Arc::new(MockAudioOutput::default());
        let ctrl = controller(device.clone(), NowPlayingStore::new());

        ctrl.mute().unwrap();
        ctrl.set_volume(0.5).unwrap();
        assert!(!ctrl.is_muted());
        assert_eq!(device.state().volume, 0.5);
    }

    #[tokio::test]
    async fn play_while_muted_keeps_the_device_silent() {
        let device = Arc::new(MockAudioOutput::default());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store);

        ctrl.set_volume(0.8).unwrap();
        ctrl.mute().unwrap();
        ctrl.play().await.unwrap();
        assert_eq!(device.state().volume, 0.0);
    }

    #[derive(Default)]
    struct MockCast {
        started: Mutex<Option<String>>,
        stopped: Mutex<bool>,
        volume: Mutex<Option<f32>>,
    }

    impl CastTransport for MockCast {
        fn start(&self, url: &str) -> Result<()> {
            *self.started.lock().unwrap() = Some(url.to_string());
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            *self.stopped.lock().unwrap() = true;
            Ok(())
        }

        fn set_volume(&self, volume: f32) -> Result<()> {
            *self.volume.lock().unwrap() = Some(volume);
            Ok(())
        }
    }

    #[tokio::test]
    async fn active_cast_session_receives_the_stream() {
        let device = Arc::new(MockAudioOutput::default());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store);
        let cast = Arc::new(MockCast::default());
        ctrl.set_cast_transport(Some(cast.clone()));

        ctrl.play().await.unwrap();
        assert!(ctrl.is_playing());
        assert_eq!(
            cast.started.lock().unwrap().as_deref(),
            Some("https://radio.example/listen")
        );
        // The local device stays untouched while casting.
        assert_eq!(device.state().play_calls, 0);

        ctrl.set_volume(0.3).unwrap();
        assert_eq!(*cast.volume.lock().unwrap(), Some(0.3));

        ctrl.stop().await.unwrap();
        assert!(*cast.stopped.lock().unwrap());
        assert!(!ctrl.is_playing());
    }

    #[tokio::test]
    async fn toggle_round_trips() {
        let device = Arc::new(MockAudioOutput::default());
        let store = store_with_listen_url("https://radio.example/listen");
        let ctrl = controller(device.clone(), store);

        ctrl.toggle().await.unwrap();
        assert!(ctrl.is_playing());
        ctrl.toggle().await.unwrap();
        assert!(!ctrl.is_playing());
    }
}
