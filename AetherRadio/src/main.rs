use aeradmin::{SyncStreamClient, SyncTarget};
use aerfeed::{AlwaysOnline, ElapsedClock, NowPlayingStore, StationFeedClient};
use aerlibrary::{FavoritesClient, StaticAuthProvider};
use aerplayback::{PlaybackController, RodioOutput};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Infrastructure ==========

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = aerconfig::get_config();
    info!(dir = config.dir(), "📁 Configuration loaded");

    let store = NowPlayingStore::with_config(config.clone());
    let clock = ElapsedClock::start(store.clone());

    // ========== PHASE 2 : Engine wiring ==========

    info!("🔊 Initializing audio output...");
    let device = Arc::new(RodioOutput::new()?);
    let controller = Arc::new(PlaybackController::new(
        device,
        store.clone(),
        config.get_station_listen_url(),
    ));
    controller.set_volume(config.get_playback_volume())?;

    if let Some(library_url) = config.get_library_base_url() {
        let auth = Arc::new(StaticAuthProvider::anonymous());
        match FavoritesClient::new(&library_url, auth) {
            Ok(_favorites) => info!(url = %library_url, "📚 Library service configured"),
            Err(e) => warn!(error = %e, "⚠️ Library service misconfigured"),
        }
    }

    if let Some(admin_url) = config.get_admin_base_url() {
        let sync = SyncStreamClient::new(&admin_url, config.get_admin_token())?;
        info!(url = %admin_url, "🔧 Admin sync configured, running startup sync");
        tokio::spawn(async move {
            match sync.run(SyncTarget::All).await {
                Ok(lines) => info!(lines = lines.len(), "Startup sync finished"),
                Err(e) => warn!(error = %e, "⚠️ Startup sync failed"),
            }
        });
    }

    info!("📻 Connecting to station feed...");
    let feed_url = config
        .get_station_feed_url()
        .ok_or("station.feed_url is not configured")?;
    let feed = StationFeedClient::new(&feed_url, store.clone(), Arc::new(AlwaysOnline))?;
    feed.connect();

    // ========== PHASE 3 : Run ==========

    let mut updates = store.subscribe();
    let display = tokio::spawn(async move {
        let mut last_song = None;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let Some(snapshot) = state.snapshot else { continue };
            let Some(song) = snapshot.song else { continue };
            let key = (song.artist.clone(), song.title.clone());
            if last_song.as_ref() != Some(&key) {
                info!(
                    station = %snapshot.station.name,
                    "🎵 Now playing: {} - {}",
                    song.artist,
                    song.title
                );
                last_song = Some(key);
            }
        }
    });

    if let Err(e) = controller.play().await {
        warn!(error = %e, "⚠️ Initial playback failed, staying idle");
    }

    info!("✅ AetherRadio is ready!");
    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    // ========== PHASE 4 : Shutdown ==========

    info!("Shutting down...");
    if let Err(e) = controller.stop().await {
        warn!(error = %e, "Audio device did not stop cleanly");
    }
    feed.disconnect();
    clock.stop().await;
    display.abort();

    Ok(())
}
