mod commands;
mod transport;

use crate::transport::{SimulatedTransport, DEFAULT_TICK};
use miniplayer_core::{
    AppConfig, AudioCoordinator, CachedCatalog, ControllerOptions, CoreError, LyricDisplay,
    PlaybackController, PlayerEvent, WidgetOptions,
};
use miniplayer_netease::NeteaseClient;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Optional config path as the only argument
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(AppConfig::config_path, PathBuf::from);

    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled(&config_path);
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match AppConfig::load_or_create_at(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a configuration template at {}. Set widget.playlist_id or widget.song_id and run again.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(run_player(&config, cancel_token)) {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Wire catalog, transport and controller together and run until shutdown.
async fn run_player(config: &AppConfig, cancel_token: CancellationToken) -> Result<(), CoreError> {
    let client = NeteaseClient::new(&config.api)?;
    let catalog = CachedCatalog::new(Arc::new(client), config.cache.policy())
        .with_playlist_limit(config.api.playlist_limit);

    let (transport, transport_events) = SimulatedTransport::new(DEFAULT_TICK);
    let coordinator = AudioCoordinator::new();
    let controller = PlaybackController::new(
        catalog,
        transport.clone(),
        coordinator,
        ControllerOptions::from_config(config),
    );

    info!(
        "Widget: position {:?}, theme {:?}, size {}{}",
        config.widget.position,
        config.widget.theme,
        config.widget.size,
        if config.widget.starts_minimized() { ", minimized" } else { "" }
    );

    tokio::spawn(log_player_events(controller.subscribe()));
    let ticker = transport.spawn_ticker(cancel_token.clone());
    let player = controller.start(transport_events, cancel_token.clone());

    serve(
        &controller,
        &config.widget,
        BufReader::new(tokio::io::stdin()),
        &cancel_token,
    )
    .await;

    let _ = player.await;
    let _ = ticker.await;
    info!("Player stopped");
    Ok(())
}

/// Mount the widget and take commands until shutdown. A failed mount is
/// reported and the player stays up, so the user can still pick a track or
/// quit.
async fn serve<R>(
    controller: &Arc<PlaybackController>,
    widget: &WidgetOptions,
    input: R,
    cancel_token: &CancellationToken,
) where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    if let Err(e) = controller.mount(widget).await {
        error!("Failed to load the widget content: {e}");
    }

    tokio::spawn(commands::read_commands(
        input,
        Arc::clone(controller),
        cancel_token.clone(),
    ));

    cancel_token.cancelled().await;
    controller.unmount().await;
}

/// Log player events to the console
async fn log_player_events(mut rx: tokio::sync::broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event {
                PlayerEvent::StateChanged { state } => {
                    info!("State: {}", state);
                }
                PlayerEvent::PlaylistLoaded { len } => {
                    info!("Playlist loaded: {} tracks", len);
                }
                PlayerEvent::TrackChanged { index, track } => {
                    info!(
                        "Track {}: {} - {} [{}]",
                        index + 1,
                        track.artist_line(),
                        track.title,
                        track.album
                    );
                }
                PlayerEvent::ModeChanged { mode } => {
                    info!("Play mode: {}", mode);
                }
                PlayerEvent::Progress { .. } => {
                    // Too frequent for the console
                }
                PlayerEvent::VolumeChanged { volume } => {
                    info!("Volume: {:.0}%", volume * 100.0);
                }
                PlayerEvent::LyricsLoading => {}
                PlayerEvent::LyricsLoaded { lines, translated } => {
                    info!(
                        "Lyrics loaded: {} lines{}",
                        lines,
                        if translated { " (translated)" } else { "" }
                    );
                }
                PlayerEvent::LyricsNotFound => {
                    info!("No lyrics found for current track");
                }
                PlayerEvent::LyricChanged(display) => match display {
                    LyricDisplay::Line {
                        text, translation, ..
                    } => {
                        if translation.is_empty() {
                            info!("♪ {}", text);
                        } else {
                            info!("♪ {} / {}", text, translation);
                        }
                    }
                    LyricDisplay::Instrumental { .. } => info!("♪ ..."),
                    LyricDisplay::Waiting | LyricDisplay::Unavailable => {}
                },
                PlayerEvent::Error { message } => {
                    warn!("Player error: {}", message);
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Player event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} player events", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = miniplayer_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use miniplayer_core::{
        CachePolicy, CatalogClient, LyricPayload, PlaybackState, QualityTier, StreamSource, Track,
    };
    use std::time::Duration;

    /// Catalog whose every request fails
    struct OfflineCatalog;

    fn offline(endpoint: &str) -> CoreError {
        CoreError::Network {
            endpoint: endpoint.into(),
            reason: "connection refused".into(),
        }
    }

    #[async_trait]
    impl CatalogClient for OfflineCatalog {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn playlist_tracks(&self, _: &str, _: u32, _: u32) -> miniplayer_core::Result<Vec<Track>> {
            Err(offline("/playlist/track/all"))
        }

        async fn song_details(&self, _: &[String]) -> miniplayer_core::Result<Vec<Track>> {
            Err(offline("/song/detail"))
        }

        async fn song_url(&self, _: &str, _: QualityTier) -> miniplayer_core::Result<Vec<StreamSource>> {
            Err(offline("/song/url/v1"))
        }

        async fn lyrics(&self, _: &str) -> miniplayer_core::Result<LyricPayload> {
            Err(offline("/lyric"))
        }
    }

    #[tokio::test]
    async fn test_failed_mount_keeps_taking_commands() {
        let (transport, _events) = SimulatedTransport::new(DEFAULT_TICK);
        let controller = PlaybackController::new(
            CachedCatalog::new(Arc::new(OfflineCatalog), CachePolicy::default()),
            transport,
            AudioCoordinator::new(),
            ControllerOptions::default(),
        );
        let widget = WidgetOptions {
            playlist_id: Some("p".into()),
            ..WidgetOptions::default()
        };
        let cancel = CancellationToken::new();

        let served = tokio::time::timeout(
            Duration::from_secs(5),
            serve(&controller, &widget, &b"status\nquit\n"[..], &cancel),
        )
        .await;

        assert!(served.is_ok());
        assert!(cancel.is_cancelled());
        assert!(controller.tracks().await.is_empty());
        assert!(matches!(
            controller.state().await,
            PlaybackState::Idle | PlaybackState::Errored(_)
        ));
    }
}
