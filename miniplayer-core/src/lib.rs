pub mod cache;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod playlist;
pub mod sync;
pub mod time;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cache::{ResourceCache, ResourceClass};
pub use catalog::{
    ensure_https, CachePolicy, CachedCatalog, CatalogClient, LyricPayload, QualityTier,
    StreamSource, DEFAULT_PLAYLIST_LIMIT,
};
pub use config::{
    ApiConfig, AppConfig, CacheConfig, DockSide, LoggingConfig, PlaybackConfig, Theme,
    WidgetOptions, WidgetPosition, CONFIG_TEMPLATE, DEFAULT_API_BASE_URL, DEFAULT_VOLUME,
};
pub use controller::{ControllerOptions, PlaybackController};
pub use coordinator::{AudioCoordinator, AudioInstance};
pub use error::{CoreError, Result};
pub use lrc::{LrcMetadata, LyricLine, LyricTrack, TimedText};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::PlaybackState;
pub use playlist::{PlayMode, PlaylistManager, ShuffleHistory, Track, PLACEHOLDER_TITLE};
pub use sync::{LyricDisplay, LyricState, LyricSynchronizer, PlayerEvent};
pub use time::DurationExt;
pub use transport::{MediaTransport, TransportEvent};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
