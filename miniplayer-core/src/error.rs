use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please set a playlist_id or song_id and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Catalog / network errors
    #[error("Request to {endpoint} failed: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("Catalog API {endpoint} returned status code {code}")]
    ApiStatus { endpoint: String, code: i64 },

    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No data found for {resource}")]
    DataNotFound { resource: String },

    #[error("No playable source for track {track_id}")]
    SourceResolutionFailed { track_id: String },

    // Media transport errors
    #[error("Playback was rejected: {reason}")]
    PlaybackRejected { reason: String },

    #[error("Media decode failed: {reason}")]
    MediaDecodeFailed { reason: String },

    // Controller misuse
    #[error("No track is loaded")]
    NoTrackLoaded,

    #[error("Cannot {operation} while {state}")]
    InvalidState { operation: &'static str, state: String },

    #[error("Track index {index} is out of range for a playlist of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
