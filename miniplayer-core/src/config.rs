use crate::catalog::{CachePolicy, DEFAULT_PLAYLIST_LIMIT};
use crate::error::{CoreError, Result};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default catalog proxy endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.hypcvgm.top/NeteaseMiniPlayer/nmp.php";

/// Volume applied to a freshly created player
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub widget: WidgetOptions,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Corner the floating widget is pinned to, or `Static` for inline placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    Static,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Screen edge a floating widget docks against when idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSide {
    Left,
    Right,
}

impl WidgetPosition {
    /// Parse an attribute value; anything unrecognized is `Static`.
    #[must_use]
    pub fn from_attr(value: &str) -> Self {
        match value {
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            _ => Self::Static,
        }
    }

    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::Static)
    }

    #[must_use]
    pub const fn dock_side(self) -> DockSide {
        match self {
            Self::TopLeft | Self::BottomLeft => DockSide::Left,
            _ => DockSide::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Auto,
    Dark,
    Light,
}

impl Theme {
    /// Parse an attribute value; anything unrecognized is `Auto`.
    #[must_use]
    pub fn from_attr(value: &str) -> Self {
        match value {
            "dark" => Self::Dark,
            "light" => Self::Light,
            _ => Self::Auto,
        }
    }
}

/// Mount-time options of one widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetOptions {
    /// Single track, minimal controls
    #[serde(default)]
    pub embed: bool,
    /// Start playing once the first track is loaded (ignored when embedded)
    #[serde(default)]
    pub autoplay: bool,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub position: WidgetPosition,
    /// Fetch and show lyrics
    #[serde(default = "default_true")]
    pub lyric: bool,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub default_minimized: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

const fn default_true() -> bool {
    true
}

fn default_size() -> String {
    "compact".to_string()
}

const fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            embed: false,
            autoplay: false,
            playlist_id: None,
            song_id: None,
            position: WidgetPosition::default(),
            lyric: default_true(),
            theme: Theme::default(),
            size: default_size(),
            default_minimized: false,
            volume: default_volume(),
        }
    }
}

impl WidgetOptions {
    /// Build options from an attribute bag such as
    /// `{"playlist-id": "14273792576", "position": "bottom-left"}`.
    ///
    /// Booleans are true only for the literal `"true"`, except `lyric`
    /// which is on unless `"false"`. Blank ids count as absent.
    #[must_use]
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Self {
        let get = |key: &str| attrs.get(key).map(|v| v.trim());
        let flag = |key: &str| get(key) == Some("true");
        let id = |key: &str| get(key).filter(|v| !v.is_empty()).map(ToString::to_string);

        Self {
            embed: flag("embed"),
            autoplay: flag("autoplay"),
            playlist_id: id("playlist-id"),
            song_id: id("song-id"),
            position: get("position").map_or_else(WidgetPosition::default, WidgetPosition::from_attr),
            lyric: get("lyric") != Some("false"),
            theme: get("theme").map_or_else(Theme::default, Theme::from_attr),
            size: get("size")
                .filter(|v| !v.is_empty())
                .map_or_else(default_size, ToString::to_string),
            default_minimized: flag("default-minimized"),
            volume: default_volume(),
        }
    }

    /// Autoplay takes effect only outside embed mode.
    #[must_use]
    pub const fn should_autoplay(&self) -> bool {
        self.autoplay && !self.embed
    }

    /// Whether the widget starts minimized.
    #[must_use]
    pub const fn starts_minimized(&self) -> bool {
        self.default_minimized && !self.embed && !self.position.is_static()
    }

    /// Treat blank ids as absent.
    pub fn normalize(&mut self) {
        for id in [&mut self.playlist_id, &mut self.song_id] {
            if id.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *id = None;
            }
        }
    }

    /// Check that a source is configured.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] if neither a playlist nor a song id
    /// is set, or the volume is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.playlist_id.is_none() && self.song_id.is_none() {
            return Err(CoreError::ConfigInvalid {
                message: "widget needs a playlist_id or a song_id".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!("widget.volume must be within 0.0..=1.0, got {}", self.volume),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_playlist_limit")]
    pub playlist_limit: u32,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_playlist_limit() -> u32 {
    DEFAULT_PLAYLIST_LIMIT
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            playlist_limit: default_playlist_limit(),
        }
    }
}

/// Cache lifetimes per resource class, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_playlist_ttl")]
    pub playlist_ttl_secs: u64,
    #[serde(default = "default_track_ttl")]
    pub track_ttl_secs: u64,
    #[serde(default = "default_stream_url_ttl")]
    pub stream_url_ttl_secs: u64,
    #[serde(default = "default_lyrics_ttl")]
    pub lyrics_ttl_secs: u64,
}

const fn default_playlist_ttl() -> u64 {
    5 * 60
}

const fn default_track_ttl() -> u64 {
    5 * 60
}

const fn default_stream_url_ttl() -> u64 {
    30 * 60
}

const fn default_lyrics_ttl() -> u64 {
    60 * 60
}

impl CacheConfig {
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        CachePolicy::from(self)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            playlist_ttl_secs: default_playlist_ttl(),
            track_ttl_secs: default_track_ttl(),
            stream_url_ttl_secs: default_stream_url_ttl(),
            lyrics_ttl_secs: default_lyrics_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Pause between surfacing a playback error and skipping the track
    #[serde(default = "default_error_skip_delay")]
    pub error_skip_delay_ms: u64,
}

const fn default_error_skip_delay() -> u64 {
    1000
}

impl PlaybackConfig {
    #[must_use]
    pub const fn error_skip_delay(&self) -> Duration {
        Duration::from_millis(self.error_skip_delay_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            error_skip_delay_ms: default_error_skip_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/miniplayer/miniplayer.log`
    #[serde(default)]
    pub enabled: bool,
}

impl AppConfig {
    /// Get the configuration directory path (~/.config/miniplayer/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/miniplayer/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create the template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Same as [`Self::load_or_create`] for an explicit path.
    ///
    /// # Errors
    ///
    /// See [`Self::load_or_create`].
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.widget.normalize();
        config.widget.validate()?;
        Ok(config)
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# MiniPlayer Configuration
# ~/.config/miniplayer/config.toml

[widget]
# Set exactly one source: a playlist id or a single song id
playlist_id = ""
# song_id = ""
embed = false
autoplay = false
# "static", "top-left", "top-right", "bottom-left", "bottom-right"
position = "static"
lyric = true
# "auto", "dark", "light"
theme = "auto"
size = "compact"
default_minimized = false
volume = 0.7

[api]
base_url = ""#,
    DEFAULT_API_BASE_URL,
    r#""
timeout_secs = 10
max_retries = 2
playlist_limit = 1000

[cache]
playlist_ttl_secs = 300
track_ttl_secs = 300
stream_url_ttl_secs = 1800
lyrics_ttl_secs = 3600

[playback]
error_skip_delay_ms = 1000

[logging]
enabled = false
"#
);
