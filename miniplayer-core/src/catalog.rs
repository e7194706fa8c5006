//! Catalog access: the remote client trait and its cached front.

use crate::cache::{ResourceCache, ResourceClass};
use crate::config::CacheConfig;
use crate::error::{CoreError, Result};
use crate::lrc::LyricTrack;
use crate::playlist::Track;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Stream quality tiers offered by the catalog, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityTier {
    ExHigh,
    Standard,
}

impl QualityTier {
    /// Wire name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExHigh => "exhigh",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stream URL record returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub track_id: String,
    /// Missing when the catalog has no playable file at this tier
    pub url: Option<String>,
    pub bitrate: Option<u64>,
    pub level: Option<String>,
}

impl StreamSource {
    /// The URL if present and non-blank.
    #[must_use]
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Raw lyric feeds of a track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricPayload {
    /// Primary-language timed text
    pub primary: Option<String>,
    /// Translation timed text
    pub translation: Option<String>,
}

impl LyricPayload {
    pub fn new(primary: Option<String>, translation: Option<String>) -> Self {
        Self {
            primary,
            translation,
        }
    }

    /// Merge both feeds into one timeline.
    #[must_use]
    pub fn to_track(&self) -> LyricTrack {
        LyricTrack::merge(self.primary.as_deref(), self.translation.as_deref())
    }
}

/// Remote catalog the player reads tracks, stream URLs and lyrics from.
///
/// Implementations report any non-success API status as an error.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Get the client name
    fn name(&self) -> &'static str;

    /// Track listing of a playlist, one page of `limit` from `offset`.
    async fn playlist_tracks(&self, playlist_id: &str, limit: u32, offset: u32) -> Result<Vec<Track>>;

    /// Track metadata for a list of ids.
    async fn song_details(&self, ids: &[String]) -> Result<Vec<Track>>;

    /// Stream URL records for a track at the given quality tier.
    async fn song_url(&self, track_id: &str, tier: QualityTier) -> Result<Vec<StreamSource>>;

    /// Lyric feeds for a track.
    async fn lyrics(&self, track_id: &str) -> Result<LyricPayload>;
}

/// Time-to-live per resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub playlist_ttl: Duration,
    pub track_ttl: Duration,
    pub stream_url_ttl: Duration,
    pub lyrics_ttl: Duration,
}

impl CachePolicy {
    #[must_use]
    pub const fn ttl(&self, class: ResourceClass) -> Duration {
        match class {
            ResourceClass::PlaylistTracks => self.playlist_ttl,
            ResourceClass::Track => self.track_ttl,
            ResourceClass::StreamUrl => self.stream_url_ttl,
            ResourceClass::Lyrics => self.lyrics_ttl,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            playlist_ttl: Duration::from_secs(5 * 60),
            track_ttl: Duration::from_secs(5 * 60),
            stream_url_ttl: Duration::from_secs(30 * 60),
            lyrics_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            playlist_ttl: Duration::from_secs(config.playlist_ttl_secs),
            track_ttl: Duration::from_secs(config.track_ttl_secs),
            stream_url_ttl: Duration::from_secs(config.stream_url_ttl_secs),
            lyrics_ttl: Duration::from_secs(config.lyrics_ttl_secs),
        }
    }
}

/// Values held in the catalog cache
#[derive(Debug, Clone)]
enum CachedValue {
    Tracks(Vec<Track>),
    Track(Track),
    StreamUrl(String),
    Lyrics(LyricPayload),
}

/// Maximum playlist page requested from the catalog
pub const DEFAULT_PLAYLIST_LIMIT: u32 = 1000;

/// A [`CatalogClient`] shielded by a per-widget [`ResourceCache`].
pub struct CachedCatalog {
    client: Arc<dyn CatalogClient>,
    cache: Mutex<ResourceCache<CachedValue>>,
    policy: CachePolicy,
    playlist_limit: u32,
}

impl CachedCatalog {
    pub fn new(client: Arc<dyn CatalogClient>, policy: CachePolicy) -> Self {
        Self {
            client,
            cache: Mutex::new(ResourceCache::new()),
            policy,
            playlist_limit: DEFAULT_PLAYLIST_LIMIT,
        }
    }

    /// Set the page size used for playlist listings
    #[must_use]
    pub const fn with_playlist_limit(mut self, limit: u32) -> Self {
        self.playlist_limit = limit;
        self
    }

    /// Name of the underlying client
    #[must_use]
    pub fn client_name(&self) -> &'static str {
        self.client.name()
    }

    async fn cached(&self, class: ResourceClass, id: &str) -> Option<CachedValue> {
        self.cache.lock().await.get(&class.key(id))
    }

    async fn store(&self, class: ResourceClass, id: &str, value: CachedValue) {
        self.cache
            .lock()
            .await
            .set(class.key(id), value, self.policy.ttl(class));
    }

    /// All tracks of a playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog request fails.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        if let Some(CachedValue::Tracks(tracks)) =
            self.cached(ResourceClass::PlaylistTracks, playlist_id).await
        {
            return Ok(tracks);
        }

        info!("Fetching playlist {} from {}", playlist_id, self.client.name());
        let tracks = self
            .client
            .playlist_tracks(playlist_id, self.playlist_limit, 0)
            .await?;
        self.store(
            ResourceClass::PlaylistTracks,
            playlist_id,
            CachedValue::Tracks(tracks.clone()),
        )
        .await;
        Ok(tracks)
    }

    /// Metadata of one track.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DataNotFound`] if the catalog knows no such track,
    /// or the request error.
    pub async fn track(&self, track_id: &str) -> Result<Track> {
        if let Some(CachedValue::Track(track)) = self.cached(ResourceClass::Track, track_id).await {
            return Ok(track);
        }

        let track = self
            .client
            .song_details(&[track_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::DataNotFound {
                resource: format!("track {track_id}"),
            })?;
        self.store(ResourceClass::Track, track_id, CachedValue::Track(track.clone()))
            .await;
        Ok(track)
    }

    /// Resolve a playable, https-normalized stream URL for a track.
    ///
    /// Asks for the high tier first and falls back to the standard tier once
    /// if that request fails or yields no usable URL. Only high-tier results
    /// are cached.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SourceResolutionFailed`] if neither tier yields a URL.
    pub async fn resolve_stream_url(&self, track_id: &str) -> Result<String> {
        if let Some(CachedValue::StreamUrl(url)) =
            self.cached(ResourceClass::StreamUrl, track_id).await
        {
            return Ok(ensure_https(&url));
        }

        match self.request_url(track_id, QualityTier::ExHigh).await {
            Ok(url) => {
                self.store(
                    ResourceClass::StreamUrl,
                    track_id,
                    CachedValue::StreamUrl(url.clone()),
                )
                .await;
                return Ok(ensure_https(&url));
            }
            Err(e) => {
                warn!(
                    "No {} stream for track {}: {}, falling back to {}",
                    QualityTier::ExHigh,
                    track_id,
                    e,
                    QualityTier::Standard
                );
            }
        }

        match self.request_url(track_id, QualityTier::Standard).await {
            Ok(url) => Ok(ensure_https(&url)),
            Err(e) => {
                warn!("Fallback stream resolution failed for track {}: {}", track_id, e);
                Err(CoreError::SourceResolutionFailed {
                    track_id: track_id.to_string(),
                })
            }
        }
    }

    async fn request_url(&self, track_id: &str, tier: QualityTier) -> Result<String> {
        let sources = self.client.song_url(track_id, tier).await?;
        sources
            .first()
            .and_then(StreamSource::playable_url)
            .map(ToString::to_string)
            .ok_or_else(|| CoreError::DataNotFound {
                resource: format!("{tier} stream of track {track_id}"),
            })
    }

    /// Raw lyric feeds of a track.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog request fails. Failures are not cached.
    pub async fn lyrics(&self, track_id: &str) -> Result<LyricPayload> {
        if let Some(CachedValue::Lyrics(payload)) = self.cached(ResourceClass::Lyrics, track_id).await {
            return Ok(payload);
        }

        let payload = self.client.lyrics(track_id).await?;
        debug!(
            "Fetched lyrics for track {} (translation: {})",
            track_id,
            payload.translation.is_some()
        );
        self.store(ResourceClass::Lyrics, track_id, CachedValue::Lyrics(payload.clone()))
            .await;
        Ok(payload)
    }
}

/// Upgrade an `http://` URL to `https://`; any other scheme is left as is.
#[must_use]
pub fn ensure_https(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.scheme() == "http" => {
            if url.set_scheme("https").is_ok() {
                url.into()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
