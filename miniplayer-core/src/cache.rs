//! In-memory resource cache with per-entry time-to-live.
//!
//! Expiry is lazy: an entry is only removed when it is read after its
//! deadline or overwritten. There is no capacity bound and no background
//! sweep; one cache lives as long as the widget that owns it.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Class of catalog resource, used as the prefix of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Full track listing of a playlist
    PlaylistTracks,
    /// Metadata of a single track
    Track,
    /// Resolved stream URL of a track
    StreamUrl,
    /// Raw timed-text lyrics of a track
    Lyrics,
}

impl ResourceClass {
    /// Key prefix for this class. Stable, used to build composite keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlaylistTracks => "playlist_all",
            Self::Track => "song",
            Self::StreamUrl => "song_url",
            Self::Lyrics => "lyric",
        }
    }

    /// Build the composite cache key `"{class}_{id}"`.
    #[must_use]
    pub fn key(self, id: &str) -> String {
        format!("{}_{id}", self.as_str())
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value together with its deadline.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past the clock's range: never expires
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now < deadline,
            None => true,
        }
    }
}

/// Key/value store where every entry carries its own TTL.
#[derive(Debug)]
pub struct ResourceCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V: Clone> ResourceCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up `key`, evicting it if it has expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. The value is returned only while
    /// `now < expires_at`; otherwise the entry is removed and a miss reported.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                debug!("Cache hit: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache entry expired: {}", key);
                self.entries.remove(key);
                None
            }
            None => {
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    /// Store `value` under `key`, valid until `now + ttl`. A TTL too large
    /// to represent keeps the entry forever.
    pub fn set_at(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for ResourceCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_keys() {
        assert_eq!(ResourceClass::StreamUrl.key("4875306"), "song_url_4875306");
        assert_eq!(ResourceClass::PlaylistTracks.key("42"), "playlist_all_42");
        assert_eq!(ResourceClass::Track.key("7"), "song_7");
        assert_eq!(ResourceClass::Lyrics.key("7"), "lyric_7");
    }

    #[test]
    fn test_ttl_boundary() {
        let mut cache = ResourceCache::new();
        let t = Instant::now();
        cache.set_at("k", "v", Duration::from_millis(1000), t);

        assert_eq!(cache.get_at("k", t + Duration::from_millis(999)), Some("v"));
        assert_eq!(cache.get_at("k", t + Duration::from_millis(1001)), None);
        // Evicted on the expired read, so it stays a miss
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get_at("k", t + Duration::from_millis(500)), None);
    }

    #[test]
    fn test_expires_exactly_at_deadline() {
        let mut cache = ResourceCache::new();
        let t = Instant::now();
        cache.set_at("k", 1, Duration::from_millis(10), t);
        assert_eq!(cache.get_at("k", t + Duration::from_millis(10)), None);
    }

    #[test]
    fn test_overwrite_replaces_value_and_deadline() {
        let mut cache = ResourceCache::new();
        let t = Instant::now();
        cache.set_at("k", 1, Duration::from_millis(10), t);
        cache.set_at("k", 2, Duration::from_millis(100), t);

        assert_eq!(cache.get_at("k", t + Duration::from_millis(50)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let mut cache = ResourceCache::new();
        let t = Instant::now();
        cache.set_at("k", "v", Duration::MAX, t);
        cache.set_at("j", "w", Duration::from_secs(u64::from(u32::MAX) * 1_000_000), t);

        let later = t + Duration::from_secs(10 * 365 * 24 * 3600);
        assert_eq!(cache.get_at("k", later), Some("v"));
        assert_eq!(cache.get_at("j", later), Some("w"));
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let mut cache: ResourceCache<String> = ResourceCache::default();
        assert!(cache.get("missing").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_with_runtime_clock() {
        let mut cache = ResourceCache::new();
        cache.set("song_1", "meta".to_string(), Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(cache.get("song_1").as_deref(), Some("meta"));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(cache.get("song_1").is_none());
        assert!(cache.get("song_1").is_none());
    }
}
