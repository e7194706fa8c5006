//! In-memory collaborators for unit tests.

use crate::catalog::{CatalogClient, LyricPayload, QualityTier, StreamSource};
use crate::error::{CoreError, Result};
use crate::playlist::Track;
use crate::transport::MediaTransport;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn track(id: usize) -> Track {
    track_lasting(id, Duration::from_secs(180))
}

pub fn track_lasting(id: usize, duration: Duration) -> Track {
    Track::new(
        id.to_string(),
        format!("Song {id}"),
        vec!["Artist".to_string()],
        "Album",
        "",
        duration,
    )
}

/// Catalog with tracks `"0".."n"` and switchable failures.
#[derive(Default)]
pub struct FakeCatalog {
    tracks: Vec<Track>,
    failing_tiers: Mutex<HashSet<QualityTier>>,
    empty_tiers: Mutex<HashSet<QualityTier>>,
    unplayable: Mutex<HashSet<String>>,
    url_delays: Mutex<HashMap<String, Duration>>,
    lyric_delays: Mutex<HashMap<String, Duration>>,
    url_requests: Mutex<Vec<(String, QualityTier)>>,
    playlist_requests: AtomicUsize,
    lyrics_failing: AtomicBool,
}

impl FakeCatalog {
    pub fn with_tracks(n: usize) -> Self {
        Self {
            tracks: (0..n).map(track).collect(),
            ..Self::default()
        }
    }

    /// Tracks whose catalog duration is `duration` (zero means unknown).
    pub fn with_durations(n: usize, duration: Duration) -> Self {
        Self {
            tracks: (0..n).map(|id| track_lasting(id, duration)).collect(),
            ..Self::default()
        }
    }

    pub fn fail_tier(&self, tier: QualityTier) {
        self.failing_tiers.lock().unwrap().insert(tier);
    }

    pub fn empty_tier(&self, tier: QualityTier) {
        self.empty_tiers.lock().unwrap().insert(tier);
    }

    /// Make every tier fail for one track.
    pub fn make_unplayable(&self, track_id: &str) {
        self.unplayable.lock().unwrap().insert(track_id.to_string());
    }

    /// Delay URL resolution of one track.
    pub fn delay_url(&self, track_id: &str, delay: Duration) {
        self.url_delays
            .lock()
            .unwrap()
            .insert(track_id.to_string(), delay);
    }

    /// Delay the lyric fetch of one track.
    pub fn delay_lyrics(&self, track_id: &str, delay: Duration) {
        self.lyric_delays
            .lock()
            .unwrap()
            .insert(track_id.to_string(), delay);
    }

    pub fn set_lyrics_failing(&self, failing: bool) {
        self.lyrics_failing.store(failing, Ordering::SeqCst);
    }

    pub fn url_requests(&self) -> Vec<(String, QualityTier)> {
        self.url_requests.lock().unwrap().clone()
    }

    pub fn playlist_requests(&self) -> usize {
        self.playlist_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn playlist_tracks(&self, _playlist_id: &str, limit: u32, offset: u32) -> Result<Vec<Track>> {
        self.playlist_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tracks
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn song_details(&self, ids: &[String]) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn song_url(&self, track_id: &str, tier: QualityTier) -> Result<Vec<StreamSource>> {
        self.url_requests
            .lock()
            .unwrap()
            .push((track_id.to_string(), tier));

        let delay = self.url_delays.lock().unwrap().get(track_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_tiers.lock().unwrap().contains(&tier)
            || self.unplayable.lock().unwrap().contains(track_id);
        if failing {
            return Err(CoreError::Network {
                endpoint: "/song/url/v1".into(),
                reason: "connection reset".into(),
            });
        }
        if self.empty_tiers.lock().unwrap().contains(&tier) {
            return Ok(Vec::new());
        }

        Ok(vec![StreamSource {
            track_id: track_id.to_string(),
            url: Some(format!("http://cdn.test/{track_id}-{tier}.mp3")),
            bitrate: Some(320_000),
            level: Some(tier.as_str().to_string()),
        }])
    }

    async fn lyrics(&self, track_id: &str) -> Result<LyricPayload> {
        let delay = self.lyric_delays.lock().unwrap().get(track_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.lyrics_failing.load(Ordering::SeqCst) {
            return Err(CoreError::ApiStatus {
                endpoint: "/lyric".into(),
                code: 404,
            });
        }
        Ok(LyricPayload::new(
            Some(format!("[00:01.00]first line of {track_id}\n[00:03.00]second line")),
            Some("[00:01.00]第一句".to_string()),
        ))
    }
}

/// Transport that records every command as `"{label}:{command}"` in a log
/// that can be shared between several transports.
pub struct FakeTransport {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    reject_start: AtomicBool,
    loaded: Mutex<Option<String>>,
}

impl FakeTransport {
    pub fn new(label: &'static str) -> Arc<Self> {
        Self::shared(label, &Arc::new(Mutex::new(Vec::new())))
    }

    pub fn shared(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            log: log.clone(),
            reject_start: AtomicBool::new(false),
            loaded: Mutex::new(None),
        })
    }

    pub fn set_reject_start(&self, reject: bool) {
        self.reject_start.store(reject, Ordering::SeqCst);
    }

    pub fn loaded_url(&self) -> Option<String> {
        self.loaded.lock().unwrap().clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Number of log entries equal to `"{label}:{command}"`.
    pub fn count(&self, command: &str) -> usize {
        let entry = format!("{}:{command}", self.label);
        self.log().iter().filter(|e| **e == entry).count()
    }

    fn record(&self, command: String) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{command}", self.label));
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn load(&self, url: &str, _duration_hint: Duration) -> Result<()> {
        *self.loaded.lock().unwrap() = Some(url.to_string());
        self.record(format!("load {url}"));
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        if self.reject_start.load(Ordering::SeqCst) {
            self.record("start rejected".to_string());
            return Err(CoreError::PlaybackRejected {
                reason: "autoplay blocked".into(),
            });
        }
        self.record("start".to_string());
        Ok(())
    }

    async fn pause(&self) {
        self.record("pause".to_string());
    }

    async fn seek(&self, position: Duration) {
        self.record(format!("seek {}", position.as_millis()));
    }

    async fn set_volume(&self, volume: f32) {
        self.record(format!("volume {volume}"));
    }
}
