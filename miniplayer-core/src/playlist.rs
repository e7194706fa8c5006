//! Ordered track sequence, current position and mode-driven navigation.

use crate::catalog::CachedCatalog;
use crate::error::{CoreError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Title used for a track whose metadata could not be fetched
pub const PLACEHOLDER_TITLE: &str = "Failed to load track";

/// Number of previously selected indices remembered in shuffle mode
const SHUFFLE_HISTORY_LEN: usize = 2;

/// Catalog track metadata. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub cover_url: String,
    pub duration: Duration,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artists: Vec<String>,
        album: impl Into<String>,
        cover_url: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists,
            album: album.into(),
            cover_url: cover_url.into(),
            duration,
        }
    }

    /// Stand-in shown when a single track's metadata fetch fails.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: PLACEHOLDER_TITLE.to_string(),
            artists: vec!["Unknown artist".to_string()],
            album: "Unknown album".to_string(),
            cover_url: String::new(),
            duration: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.title == PLACEHOLDER_TITLE && self.duration.is_zero()
    }

    /// Artists joined for display, e.g. `"A / B"`.
    #[must_use]
    pub fn artist_line(&self) -> String {
        self.artists.join(" / ")
    }
}

/// How the next track is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Walk the list in order, wrapping at both ends
    #[default]
    Sequential,
    /// Stay on the current track
    RepeatOne,
    /// Pick any other track at random
    Shuffle,
}

impl PlayMode {
    /// Next mode in the `Sequential -> RepeatOne -> Shuffle` ring.
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Sequential => Self::RepeatOne,
            Self::RepeatOne => Self::Shuffle,
            Self::Shuffle => Self::Sequential,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::RepeatOne => "repeat_one",
            Self::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last few indices left behind by shuffle selections, oldest first.
///
/// Selection currently excludes only the live index; this is bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleHistory {
    entries: VecDeque<usize>,
}

impl ShuffleHistory {
    fn record(&mut self, index: usize) {
        self.entries.push_back(index);
        while self.entries.len() > SHUFFLE_HISTORY_LEN {
            self.entries.pop_front();
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remembered indices, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Forward,
    Backward,
}

/// Owns the playlist, its current index and the play mode.
///
/// `current_index` is always in range while the list is non-empty.
#[derive(Debug)]
pub struct PlaylistManager {
    tracks: Vec<Track>,
    current_index: usize,
    mode: PlayMode,
    shuffle_history: ShuffleHistory,
    rng: StdRng,
}

impl PlaylistManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create a manager with a deterministic shuffle sequence.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: 0,
            mode: PlayMode::default(),
            shuffle_history: ShuffleHistory::default(),
            rng,
        }
    }

    /// Fetch the full track list of a catalog playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog request fails or the playlist is empty.
    pub async fn fetch_playlist(catalog: &CachedCatalog, playlist_id: &str) -> Result<Vec<Track>> {
        let tracks = catalog.playlist_tracks(playlist_id).await?;
        if tracks.is_empty() {
            return Err(CoreError::DataNotFound {
                resource: format!("playlist {playlist_id}"),
            });
        }
        Ok(tracks)
    }

    /// Fetch one track, substituting a placeholder if the fetch fails.
    pub async fn fetch_single_track(catalog: &CachedCatalog, track_id: &str) -> Track {
        match catalog.track(track_id).await {
            Ok(track) => track,
            Err(e) => {
                warn!("Failed to fetch track {}: {}, using placeholder", track_id, e);
                Track::placeholder(track_id)
            }
        }
    }

    /// Replace the whole playlist and rewind to the first track.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        info!("Playlist replaced ({} tracks)", tracks.len());
        self.tracks = tracks;
        self.current_index = 0;
        self.shuffle_history.clear();
    }

    /// Keep only the first track (embed mode shows a single track).
    pub fn truncate_to_first(&mut self) {
        self.tracks.truncate(1);
        self.current_index = 0;
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Current index, `None` while the playlist is empty.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        (!self.tracks.is_empty()).then_some(self.current_index)
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    #[must_use]
    pub const fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    /// Advance the mode ring and return the new mode.
    pub fn cycle_mode(&mut self) -> PlayMode {
        self.mode = self.mode.cycle();
        self.mode
    }

    #[must_use]
    pub fn shuffle_history(&self) -> &ShuffleHistory {
        &self.shuffle_history
    }

    /// Move to the next track according to the play mode.
    ///
    /// Returns the new index, which equals the old one when there is nothing
    /// else to move to; the caller then restarts the current track.
    pub fn select_next(&mut self) -> Option<usize> {
        self.select(Step::Forward, self.mode)
    }

    /// Move to the previous track according to the play mode.
    pub fn select_previous(&mut self) -> Option<usize> {
        self.select(Step::Backward, self.mode)
    }

    /// Move forward for error recovery: like [`Self::select_next`] except
    /// that `RepeatOne` advances sequentially so the failing track is skipped.
    pub fn select_next_skipping_current(&mut self) -> Option<usize> {
        let mode = match self.mode {
            PlayMode::RepeatOne => PlayMode::Sequential,
            mode => mode,
        };
        self.select(Step::Forward, mode)
    }

    /// Jump directly to `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] if `index >= len`.
    pub fn select_index(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    fn select(&mut self, step: Step, mode: PlayMode) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        let current = self.current_index;
        if len == 1 {
            return Some(current);
        }

        let next = match mode {
            PlayMode::RepeatOne => current,
            PlayMode::Sequential => match step {
                Step::Forward => (current + 1) % len,
                Step::Backward => (current + len - 1) % len,
            },
            PlayMode::Shuffle => {
                // Uniform over every index except the current one
                let pick = self.rng.random_range(0..len - 1);
                self.shuffle_history.record(current);
                if pick >= current {
                    pick + 1
                } else {
                    pick
                }
            }
        };

        self.current_index = next;
        Some(next)
    }
}

impl Default for PlaylistManager {
    fn default() -> Self {
        Self::new()
    }
}
