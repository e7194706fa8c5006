use crate::lrc::{LyricLine, LyricTrack};
use crate::playback::PlaybackState;
use crate::playlist::{PlayMode, Track};
use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the per-controller event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by a playback controller towards the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The controller moved to a new state
    StateChanged { state: PlaybackState },
    /// A new playlist replaced the old one
    PlaylistLoaded { len: usize },
    /// A different track became current
    TrackChanged { index: usize, track: Track },
    /// Play mode changed
    ModeChanged { mode: PlayMode },
    /// Regular position update
    Progress { position: Duration, duration: Duration },
    /// Output volume changed
    VolumeChanged { volume: f32 },
    /// Lyric fetch started for the current track
    LyricsLoading,
    /// Lyrics were loaded for the current track
    LyricsLoaded { lines: usize, translated: bool },
    /// No lyrics found for current track
    LyricsNotFound,
    /// The displayed lyric line changed
    LyricChanged(LyricDisplay),
    /// Error to show to the user
    Error { message: String },
}

/// Create the broadcast channel a controller publishes on.
#[must_use]
pub fn event_channel() -> broadcast::Sender<PlayerEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Lyric availability for the current track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LyricState {
    /// Nothing to show: no track, fetch failed, or both feeds were empty
    #[default]
    Unavailable,
    /// Fetch in flight
    Loading,
    Loaded(LyricTrack),
}

/// What the lyric area should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricDisplay {
    /// No lyrics for this track
    Unavailable,
    /// Lyrics loaded, position is before the first line
    Waiting,
    /// A sung line, with its translation (possibly empty)
    Line {
        index: usize,
        text: String,
        translation: String,
    },
    /// A timestamp with no primary text
    Instrumental { index: usize, translation: String },
}

impl LyricDisplay {
    fn from_line(index: usize, line: &LyricLine) -> Self {
        if line.is_instrumental() {
            Self::Instrumental {
                index,
                translation: line.translation.clone(),
            }
        } else {
            Self::Line {
                index,
                text: line.text.clone(),
                translation: line.translation.clone(),
            }
        }
    }
}

/// Tracks which lyric line belongs to the current playback position.
///
/// [`advance_to`](Self::advance_to) only reports a display when the
/// resolved line index differs from the previous call.
#[derive(Debug, Default)]
pub struct LyricSynchronizer {
    state: LyricState,
    current: Option<usize>,
}

impl LyricSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &LyricState {
        &self.state
    }

    /// Mark a fetch as in flight, dropping any previous lyrics.
    pub fn begin_loading(&mut self) {
        self.state = LyricState::Loading;
        self.current = None;
    }

    /// Install a merged track. Returns `false` (and becomes unavailable) when
    /// the track has no lines.
    pub fn load(&mut self, track: LyricTrack) -> bool {
        self.current = None;
        if track.is_empty() {
            self.state = LyricState::Unavailable;
            return false;
        }
        self.state = LyricState::Loaded(track);
        true
    }

    /// Forget all lyrics.
    pub fn clear(&mut self) {
        self.state = LyricState::Unavailable;
        self.current = None;
    }

    /// Index of the line shown after the last `advance_to`.
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Display for the current index, regardless of change tracking.
    #[must_use]
    pub fn current_display(&self) -> LyricDisplay {
        match &self.state {
            LyricState::Loaded(track) => self
                .current
                .and_then(|i| track.line(i).map(|line| LyricDisplay::from_line(i, line)))
                .unwrap_or(LyricDisplay::Waiting),
            LyricState::Unavailable | LyricState::Loading => LyricDisplay::Unavailable,
        }
    }

    /// Resolve the line for `position`; `Some` only if it changed.
    pub fn advance_to(&mut self, position: Duration) -> Option<LyricDisplay> {
        let LyricState::Loaded(track) = &self.state else {
            return None;
        };

        let index = track.line_index_at(position);
        if index == self.current {
            return None;
        }
        self.current = index;

        Some(match index.and_then(|i| track.line(i).map(|line| (i, line))) {
            Some((i, line)) => LyricDisplay::from_line(i, line),
            None => LyricDisplay::Waiting,
        })
    }
}
