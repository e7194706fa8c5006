use std::fmt;

/// Reason recorded when no quality tier yields a stream URL
pub const REASON_NO_SOURCE: &str = "no playable source";
/// Reason recorded when the transport refuses to start
pub const REASON_PLAY_REJECTED: &str = "play rejected";

/// Lifecycle state of one playback controller.
///
/// Only the controller writes it; everything else observes it through
/// [`PlayerEvent::StateChanged`](crate::PlayerEvent::StateChanged).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No track loaded
    #[default]
    Idle,
    /// Resolving the stream of the current track
    Loading,
    /// Track loaded and the transport is running
    Playing,
    /// Track loaded, transport stopped
    Paused,
    /// The current track cannot be played
    Errored(String),
}

impl PlaybackState {
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// A track is loaded into the transport.
    #[must_use]
    pub const fn has_loaded_track(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    #[must_use]
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Errored(reason) => Some(reason),
            _ => None,
        }
    }

    /// Short name used in logs and error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Errored(reason) => write!(f, "errored ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}
