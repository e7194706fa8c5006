//! Media transport abstraction: the device that actually decodes and plays audio.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Notifications raised by a [`MediaTransport`].
///
/// Delivered to [`PlaybackController::run`](crate::PlaybackController::run)
/// through an mpsc channel, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Periodic position report; non-decreasing within one loaded source
    TimeUpdate { position: Duration },
    /// The transport learned the real length of the loaded source
    DurationChanged { duration: Duration },
    /// The loaded source played to its end
    Ended,
    /// Decoding or network failure mid-stream
    Error { reason: String },
}

/// Trait for audio output backends.
///
/// Implementations only execute commands; they never decide what plays next.
/// A transport is driven by exactly one controller.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Returns a human-readable name for this transport.
    fn name(&self) -> &'static str;

    /// Load a source URL, stopped at position zero.
    async fn load(&self, url: &str, duration_hint: Duration) -> Result<()>;

    /// Start or resume output.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackRejected`](crate::CoreError::PlaybackRejected)
    /// if the platform refuses to start playback.
    async fn start(&self) -> Result<()>;

    /// Stop output, keeping the position.
    async fn pause(&self);

    /// Jump to a position within the loaded source.
    async fn seek(&self, position: Duration);

    /// Set output volume in `[0, 1]`.
    async fn set_volume(&self, volume: f32);
}
