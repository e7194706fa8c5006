//! Playback state machine of one player widget.
//!
//! A [`PlaybackController`] owns the playlist, drives one [`MediaTransport`]
//! and publishes [`PlayerEvent`]s. Every track activation takes a new
//! generation number; network results that complete under an older
//! generation are dropped so a slow response can never replace the source of
//! a track the user already moved away from.

use crate::catalog::CachedCatalog;
use crate::config::{AppConfig, WidgetOptions, DEFAULT_VOLUME};
use crate::coordinator::{next_instance_id, AudioCoordinator, AudioInstance};
use crate::error::{CoreError, Result};
use crate::lrc::{LyricLine, LyricTrack};
use crate::playback::{PlaybackState, REASON_NO_SOURCE, REASON_PLAY_REJECTED};
use crate::playlist::{PlayMode, PlaylistManager, Track};
use crate::sync::{event_channel, LyricDisplay, LyricState, LyricSynchronizer, PlayerEvent};
use crate::transport::{MediaTransport, TransportEvent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tunables of a controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Fetch and follow lyrics
    pub lyrics_enabled: bool,
    /// Pause between surfacing a playback error and skipping the track
    pub error_skip_delay: Duration,
    pub volume: f32,
    /// Seed for a reproducible shuffle order; random when `None`
    pub shuffle_seed: Option<u64>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            lyrics_enabled: true,
            error_skip_delay: Duration::from_secs(1),
            volume: DEFAULT_VOLUME,
            shuffle_seed: None,
        }
    }
}

impl ControllerOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            lyrics_enabled: config.widget.lyric,
            error_skip_delay: config.playback.error_skip_delay(),
            volume: config.widget.volume,
            shuffle_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Next,
    Previous,
}

struct ControllerInner {
    playlist: PlaylistManager,
    state: PlaybackState,
    lyrics: LyricSynchronizer,
    /// Bumped on every activation and playlist replacement
    generation: u64,
    /// The transport holds the current track's source
    source_loaded: bool,
    /// Whether the user wants audio; survives track changes
    wants_playback: bool,
    position: Duration,
    duration: Duration,
    volume: f32,
    consecutive_failures: usize,
    lyrics_visible: bool,
}

/// Orchestrates playlist, catalog, lyrics and transport for one widget
pub struct PlaybackController {
    id: u64,
    inner: Mutex<ControllerInner>,
    catalog: CachedCatalog,
    transport: Arc<dyn MediaTransport>,
    coordinator: Arc<AudioCoordinator>,
    events: broadcast::Sender<PlayerEvent>,
    error_skip_delay: Duration,
}

fn clamp_volume(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

impl PlaybackController {
    /// Create a new controller
    ///
    /// # Arguments
    /// * `catalog` - Cached catalog access owned by this widget
    /// * `transport` - Audio output driven exclusively by this controller
    /// * `coordinator` - Process-wide single-active-player slot
    /// * `options` - Lyrics, volume and recovery settings
    pub fn new(
        catalog: CachedCatalog,
        transport: Arc<dyn MediaTransport>,
        coordinator: Arc<AudioCoordinator>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let playlist = options
            .shuffle_seed
            .map_or_else(PlaylistManager::new, PlaylistManager::with_seed);

        Arc::new(Self {
            id: next_instance_id(),
            inner: Mutex::new(ControllerInner {
                playlist,
                state: PlaybackState::Idle,
                lyrics: LyricSynchronizer::new(),
                generation: 0,
                source_loaded: false,
                wants_playback: false,
                position: Duration::ZERO,
                duration: Duration::ZERO,
                volume: clamp_volume(options.volume),
                consecutive_failures: 0,
                lyrics_visible: options.lyrics_enabled,
            }),
            catalog,
            transport,
            coordinator,
            events: event_channel(),
            error_skip_delay: options.error_skip_delay,
        })
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.state.clone()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.inner.lock().await.playlist.current_index()
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.inner.lock().await.playlist.current_track().cloned()
    }

    pub async fn tracks(&self) -> Vec<Track> {
        self.inner.lock().await.playlist.tracks().to_vec()
    }

    pub async fn mode(&self) -> PlayMode {
        self.inner.lock().await.playlist.mode()
    }

    pub async fn position(&self) -> Duration {
        self.inner.lock().await.position
    }

    /// Length of the loaded track; the seek bound.
    pub async fn duration(&self) -> Duration {
        self.inner.lock().await.duration
    }

    pub async fn volume(&self) -> f32 {
        self.inner.lock().await.volume
    }

    pub async fn lyric_state(&self) -> LyricState {
        self.inner.lock().await.lyrics.state().clone()
    }

    /// What the lyric area shows right now.
    pub async fn lyric_display(&self) -> LyricDisplay {
        self.inner.lock().await.lyrics.current_display()
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&self, inner: &mut ControllerInner, state: PlaybackState) {
        if inner.state == state {
            return;
        }
        debug!("Player {}: {} -> {}", self.id, inner.state, state);
        inner.state = state.clone();
        self.emit(PlayerEvent::StateChanged { state });
    }

    fn reject_start(&self, inner: &mut ControllerInner, error: &CoreError) {
        warn!("Player {} could not start playback: {}", self.id, error);
        inner.wants_playback = false;
        self.set_state(inner, PlaybackState::Errored(REASON_PLAY_REJECTED.to_string()));
        self.emit(PlayerEvent::Error {
            message: error.to_string(),
        });
    }

    /// Load the configured source and activate the first track.
    ///
    /// Embedded widgets prefer `song_id` and keep only the first track of a
    /// playlist; floating widgets prefer `playlist_id`. Autoplay applies only
    /// outside embed mode.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured or the playlist cannot be
    /// loaded. A track that fails to play is not an error here; it is
    /// surfaced as an event and skipped.
    pub async fn mount(self: &Arc<Self>, widget: &WidgetOptions) -> Result<()> {
        info!(
            "Mounting player {} (embed: {}, playlist: {:?}, song: {:?})",
            self.id, widget.embed, widget.playlist_id, widget.song_id
        );

        if let Err(e) = self.load_source(widget).await {
            error!("Player {} failed to load: {}", self.id, e);
            self.emit(PlayerEvent::Error {
                message: format!("load failed: {e}"),
            });
            return Err(e);
        }

        if widget.should_autoplay() {
            self.inner.lock().await.wants_playback = true;
        }

        if let Err(e) = self.activate_current().await {
            debug!("Initial activation of player {} failed: {}", self.id, e);
        }
        Ok(())
    }

    async fn load_source(&self, widget: &WidgetOptions) -> Result<()> {
        match (widget.embed, widget.playlist_id.as_deref(), widget.song_id.as_deref()) {
            (true, _, Some(song_id)) | (false, None, Some(song_id)) => {
                self.load_single_track(song_id).await;
                Ok(())
            }
            (true, Some(playlist_id), None) => {
                let tracks = PlaylistManager::fetch_playlist(&self.catalog, playlist_id).await?;
                self.install_playlist(tracks, true).await;
                Ok(())
            }
            (false, Some(playlist_id), _) => self.load_playlist(playlist_id).await.map(|_| ()),
            (_, None, None) => Err(CoreError::ConfigInvalid {
                message: "widget needs a playlist_id or a song_id".into(),
            }),
        }
    }

    /// Replace the playlist with a catalog playlist. Does not activate.
    ///
    /// # Errors
    ///
    /// Returns an error if the playlist cannot be fetched or is empty; the
    /// current playlist is kept in that case.
    pub async fn load_playlist(&self, playlist_id: &str) -> Result<usize> {
        let tracks = PlaylistManager::fetch_playlist(&self.catalog, playlist_id).await?;
        Ok(self.install_playlist(tracks, false).await)
    }

    /// Replace the playlist with one track, or its placeholder if the
    /// metadata cannot be fetched. Does not activate.
    pub async fn load_single_track(&self, track_id: &str) {
        let track = PlaylistManager::fetch_single_track(&self.catalog, track_id).await;
        self.install_playlist(vec![track], false).await;
    }

    async fn install_playlist(&self, tracks: Vec<Track>, first_only: bool) -> usize {
        let mut inner = self.inner.lock().await;
        inner.playlist.replace(tracks);
        if first_only {
            inner.playlist.truncate_to_first();
        }
        inner.generation += 1;
        inner.consecutive_failures = 0;

        let len = inner.playlist.len();
        self.emit(PlayerEvent::PlaylistLoaded { len });
        len
    }

    /// Load the current playlist entry into the transport.
    ///
    /// Resolves the stream URL, loads it paused, starts it if playback is
    /// wanted, then fetches lyrics.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoTrackLoaded`] for an empty playlist, or the
    /// resolution error; in the latter case the controller is `Errored` and
    /// skips forward after the configured delay.
    pub async fn activate_current(self: &Arc<Self>) -> Result<()> {
        let (generation, track) = {
            let mut inner = self.inner.lock().await;
            let (Some(index), Some(track)) = (
                inner.playlist.current_index(),
                inner.playlist.current_track().cloned(),
            ) else {
                return Err(CoreError::NoTrackLoaded);
            };

            if inner.state.is_playing() {
                self.transport.pause().await;
            }
            inner.generation += 1;
            inner.source_loaded = false;
            inner.position = Duration::ZERO;
            inner.duration = track.duration;
            inner.lyrics.clear();
            self.set_state(&mut inner, PlaybackState::Loading);
            self.emit(PlayerEvent::TrackChanged {
                index,
                track: track.clone(),
            });
            (inner.generation, track)
        };

        info!(
            "Activating track {} - {} ({})",
            track.artist_line(),
            track.title,
            track.id
        );

        let url = match self.catalog.resolve_stream_url(&track.id).await {
            Ok(url) => url,
            Err(e) => {
                self.fail_activation(generation, &e).await;
                return Err(e);
            }
        };

        let start = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding stale stream for track {}", track.id);
                return Ok(());
            }
            if let Err(e) = self.transport.load(&url, track.duration).await {
                drop(inner);
                self.fail_activation(generation, &e).await;
                return Err(e);
            }
            self.transport.set_volume(inner.volume).await;
            inner.source_loaded = true;
            self.set_state(&mut inner, PlaybackState::Paused);
            inner.wants_playback
        };

        if start {
            // A rejection is already surfaced as state and event
            let _ = self.start_playback(generation).await;
        }

        self.fetch_lyrics(generation, &track.id).await;
        Ok(())
    }

    async fn fail_activation(self: &Arc<Self>, generation: u64, error: &CoreError) {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Ignoring failure of superseded activation: {}", error);
                return;
            }
            warn!("Player {} cannot play current track: {}", self.id, error);
            self.set_state(&mut inner, PlaybackState::Errored(REASON_NO_SOURCE.to_string()));
        }
        self.emit(PlayerEvent::Error {
            message: error.to_string(),
        });
        self.schedule_skip(generation);
    }

    /// Start or resume playback.
    ///
    /// Claims the coordinator first, so any other playing instance is paused
    /// before this one starts. While a track is loading this only records the
    /// intent; without a loaded source the current track is activated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PlaybackRejected`] if the transport refuses to
    /// start; the state becomes `Errored("play rejected")` and nothing is
    /// retried until the next explicit call or track change.
    pub async fn play(self: &Arc<Self>) -> Result<()> {
        let loaded_generation = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_playing() {
                return Ok(());
            }
            if inner.state == PlaybackState::Loading {
                inner.wants_playback = true;
                return Ok(());
            }
            if inner.source_loaded {
                Some(inner.generation)
            } else if inner.playlist.is_empty() {
                return Err(CoreError::NoTrackLoaded);
            } else {
                inner.wants_playback = true;
                None
            }
        };

        match loaded_generation {
            Some(generation) => self.start_playback(generation).await,
            None => self.activate_current().await,
        }
    }

    async fn start_playback(self: &Arc<Self>, generation: u64) -> Result<()> {
        let me: Arc<dyn AudioInstance> = Arc::<Self>::clone(self);
        self.coordinator.claim(&me).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || !inner.source_loaded {
            debug!("Start on player {} superseded by a newer track", self.id);
            inner.wants_playback = true;
            return Ok(());
        }

        match self.transport.start().await {
            Ok(()) => {
                inner.wants_playback = true;
                self.set_state(&mut inner, PlaybackState::Playing);
                Ok(())
            }
            Err(e) => {
                self.reject_start(&mut inner, &e);
                Err(e)
            }
        }
    }

    /// Stop output. Idempotent outside `Playing`; always clears the intent
    /// to play.
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        inner.wants_playback = false;
        if !inner.state.is_playing() {
            return;
        }
        self.transport.pause().await;
        self.set_state(&mut inner, PlaybackState::Paused);
    }

    /// Pause when playing, play otherwise.
    ///
    /// # Errors
    ///
    /// See [`Self::play`].
    pub async fn toggle_play(self: &Arc<Self>) -> Result<()> {
        if self.state().await.is_playing() {
            self.pause().await;
            Ok(())
        } else {
            self.play().await
        }
    }

    /// Go to the next track according to the play mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoTrackLoaded`] for an empty playlist.
    pub async fn next(self: &Arc<Self>) -> Result<()> {
        self.step(Direction::Next).await
    }

    /// Go to the previous track according to the play mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoTrackLoaded`] for an empty playlist.
    pub async fn previous(self: &Arc<Self>) -> Result<()> {
        self.step(Direction::Previous).await
    }

    async fn step(self: &Arc<Self>, direction: Direction) -> Result<()> {
        let restart = {
            let mut inner = self.inner.lock().await;
            let before = inner.playlist.current_index().ok_or(CoreError::NoTrackLoaded)?;
            let after = match direction {
                Direction::Next => inner.playlist.select_next(),
                Direction::Previous => inner.playlist.select_previous(),
            }
            .ok_or(CoreError::NoTrackLoaded)?;
            before == after && inner.source_loaded
        };

        if restart {
            self.restart_current().await
        } else {
            self.activate_current().await
        }
    }

    /// Rewind the loaded track; keeps playing if playback is wanted.
    async fn restart_current(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        debug!("Restarting current track on player {}", self.id);

        self.transport.seek(Duration::ZERO).await;
        inner.position = Duration::ZERO;
        if let Some(display) = inner.lyrics.advance_to(Duration::ZERO) {
            self.emit(PlayerEvent::LyricChanged(display));
        }
        self.emit(PlayerEvent::Progress {
            position: Duration::ZERO,
            duration: inner.duration,
        });

        if !inner.wants_playback {
            return Ok(());
        }
        match self.transport.start().await {
            Ok(()) => {
                self.set_state(&mut inner, PlaybackState::Playing);
                Ok(())
            }
            Err(e) => {
                self.reject_start(&mut inner, &e);
                Err(e)
            }
        }
    }

    /// Jump to a playlist entry; no-op if it is already current.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] for an invalid index.
    pub async fn select_track(self: &Arc<Self>, index: usize) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.playlist.current_index() == Some(index) {
                return Ok(());
            }
            inner.playlist.select_index(index)?;
        }
        self.activate_current().await
    }

    /// Seek within the loaded track, clamped to `[0, duration]` when the
    /// duration is known.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless playing or paused.
    pub async fn seek(&self, target: Duration) -> Result<Duration> {
        let mut inner = self.inner.lock().await;
        if !inner.state.has_loaded_track() {
            return Err(CoreError::InvalidState {
                operation: "seek",
                state: inner.state.name().to_string(),
            });
        }

        // Zero duration is unknown: leave the bound to the transport
        let position = if inner.duration.is_zero() {
            target
        } else {
            target.min(inner.duration)
        };
        self.transport.seek(position).await;
        inner.position = position;
        if let Some(display) = inner.lyrics.advance_to(position) {
            self.emit(PlayerEvent::LyricChanged(display));
        }
        self.emit(PlayerEvent::Progress {
            position,
            duration: inner.duration,
        });
        Ok(position)
    }

    /// [`Self::seek`] with fractional seconds; negative targets seek to zero.
    ///
    /// # Errors
    ///
    /// See [`Self::seek`].
    pub async fn seek_secs(&self, seconds: f64) -> Result<Duration> {
        let target = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
        self.seek(target).await
    }

    /// Set the output volume, clamped to `[0, 1]`. Returns the applied level.
    pub async fn set_volume(&self, level: f32) -> f32 {
        let volume = clamp_volume(level);
        let mut inner = self.inner.lock().await;
        inner.volume = volume;
        self.transport.set_volume(volume).await;
        self.emit(PlayerEvent::VolumeChanged { volume });
        volume
    }

    /// Advance the `Sequential -> RepeatOne -> Shuffle` ring.
    pub async fn cycle_mode(&self) -> PlayMode {
        let mode = self.inner.lock().await.playlist.cycle_mode();
        info!("Player {} play mode: {}", self.id, mode);
        self.emit(PlayerEvent::ModeChanged { mode });
        mode
    }

    pub async fn set_mode(&self, mode: PlayMode) {
        self.inner.lock().await.playlist.set_mode(mode);
        self.emit(PlayerEvent::ModeChanged { mode });
    }

    /// Show or hide lyrics. Hidden lyrics are not fetched; showing them
    /// again fetches lyrics for the loaded track.
    pub async fn set_lyrics_visible(&self, visible: bool) {
        let refetch = {
            let mut inner = self.inner.lock().await;
            if inner.lyrics_visible == visible {
                return;
            }
            inner.lyrics_visible = visible;
            if visible {
                let generation = inner.generation;
                inner
                    .playlist
                    .current_track()
                    .filter(|_| inner.source_loaded)
                    .map(|track| (generation, track.id.clone()))
            } else {
                inner.lyrics.clear();
                self.emit(PlayerEvent::LyricChanged(LyricDisplay::Unavailable));
                None
            }
        };

        if let Some((generation, track_id)) = refetch {
            self.fetch_lyrics(generation, &track_id).await;
        }
    }

    async fn fetch_lyrics(&self, generation: u64, track_id: &str) {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation || !inner.lyrics_visible {
                return;
            }
            inner.lyrics.begin_loading();
        }
        self.emit(PlayerEvent::LyricsLoading);

        let result = self.catalog.lyrics(track_id).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!("Discarding stale lyrics for track {}", track_id);
            return;
        }
        if !inner.lyrics_visible {
            return;
        }

        let track = match result {
            Ok(payload) => payload.to_track(),
            Err(e) => {
                warn!("Failed to fetch lyrics for track {}: {}", track_id, e);
                LyricTrack::default()
            }
        };
        let lines = track.len();
        let translated = track.lines().iter().any(LyricLine::has_translation);

        if inner.lyrics.load(track) {
            info!("Loaded {} lyric lines for track {}", lines, track_id);
            self.emit(PlayerEvent::LyricsLoaded { lines, translated });
            let position = inner.position;
            if let Some(display) = inner.lyrics.advance_to(position) {
                self.emit(PlayerEvent::LyricChanged(display));
            }
        } else {
            debug!("No lyrics for track {}", track_id);
            self.emit(PlayerEvent::LyricsNotFound);
        }
    }

    /// Apply one transport notification.
    pub async fn handle_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::TimeUpdate { position } => self.on_time_update(position).await,
            TransportEvent::DurationChanged { duration } => self.on_duration_changed(duration).await,
            TransportEvent::Ended => self.on_track_ended().await,
            TransportEvent::Error { reason } => self.on_transport_error(reason).await,
        }
    }

    async fn on_time_update(&self, position: Duration) {
        let mut inner = self.inner.lock().await;
        if !inner.source_loaded {
            return;
        }

        let position = if inner.duration.is_zero() {
            position
        } else {
            position.min(inner.duration)
        };
        inner.position = position;
        if !position.is_zero() {
            inner.consecutive_failures = 0;
        }

        self.emit(PlayerEvent::Progress {
            position,
            duration: inner.duration,
        });
        if let Some(display) = inner.lyrics.advance_to(position) {
            self.emit(PlayerEvent::LyricChanged(display));
        }
    }

    async fn on_duration_changed(&self, duration: Duration) {
        let mut inner = self.inner.lock().await;
        if inner.source_loaded && !duration.is_zero() {
            debug!("Player {} duration is {:?}", self.id, duration);
            inner.duration = duration;
        }
    }

    /// The loaded track played to its end: move on, keeping the intent to play.
    pub async fn on_track_ended(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock().await;
            if !inner.source_loaded {
                return;
            }
            inner.consecutive_failures = 0;
            inner.position = inner.duration;
        }

        info!("Track ended on player {}", self.id);
        if let Err(e) = self.step(Direction::Next).await {
            warn!("Player {} could not advance after track end: {}", self.id, e);
        }
    }

    /// The transport failed mid-stream: surface it, then skip forward after
    /// the configured delay.
    pub async fn on_transport_error(self: &Arc<Self>, reason: String) {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.source_loaded {
                debug!("Ignoring transport error without a loaded source: {}", reason);
                return;
            }
            let error = CoreError::MediaDecodeFailed {
                reason: reason.clone(),
            };
            error!("Player {} transport error: {}", self.id, error);

            inner.source_loaded = false;
            self.set_state(&mut inner, PlaybackState::Errored(reason));
            self.emit(PlayerEvent::Error {
                message: error.to_string(),
            });
            inner.generation
        };
        self.schedule_skip(generation);
    }

    fn schedule_skip(self: &Arc<Self>, generation: u64) {
        let this = Arc::clone(self);
        let delay = self.error_skip_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.skip_failed(generation).await;
        });
    }

    async fn skip_failed(self: &Arc<Self>, generation: u64) {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Skip on player {} superseded", self.id);
                return;
            }
            inner.consecutive_failures += 1;
            if inner.consecutive_failures >= inner.playlist.len() {
                warn!(
                    "Player {}: {} consecutive failures, not skipping further",
                    self.id, inner.consecutive_failures
                );
                return;
            }
            inner.playlist.select_next_skipping_current();
        }

        info!("Player {} skipping failed track", self.id);
        if let Err(e) = self.activate_current().await {
            debug!("Recovery activation on player {} failed: {}", self.id, e);
        }
    }

    /// Spawn [`Self::run`] on the current runtime
    #[must_use]
    pub fn start(
        self: &Arc<Self>,
        events: mpsc::Receiver<TransportEvent>,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(events, cancel_token))
    }

    /// Feed transport events into the state machine until cancelled or the
    /// transport goes away.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
        cancel_token: CancellationToken,
    ) {
        info!("Player {} listening for transport events", self.id);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Player {} shutting down", self.id);
                    break;
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle_transport_event(event).await,
                        None => {
                            debug!("Transport of player {} closed its event channel", self.id);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Stop output and give up the coordinator slot.
    pub async fn unmount(&self) {
        self.pause().await;
        self.coordinator.release(self.id).await;
    }
}

#[async_trait]
impl AudioInstance for PlaybackController {
    fn instance_id(&self) -> u64 {
        self.id
    }

    async fn pause(&self) {
        Self::pause(self).await;
    }
}
