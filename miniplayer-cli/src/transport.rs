//! Clock-driven stand-in for an audio device.
//!
//! Nothing is decoded: a loaded source "plays" by advancing a position on
//! every tick until it reaches the track length.

use async_trait::async_trait;
use miniplayer_core::{MediaTransport, Result, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default tick interval
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Default)]
struct Deck {
    url: Option<String>,
    length: Duration,
    position: Duration,
    playing: bool,
}

pub struct SimulatedTransport {
    deck: Mutex<Deck>,
    events: mpsc::Sender<TransportEvent>,
    tick: Duration,
}

impl SimulatedTransport {
    /// Create a transport and the receiver its events arrive on.
    #[must_use]
    pub fn new(tick: Duration) -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let transport = Arc::new(Self {
            deck: Mutex::new(Deck::default()),
            events,
            tick,
        });
        (transport, rx)
    }

    /// Start the tick loop in a background task
    #[must_use]
    pub fn spawn_ticker(self: &Arc<Self>, cancel_token: CancellationToken) -> tokio::task::JoinHandle<()> {
        let transport = Arc::clone(self);
        tokio::spawn(async move { transport.run(cancel_token).await })
    }

    async fn run(&self, cancel_token: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!("Simulated transport stopping");
                    break;
                }
                () = tokio::time::sleep(self.tick) => {
                    for event in self.advance().await {
                        if self.events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Move the position forward by one tick and collect resulting events.
    async fn advance(&self) -> Vec<TransportEvent> {
        let mut deck = self.deck.lock().await;
        if !deck.playing {
            return Vec::new();
        }

        // Zero length means unknown: run until paused
        deck.position += self.tick;
        if !deck.length.is_zero() {
            deck.position = deck.position.min(deck.length);
        }
        let mut events = vec![TransportEvent::TimeUpdate {
            position: deck.position,
        }];
        if !deck.length.is_zero() && deck.position >= deck.length {
            deck.playing = false;
            events.push(TransportEvent::Ended);
        }
        events
    }
}

#[async_trait]
impl MediaTransport for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn load(&self, url: &str, duration_hint: Duration) -> Result<()> {
        info!("Loading source: {}", url);
        {
            let mut deck = self.deck.lock().await;
            deck.url = Some(url.to_string());
            deck.length = duration_hint;
            deck.position = Duration::ZERO;
            deck.playing = false;
        }
        if !duration_hint.is_zero() {
            let _ = self
                .events
                .send(TransportEvent::DurationChanged {
                    duration: duration_hint,
                })
                .await;
        }
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let mut deck = self.deck.lock().await;
        if deck.url.is_some() {
            deck.playing = true;
        }
        Ok(())
    }

    async fn pause(&self) {
        self.deck.lock().await.playing = false;
    }

    async fn seek(&self, position: Duration) {
        let mut deck = self.deck.lock().await;
        deck.position = if deck.length.is_zero() {
            position
        } else {
            position.min(deck.length)
        };
    }

    async fn set_volume(&self, volume: f32) {
        debug!("Simulated volume: {:.2}", volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_deck_does_not_advance() {
        let (transport, _rx) = SimulatedTransport::new(Duration::from_secs(1));
        assert!(transport.advance().await.is_empty());

        transport.load("https://cdn/a.mp3", Duration::from_secs(3)).await.unwrap();
        assert!(transport.advance().await.is_empty());
    }

    #[tokio::test]
    async fn test_plays_to_end() {
        let (transport, mut rx) = SimulatedTransport::new(Duration::from_secs(1));
        transport.load("https://cdn/a.mp3", Duration::from_secs(2)).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::DurationChanged {
                duration: Duration::from_secs(2)
            })
        );

        transport.start().await.unwrap();
        assert_eq!(
            transport.advance().await,
            vec![TransportEvent::TimeUpdate {
                position: Duration::from_secs(1)
            }]
        );
        assert_eq!(
            transport.advance().await,
            vec![
                TransportEvent::TimeUpdate {
                    position: Duration::from_secs(2)
                },
                TransportEvent::Ended,
            ]
        );
        assert!(transport.advance().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_length_never_ends() {
        let (transport, _rx) = SimulatedTransport::new(Duration::from_secs(1));
        transport.load("https://cdn/a.mp3", Duration::ZERO).await.unwrap();
        transport.start().await.unwrap();

        for _ in 0..3 {
            assert!(!transport.advance().await.contains(&TransportEvent::Ended));
        }
    }

    #[tokio::test]
    async fn test_seek_is_clamped_to_length() {
        let (transport, _rx) = SimulatedTransport::new(Duration::from_secs(1));
        transport.load("https://cdn/a.mp3", Duration::from_secs(10)).await.unwrap();
        transport.seek(Duration::from_secs(60)).await;

        assert_eq!(transport.deck.lock().await.position, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_loop_emits_events() {
        let (transport, mut rx) = SimulatedTransport::new(Duration::from_millis(250));
        transport.load("https://cdn/a.mp3", Duration::ZERO).await.unwrap();
        {
            let mut deck = transport.deck.lock().await;
            deck.length = Duration::from_secs(1);
        }
        transport.start().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = transport.spawn_ticker(cancel.clone());

        let mut ended = false;
        while let Some(event) = rx.recv().await {
            if event == TransportEvent::Ended {
                ended = true;
                break;
            }
        }
        cancel.cancel();
        handle.await.unwrap();
        assert!(ended);
    }
}
