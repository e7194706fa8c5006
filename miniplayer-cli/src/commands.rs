//! Line-oriented control of a running player.

use miniplayer_core::{DurationExt, PlayMode, PlaybackController};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const HELP: &str = "commands: play | pause | toggle | next | prev | goto <n> | seek <secs> \
| vol <0-1> | mode [sequential|repeat_one|shuffle] | lyrics on|off | list | status | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// One-based position in the playlist
    Goto(usize),
    Seek(f64),
    Volume(f32),
    CycleMode,
    SetMode(PlayMode),
    Lyrics(bool),
    List,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// # Errors
    ///
    /// Returns a message for the user if the line is not a command.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".into());
        };
        let arg = words.next();

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("play", None) => Self::Play,
            ("pause", None) => Self::Pause,
            ("toggle" | "p", None) => Self::Toggle,
            ("next" | "n", None) => Self::Next,
            ("prev" | "previous", None) => Self::Previous,
            ("goto", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Goto(n),
                _ => return Err(format!("not a track number: {n}")),
            },
            ("seek", Some(secs)) => Self::Seek(
                secs.parse()
                    .map_err(|_| format!("not a number of seconds: {secs}"))?,
            ),
            ("vol" | "volume", Some(level)) => Self::Volume(
                level
                    .parse()
                    .map_err(|_| format!("not a volume: {level}"))?,
            ),
            ("mode", None) => Self::CycleMode,
            ("mode", Some(mode)) => Self::SetMode(parse_mode(mode)?),
            ("lyrics", Some("on")) => Self::Lyrics(true),
            ("lyrics", Some("off")) => Self::Lyrics(false),
            ("list" | "ls", None) => Self::List,
            ("status", None) => Self::Status,
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit" | "q", None) => Self::Quit,
            _ => return Err(format!("unknown command: {}", line.trim())),
        };
        Ok(command)
    }
}

fn parse_mode(name: &str) -> Result<PlayMode, String> {
    match name {
        "sequential" | "seq" => Ok(PlayMode::Sequential),
        "repeat_one" | "repeat" | "one" => Ok(PlayMode::RepeatOne),
        "shuffle" | "random" => Ok(PlayMode::Shuffle),
        other => Err(format!("unknown play mode: {other}")),
    }
}

/// Execute a command against the controller. Returns `false` on quit.
pub async fn execute(controller: &Arc<PlaybackController>, command: Command) -> bool {
    let result = match command {
        Command::Play => controller.play().await,
        Command::Pause => {
            controller.pause().await;
            Ok(())
        }
        Command::Toggle => controller.toggle_play().await,
        Command::Next => controller.next().await,
        Command::Previous => controller.previous().await,
        Command::Goto(n) => controller.select_track(n - 1).await,
        Command::Seek(secs) => controller.seek_secs(secs).await.map(|at| {
            info!("Seeked to {}", at.format_clock());
        }),
        Command::Volume(level) => {
            let applied = controller.set_volume(level).await;
            info!("Volume {:.0}%", applied * 100.0);
            Ok(())
        }
        Command::CycleMode => {
            info!("Play mode: {}", controller.cycle_mode().await);
            Ok(())
        }
        Command::SetMode(mode) => {
            controller.set_mode(mode).await;
            Ok(())
        }
        Command::Lyrics(visible) => {
            controller.set_lyrics_visible(visible).await;
            Ok(())
        }
        Command::List => {
            let current = controller.current_index().await;
            for (i, track) in controller.tracks().await.iter().enumerate() {
                let marker = if Some(i) == current { '>' } else { ' ' };
                info!(
                    "{} {:>3}. {} - {} [{}]",
                    marker,
                    i + 1,
                    track.artist_line(),
                    track.title,
                    track.duration.format_clock()
                );
            }
            Ok(())
        }
        Command::Status => {
            let track = controller.current_track().await;
            info!(
                "{} | {} | {}/{} | mode {} | vol {:.0}%",
                controller.state().await,
                track.map_or_else(|| "-".to_string(), |t| t.title),
                controller.position().await.format_clock(),
                controller.duration().await.format_clock(),
                controller.mode().await,
                controller.volume().await * 100.0
            );
            Ok(())
        }
        Command::Help => {
            info!("{}", HELP);
            Ok(())
        }
        Command::Quit => return false,
    };

    if let Err(e) = result {
        warn!("{}", e);
    }
    true
}

/// Read commands line by line until quit, end of input or cancellation.
pub async fn read_commands<R>(
    input: R,
    controller: Arc<PlaybackController>,
    cancel_token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    info!("{}", HELP);

    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match Command::parse(&line) {
                Ok(command) => {
                    if !execute(&controller, command).await {
                        cancel_token.cancel();
                        break;
                    }
                }
                Err(message) => warn!("{}", message),
            },
            Ok(None) => {
                info!("Input closed, player keeps running until Ctrl+C");
                break;
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("play"), Ok(Command::Play));
        assert_eq!(Command::parse("  NEXT "), Ok(Command::Next));
        assert_eq!(Command::parse("prev"), Ok(Command::Previous));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
        assert_eq!(Command::parse("mode"), Ok(Command::CycleMode));
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(Command::parse("goto 3"), Ok(Command::Goto(3)));
        assert_eq!(Command::parse("seek 42.5"), Ok(Command::Seek(42.5)));
        assert_eq!(Command::parse("vol 0.3"), Ok(Command::Volume(0.3)));
        assert_eq!(
            Command::parse("mode shuffle"),
            Ok(Command::SetMode(PlayMode::Shuffle))
        );
        assert_eq!(Command::parse("lyrics off"), Ok(Command::Lyrics(false)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("goto 0").is_err());
        assert!(Command::parse("goto x").is_err());
        assert!(Command::parse("seek").is_err());
        assert!(Command::parse("mode loud").is_err());
        assert!(Command::parse("lyrics maybe").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
