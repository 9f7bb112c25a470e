use songdeck_core::{MediaRequest, Player};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOG_TARGET: &str = "songdeck::commands";

/// Volume change for `+` and `-`
const VOLUME_STEP: f32 = 0.1;

pub const HELP: &str = "\
commands:
  <space> or <enter>  play / pause
  n                   next track
  p                   previous track
  r                   retry after a playback error
  s <percent>         seek to a position, e.g. `s 50`
  + / -               volume up / down
  v <percent>         set volume, e.g. `v 80`
  j <number>          jump to track number
  o <url>             play a media URL outside the playlist
  q                   quit";

/// A line typed on stdin
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlayPause,
    Next,
    Prev,
    Retry,
    /// Seek to a fraction of the duration
    Seek(f64),
    VolumeUp,
    VolumeDown,
    Volume(f32),
    /// Zero-based playlist index
    Jump(usize),
    Open(String),
    Quit,
    Help,
}

impl Command {
    /// Parse one input line, `None` if it is not a command
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Some(Self::TogglePlayPause);
        }

        let line = line.trim();
        let (word, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, arg)| (word, arg.trim()));

        match (word, arg) {
            ("n", "") => Some(Self::Next),
            ("p", "") => Some(Self::Prev),
            ("r", "") => Some(Self::Retry),
            ("+", "") => Some(Self::VolumeUp),
            ("-", "") => Some(Self::VolumeDown),
            ("q", "") => Some(Self::Quit),
            ("h" | "?", "") => Some(Self::Help),
            ("s", percent) => parse_percent(percent).map(|p| Self::Seek(f64::from(p))),
            ("v", percent) => parse_percent(percent).map(Self::Volume),
            ("j", number) => number
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Self::Jump),
            ("o", url) if !url.is_empty() => Some(Self::Open(url.to_string())),
            _ => None,
        }
    }
}

/// `"50"` or `"50%"` as a fraction
fn parse_percent(value: &str) -> Option<f32> {
    let value = value.strip_suffix('%').unwrap_or(value);
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v / 100.0)
}

/// Apply a command to the player
pub async fn dispatch(player: &Arc<Player>, command: Command, volume: &mut f32) {
    match command {
        Command::TogglePlayPause => player.toggle_play_pause().await,
        Command::Next => player.next().await,
        Command::Prev => player.prev().await,
        Command::Retry => {
            if !player.retry().await {
                println!("nothing to retry");
            }
        }
        Command::Seek(fraction) => {
            if !player.seek(fraction).await {
                println!("cannot seek yet");
            }
        }
        Command::VolumeUp => {
            *volume = (*volume + VOLUME_STEP).min(1.0);
            player.set_volume(*volume).await;
        }
        Command::VolumeDown => {
            *volume = (*volume - VOLUME_STEP).max(0.0);
            player.set_volume(*volume).await;
        }
        Command::Volume(level) => {
            *volume = level.clamp(0.0, 1.0);
            player.set_volume(*volume).await;
        }
        Command::Jump(index) => {
            if let Err(e) = player.load_track(index).await {
                warn!(target: LOG_TARGET, "{e}");
                println!("! {e}");
            }
        }
        Command::Open(url) => {
            let request = MediaRequest {
                title: url.clone(),
                artist: String::new(),
                url,
            };
            player.play(request).await;
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => player.cancel_token().cancel(),
    }
}

/// Read commands from stdin until cancelled or stdin closes
pub async fn run_commands(
    player: Arc<Player>,
    initial_volume: f32,
    cancel_token: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut volume = initial_volume;

    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => match Command::parse(&line) {
                Some(command) => dispatch(&player, command, &mut volume).await,
                None => println!("{HELP}"),
            },
            Ok(None) => {
                info!(target: LOG_TARGET, "stdin closed");
                break;
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to read stdin: {e}");
                break;
            }
        }
    }
}
