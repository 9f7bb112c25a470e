use songdeck_core::{LyricCue, LyricsUnavailableReason, PlaybackState, Player, PlayerEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "songdeck::bridge";

/// Turns player events into terminal lines
#[derive(Debug, Default)]
pub struct EventPrinter {
    last_elapsed: Option<String>,
}

impl EventPrinter {
    /// Line to print for `event`, if any.
    ///
    /// `cues` are the lyrics of the current track, used to show the
    /// highlighted line. Progress is only reported once per elapsed second.
    pub fn render(&mut self, event: &PlayerEvent, cues: &[LyricCue]) -> Option<String> {
        match event {
            PlayerEvent::TrackChanged { index, track } => {
                self.last_elapsed = None;
                let mut line = format!("\n♪ [{}] {} - {}", index + 1, track.title, track.artist);
                if let Some(uploaded) = track.uploaded_at_display() {
                    line.push_str(&format!("  (uploaded {uploaded})"));
                }
                Some(line)
            }
            PlayerEvent::StateChanged { state } => match state {
                PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ended => {
                    Some(format!("[{state}]"))
                }
                PlaybackState::Idle | PlaybackState::Loading | PlaybackState::Error(_) => None,
            },
            PlayerEvent::LyricsLoaded { cue_count } => Some(format!("({cue_count} lyric lines)")),
            PlayerEvent::LyricsUnavailable { reason } => Some(
                match reason {
                    LyricsUnavailableReason::NoLyricsUrl => "(no lyrics for this track)",
                    LyricsUnavailableReason::NoCues => "(lyrics contain no timed lines)",
                    LyricsUnavailableReason::FetchFailed => "(lyrics could not be loaded)",
                }
                .to_string(),
            ),
            PlayerEvent::Progress(progress) => {
                if self.last_elapsed.as_deref() == Some(progress.elapsed.as_str()) {
                    return None;
                }
                self.last_elapsed = Some(progress.elapsed.clone());
                Some(format!(
                    "  {} / {}  -{}",
                    progress.elapsed, progress.duration, progress.remaining
                ))
            }
            PlayerEvent::ActiveCueChanged { index } => index
                .and_then(|i| cues.get(i))
                .map(|cue| format!("  > {}", cue.text)),
            PlayerEvent::RetryVisibility { visible } => {
                visible.then(|| "Type 'r' to retry".to_string())
            }
            PlayerEvent::Error { message } => Some(format!("! {message}")),
            PlayerEvent::VolumeChanged { volume } => {
                Some(format!("volume {:.0}%", volume * 100.0))
            }
        }
    }
}

/// Print player events until cancelled or the channel closes
pub async fn print_player_events(
    player: Arc<Player>,
    mut rx: broadcast::Receiver<PlayerEvent>,
    cancel_token: CancellationToken,
) {
    let mut printer = EventPrinter::default();

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => event,
        };

        match event {
            Ok(event) => {
                let session;
                let cues: &[LyricCue] = if matches!(event, PlayerEvent::ActiveCueChanged { .. }) {
                    session = player.session().await;
                    session.cues()
                } else {
                    &[]
                };
                if let Some(line) = printer.render(&event, cues) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!(target: LOG_TARGET, "Player event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!(target: LOG_TARGET, "Missed {} player events", n);
            }
        }
    }
}
