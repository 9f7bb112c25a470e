use parking_lot::Mutex;
use songdeck_core::{MediaElement, MediaEvent, StartTicket};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "songdeck::media";

/// Virtual playback clock for one loaded source
#[derive(Debug, Default)]
struct Clock {
    url: Option<String>,
    position: f64,
    paused: bool,
    volume: f32,
}

/// Media element that "plays" sources on a virtual clock.
///
/// Every reachable source lasts `track_secs`. HTTP(S) URLs are always
/// reachable; anything else is treated as a local path and must exist.
pub struct SimulatedMedia {
    clock: Mutex<Clock>,
    track_secs: f64,
    events: mpsc::UnboundedSender<MediaEvent>,
}

impl SimulatedMedia {
    #[must_use]
    pub fn new(track_secs: f64, events: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self {
            clock: Mutex::new(Clock {
                paused: true,
                volume: 1.0,
                ..Clock::default()
            }),
            track_secs,
            events,
        }
    }

    /// Current output volume
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.clock.lock().volume
    }

    /// Move the clock forward by `elapsed` seconds of playback.
    ///
    /// Emits a time update while playing, and `Ended` once the position
    /// reaches the end of the source.
    pub fn advance(&self, elapsed: f64) {
        let mut clock = self.clock.lock();
        if clock.paused || clock.url.is_none() {
            return;
        }

        clock.position = (clock.position + elapsed).min(self.track_secs);
        self.send(MediaEvent::TimeUpdate {
            current_time: clock.position,
            duration: self.track_secs,
        });

        if clock.position >= self.track_secs {
            clock.paused = true;
            debug!(target: LOG_TARGET, "Reached end of source");
            self.send(MediaEvent::Ended);
        }
    }

    /// Tick the clock on a tokio interval until cancelled
    #[must_use]
    pub fn start_clock(
        self: Arc<Self>,
        tick: Duration,
        speed: f64,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let step = tick.as_secs_f64() * speed;

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        info!(target: LOG_TARGET, "Media clock stopped");
                        break;
                    }
                    _ = interval.tick() => self.advance(step),
                }
            }
        })
    }

    fn send(&self, event: MediaEvent) {
        // Receiver is gone once the player loop has shut down
        let _ = self.events.send(event);
    }
}

fn is_reachable(url: &str) -> bool {
    if url.starts_with("http://") || url.starts_with("https://") {
        return true;
    }
    let path = url.strip_prefix("file://").unwrap_or(url);
    !path.is_empty() && Path::new(path).exists()
}

impl MediaElement for SimulatedMedia {
    fn load(&self, url: &str) {
        let mut clock = self.clock.lock();
        clock.url = Some(url.to_string());
        clock.position = 0.0;
        clock.paused = true;
        debug!(target: LOG_TARGET, "Loaded source {}", url);
    }

    fn play(&self, ticket: StartTicket) {
        let mut clock = self.clock.lock();
        let Some(url) = clock.url.as_deref() else {
            self.send(MediaEvent::StartFailed {
                ticket,
                reason: "no source loaded".into(),
            });
            return;
        };

        if !is_reachable(url) {
            let reason = format!("cannot open {url}");
            self.send(MediaEvent::StartFailed { ticket, reason });
            return;
        }

        if clock.position >= self.track_secs {
            clock.position = 0.0;
        }
        clock.paused = false;
        self.send(MediaEvent::Started { ticket });
    }

    fn pause(&self) {
        self.clock.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.clock.lock().paused
    }

    fn duration(&self) -> Option<f64> {
        let clock = self.clock.lock();
        clock
            .url
            .as_deref()
            .filter(|url| is_reachable(url))
            .map(|_| self.track_secs)
    }

    fn seek(&self, position: f64) {
        let mut clock = self.clock.lock();
        clock.position = position.clamp(0.0, self.track_secs);
    }

    fn set_volume(&self, volume: f32) {
        self.clock.lock().volume = volume;
    }
}
