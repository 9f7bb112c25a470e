//! Async host loop around the [`PlaybackController`].

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::{LyricsRequest, MediaRequest, PlaybackController};
use crate::error::Result;
use crate::events::PlayerEvent;
use crate::media::MediaEvent;
use crate::playback::{PlaybackSession, PlaybackState};
use crate::source::LyricsSource;

const LOG_TARGET: &str = "songdeck::player";

/// Drives a [`PlaybackController`] from user actions and media events.
///
/// Lyrics fetches run as spawned tasks and report back through the
/// controller, which drops results for tracks the session has left.
pub struct Player {
    controller: Mutex<PlaybackController>,
    lyrics_source: Arc<dyn LyricsSource>,
    event_tx: broadcast::Sender<PlayerEvent>,
    cancel_token: CancellationToken,
}

impl Player {
    /// Create a new player
    ///
    /// # Arguments
    /// * `controller` - Controller owning the session and media element
    /// * `lyrics_source` - Transport used to fetch lyrics text
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    pub fn new(
        controller: PlaybackController,
        lyrics_source: Arc<dyn LyricsSource>,
        cancel_token: Option<CancellationToken>,
    ) -> Arc<Self> {
        let event_tx = controller.event_sender();
        Arc::new(Self {
            controller: Mutex::new(controller),
            lyrics_source,
            event_tx,
            cancel_token: cancel_token.unwrap_or_default(),
        })
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> PlaybackSession {
        self.controller.lock().await.session().clone()
    }

    pub async fn state(&self) -> PlaybackState {
        self.controller.lock().await.state().clone()
    }

    /// Load and play the track at `index`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`](crate::CoreError::IndexOutOfRange)
    /// if `index` is not a valid playlist position.
    pub async fn load_track(self: &Arc<Self>, index: usize) -> Result<()> {
        let request = self.controller.lock().await.load_track(index)?;
        self.fetch_lyrics(request);
        Ok(())
    }

    pub async fn play(self: &Arc<Self>, request: MediaRequest) {
        let lyrics = self.controller.lock().await.play(request);
        self.fetch_lyrics(lyrics);
    }

    pub async fn pause(&self) {
        self.controller.lock().await.pause();
    }

    pub async fn toggle_play_pause(&self) {
        self.controller.lock().await.toggle_play_pause();
    }

    pub async fn next(self: &Arc<Self>) {
        let request = self.controller.lock().await.next();
        self.fetch_lyrics(request);
    }

    pub async fn prev(self: &Arc<Self>) {
        let request = self.controller.lock().await.prev();
        self.fetch_lyrics(request);
    }

    pub async fn seek(&self, fraction: f64) -> bool {
        self.controller.lock().await.seek(fraction)
    }

    pub async fn retry(&self) -> bool {
        self.controller.lock().await.retry()
    }

    pub async fn set_volume(&self, volume: f32) {
        self.controller.lock().await.set_volume(volume);
    }

    /// Start handling media events in a background task
    #[must_use]
    pub fn start(
        self: Arc<Self>,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(media_events).await;
        })
    }

    /// Run the media event loop until cancelled or the host closes the channel
    pub async fn run(self: &Arc<Self>, mut media_events: mpsc::UnboundedReceiver<MediaEvent>) {
        info!(target: LOG_TARGET, "Player event loop started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Player shutting down");
                    break;
                }
                event = media_events.recv() => {
                    let Some(event) = event else {
                        info!(target: LOG_TARGET, "Media event channel closed");
                        break;
                    };
                    self.handle_media_event(event).await;
                }
            }
        }
    }

    /// Apply one notification from the media element
    pub async fn handle_media_event(self: &Arc<Self>, event: MediaEvent) {
        let mut controller = self.controller.lock().await;
        match event {
            MediaEvent::Started { ticket } => {
                controller.on_media_started(ticket);
            }
            MediaEvent::StartFailed { ticket, reason } => {
                controller.on_media_start_failed(ticket, &reason);
            }
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                controller.on_time_advance(current_time, duration);
            }
            MediaEvent::Ended => {
                let request = controller.on_media_ended();
                drop(controller);
                self.fetch_lyrics(request);
            }
            MediaEvent::Error { reason } => {
                controller.on_media_error(&reason);
            }
        }
    }

    /// Spawn the lyrics fetch for a track load, if it needs one
    fn fetch_lyrics(self: &Arc<Self>, request: Option<LyricsRequest>) {
        let Some(request) = request else {
            return;
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            debug!(
                target: LOG_TARGET,
                "Fetching lyrics for track {} via {}: {}",
                request.track_index,
                this.lyrics_source.name(),
                request.url
            );
            let result = tokio::select! {
                () = this.cancel_token.cancelled() => return,
                result = this.lyrics_source.fetch_text(&request.url) => result,
            };
            this.controller
                .lock()
                .await
                .on_lyrics_fetched(&request, result);
        });
    }
}
