//! Host media element seam.

/// Identifies one request to start media playback.
///
/// The host echoes the ticket back in [`MediaEvent::Started`] or
/// [`MediaEvent::StartFailed`] so the controller can drop completions for
/// requests it has since superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartTicket(pub u64);

/// The audio element playback is delegated to.
///
/// Owned exclusively by the [`PlaybackController`](crate::PlaybackController);
/// nothing else may start, stop or seek it. Starting is asynchronous: `play`
/// only requests a start and the outcome arrives later as a [`MediaEvent`].
pub trait MediaElement: Send + Sync {
    /// Replace the media source. Playback position resets to zero.
    fn load(&self, url: &str);

    /// Request playback start or resume
    fn play(&self, ticket: StartTicket);

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Duration in seconds, `None` until metadata is available
    fn duration(&self) -> Option<f64>;

    /// Move the playback position to `position` seconds
    fn seek(&self, position: f64);

    /// Set output volume in `0.0..=1.0`
    fn set_volume(&self, volume: f32);
}

/// Notifications from the host media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// A start request succeeded
    Started { ticket: StartTicket },
    /// A start request failed (network, decode, autoplay policy, ...)
    StartFailed { ticket: StartTicket, reason: String },
    /// Playback position advanced
    TimeUpdate { current_time: f64, duration: f64 },
    /// Media played to its natural end
    Ended,
    /// The current source failed to load
    Error { reason: String },
}
