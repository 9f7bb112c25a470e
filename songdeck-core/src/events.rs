use crate::playback::{PlaybackState, Track};

/// Why the lyrics panel has nothing to show for the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsUnavailableReason {
    /// The track has no lyrics resource
    NoLyricsUrl,
    /// The resource was fetched but contained no timed lines
    NoCues,
    /// The resource could not be fetched
    FetchFailed,
}

/// Transport display values computed on each time advance
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Position as a fraction of the duration, 0.0 to 1.0
    pub fraction: f64,
    pub elapsed: String,
    pub duration: String,
    pub remaining: String,
    /// Lyric cue to highlight
    pub active_cue: Option<usize>,
}

/// Signals emitted by the playback controller for the UI layer
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Transport state changed
    StateChanged { state: PlaybackState },
    /// A new track was loaded into the session
    TrackChanged { index: usize, track: Track },
    /// Lyrics were loaded for the current track
    LyricsLoaded { cue_count: usize },
    /// No lyrics to show for the current track
    LyricsUnavailable { reason: LyricsUnavailableReason },
    /// Regular position update
    Progress(ProgressUpdate),
    /// Highlighted lyric changed; the UI should bring it into view
    ActiveCueChanged { index: Option<usize> },
    /// Show or hide the retry control
    RetryVisibility { visible: bool },
    /// Error message for display
    Error { message: String },
    /// Output volume changed
    VolumeChanged { volume: f32 },
}
