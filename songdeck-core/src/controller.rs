//! Playback transport state machine.
//!
//! The controller is synchronous: every user action and every host
//! notification is a method call that updates the [`PlaybackSession`] and
//! publishes [`PlayerEvent`]s. Asynchronous work (lyrics fetches, media
//! starts) is tagged when issued so that late completions for a track the
//! session has moved away from are dropped.

use crate::error::{CoreError, Result};
use crate::events::{LyricsUnavailableReason, PlayerEvent, ProgressUpdate};
use crate::lrc::Lyrics;
use crate::media::{MediaElement, StartTicket};
use crate::playback::{PlaybackFailure, PlaybackSession, PlaybackState, Playlist, Track};
use crate::time::{format_clock, is_known_duration};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "songdeck::controller";

/// Lyrics fetch issued by a track load.
///
/// Hand the fetched text (or the failure) back through
/// [`PlaybackController::on_lyrics_fetched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsRequest {
    /// Load generation the fetch belongs to
    pub generation: u64,
    pub track_index: usize,
    pub url: String,
}

/// Media to play, with the details needed to retry it after a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub url: String,
    pub title: String,
    pub artist: String,
}

impl From<&Track> for MediaRequest {
    fn from(track: &Track) -> Self {
        Self {
            url: track.media_url.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
        }
    }
}

impl From<PlaybackFailure> for MediaRequest {
    fn from(failure: PlaybackFailure) -> Self {
        Self {
            url: failure.url,
            title: failure.title,
            artist: failure.artist,
        }
    }
}

/// Owns the playback session and the media element
pub struct PlaybackController {
    playlist: Playlist,
    media: Arc<dyn MediaElement>,
    session: PlaybackSession,
    /// Media currently set as the element's source
    loaded: Option<MediaRequest>,
    /// Bumped on every track load; stale lyrics results carry an older value
    generation: u64,
    next_ticket: u64,
    pending_start: Option<(StartTicket, MediaRequest)>,
    active_cue: Option<usize>,
    volume: f32,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl PlaybackController {
    /// Create a controller for a playlist. The session starts `Idle`.
    #[must_use]
    pub fn new(playlist: Playlist, media: Arc<dyn MediaElement>) -> Self {
        let (event_tx, _) = broadcast::channel(64);

        Self {
            playlist,
            media,
            session: PlaybackSession::default(),
            loaded: None,
            generation: 0,
            next_ticket: 0,
            pending_start: None,
            active_cue: None,
            volume: 1.0,
            event_tx,
        }
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Sender side of the event channel, for subscribing without the controller
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<PlayerEvent> {
        self.event_tx.clone()
    }

    #[must_use]
    pub const fn session(&self) -> &PlaybackSession {
        &self.session
    }

    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.session.state
    }

    #[must_use]
    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.session
            .current_track_index
            .and_then(|i| self.playlist.get(i))
    }

    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    /// Load the track at `index` and start playing it.
    ///
    /// Clears the previous track's cues. Returns the lyrics fetch to perform
    /// when the track declares a lyrics resource.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] if `index` is not a valid
    /// playlist position. The session is left untouched in that case.
    pub fn load_track(&mut self, index: usize) -> Result<Option<LyricsRequest>> {
        let len = self.playlist.len();
        if index >= len {
            warn!(target: LOG_TARGET, "Rejected track index {} (playlist has {})", index, len);
            return Err(CoreError::IndexOutOfRange { index, len });
        }
        Ok(self.load_valid(index))
    }

    fn load_valid(&mut self, index: usize) -> Option<LyricsRequest> {
        let track = self.playlist[index].clone();
        self.generation += 1;

        info!(
            target: LOG_TARGET,
            "Loading track {}: {} - {}", index, track.artist, track.title
        );

        self.session.current_track_index = Some(index);
        self.session.lyrics = Lyrics::default();
        self.set_active_cue(None);
        self.emit(PlayerEvent::TrackChanged {
            index,
            track: track.clone(),
        });
        self.set_state(PlaybackState::Loading);

        let request = if let Some(url) = &track.lyrics_url {
            Some(LyricsRequest {
                generation: self.generation,
                track_index: index,
                url: url.clone(),
            })
        } else {
            self.emit(PlayerEvent::LyricsUnavailable {
                reason: LyricsUnavailableReason::NoLyricsUrl,
            });
            None
        };

        self.start_new_source(MediaRequest::from(&track));
        request
    }

    /// Play `request`.
    ///
    /// The same URL as the loaded source toggles: it resumes when the media is
    /// paused and pauses otherwise. After a playback error it retries.
    ///
    /// A different URL is a new load. A playlist track's URL loads that track
    /// with its lyrics; any other URL leaves the playlist and shows no lyrics.
    pub fn play(&mut self, request: MediaRequest) -> Option<LyricsRequest> {
        if self.loaded.as_ref().is_some_and(|l| l.url == request.url) {
            if self.session.state.is_error() {
                self.retry();
            } else if self.media.is_paused() {
                self.request_start(request);
            } else {
                self.pause();
            }
            return None;
        }

        if let Some(index) = self.playlist.iter().position(|t| t.media_url == request.url) {
            return self.load_valid(index);
        }

        self.detach_track();
        self.start_new_source(request);
        None
    }

    /// Leave the current playlist track for a source outside the playlist
    fn detach_track(&mut self) {
        self.generation += 1;
        self.session.current_track_index = None;
        self.session.lyrics = Lyrics::default();
        self.set_active_cue(None);
        self.emit(PlayerEvent::LyricsUnavailable {
            reason: LyricsUnavailableReason::NoLyricsUrl,
        });
    }

    /// Pause playback. Does nothing unless currently playing.
    pub fn pause(&mut self) {
        if self.session.state != PlaybackState::Playing {
            debug!(target: LOG_TARGET, "Ignoring pause while {}", self.session.state);
            return;
        }
        self.media.pause();
        self.set_state(PlaybackState::Paused);
    }

    /// Play/pause button: resume when the media is paused, pause otherwise.
    /// After a playback error it acts as retry.
    pub fn toggle_play_pause(&mut self) {
        let Some(loaded) = self.loaded.clone() else {
            debug!(target: LOG_TARGET, "Ignoring play/pause with no track loaded");
            return;
        };
        if self.session.state.is_error() {
            self.retry();
        } else if self.media.is_paused() {
            self.request_start(loaded);
        } else {
            self.pause();
        }
    }

    /// Re-issue playback of the failed media. Only valid in the `Error` state.
    ///
    /// The track is not reloaded, so cues from the earlier load are kept.
    pub fn retry(&mut self) -> bool {
        let PlaybackState::Error(failure) = &self.session.state else {
            debug!(target: LOG_TARGET, "Ignoring retry while {}", self.session.state);
            return false;
        };
        let request = MediaRequest::from(failure.clone());
        info!(target: LOG_TARGET, "Retrying playback of {}", request.url);

        if self.loaded.as_ref().is_some_and(|l| l.url == request.url) {
            self.emit(PlayerEvent::RetryVisibility { visible: false });
            self.set_state(PlaybackState::Loading);
            self.request_start(request);
        } else {
            self.start_new_source(request);
        }
        true
    }

    /// Go to the next track, wrapping to the first
    pub fn next(&mut self) -> Option<LyricsRequest> {
        self.step(true)
    }

    /// Go to the previous track, wrapping to the last
    pub fn prev(&mut self) -> Option<LyricsRequest> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Option<LyricsRequest> {
        let len = self.playlist.len();
        let Some(current) = self.session.current_track_index else {
            debug!(target: LOG_TARGET, "Ignoring skip with no track loaded");
            return None;
        };
        if len == 0 {
            return None;
        }

        let target = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.load_valid(target)
    }

    /// Seek to `fraction` of the duration.
    ///
    /// `fraction` is clamped to `0.0..=1.0`. Returns `false` without seeking
    /// when the duration is not known yet.
    pub fn seek(&mut self, fraction: f64) -> bool {
        let Some(duration) = self.media.duration().filter(|d| is_known_duration(*d)) else {
            debug!(target: LOG_TARGET, "Ignoring seek before duration is known");
            return false;
        };
        if fraction.is_nan() {
            return false;
        }
        self.media.seek(fraction.clamp(0.0, 1.0) * duration);
        true
    }

    /// Set output volume, clamped to `0.0..=1.0`
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        self.volume = volume;
        self.media.set_volume(volume);
        self.emit(PlayerEvent::VolumeChanged { volume });
    }

    /// Handle a playback position update from the media element.
    ///
    /// Skipped (returns `None`) until the duration is a finite positive
    /// number. Only the latest call matters; nothing accumulates.
    pub fn on_time_advance(&mut self, current_time: f64, duration: f64) -> Option<ProgressUpdate> {
        if !is_known_duration(duration) {
            return None;
        }

        let active_cue = self.session.lyrics.active_index(current_time);
        let update = ProgressUpdate {
            fraction: (current_time / duration).clamp(0.0, 1.0),
            elapsed: format_clock(current_time),
            duration: format_clock(duration),
            remaining: format_clock(duration - current_time),
            active_cue,
        };

        self.set_active_cue(active_cue);
        self.emit(PlayerEvent::Progress(update.clone()));
        Some(update)
    }

    /// The media element started playing for `ticket`
    pub fn on_media_started(&mut self, ticket: StartTicket) -> bool {
        if self.take_pending(ticket).is_none() {
            return false;
        }
        self.set_state(PlaybackState::Playing);
        true
    }

    /// The media element failed to start for `ticket`
    pub fn on_media_start_failed(&mut self, ticket: StartTicket, reason: &str) -> bool {
        let Some(request) = self.take_pending(ticket) else {
            return false;
        };
        self.fail(request, reason);
        true
    }

    /// The current media source failed to load
    pub fn on_media_error(&mut self, reason: &str) {
        if self.session.state.is_error() {
            return;
        }
        let Some(loaded) = self.loaded.clone() else {
            return;
        };
        self.pending_start = None;
        self.fail(loaded, reason);
    }

    /// The media played to its end: mark `Ended` and advance to the next track
    pub fn on_media_ended(&mut self) -> Option<LyricsRequest> {
        if self.session.state != PlaybackState::Playing {
            debug!(target: LOG_TARGET, "Ignoring end of media while {}", self.session.state);
            return None;
        }
        self.set_state(PlaybackState::Ended);
        self.next()
    }

    /// Deliver the result of a lyrics fetch.
    ///
    /// Results for a load the session has since moved past are discarded and
    /// `false` is returned.
    pub fn on_lyrics_fetched(
        &mut self,
        request: &LyricsRequest,
        result: std::result::Result<String, CoreError>,
    ) -> bool {
        if request.generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Discarding stale lyrics for track {} (generation {} != {})",
                request.track_index, request.generation, self.generation
            );
            return false;
        }

        match result {
            Ok(text) => {
                let lyrics = Lyrics::parse(&text);
                if lyrics.is_empty() {
                    info!(target: LOG_TARGET, "No timed lines in {}", request.url);
                    self.emit(PlayerEvent::LyricsUnavailable {
                        reason: LyricsUnavailableReason::NoCues,
                    });
                } else {
                    info!(target: LOG_TARGET, "Loaded {} lyric lines", lyrics.len());
                    self.emit(PlayerEvent::LyricsLoaded {
                        cue_count: lyrics.len(),
                    });
                }
                self.session.lyrics = lyrics;
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Lyrics unavailable: {}", e);
                self.session.lyrics = Lyrics::default();
                self.emit(PlayerEvent::LyricsUnavailable {
                    reason: LyricsUnavailableReason::FetchFailed,
                });
            }
        }
        self.set_active_cue(None);
        true
    }

    fn start_new_source(&mut self, request: MediaRequest) {
        debug!(target: LOG_TARGET, "Setting media source {}", request.url);
        self.media.load(&request.url);
        self.media.set_volume(self.volume);
        self.session.current_media_url = Some(request.url.clone());
        self.loaded = Some(request.clone());

        self.emit(PlayerEvent::RetryVisibility { visible: false });
        self.set_state(PlaybackState::Loading);
        self.request_start(request);
    }

    fn request_start(&mut self, request: MediaRequest) {
        self.next_ticket += 1;
        let ticket = StartTicket(self.next_ticket);
        self.pending_start = Some((ticket, request));
        self.media.play(ticket);
    }

    fn take_pending(&mut self, ticket: StartTicket) -> Option<MediaRequest> {
        match self.pending_start.take() {
            Some((pending, request)) if pending == ticket => Some(request),
            other => {
                debug!(target: LOG_TARGET, "Discarding stale start result {:?}", ticket);
                self.pending_start = other;
                None
            }
        }
    }

    fn fail(&mut self, request: MediaRequest, reason: &str) {
        warn!(target: LOG_TARGET, "Playback of {} failed: {}", request.url, reason);
        let message = CoreError::MediaStartFailed {
            url: request.url.clone(),
            reason: reason.to_string(),
        }
        .to_string();

        self.set_state(PlaybackState::Error(PlaybackFailure {
            url: request.url,
            title: request.title,
            artist: request.artist,
            message: message.clone(),
        }));
        self.emit(PlayerEvent::Error { message });
        self.emit(PlayerEvent::RetryVisibility { visible: true });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.session.state == state {
            return;
        }
        debug!(target: LOG_TARGET, "State {} -> {}", self.session.state, state);
        self.session.state = state.clone();
        self.emit(PlayerEvent::StateChanged { state });
    }

    fn set_active_cue(&mut self, index: Option<usize>) {
        if self.active_cue == index {
            return;
        }
        self.active_cue = index;
        self.emit(PlayerEvent::ActiveCueChanged { index });
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Play(StartTicket),
        Pause,
        Seek(f64),
        Volume(f32),
    }

    #[derive(Default)]
    struct RecordingMedia {
        calls: Mutex<Vec<Call>>,
        paused: Mutex<bool>,
        duration: Mutex<Option<f64>>,
    }

    impl RecordingMedia {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn last_ticket(&self) -> StartTicket {
            self.calls()
                .iter()
                .rev()
                .find_map(|c| match c {
                    Call::Play(t) => Some(*t),
                    _ => None,
                })
                .unwrap()
        }

        fn set_duration(&self, duration: Option<f64>) {
            *self.duration.lock().unwrap() = duration;
        }
    }

    impl MediaElement for RecordingMedia {
        fn load(&self, url: &str) {
            *self.paused.lock().unwrap() = true;
            self.calls.lock().unwrap().push(Call::Load(url.to_string()));
        }

        fn play(&self, ticket: StartTicket) {
            *self.paused.lock().unwrap() = false;
            self.calls.lock().unwrap().push(Call::Play(ticket));
        }

        fn pause(&self) {
            *self.paused.lock().unwrap() = true;
            self.calls.lock().unwrap().push(Call::Pause);
        }

        fn is_paused(&self) -> bool {
            *self.paused.lock().unwrap()
        }

        fn duration(&self) -> Option<f64> {
            *self.duration.lock().unwrap()
        }

        fn seek(&self, position: f64) {
            self.calls.lock().unwrap().push(Call::Seek(position));
        }

        fn set_volume(&self, volume: f32) {
            self.calls.lock().unwrap().push(Call::Volume(volume));
        }
    }

    fn playlist(n: usize) -> Playlist {
        (0..n)
            .map(|i| {
                Track::new(format!("Song {i}"), "Artist", format!("https://cdn/{i}.mp3"))
                    .with_lyrics_url(format!("https://cdn/{i}.lrc"))
            })
            .collect()
    }

    fn controller(n: usize) -> (PlaybackController, Arc<RecordingMedia>) {
        let media = Arc::new(RecordingMedia::default());
        (PlaybackController::new(playlist(n), media.clone()), media)
    }

    /// Load a track and confirm its media start
    fn load_playing(
        c: &mut PlaybackController,
        media: &RecordingMedia,
        index: usize,
    ) -> Option<LyricsRequest> {
        let request = c.load_track(index).unwrap();
        assert!(c.on_media_started(media.last_ticket()));
        request
    }

    fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_load_track_out_of_range() {
        let (mut c, media) = controller(3);
        let err = c.load_track(3).unwrap_err();
        assert!(matches!(err, CoreError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(c.session().current_track_index, None);
        assert_eq!(*c.state(), PlaybackState::Idle);
        assert!(media.calls().is_empty());

        load_playing(&mut c, &media, 1);
        assert!(c.load_track(7).is_err());
        assert_eq!(c.session().current_track_index, Some(1));
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_load_track_enters_loading_and_starts_media() {
        let (mut c, media) = controller(2);
        let request = c.load_track(1).unwrap().unwrap();

        assert_eq!(request.track_index, 1);
        assert_eq!(request.url, "https://cdn/1.lrc");
        assert_eq!(c.session().current_track_index, Some(1));
        assert_eq!(c.session().current_media_url.as_deref(), Some("https://cdn/1.mp3"));
        assert_eq!(*c.state(), PlaybackState::Loading);
        assert_eq!(
            media.calls(),
            vec![
                Call::Load("https://cdn/1.mp3".into()),
                Call::Volume(1.0),
                Call::Play(StartTicket(1)),
            ]
        );

        assert!(c.on_media_started(StartTicket(1)));
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_load_track_without_lyrics_url() {
        let media = Arc::new(RecordingMedia::default());
        let list: Playlist = vec![Track::new("T", "A", "a.mp3")].into();
        let mut c = PlaybackController::new(list, media);
        let mut rx = c.subscribe();

        assert_eq!(c.load_track(0).unwrap(), None);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            PlayerEvent::LyricsUnavailable {
                reason: LyricsUnavailableReason::NoLyricsUrl
            }
        )));
    }

    #[test]
    fn test_lyrics_fetched_populates_cues() {
        let (mut c, media) = controller(2);
        let request = load_playing(&mut c, &media, 0).unwrap();

        assert!(c.on_lyrics_fetched(&request, Ok("[00:01.00]One\n[00:02.00]Two".into())));
        assert_eq!(c.session().cues().len(), 2);
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_stale_lyrics_fetch_discarded() {
        let (mut c, media) = controller(2);
        let stale = load_playing(&mut c, &media, 0).unwrap();
        let current = load_playing(&mut c, &media, 1).unwrap();

        assert!(!c.on_lyrics_fetched(&stale, Ok("[00:01.00]Old track".into())));
        assert!(c.session().cues().is_empty());

        assert!(c.on_lyrics_fetched(&current, Ok("[00:01.00]New track".into())));
        assert_eq!(c.session().cues()[0].text, "New track");
    }

    #[test]
    fn test_reloading_same_index_invalidates_fetch() {
        let (mut c, media) = controller(1);
        let first = load_playing(&mut c, &media, 0).unwrap();
        let second = c.next().unwrap();

        assert_eq!(first.track_index, second.track_index);
        assert!(!c.on_lyrics_fetched(&first, Ok("[00:01.00]x".into())));
        assert!(c.on_lyrics_fetched(&second, Ok("[00:01.00]x".into())));
    }

    #[test]
    fn test_lyrics_failure_is_not_fatal() {
        let (mut c, media) = controller(1);
        let mut rx = c.subscribe();
        let request = load_playing(&mut c, &media, 0).unwrap();

        let err = CoreError::LyricsFetchFailed {
            url: request.url.clone(),
            reason: "404".into(),
        };
        assert!(c.on_lyrics_fetched(&request, Err(err)));
        assert!(c.session().cues().is_empty());
        assert_eq!(*c.state(), PlaybackState::Playing);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            PlayerEvent::LyricsUnavailable {
                reason: LyricsUnavailableReason::FetchFailed
            }
        )));
    }

    #[test]
    fn test_lyrics_without_cues() {
        let (mut c, media) = controller(1);
        let mut rx = c.subscribe();
        let request = load_playing(&mut c, &media, 0).unwrap();

        assert!(c.on_lyrics_fetched(&request, Ok("[ti:Only tags]".into())));
        assert!(c.session().cues().is_empty());
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            PlayerEvent::LyricsUnavailable {
                reason: LyricsUnavailableReason::NoCues
            }
        )));
    }

    #[test]
    fn test_pause_only_from_playing() {
        let (mut c, media) = controller(1);
        c.pause();
        assert_eq!(*c.state(), PlaybackState::Idle);

        c.load_track(0).unwrap();
        c.pause();
        assert_eq!(*c.state(), PlaybackState::Loading);

        c.on_media_started(media.last_ticket());
        c.pause();
        assert_eq!(*c.state(), PlaybackState::Paused);
        assert_eq!(media.calls().last(), Some(&Call::Pause));
    }

    #[test]
    fn test_toggle_play_pause() {
        let (mut c, media) = controller(1);
        c.toggle_play_pause();
        assert!(media.calls().is_empty());

        load_playing(&mut c, &media, 0);
        c.toggle_play_pause();
        assert_eq!(*c.state(), PlaybackState::Paused);

        c.toggle_play_pause();
        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_play_same_url_toggles_and_new_url_loads() {
        let (mut c, media) = controller(2);
        let request = load_playing(&mut c, &media, 0);
        assert!(request.is_some());
        let song0 = MediaRequest::from(&c.playlist()[0]);
        let song1 = MediaRequest::from(&c.playlist()[1]);

        assert_eq!(c.play(song0.clone()), None);
        assert_eq!(*c.state(), PlaybackState::Paused);

        assert_eq!(c.play(song0), None);
        c.on_media_started(media.last_ticket());
        assert_eq!(*c.state(), PlaybackState::Playing);
        assert_eq!(c.session().current_track_index, Some(0));

        let lyrics = c.play(song1).unwrap();
        assert_eq!(lyrics.track_index, 1);
        assert_eq!(c.session().current_track_index, Some(1));
        assert_eq!(*c.state(), PlaybackState::Loading);
    }

    #[test]
    fn test_play_outside_playlist_drops_track_lyrics() {
        let (mut c, media) = controller(2);
        let mut rx = c.subscribe();
        let delivered = load_playing(&mut c, &media, 0).unwrap();
        assert!(c.on_lyrics_fetched(&delivered, Ok("[00:01.00]Track zero".into())));
        assert_eq!(c.session().cues().len(), 1);
        drain(&mut rx);

        let elsewhere = MediaRequest {
            url: "https://elsewhere/x.mp3".into(),
            title: "x".into(),
            artist: String::new(),
        };
        assert_eq!(c.play(elsewhere), None);
        assert_eq!(c.session().current_track_index, None);
        assert_eq!(
            c.session().current_media_url.as_deref(),
            Some("https://elsewhere/x.mp3")
        );
        assert!(c.session().cues().is_empty());
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            PlayerEvent::LyricsUnavailable {
                reason: LyricsUnavailableReason::NoLyricsUrl
            }
        )));

        // Skipping needs a playlist track to step from
        assert_eq!(c.next(), None);
        assert_eq!(c.session().current_track_index, None);
    }

    #[test]
    fn test_play_outside_playlist_discards_in_flight_lyrics() {
        let (mut c, media) = controller(2);
        let in_flight = load_playing(&mut c, &media, 1).unwrap();

        let elsewhere = MediaRequest {
            url: "https://elsewhere/y.mp3".into(),
            title: "y".into(),
            artist: String::new(),
        };
        c.play(elsewhere);
        assert!(!c.on_lyrics_fetched(&in_flight, Ok("[00:01.00]Track one".into())));
        assert!(c.session().cues().is_empty());
    }

    #[test]
    fn test_next_prev_wrap() {
        let (mut c, media) = controller(3);
        load_playing(&mut c, &media, 2);
        c.next();
        assert_eq!(c.session().current_track_index, Some(0));
        c.prev();
        assert_eq!(c.session().current_track_index, Some(2));
        c.prev();
        assert_eq!(c.session().current_track_index, Some(1));
    }

    #[test]
    fn test_skip_without_track_is_noop() {
        let (mut c, media) = controller(3);
        assert_eq!(c.next(), None);
        assert_eq!(c.prev(), None);
        assert_eq!(c.session().current_track_index, None);
        assert!(media.calls().is_empty());

        let media = Arc::new(RecordingMedia::default());
        let mut empty = PlaybackController::new(Vec::new().into(), media);
        assert_eq!(empty.next(), None);
        assert!(empty.load_track(0).is_err());
    }

    #[test]
    fn test_end_of_last_track_wraps_to_first() {
        let (mut c, media) = controller(3);
        let mut rx = c.subscribe();
        load_playing(&mut c, &media, 2);
        drain(&mut rx);

        let request = c.on_media_ended().unwrap();
        assert_eq!(request.track_index, 0);
        assert_eq!(c.session().current_track_index, Some(0));
        assert_eq!(*c.state(), PlaybackState::Loading);

        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);

        let states: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![PlaybackState::Ended, PlaybackState::Loading, PlaybackState::Playing]
        );
    }

    #[test]
    fn test_end_ignored_unless_playing() {
        let (mut c, media) = controller(2);
        c.load_track(0).unwrap();
        assert_eq!(c.on_media_ended(), None);
        assert_eq!(c.session().current_track_index, Some(0));

        c.on_media_started(media.last_ticket());
        c.pause();
        assert_eq!(c.on_media_ended(), None);
    }

    #[test]
    fn test_start_failure_and_retry() {
        let (mut c, media) = controller(1);
        let mut rx = c.subscribe();
        let request = c.load_track(0).unwrap().unwrap();
        c.on_lyrics_fetched(&request, Ok("[00:01.00]Kept".into()));

        assert!(c.on_media_start_failed(media.last_ticket(), "decode error"));
        let PlaybackState::Error(failure) = c.state().clone() else {
            panic!("expected error state");
        };
        assert_eq!(failure.url, "https://cdn/0.mp3");
        assert_eq!(failure.title, "Song 0");
        assert_eq!(failure.artist, "Artist");
        assert!(failure.message.contains("decode error"));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PlayerEvent::RetryVisibility { visible: true })));
        assert!(events.iter().any(|e| matches!(e, PlayerEvent::Error { .. })));

        let loads_before = media.calls().iter().filter(|c| matches!(c, Call::Load(_))).count();
        assert!(c.retry());
        assert_eq!(*c.state(), PlaybackState::Loading);
        assert_eq!(c.session().cues().len(), 1);
        let loads_after = media.calls().iter().filter(|c| matches!(c, Call::Load(_))).count();
        assert_eq!(loads_before, loads_after);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PlayerEvent::RetryVisibility { visible: false })));

        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_toggle_after_start_failure_hides_retry() {
        let (mut c, media) = controller(1);
        c.load_track(0).unwrap();
        assert!(c.on_media_start_failed(media.last_ticket(), "autoplay blocked"));

        let mut rx = c.subscribe();
        c.toggle_play_pause();
        assert_eq!(*c.state(), PlaybackState::Loading);
        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);

        let last_visibility = drain(&mut rx).into_iter().rev().find_map(|e| match e {
            PlayerEvent::RetryVisibility { visible } => Some(visible),
            _ => None,
        });
        assert_eq!(last_visibility, Some(false));
    }

    #[test]
    fn test_resume_same_url_from_error_hides_retry() {
        let (mut c, media) = controller(1);
        c.load_track(0).unwrap();
        c.on_media_start_failed(media.last_ticket(), "network");
        let song = MediaRequest::from(&c.playlist()[0]);

        let mut rx = c.subscribe();
        assert_eq!(c.play(song), None);
        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PlayerEvent::RetryVisibility { visible: false })));
    }

    #[test]
    fn test_retry_only_from_error() {
        let (mut c, media) = controller(1);
        assert!(!c.retry());
        load_playing(&mut c, &media, 0);
        assert!(!c.retry());
    }

    #[test]
    fn test_stale_start_result_ignored() {
        let (mut c, media) = controller(2);
        c.load_track(0).unwrap();
        let first = media.last_ticket();
        c.load_track(1).unwrap();

        assert!(!c.on_media_start_failed(first, "aborted"));
        assert_eq!(*c.state(), PlaybackState::Loading);
        assert!(!c.on_media_started(first));
        assert!(c.on_media_started(media.last_ticket()));
        assert_eq!(*c.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_media_error_while_playing() {
        let (mut c, media) = controller(1);
        c.on_media_error("ignored without a source");
        assert_eq!(*c.state(), PlaybackState::Idle);

        load_playing(&mut c, &media, 0);
        c.on_media_error("network");
        assert!(c.state().is_error());
    }

    #[test]
    fn test_time_advance() {
        let (mut c, media) = controller(1);
        let mut rx = c.subscribe();
        let request = load_playing(&mut c, &media, 0).unwrap();
        c.on_lyrics_fetched(&request, Ok("[00:10.00]a\n[00:10.00]b\n[00:20.00]c".into()));

        assert_eq!(c.on_time_advance(5.0, f64::NAN), None);
        assert_eq!(c.on_time_advance(5.0, 0.0), None);

        let update = c.on_time_advance(15.0, 60.0).unwrap();
        assert!((update.fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(update.elapsed, "0:15");
        assert_eq!(update.duration, "1:00");
        assert_eq!(update.remaining, "0:45");
        assert_eq!(update.active_cue, Some(1));

        assert_eq!(c.on_time_advance(9.999, 60.0).unwrap().active_cue, None);

        drain(&mut rx);
        c.on_time_advance(12.0, 60.0);
        c.on_time_advance(13.0, 60.0);
        let changes = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, PlayerEvent::ActiveCueChanged { .. }))
            .count();
        assert_eq!(changes, 1);
    }

    #[test]
    fn test_seek() {
        let (mut c, media) = controller(1);
        load_playing(&mut c, &media, 0);
        assert!(!c.seek(0.5));

        media.set_duration(Some(200.0));
        assert!(c.seek(0.25));
        assert!(c.seek(1.5));
        assert_eq!(
            media.calls().into_iter().filter(|c| matches!(c, Call::Seek(_))).collect::<Vec<_>>(),
            vec![Call::Seek(50.0), Call::Seek(200.0)]
        );
    }

    #[test]
    fn test_set_volume_clamps() {
        let (mut c, media) = controller(1);
        c.set_volume(1.7);
        assert!((c.volume() - 1.0).abs() < f32::EPSILON);
        c.set_volume(-0.2);
        assert_eq!(media.calls().last(), Some(&Call::Volume(0.0)));

        c.set_volume(0.4);
        c.load_track(0).unwrap();
        assert!(media.calls().contains(&Call::Volume(0.4)));
    }
}
