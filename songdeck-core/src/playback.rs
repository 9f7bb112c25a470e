use crate::lrc::{LyricCue, Lyrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A song in the playlist, as handed over by the list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Playable media resource
    #[serde(rename = "url", alias = "mediaUrl")]
    pub media_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_url: Option<String>,
    /// Original upload file name, used for download naming
    #[serde(default, alias = "musicFileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Upload time
    #[serde(
        default,
        rename = "timestamp",
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Track {
    /// Create a track with only the required fields
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            media_url: media_url.into(),
            cover_url: None,
            lyrics_url: None,
            file_name: None,
            uploaded_at: None,
        }
    }

    #[must_use]
    pub fn with_lyrics_url(mut self, url: impl Into<String>) -> Self {
        self.lyrics_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Extension of the uploaded file name (text after the last dot)
    #[must_use]
    pub fn file_extension(&self) -> Option<&str> {
        let name = self.file_name.as_deref()?;
        name.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Suggested file name for downloading the media, e.g. `Song.mp3`
    #[must_use]
    pub fn download_name(&self) -> String {
        match self.file_extension() {
            Some(ext) => format!("{}.{ext}", self.title),
            None => self.title.clone(),
        }
    }

    /// Upload time formatted as `YYYY/MM/DD HH:MM` (UTC)
    #[must_use]
    pub fn uploaded_at_display(&self) -> Option<String> {
        self.uploaded_at
            .map(|at| at.format("%Y/%m/%d %H:%M").to_string())
    }
}

/// Read-only ordered list of tracks; order is playback order
pub type Playlist = Arc<[Track]>;

/// Details of a track whose media failed to start, kept for retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFailure {
    pub url: String,
    pub title: String,
    pub artist: String,
    pub message: String,
}

/// Transport state of the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Error(PlaybackFailure),
}

impl PlaybackState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The single live playback session of the player view
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    pub current_track_index: Option<usize>,
    pub current_media_url: Option<String>,
    pub state: PlaybackState,
    /// Cues for the current track; empty until lyrics arrive
    pub lyrics: Lyrics,
}

impl PlaybackSession {
    #[must_use]
    pub fn cues(&self) -> &[LyricCue] {
        &self.lyrics.cues
    }
}
