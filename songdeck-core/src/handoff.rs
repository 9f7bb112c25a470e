//! Playlist handoff between the song list and the player view.
//!
//! The list page opens the player with a query string of the form
//! `music=<url-encoded JSON array of tracks>&index=<start index>`.

use crate::error::{CoreError, Result};
use crate::playback::{Playlist, Track};
use tracing::debug;

/// Query parameter carrying the JSON track list
pub const MUSIC_PARAM: &str = "music";

/// Query parameter carrying the starting track index
pub const INDEX_PARAM: &str = "index";

/// Track list plus the index to start playing from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandoff {
    pub tracks: Vec<Track>,
    /// Not range-checked here; loading an invalid index reports
    /// [`CoreError::IndexOutOfRange`]
    pub start_index: usize,
}

impl PlaylistHandoff {
    #[must_use]
    pub const fn new(tracks: Vec<Track>, start_index: usize) -> Self {
        Self {
            tracks,
            start_index,
        }
    }

    /// Read a handoff from a query string (with or without the leading `?`).
    ///
    /// A missing or non-numeric index defaults to 0.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HandoffMissing`] if there is no `music` parameter,
    /// [`CoreError::HandoffInvalid`] if it is not a JSON track list and
    /// [`CoreError::InvalidTrackIndex`] for a negative index.
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut music = None;
        let mut index = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                MUSIC_PARAM if music.is_none() => music = Some(value.into_owned()),
                INDEX_PARAM if index.is_none() => index = Some(value.into_owned()),
                _ => {}
            }
        }

        let music = music.ok_or(CoreError::HandoffMissing)?;
        let tracks: Vec<Track> = serde_json::from_str(&music)?;
        let start_index = index.as_deref().map_or(Ok(0), parse_index)?;

        debug!(
            "Read playlist handoff with {} track(s), starting at {}",
            tracks.len(),
            start_index
        );
        Ok(Self {
            tracks,
            start_index,
        })
    }

    /// Build the player query string for this handoff (without the `?`)
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HandoffInvalid`] if the tracks cannot be serialized.
    pub fn to_query(&self) -> Result<String> {
        let json = serde_json::to_string(&self.tracks)?;
        Ok(format!(
            "{MUSIC_PARAM}={}&{INDEX_PARAM}={}",
            urlencoding::encode(&json),
            self.start_index
        ))
    }

    /// Hand the tracks over as a read-only playlist
    #[must_use]
    pub fn into_playlist(self) -> (Playlist, usize) {
        (self.tracks.into(), self.start_index)
    }
}

/// Leading integer of `value`, or 0 when there are no digits.
///
/// Values too large for any playlist saturate and are rejected at load time.
fn parse_index(value: &str) -> Result<usize> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);

    if digits.is_empty() {
        return Ok(0);
    }
    if negative && digits.bytes().any(|b| b != b'0') {
        return Err(CoreError::InvalidTrackIndex {
            value: value.to_string(),
        });
    }
    Ok(digits.parse().unwrap_or(usize::MAX))
}
