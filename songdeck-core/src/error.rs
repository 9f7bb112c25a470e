use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it if needed and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Playlist errors
    #[error("Track index {index} is out of range for a playlist of {len} track(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid track index {value}")]
    InvalidTrackIndex { value: String },

    #[error("No music data found in the player link")]
    HandoffMissing,

    #[error("Invalid music data: {0}")]
    HandoffInvalid(#[from] serde_json::Error),

    // Lyrics errors
    #[error("Failed to fetch lyrics from {url}: {reason}")]
    LyricsFetchFailed { url: String, reason: String },

    // Media errors
    #[error("Playback of {url} failed: {reason}")]
    MediaStartFailed { url: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
