pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod handoff;
pub mod lrc;
pub mod media;
pub mod paths;
pub mod playback;
pub mod player;
pub mod source;
pub mod time;

pub use config::{LoggingConfig, LyricsConfig, PlayerConfig, SongdeckConfig, CONFIG_TEMPLATE};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use controller::{LyricsRequest, MediaRequest, PlaybackController};
pub use error::CoreError;
pub use events::{LyricsUnavailableReason, PlayerEvent, ProgressUpdate};
pub use handoff::PlaylistHandoff;
pub use lrc::{active_index, LyricCue, Lyrics};
pub use media::{MediaElement, MediaEvent, StartTicket};
pub use paths::{config_dir, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::{PlaybackFailure, PlaybackSession, PlaybackState, Playlist, Track};
pub use player::Player;
pub use source::LyricsSource;
pub use time::format_clock;
