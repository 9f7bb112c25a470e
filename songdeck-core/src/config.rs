use crate::error::{CoreError, Result};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_VOLUME: f32 = 1.0;
const DEFAULT_TICK_INTERVAL_MS: u64 = 250;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_USER_AGENT: &str = "songdeck/0.1";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongdeckConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial output volume, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    /// How often the host media element reports playback position
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

const fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

const fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_true() -> bool {
    true
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/songdeck/songdeck.log`
    #[serde(default)]
    pub enabled: bool,
    /// Env-filter directive, overridden by `RUST_LOG`
    #[serde(default)]
    pub filter: Option<String>,
}

impl SongdeckConfig {
    /// Get the config file path (~/.config/songdeck/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location or create the template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing a template on first
    /// run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path` or create the template there
    ///
    /// # Errors
    ///
    /// See [`SongdeckConfig::load_or_create`].
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;
            info!("Wrote config template to {}", path.display());

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.player.default_volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "player.default_volume must be between 0.0 and 1.0, got {}",
                    self.player.default_volume
                ),
            });
        }
        if self.player.tick_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.tick_interval_ms must be greater than 0".into(),
            });
        }
        if self.lyrics.request_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.request_timeout_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# Songdeck Configuration
# ~/.config/songdeck/config.toml

[player]
# Initial volume, 0.0 to 1.0
default_volume = 1.0
# Playback position update interval in milliseconds
tick_interval_ms = "#,
    DEFAULT_TICK_INTERVAL_MS,
    r#"

[lyrics]
enabled = true
request_timeout_secs = "#,
    DEFAULT_REQUEST_TIMEOUT_SECS,
    "\nmax_retries = ",
    DEFAULT_MAX_RETRIES,
    "\nuser_agent = \"",
    DEFAULT_USER_AGENT,
    r#""

[logging]
# Also write logs to ~/.config/songdeck/songdeck.log
enabled = false
# filter = "info,songdeck=debug"
"#
);
