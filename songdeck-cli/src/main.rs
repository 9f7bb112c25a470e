mod bridge;
mod commands;
mod media;

use crate::bridge::print_player_events;
use crate::commands::{run_commands, HELP};
use crate::media::SimulatedMedia;
use clap::Parser;
use songdeck_core::{
    CoreError, LyricsSource, PlaybackController, Player, PlaylistHandoff, SongdeckConfig, Track,
};
use songdeck_lyrics_http::HttpLyricsSource;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Play a playlist on a simulated media clock with synchronized lyrics
#[derive(Parser, Debug)]
#[command(name = "songdeck", version, about)]
struct Args {
    /// Player query string, `music=<url-encoded JSON tracks>&index=<n>`
    #[arg(long, conflicts_with = "playlist", required_unless_present = "playlist")]
    query: Option<String>,

    /// JSON file holding an array of tracks
    #[arg(long)]
    playlist: Option<PathBuf>,

    /// Track to start from when reading --playlist
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Simulated length of every track in seconds
    #[arg(long, default_value_t = 180.0)]
    track_secs: f64,

    /// Simulated clock speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

fn main() {
    let args = Args::parse();

    // Check config for logging settings before full config load
    let (file_logging_enabled, filter) = check_logging_config();
    init_tracing(file_logging_enabled, filter.as_deref());

    let config = match SongdeckConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!("Created config template at {}, using defaults", path.display());
            SongdeckConfig::default()
        }
        Err(e) => {
            error!("Failed to load {}: {e}", SongdeckConfig::config_path().display());
            std::process::exit(1);
        }
    };

    if !(args.track_secs.is_finite() && args.track_secs > 0.0) {
        error!("--track-secs must be a positive number");
        std::process::exit(2);
    }
    if !(args.speed.is_finite() && args.speed > 0.0) {
        error!("--speed must be a positive number");
        std::process::exit(2);
    }

    let handoff = match read_handoff(&args) {
        Ok(handoff) => handoff,
        Err(e) => {
            error!("Failed to read playlist: {e}");
            std::process::exit(1);
        }
    };
    let (playlist, start_index) = handoff.into_playlist();
    let playlist = if config.lyrics.enabled {
        playlist
    } else {
        playlist.iter().cloned().map(without_lyrics).collect()
    };
    info!("Loaded playlist with {} track(s)", playlist.len());

    let lyrics_source: Arc<dyn LyricsSource> = match HttpLyricsSource::from_config(&config.lyrics)
    {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    runtime.block_on(async {
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let media = Arc::new(SimulatedMedia::new(args.track_secs, media_tx));

        let mut controller = PlaybackController::new(playlist, media.clone());
        controller.set_volume(config.player.default_volume);
        let events = controller.subscribe();

        let player = Player::new(controller, lyrics_source, Some(cancel_token.clone()));

        let bridge = tokio::spawn(print_player_events(
            player.clone(),
            events,
            cancel_token.clone(),
        ));
        let clock = media.start_clock(
            Duration::from_millis(config.player.tick_interval_ms),
            args.speed,
            cancel_token.clone(),
        );
        let player_loop = player.clone().start(media_rx);
        tokio::spawn(run_commands(
            player.clone(),
            config.player.default_volume,
            cancel_token.clone(),
        ));

        println!("{HELP}");
        if let Err(e) = player.load_track(start_index).await {
            error!("{e}");
            println!("! {e}");
        }

        cancel_token.cancelled().await;
        let _ = tokio::join!(bridge, clock, player_loop);
    });

    // The stdin reader blocks on a runtime thread until the next line
    runtime.shutdown_timeout(Duration::from_millis(200));
    info!("Shut down");
}

/// Build the playlist handoff from `--query` or `--playlist`
fn read_handoff(args: &Args) -> Result<PlaylistHandoff, CoreError> {
    if let Some(query) = &args.query {
        return PlaylistHandoff::from_query(query);
    }
    let Some(path) = &args.playlist else {
        return Err(CoreError::HandoffMissing);
    };
    let content = std::fs::read_to_string(path)?;
    let tracks: Vec<Track> = serde_json::from_str(&content)?;
    Ok(PlaylistHandoff::new(tracks, args.index))
}

fn without_lyrics(mut track: Track) -> Track {
    track.lyrics_url = None;
    track
}

/// Read `[logging]` from the config file without requiring the rest to be valid
fn check_logging_config() -> (bool, Option<String>) {
    // Minimal structs to parse just the logging section
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        filter: Option<String>,
    }

    let config_path = SongdeckConfig::config_path();
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return (false, None);
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| (c.logging.enabled, c.logging.filter))
        .unwrap_or((false, None))
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool, filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or("info")));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = songdeck_core::log_file_path();

        // Create config directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
