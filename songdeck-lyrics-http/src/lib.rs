use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use songdeck_core::{CoreError, LyricsConfig, LyricsSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const LOG_TARGET: &str = "songdeck::lyrics::http";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_USER_AGENT: &str = "songdeck/0.1";

/// Fetches lyrics text over HTTP(S), or from disk for `file://` URLs and plain paths
pub struct HttpLyricsSource {
    client: ClientWithMiddleware,
}

impl HttpLyricsSource {
    /// Create a source with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::build(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_MAX_RETRIES,
            DEFAULT_USER_AGENT,
        )
    }

    /// Create a source from the `[lyrics]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &LyricsConfig) -> Result<Self, CoreError> {
        Self::build(
            Duration::from_secs(config.request_timeout_secs),
            config.max_retries,
            &config.user_agent,
        )
    }

    fn build(timeout: Duration, max_retries: u32, user_agent: &str) -> Result<Self, CoreError> {
        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| CoreError::LyricsFetchFailed {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &str) -> Result<String, CoreError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(url, e))?;

        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "Lyrics request returned status: {}", response.status());
            return Err(fetch_failed(
                url,
                format!("server returned status {}", response.status()),
            ));
        }

        response.text().await.map_err(|e| fetch_failed(url, e))
    }

    async fn fetch_file(path: PathBuf, url: &str) -> Result<String, CoreError> {
        debug!(target: LOG_TARGET, "Reading lyrics file {}", path.display());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| fetch_failed(url, e))
    }
}

/// Where a lyrics URL points
#[derive(Debug, PartialEq, Eq)]
enum Location {
    Http,
    File(PathBuf),
}

fn locate(url: &str) -> Result<Location, CoreError> {
    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(Location::Http),
            "file" => parsed
                .to_file_path()
                .map(Location::File)
                .map_err(|()| fetch_failed(url, "not a valid file URL")),
            // Windows drive letters parse as a one-letter scheme
            scheme if scheme.len() == 1 => Ok(Location::File(PathBuf::from(url))),
            scheme => Err(fetch_failed(url, format!("unsupported scheme '{scheme}'"))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Location::File(PathBuf::from(url))),
        Err(e) => Err(fetch_failed(url, e)),
    }
}

fn fetch_failed(url: &str, reason: impl std::fmt::Display) -> CoreError {
    CoreError::LyricsFetchFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl LyricsSource for HttpLyricsSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_text(&self, url: &str) -> Result<String, CoreError> {
        info!(target: LOG_TARGET, "Fetching lyrics from {}", url);

        let text = match locate(url)? {
            Location::Http => self.fetch_http(url).await?,
            Location::File(path) => Self::fetch_file(path, url).await?,
        };

        debug!(target: LOG_TARGET, "Fetched {} bytes of lyrics", text.len());
        Ok(text)
    }
}
