//! Lyrics transport seam.

use crate::error::CoreError;
use async_trait::async_trait;

/// Fetches the raw text of a lyrics resource.
///
/// Implementations only move bytes; parsing happens in
/// [`Lyrics::parse`](crate::Lyrics::parse). A failed fetch is reported as
/// [`CoreError::LyricsFetchFailed`] and never blocks playback.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the lyrics text at `url`
    async fn fetch_text(&self, url: &str) -> Result<String, CoreError>;
}
