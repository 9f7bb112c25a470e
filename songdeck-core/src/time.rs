//! Playback clock formatting.

/// Format seconds as `m:ss` for the transport display.
///
/// Minutes are not padded and grow past 59 (`75:03`). Fractions are floored.
/// Negative or non-finite input renders as `0:00`.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    format!("{}:{:02}", total / 60, total % 60)
}

/// Floor a playback position to whole seconds, saturating at `u64::MAX`
#[must_use]
pub fn whole_seconds(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let floored = seconds.floor() as u64;
    floored
}

/// Whether a media duration is usable for progress and seeking
#[must_use]
pub fn is_known_duration(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}
