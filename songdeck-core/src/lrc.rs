//! Timed lyrics parsing and active-line resolution.
//!
//! Lines carry a `[MM:SS.ff]` or `[MM:SS.fff]` prefix followed by the lyric
//! text. Anything else in the file (ID tags, blank lines, malformed stamps) is
//! skipped without error.

/// A single timed lyric line
#[derive(Debug, Clone, PartialEq)]
pub struct LyricCue {
    /// Start time in seconds from the beginning of the track
    pub time: f64,
    /// Display text, trimmed and never empty
    pub text: String,
}

/// Parsed lyrics for one track, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lyrics {
    pub cues: Vec<LyricCue>,
}

impl Lyrics {
    /// Parse timed lyrics text.
    ///
    /// Cues keep the order they appear in the input. They are not sorted, so a
    /// file with out-of-order stamps yields out-of-order cues. An input with no
    /// usable lines yields empty lyrics rather than an error.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let cues = input
            .lines()
            .filter_map(|line| {
                let (time, text) = parse_timestamp_prefix(line.trim_start())?;
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(LyricCue {
                    time,
                    text: text.to_string(),
                })
            })
            .collect();

        Self { cues }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Index of the cue active at `position` seconds
    #[must_use]
    pub fn active_index(&self, position: f64) -> Option<usize> {
        active_index(&self.cues, position)
    }
}

/// Resolve the active cue for a playback position.
///
/// Scans from the first cue and stops at the first cue that starts after
/// `position`; the cue just before it is active. With tied start times the
/// later of the tied cues wins. Returns `None` when `position` precedes the
/// first cue, the list is empty, or `position` is NaN.
#[must_use]
pub fn active_index(cues: &[LyricCue], position: f64) -> Option<usize> {
    cues.iter()
        .take_while(|cue| cue.time <= position)
        .count()
        .checked_sub(1)
}

/// Parse a `[MM:SS.ff]` / `[MM:SS.fff]` prefix into seconds plus the remaining text
fn parse_timestamp_prefix(line: &str) -> Option<(f64, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, text) = rest.split_once(']')?;

    let (minutes, rest) = stamp.split_once(':')?;
    let (seconds, fraction) = rest.split_once('.')?;

    if minutes.len() != 2 || seconds.len() != 2 {
        return None;
    }
    let divisor = match fraction.len() {
        2 => 100.0,
        3 => 1000.0,
        _ => return None,
    };

    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    let fraction = parse_digits(fraction)?;

    let time = f64::from(minutes * 60 + seconds) + f64::from(fraction) / divisor;
    Some((time, text))
}

fn parse_digits(s: &str) -> Option<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
