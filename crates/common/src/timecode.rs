//! Timestamp parsing and formatting.
//!
//! Clip boundaries travel as human timestamps (`HH:MM:SS`, `MM:SS`, `SS`,
//! each component optionally fractional). Internally every boundary is a
//! non-negative number of seconds so filter-graph math keeps sub-second
//! precision; the canonical display form drops it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ShortsError, ShortsResult};

/// A non-negative position in a media file, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    /// Build a timestamp from seconds, rejecting negative or non-finite input.
    pub fn from_secs(secs: f64) -> ShortsResult<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ShortsError::invalid_timestamp(
                secs.to_string(),
                "seconds must be finite and non-negative",
            ));
        }
        Ok(Self(secs))
    }

    /// Parse `HH:MM:SS`, `MM:SS` or `SS` (components may be fractional).
    pub fn parse(text: &str) -> ShortsResult<Self> {
        parse_seconds(text).map(Self)
    }

    pub fn secs(self) -> f64 {
        self.0
    }

    /// Canonical `HH:MM:SS` form.
    pub fn canonical(self) -> String {
        format_hms(self.0)
    }

    /// Seconds with up to six decimals, trailing zeros removed.
    pub fn precise(self) -> String {
        format_precise(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for Timestamp {
    type Err = ShortsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a human timestamp into seconds.
///
/// Components are folded big-endian (`acc = acc * 60 + part`), so one, two
/// or three components are accepted.
pub fn parse_seconds(text: &str) -> ShortsResult<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ShortsError::invalid_timestamp(text, "empty timestamp"));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(ShortsError::invalid_timestamp(
            text,
            "expected at most three components",
        ));
    }

    let mut acc = 0.0f64;
    for part in parts {
        let part = part.trim();
        let value = parse_component(part)
            .ok_or_else(|| ShortsError::invalid_timestamp(text, format!("'{part}' is not numeric")))?;
        acc = acc * 60.0 + value;
    }
    Ok(acc)
}

fn parse_component(part: &str) -> Option<f64> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value = part.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parse the strict `HH:MM:SS` form the clip-selection layer is asked to emit.
///
/// Minutes and seconds must be one or two digits and below 60.
pub fn parse_strict(text: &str) -> ShortsResult<Timestamp> {
    let trimmed = text.trim();
    let invalid = || ShortsError::invalid_timestamp(text, "expected HH:MM:SS");

    let parts: Vec<&str> = trimmed.split(':').collect();
    let &[hours, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };

    let digits = |s: &str, max_len: usize| -> Option<u64> {
        if s.is_empty() || s.len() > max_len || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };

    let h = digits(hours, 4).ok_or_else(invalid)?;
    let m = digits(minutes, 2).filter(|m| *m < 60).ok_or_else(invalid)?;
    let s = digits(seconds, 2).filter(|s| *s < 60).ok_or_else(invalid)?;

    Timestamp::from_secs((h * 3600 + m * 60 + s) as f64)
}

/// Format seconds as `HH:MM:SS`, dropping any fractional part.
pub fn format_hms(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Format seconds with six decimals, stripping trailing zeros (`12.5`, `10`).
pub fn format_precise(secs: f64) -> String {
    let text = format!("{secs:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
