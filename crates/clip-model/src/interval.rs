//! Silence events and keep intervals.
//!
//! Both are measured in seconds from the origin of the scanned segment
//! (0 = clip start), never in absolute source time.

use serde::{Deserialize, Serialize};

/// A detected stretch of silence.
///
/// `end == None` marks a silence that was still running when the scan
/// stopped, i.e. silent until the end of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceEvent {
    pub start: f64,
    pub end: Option<f64>,
}

impl SilenceEvent {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn unterminated(start: f64) -> Self {
        Self { start, end: None }
    }

    /// Pair start and end markers by position.
    ///
    /// Starts without a matching end become unterminated events; surplus
    /// ends are ignored.
    pub fn from_markers(starts: &[f64], ends: &[f64]) -> Vec<Self> {
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| Self {
                start,
                end: ends.get(i).copied(),
            })
            .collect()
    }
}

/// A non-silent span that is kept in the final edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeepInterval {
    pub start: f64,
    pub end: f64,
}

impl KeepInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Shift the interval onto another time origin.
    pub fn offset_by(&self, origin_secs: f64) -> Self {
        Self {
            start: self.start + origin_secs,
            end: self.end + origin_secs,
        }
    }
}

impl From<(f64, f64)> for KeepInterval {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}
