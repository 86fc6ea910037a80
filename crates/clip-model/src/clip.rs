//! Clip descriptors and validated clip requests.

use serde::{Deserialize, Serialize};
use shortmaker_common::error::{ShortsError, ShortsResult};
use shortmaker_common::Timestamp;

/// A clip as proposed by the clip-selection layer or typed by a user.
///
/// Timestamps are kept as text until [`ClipRequest::from_descriptor`]
/// validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub start_time: String,
    pub end_time: String,

    #[serde(default)]
    pub title: String,

    /// Why the clip was picked. Informational only.
    #[serde(default)]
    pub reason: String,
}

impl ClipDescriptor {
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            title: title.into(),
            reason: String::new(),
        }
    }
}

/// A validated clip: both boundaries parsed and `start < end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub start: Timestamp,
    pub end: Timestamp,
    pub title: String,
}

impl ClipRequest {
    pub fn new(start: Timestamp, end: Timestamp, title: impl Into<String>) -> ShortsResult<Self> {
        if start >= end {
            return Err(ShortsError::invalid_range(format!(
                "start {} must be before end {}",
                start.precise(),
                end.precise()
            )));
        }
        Ok(Self {
            start,
            end,
            title: title.into(),
        })
    }

    /// Parse and check a raw descriptor.
    pub fn from_descriptor(descriptor: &ClipDescriptor) -> ShortsResult<Self> {
        let start = Timestamp::parse(&descriptor.start_time)?;
        let end = Timestamp::parse(&descriptor.end_time)?;
        Self::new(start, end, descriptor.title.trim())
    }

    pub fn duration_secs(&self) -> f64 {
        self.end.secs() - self.start.secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_descriptor() {
        let clip =
            ClipRequest::from_descriptor(&ClipDescriptor::new("00:00:10", "00:00:30", " Great Hook "))
                .unwrap();
        assert_eq!(clip.start.secs(), 10.0);
        assert_eq!(clip.end.secs(), 30.0);
        assert_eq!(clip.title, "Great Hook");
        assert_eq!(clip.duration_secs(), 20.0);
    }

    #[test]
    fn test_equal_bounds_rejected() {
        let err = ClipRequest::from_descriptor(&ClipDescriptor::new("00:00:10", "00:00:10", "x"))
            .unwrap_err();
        assert!(matches!(err, ShortsError::InvalidRange { .. }));
    }

    #[test]
    fn test_unparseable_bounds_rejected() {
        let err = ClipRequest::from_descriptor(&ClipDescriptor::new("bad", "00:00:10", "x"))
            .unwrap_err();
        assert!(matches!(err, ShortsError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_descriptor_deserializes_without_reason() {
        let descriptor: ClipDescriptor = serde_json::from_str(
            r#"{"start_time": "00:00:10", "end_time": "00:00:40", "title": "Missing reason"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.reason, "");
    }
}
