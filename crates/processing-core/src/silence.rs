//! Silence removal planning.
//!
//! A silence scan reports `silence_start:` / `silence_end:` markers in
//! seconds from the scanned segment's start. The resolver turns them into
//! the complementary keep intervals and decides whether a cut is worth
//! making at all.

use shortmaker_clip_model::interval::{KeepInterval, SilenceEvent};
use shortmaker_common::config::SilenceSettings;

const START_MARKER: &str = "silence_start:";
const END_MARKER: &str = "silence_end:";

/// Raw markers collected from a silence-scan log, in log order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilenceLog {
    pub starts: Vec<f64>,
    pub ends: Vec<f64>,
}

impl SilenceLog {
    /// Pair markers into events; a trailing start without an end stays open.
    pub fn events(&self) -> Vec<SilenceEvent> {
        SilenceEvent::from_markers(&self.starts, &self.ends)
    }
}

/// Collect silence markers from `silencedetect` output.
///
/// Lines without a marker, and markers without a readable number, are
/// ignored.
pub fn parse_silence_log(text: &str) -> SilenceLog {
    let mut log = SilenceLog::default();
    for line in text.lines() {
        if let Some(value) = marker_value(line, START_MARKER) {
            log.starts.push(value);
        } else if let Some(value) = marker_value(line, END_MARKER) {
            log.ends.push(value);
        }
    }
    log
}

fn marker_value(line: &str, marker: &str) -> Option<f64> {
    let (_, rest) = line.split_once(marker)?;
    let rest = rest.trim_start();
    // Older ffmpeg prints `%.6g`, so exponent forms like `2.08333e-05` occur.
    let token_len = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
        .unwrap_or(rest.len());
    rest[..token_len].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// What to do with a clip's silence.
#[derive(Debug, Clone, PartialEq)]
pub enum SilenceEdit {
    /// Nothing meaningful to remove; render the clip in one piece.
    Untouched,
    /// Keep only these intervals, in order.
    Cut(Vec<KeepInterval>),
}

impl SilenceEdit {
    pub fn intervals(&self) -> &[KeepInterval] {
        match self {
            SilenceEdit::Untouched => &[],
            SilenceEdit::Cut(intervals) => intervals,
        }
    }

    pub fn is_cut(&self) -> bool {
        matches!(self, SilenceEdit::Cut(_))
    }
}

/// Derives keep intervals from silence events.
#[derive(Debug, Clone)]
pub struct SilenceResolver {
    /// Intervals shorter than this are dropped as encoding noise.
    pub min_keep_secs: f64,
    /// Share of the segment a lone interval must cover to count as full-span.
    pub full_span_ratio: f64,
    /// Edge tolerance for the full-span check.
    pub full_span_epsilon_secs: f64,
}

impl Default for SilenceResolver {
    fn default() -> Self {
        Self::new(&SilenceSettings::default())
    }
}

impl SilenceResolver {
    pub fn new(settings: &SilenceSettings) -> Self {
        Self {
            min_keep_secs: settings.min_keep_secs,
            full_span_ratio: settings.full_span_ratio,
            full_span_epsilon_secs: settings.full_span_epsilon_secs,
        }
    }

    /// Complement of `events` within `[0, duration)`, minus intervals
    /// shorter than `min_keep_secs`.
    pub fn keep_intervals(&self, events: &[SilenceEvent], duration: f64) -> Vec<KeepInterval> {
        if duration.is_nan() || duration <= 0.0 {
            return Vec::new();
        }

        let mut keep = Vec::with_capacity(events.len() + 1);
        let mut cursor = 0.0f64;

        for event in events {
            let silence_start = event.start.clamp(0.0, duration);
            let silence_end = event.end.unwrap_or(duration).clamp(0.0, duration);

            if silence_start > cursor {
                keep.push(KeepInterval::new(cursor, silence_start));
            }
            cursor = cursor.max(silence_start).max(silence_end);
        }

        if cursor < duration {
            keep.push(KeepInterval::new(cursor, duration));
        }

        keep.retain(|interval| interval.duration() >= self.min_keep_secs);
        keep
    }

    /// True when `intervals` describe no real edit: nothing kept, or one
    /// interval covering (nearly) the whole segment.
    pub fn is_degenerate(&self, intervals: &[KeepInterval], duration: f64) -> bool {
        match intervals {
            [] => true,
            [only] => {
                let eps = self.full_span_epsilon_secs;
                only.duration() >= duration * self.full_span_ratio
                    || (only.start <= eps && only.end >= duration - eps)
            }
            _ => false,
        }
    }

    /// Resolve events into an edit decision for a segment of `duration`.
    pub fn resolve(&self, events: &[SilenceEvent], duration: f64) -> SilenceEdit {
        let intervals = self.keep_intervals(events, duration);
        if self.is_degenerate(&intervals, duration) {
            tracing::debug!(
                intervals = intervals.len(),
                duration,
                "No significant silence detected"
            );
            SilenceEdit::Untouched
        } else {
            SilenceEdit::Cut(intervals)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(intervals: &[KeepInterval]) -> Vec<(f64, f64)> {
        intervals.iter().map(|i| (i.start, i.end)).collect()
    }

    #[test]
    fn test_paired_silence() {
        let resolver = SilenceResolver::default();
        let events = vec![SilenceEvent::new(1.0, 2.0), SilenceEvent::new(3.5, 4.0)];
        let keep = resolver.keep_intervals(&events, 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 1.0), (2.0, 3.5), (4.0, 6.0)]);
        assert!(resolver.resolve(&events, 6.0).is_cut());
    }

    #[test]
    fn test_no_silence_is_degenerate() {
        let resolver = SilenceResolver::default();
        let keep = resolver.keep_intervals(&[], 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 6.0)]);
        assert_eq!(resolver.resolve(&[], 6.0), SilenceEdit::Untouched);
    }

    #[test]
    fn test_unterminated_silence_runs_to_end() {
        let resolver = SilenceResolver::default();
        let events = SilenceEvent::from_markers(&[5.0], &[]);
        let keep = resolver.keep_intervals(&events, 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 5.0)]);
    }

    #[test]
    fn test_silence_at_start() {
        let resolver = SilenceResolver::default();
        let keep = resolver.keep_intervals(&[SilenceEvent::new(0.0, 1.5)], 6.0);
        assert_eq!(pairs(&keep), vec![(1.5, 6.0)]);
    }

    #[test]
    fn test_zero_duration_yields_nothing() {
        let resolver = SilenceResolver::default();
        assert!(resolver.keep_intervals(&[], 0.0).is_empty());
        assert!(resolver.keep_intervals(&[], -2.0).is_empty());
        assert_eq!(resolver.resolve(&[], 0.0), SilenceEdit::Untouched);
    }

    #[test]
    fn test_short_gaps_are_dropped() {
        let resolver = SilenceResolver::default();
        let events = vec![SilenceEvent::new(1.0, 2.0), SilenceEvent::new(2.03, 4.0)];
        let keep = resolver.keep_intervals(&events, 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 1.0), (4.0, 6.0)]);
    }

    #[test]
    fn test_events_beyond_duration_are_clamped() {
        let resolver = SilenceResolver::default();
        let events = vec![SilenceEvent::new(4.0, 9.0), SilenceEvent::new(10.0, 11.0)];
        let keep = resolver.keep_intervals(&events, 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 4.0)]);
    }

    #[test]
    fn test_full_span_boundaries() {
        let resolver = SilenceResolver::default();
        assert!(resolver.is_degenerate(&[KeepInterval::new(0.08, 10.0)], 10.0));
        // Under 99%, but both edges sit within the epsilon.
        assert!(resolver.is_degenerate(&[KeepInterval::new(0.04, 0.96)], 1.0));
        assert!(!resolver.is_degenerate(&[KeepInterval::new(0.5, 10.0)], 10.0));
        assert!(!resolver.is_degenerate(
            &[KeepInterval::new(0.0, 1.0), KeepInterval::new(1.5, 10.0)],
            10.0
        ));
    }

    #[test]
    fn test_thresholds_are_tunable() {
        let resolver = SilenceResolver {
            min_keep_secs: 1.0,
            full_span_ratio: 0.5,
            full_span_epsilon_secs: 0.0,
        };
        let events = vec![SilenceEvent::new(0.5, 1.0)];
        // (0.0, 0.5) falls under the 1s floor, (1.0, 6.0) covers > 50%.
        assert_eq!(resolver.resolve(&events, 6.0), SilenceEdit::Untouched);
    }

    #[test]
    fn test_parse_silence_log() {
        let stderr = "
            [silencedetect @ 0x0] silence_start: 1.0
            [silencedetect @ 0x0] silence_end: 2.0 | silence_duration: 1.0
            [silencedetect @ 0x0] silence_start: 3.5
            [silencedetect @ 0x0] silence_end: 4.0 | silence_duration: 0.5
            [silencedetect @ 0x0] silence_start: 5.25
            size=N/A time=00:00:06.00 bitrate=N/A speed= 600x
        ";
        let log = parse_silence_log(stderr);
        assert_eq!(log.starts, vec![1.0, 3.5, 5.25]);
        assert_eq!(log.ends, vec![2.0, 4.0]);
        assert_eq!(log.events().last(), Some(&SilenceEvent::unterminated(5.25)));
    }

    #[test]
    fn test_parse_silence_log_skips_unreadable_markers() {
        let log = parse_silence_log("silence_start: abc\nsilence_start: -0.002\nnoise");
        assert_eq!(log.starts, vec![-0.002]);
        assert!(log.ends.is_empty());
    }

    #[test]
    fn test_parse_silence_log_exponent_markers() {
        let log = parse_silence_log(
            "[silencedetect @ 0x0] silence_start: 2.08333e-05\n\
             [silencedetect @ 0x0] silence_end: 1.5 | silence_duration: 1.49998\n\
             [silencedetect @ 0x0] silence_start: 3E+00",
        );
        assert_eq!(log.starts, vec![2.08333e-05, 3.0]);
        assert_eq!(log.ends, vec![1.5]);

        let keep = SilenceResolver::default().keep_intervals(&log.events(), 6.0);
        assert_eq!(pairs(&keep), vec![(1.5, 3.0)]);
    }

    #[test]
    fn test_end_before_start_never_overlaps() {
        let resolver = SilenceResolver::default();
        let events = vec![SilenceEvent::new(2.0, 1.5), SilenceEvent::new(4.0, 4.5)];
        let keep = resolver.keep_intervals(&events, 6.0);
        assert_eq!(pairs(&keep), vec![(0.0, 2.0), (2.0, 4.0), (4.5, 6.0)]);
        for window in keep.windows(2) {
            assert!(window[0].end <= window[1].start);
        }
    }
}
