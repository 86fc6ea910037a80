//! Clip-selection response handling.
//!
//! The clip-selection layer answers with JSON, either `{"clips": [...]}` or
//! a bare list, sometimes wrapped in prose. This module turns that text into
//! clip descriptors and filters out clips the renderer should never see.

use serde_json::Value;
use shortmaker_common::config::ClipBounds;
use shortmaker_common::error::{ShortsError, ShortsResult};
use shortmaker_common::timecode::{parse_seconds, parse_strict};

use crate::clip::ClipDescriptor;

/// Maximum length of a generated output file stem.
pub const MAX_FILENAME_LEN: usize = 50;

/// Parse a clip-selection response into descriptors.
///
/// Entries that are not objects or lack `start_time`/`end_time` are skipped
/// with a warning. Fails when no usable entry remains.
pub fn parse_ai_response(text: &str) -> ShortsResult<Vec<ClipDescriptor>> {
    let data = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(first_err) => {
            let block = extract_object_block(text).ok_or_else(|| {
                ShortsError::parse(format!("response is not valid JSON: {first_err}"))
            })?;
            serde_json::from_str::<Value>(block)
                .map_err(|e| ShortsError::parse(format!("response is not valid JSON: {e}")))?
        }
    };

    let entries = match data {
        Value::Object(mut map) => match map.remove("clips") {
            Some(Value::Array(items)) => items,
            _ => return Err(ShortsError::parse("response has no \"clips\" list")),
        },
        Value::Array(items) => items,
        _ => return Err(ShortsError::parse("response is neither an object nor a list")),
    };

    let clips: Vec<ClipDescriptor> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| descriptor_from_value(i + 1, entry))
        .collect();

    if clips.is_empty() {
        return Err(ShortsError::parse("no clips found in response"));
    }
    Ok(clips)
}

fn extract_object_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn descriptor_from_value(index: usize, entry: &Value) -> Option<ClipDescriptor> {
    let Some(object) = entry.as_object() else {
        tracing::warn!(clip = index, "Skipping clip: expected an object");
        return None;
    };

    let field = |key: &str| -> Option<String> {
        object.get(key).map(|value| match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
    };

    let (Some(start_time), Some(end_time)) = (field("start_time"), field("end_time")) else {
        tracing::warn!(clip = index, "Skipping clip: missing start_time/end_time");
        return None;
    };

    Some(ClipDescriptor {
        start_time,
        end_time,
        title: field("title").unwrap_or_default(),
        reason: field("reason").unwrap_or_default(),
    })
}

/// Keep only clips with strict `HH:MM:SS` bounds, `start < end`, and a
/// duration inside `bounds`.
///
/// Accepted clips come back with canonical timestamps and a non-empty
/// title (`clip_<n>` when the response had none).
pub fn validate_clips(clips: &[ClipDescriptor], bounds: &ClipBounds) -> Vec<ClipDescriptor> {
    clips
        .iter()
        .enumerate()
        .filter_map(|(i, clip)| match validate_clip(clip, bounds) {
            Ok((start, end)) => {
                let title = if clip.title.trim().is_empty() {
                    format!("clip_{}", i + 1)
                } else {
                    clip.title.trim().to_string()
                };
                Some(ClipDescriptor {
                    start_time: start,
                    end_time: end,
                    title,
                    reason: clip.reason.clone(),
                })
            }
            Err(reason) => {
                tracing::warn!(clip = i + 1, title = %clip.title, %reason, "Skipping clip");
                None
            }
        })
        .collect()
}

fn validate_clip(clip: &ClipDescriptor, bounds: &ClipBounds) -> Result<(String, String), String> {
    let start = parse_strict(&clip.start_time)
        .map_err(|_| format!("invalid start_time '{}'; expected HH:MM:SS", clip.start_time))?;
    let end = parse_strict(&clip.end_time)
        .map_err(|_| format!("invalid end_time '{}'; expected HH:MM:SS", clip.end_time))?;

    if start >= end {
        return Err(format!(
            "start_time must be before end_time (got {} >= {})",
            clip.start_time, clip.end_time
        ));
    }

    let duration = end.secs() - start.secs();
    if duration < bounds.min_secs || duration > bounds.max_secs {
        return Err(format!(
            "duration is {duration:.0}s; expected {:.0}-{:.0}s",
            bounds.min_secs, bounds.max_secs
        ));
    }

    Ok((start.canonical(), end.canonical()))
}

/// Drop clips that end after `duration_secs` of source video.
pub fn clips_within(clips: Vec<ClipDescriptor>, duration_secs: f64) -> Vec<ClipDescriptor> {
    clips
        .into_iter()
        .filter(|clip| match parse_seconds(&clip.end_time) {
            Ok(end) if end <= duration_secs => true,
            Ok(_) => {
                tracing::warn!(
                    title = %clip.title,
                    end = %clip.end_time,
                    duration_secs,
                    "Skipping clip past the end of the video"
                );
                false
            }
            Err(err) => {
                tracing::warn!(title = %clip.title, error = %err, "Skipping clip");
                false
            }
        })
        .collect()
}

/// Turn a clip title into a file stem: anything outside `[A-Za-z0-9_-]`
/// becomes `_`, capped at [`MAX_FILENAME_LEN`] characters.
pub fn make_safe_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_fields() {
        let raw = r#"
        {
          "clips": [
            {
              "start_time": " 0:00:15 ",
              "end_time": "00:00:45",
              "title": " Great Hook ",
              "reason": " Strong opening statement "
            }
          ]
        }
        "#;

        let clips = parse_ai_response(raw).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].start_time, "0:00:15");
        assert_eq!(clips[0].title, "Great Hook");
        assert_eq!(clips[0].reason, "Strong opening statement");

        let validated = validate_clips(&clips, &ClipBounds::default());
        assert_eq!(validated[0].start_time, "00:00:15");
        assert_eq!(validated[0].end_time, "00:00:45");
    }

    #[test]
    fn test_parse_extracts_json_from_prose() {
        let raw = "Sure! Here are the clips:\n{\"clips\": [{\"start_time\": \"00:00:10\", \"end_time\": \"00:00:40\", \"title\": \"A\"}]}\nEnjoy.";
        let clips = parse_ai_response(raw).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].reason, "");
    }

    #[test]
    fn test_parse_accepts_bare_list() {
        let raw = r#"[{"start_time": "00:00:10", "end_time": "00:00:40", "title": "A"}]"#;
        assert_eq!(parse_ai_response(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_ai_response("not json at all").unwrap_err();
        assert!(matches!(err, ShortsError::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_clip_list() {
        assert!(parse_ai_response(r#"{"clips": []}"#).is_err());
        assert!(parse_ai_response(r#"{"clips": [{"title": "no times"}]}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_clips() {
        let bounds = ClipBounds::default();
        let clips = vec![
            ClipDescriptor::new("00:61:10", "00:01:40", "Bad minutes"),
            ClipDescriptor::new("00:00:10", "00:00:70", "Bad seconds"),
            ClipDescriptor::new("00:00:35", "00:00:20", "Backwards"),
            ClipDescriptor::new("00:00:10", "00:00:20", "Too short"),
            ClipDescriptor::new("00:00:10", "00:01:20", "Too long"),
            ClipDescriptor::new("00:00:10", "00:00:40", ""),
        ];

        let validated = validate_clips(&clips, &bounds);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].title, "clip_6");
    }

    #[test]
    fn test_validate_reason_messages() {
        let bounds = ClipBounds::default();
        let err = validate_clip(&ClipDescriptor::new("00:00:10", "00:00:20", "x"), &bounds)
            .unwrap_err();
        assert_eq!(err, "duration is 10s; expected 15-60s");

        let err = validate_clip(&ClipDescriptor::new("00:61:10", "00:01:40", "x"), &bounds)
            .unwrap_err();
        assert_eq!(err, "invalid start_time '00:61:10'; expected HH:MM:SS");
    }

    #[test]
    fn test_clips_within_duration() {
        let clips = vec![
            ClipDescriptor::new("00:00:10", "00:00:40", "Inside"),
            ClipDescriptor::new("00:00:30", "00:01:00", "Exactly at end"),
            ClipDescriptor::new("00:00:50", "00:01:20", "Past end"),
        ];
        let kept: Vec<String> = clips_within(clips, 60.0)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(kept, vec!["Inside", "Exactly at end"]);
    }

    #[test]
    fn test_make_safe_filename() {
        assert_eq!(make_safe_filename("Great Hook!"), "Great_Hook_");
        assert_eq!(make_safe_filename("a-b_c"), "a-b_c");
        assert_eq!(make_safe_filename(&"x".repeat(80)).len(), MAX_FILENAME_LEN);
    }
}
