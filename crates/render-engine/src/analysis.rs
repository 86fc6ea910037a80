//! Collaborators that inspect the source before rendering.
//!
//! Face detection and silence scanning are pluggable so the renderer can
//! run against fakes in tests and against external tools in production.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use shortmaker_clip_model::clip::ClipRequest;
use shortmaker_common::config::{FaceDetectorConfig, RenderSettings, SilenceSettings};
use shortmaker_common::error::{ShortsError, ShortsResult};
use shortmaker_common::timecode::{format_precise, Timestamp};
use shortmaker_processing_core::framing::UNKNOWN_FACE_X;

use crate::process::{CommandRunner, Invocation};

/// Locates the dominant face in a frame.
pub trait FaceLocator: Send + Sync {
    /// Normalized horizontal face center in `[0, 1]` at `at`, or
    /// [`UNKNOWN_FACE_X`] when no face is found.
    fn locate(&self, video: &Path, at: Timestamp) -> f64;
}

/// Always reports the frame center.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenteredFace;

impl FaceLocator for CenteredFace {
    fn locate(&self, _video: &Path, _at: Timestamp) -> f64 {
        UNKNOWN_FACE_X
    }
}

/// Delegates detection to an external program.
///
/// The program is called as `<program> <args..> <video> <seconds>` and must
/// print the face center as a float on stdout. Any failure falls back to
/// the frame center.
#[derive(Debug, Clone)]
pub struct CommandFaceLocator {
    config: FaceDetectorConfig,
}

impl CommandFaceLocator {
    pub fn new(config: FaceDetectorConfig) -> Self {
        Self { config }
    }

    fn probe(&self, video: &Path, at: Timestamp) -> ShortsResult<f64> {
        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(video)
            .arg(at.precise())
            .output()
            .map_err(|e| {
                ShortsError::process(format!("Failed to start {}: {e}", self.config.program))
            })?;

        if !output.status.success() {
            return Err(ShortsError::process(format!(
                "{} exited with {}",
                self.config.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_face_position(&stdout)
            .ok_or_else(|| ShortsError::parse(format!("no face position in '{}'", stdout.trim())))
    }
}

impl FaceLocator for CommandFaceLocator {
    fn locate(&self, video: &Path, at: Timestamp) -> f64 {
        match self.probe(video, at) {
            Ok(face_x) => face_x,
            Err(err) => {
                tracing::warn!(error = %err, "Face detection failed, centering crop");
                UNKNOWN_FACE_X
            }
        }
    }
}

/// First finite number in `text`, clamped to `[0, 1]`.
fn parse_face_position(text: &str) -> Option<f64> {
    text.split_whitespace()
        .find_map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
        .map(|v| v.clamp(0.0, 1.0))
}

/// Source duration in seconds as reported by `ffprobe`, or `None` when it
/// cannot be determined.
pub fn probe_duration(ffprobe: &str, video: &Path) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(video)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .next()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Produces raw silence-detection output for a clip's source segment.
pub trait SilenceScanner: Send + Sync {
    /// Scan the clip's segment and return the detector log. Marker times
    /// are relative to the clip start.
    fn scan(&self, video: &Path, clip: &ClipRequest) -> ShortsResult<String>;
}

/// Runs ffmpeg's `silencedetect` over the clip segment.
pub struct FfmpegSilenceScanner {
    runner: Arc<dyn CommandRunner>,
    ffmpeg: String,
    noise_db: i32,
    min_silence_secs: f64,
    tail_chars: usize,
}

impl FfmpegSilenceScanner {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        render: &RenderSettings,
        silence: &SilenceSettings,
    ) -> Self {
        Self {
            runner,
            ffmpeg: render.ffmpeg.clone(),
            noise_db: silence.noise_db,
            min_silence_secs: silence.min_silence_secs,
            tail_chars: render.diagnostic_tail_chars,
        }
    }

    pub fn invocation(&self, video: &Path, clip: &ClipRequest) -> Invocation {
        Invocation::new(&self.ffmpeg).args([
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-ss".to_string(),
            clip.start.precise(),
            "-to".to_string(),
            clip.end.precise(),
            "-i".to_string(),
            video.display().to_string(),
            "-af".to_string(),
            format!(
                "silencedetect=noise={}dB:d={}",
                self.noise_db,
                format_precise(self.min_silence_secs)
            ),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ])
    }
}

impl SilenceScanner for FfmpegSilenceScanner {
    fn scan(&self, video: &Path, clip: &ClipRequest) -> ShortsResult<String> {
        let outcome = self.runner.run(&self.invocation(video, clip))?;
        if !outcome.success {
            return Err(ShortsError::process(format!(
                "silence scan failed: {}",
                outcome.stderr_tail(self.tail_chars)
            )));
        }
        Ok(outcome.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutcome;
    use shortmaker_clip_model::clip::ClipDescriptor;

    struct CannedRunner(ProcessOutcome);

    impl CommandRunner for CannedRunner {
        fn run(&self, _invocation: &Invocation) -> ShortsResult<ProcessOutcome> {
            Ok(self.0.clone())
        }
    }

    fn clip() -> ClipRequest {
        ClipRequest::from_descriptor(&ClipDescriptor::new("00:01:00", "00:01:30", "x")).unwrap()
    }

    #[test]
    fn test_parse_face_position() {
        assert_eq!(parse_face_position("0.42\n"), Some(0.42));
        assert_eq!(parse_face_position("face: 1.7"), Some(1.0));
        assert_eq!(parse_face_position("nothing"), None);
        assert_eq!(parse_face_position("NaN 0.3"), Some(0.3));
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("1834.560000\n"), Some(1834.56));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration("0.000000"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_probe_duration_without_ffprobe() {
        assert_eq!(
            probe_duration("definitely-not-ffprobe", Path::new("in.mp4")),
            None
        );
    }

    #[test]
    fn test_centered_face() {
        assert_eq!(CenteredFace.locate(Path::new("in.mp4"), Timestamp::ZERO), 0.5);
    }

    #[test]
    fn test_missing_detector_falls_back_to_center() {
        let locator = CommandFaceLocator::new(FaceDetectorConfig {
            program: "definitely-not-a-face-detector".to_string(),
            args: Vec::new(),
        });
        assert_eq!(locator.locate(Path::new("in.mp4"), Timestamp::ZERO), UNKNOWN_FACE_X);
    }

    #[test]
    fn test_scanner_invocation() {
        let runner = Arc::new(CannedRunner(ProcessOutcome::default()));
        let scanner = FfmpegSilenceScanner::new(
            runner,
            &RenderSettings::default(),
            &SilenceSettings::default(),
        );
        let invocation = scanner.invocation(Path::new("in.mp4"), &clip());

        assert_eq!(invocation.value_of("-ss"), Some("60"));
        assert_eq!(invocation.value_of("-to"), Some("90"));
        assert_eq!(invocation.value_of("-af"), Some("silencedetect=noise=-30dB:d=0.5"));
        assert_eq!(invocation.args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_scanner_returns_stderr_or_error() {
        let ok = FfmpegSilenceScanner::new(
            Arc::new(CannedRunner(ProcessOutcome {
                success: true,
                exit_code: Some(0),
                stderr: "silence_start: 1.0".to_string(),
            })),
            &RenderSettings::default(),
            &SilenceSettings::default(),
        );
        assert_eq!(ok.scan(Path::new("in.mp4"), &clip()).unwrap(), "silence_start: 1.0");

        let failed = FfmpegSilenceScanner::new(
            Arc::new(CannedRunner(ProcessOutcome {
                success: false,
                exit_code: Some(1),
                stderr: "in.mp4: No such file or directory".to_string(),
            })),
            &RenderSettings::default(),
            &SilenceSettings::default(),
        );
        let err = failed.scan(Path::new("in.mp4"), &clip()).unwrap_err();
        assert!(err.to_string().contains("No such file"));
    }
}
