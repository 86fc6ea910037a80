//! Encoder selection and fallback.
//!
//! A clip is encoded on the VAAPI device when one is usable and re-encoded
//! in software if that fails. The attempt sequence is a small state
//! machine:
//!
//! ```text
//! start ─┬─ hardware available ──► TryHardware ─┬─ ok ──► Done
//!        │                                      └─ fail ─┐
//!        └─ unavailable ────────► SkipHardware ──────────┤
//!                                                        ▼
//!                                          TrySoftware ─┬─ ok ──► Done
//!                                                       └─ fail ► Failed
//! ```
//!
//! There are at most two attempts per clip. A render only counts as
//! successful if the output file exists and is non-empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shortmaker_common::config::RenderSettings;
use shortmaker_common::error::{ShortsError, ShortsResult};

use crate::command::{EncodePath, RenderCommand, RenderTarget};
use crate::graph::FilterGraph;
use crate::process::CommandRunner;

/// Whether the hardware encode path may be attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareSupport {
    Available { device: PathBuf },
    Unavailable { reason: String },
}

impl HardwareSupport {
    /// Probe the configured render device.
    ///
    /// The device must exist and open for reading and writing, unless
    /// hardware encoding is disabled in configuration.
    pub fn detect(settings: &RenderSettings) -> Self {
        if !settings.hardware_enabled {
            return Self::Unavailable {
                reason: "hardware encoding disabled".to_string(),
            };
        }

        let device = &settings.vaapi_device;
        if !device.exists() {
            return Self::Unavailable {
                reason: format!("{} not found", device.display()),
            };
        }

        match OpenOptions::new().read(true).write(true).open(device) {
            Ok(_) => Self::Available {
                device: device.clone(),
            },
            Err(err) => Self::Unavailable {
                reason: format!("{} not accessible: {err}", device.display()),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// One encode attempt, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeAttempt {
    pub path: EncodePath,
    pub succeeded: bool,
    pub exit_code: Option<i32>,
}

/// Result of dispatching one clip.
#[derive(Debug)]
pub struct EncodeReport {
    pub attempts: Vec<EncodeAttempt>,
    /// Encoder that produced the output, or the final failure.
    pub result: ShortsResult<EncodePath>,
}

enum EncodeState {
    TryHardware,
    SkipHardware,
    TrySoftware,
    Done(EncodePath),
    Failed(ShortsError),
}

/// Runs render commands with hardware-then-software fallback.
pub struct EncodeDispatcher<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a RenderSettings,
    hardware: &'a HardwareSupport,
}

impl<'a> EncodeDispatcher<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        settings: &'a RenderSettings,
        hardware: &'a HardwareSupport,
    ) -> Self {
        Self {
            runner,
            settings,
            hardware,
        }
    }

    /// Encode `graph` for `target`.
    ///
    /// On final failure any partial output file is removed.
    pub fn dispatch(&self, target: RenderTarget<'_>, graph: &FilterGraph) -> EncodeReport {
        let mut attempts = Vec::with_capacity(2);
        let mut state = if self.hardware.is_available() {
            EncodeState::TryHardware
        } else {
            EncodeState::SkipHardware
        };

        let result = loop {
            state = match state {
                EncodeState::SkipHardware => {
                    if let HardwareSupport::Unavailable { reason } = self.hardware {
                        tracing::info!(
                            title = %target.clip.title,
                            %reason,
                            "Hardware encoder unavailable, using software"
                        );
                    }
                    EncodeState::TrySoftware
                }
                EncodeState::TryHardware => {
                    let command = RenderCommand::hardware(self.settings, target, graph);
                    match self.attempt(&command, &mut attempts) {
                        Ok(()) => EncodeState::Done(EncodePath::Hardware),
                        Err(err) => {
                            tracing::warn!(
                                title = %target.clip.title,
                                stage = "encode",
                                error = %err,
                                "Hardware encode failed, retrying in software"
                            );
                            EncodeState::TrySoftware
                        }
                    }
                }
                EncodeState::TrySoftware => {
                    let command = RenderCommand::software(self.settings, target, graph);
                    match self.attempt(&command, &mut attempts) {
                        Ok(()) => EncodeState::Done(EncodePath::Software),
                        Err(err) => EncodeState::Failed(err),
                    }
                }
                EncodeState::Done(path) => break Ok(path),
                EncodeState::Failed(err) => break Err(err),
            };
        };

        if result.is_err() {
            discard_partial_output(target.output);
        }

        EncodeReport { attempts, result }
    }

    fn attempt(
        &self,
        command: &RenderCommand,
        attempts: &mut Vec<EncodeAttempt>,
    ) -> ShortsResult<()> {
        tracing::info!(
            encoder = command.path.as_str(),
            attempt = attempts.len() + 1,
            output = %command.output_path.display(),
            "Encoding clip"
        );

        let failure = |message: String| match command.path {
            EncodePath::Hardware => ShortsError::hardware_encode(message),
            EncodePath::Software => ShortsError::software_encode(message),
        };

        let outcome = match self.runner.run(&command.invocation) {
            Ok(outcome) => outcome,
            Err(err) => {
                attempts.push(EncodeAttempt {
                    path: command.path,
                    succeeded: false,
                    exit_code: None,
                });
                return Err(failure(err.to_string()));
            }
        };

        let verified = if outcome.success {
            verify_output(&command.output_path)
        } else {
            let code = outcome
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(failure(format!(
                "ffmpeg exited with {code}: {}",
                outcome.stderr_tail(self.settings.diagnostic_tail_chars)
            )))
        };

        attempts.push(EncodeAttempt {
            path: command.path,
            succeeded: verified.is_ok(),
            exit_code: outcome.exit_code,
        });
        verified
    }
}

fn verify_output(path: &Path) -> ShortsResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(ShortsError::EmptyOutputArtifact {
            path: path.to_path_buf(),
        }),
    }
}

fn discard_partial_output(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to remove partial output")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_hardware_is_unavailable() {
        let settings = RenderSettings {
            hardware_enabled: false,
            ..RenderSettings::default()
        };
        assert_eq!(
            HardwareSupport::detect(&settings),
            HardwareSupport::Unavailable {
                reason: "hardware encoding disabled".to_string()
            }
        );
    }

    #[test]
    fn test_missing_device_is_unavailable() {
        let settings = RenderSettings {
            vaapi_device: PathBuf::from("/nonexistent/dri/renderD999"),
            ..RenderSettings::default()
        };
        let support = HardwareSupport::detect(&settings);
        assert!(!support.is_available());
    }

    #[test]
    fn test_verify_output_rejects_empty_file() {
        let dir = std::env::temp_dir().join(format!("shortmaker-verify-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let empty = dir.join("empty.mp4");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            verify_output(&empty),
            Err(ShortsError::EmptyOutputArtifact { .. })
        ));
        assert!(verify_output(&dir.join("missing.mp4")).is_err());

        let full = dir.join("full.mp4");
        std::fs::write(&full, b"data").unwrap();
        assert!(verify_output(&full).is_ok());

        let _ = std::fs::remove_dir_all(dir);
    }
}
