//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ShortsError, ShortsResult};

/// Environment variable that disables the hardware encode path.
pub const ENV_DISABLE_VAAPI: &str = "SHORT_MAKER_DISABLE_VAAPI";

/// Environment variable that points at a preferred font file.
pub const ENV_FONT_FILE: &str = "SHORT_MAKER_FONT_FILE";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where rendered clips are written.
    pub output_dir: PathBuf,

    /// Whether silent stretches are cut from clips by default.
    pub remove_silence: bool,

    /// Encoder and overlay settings.
    pub render: RenderSettings,

    /// Silence detection and keep-interval thresholds.
    pub silence: SilenceSettings,

    /// Accepted clip durations for AI-selected clips.
    pub clip_bounds: ClipBounds,

    /// External face detector. `None` means every clip is center-cropped.
    pub face_detector: Option<FaceDetectorConfig>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Encoder, device and font settings used when building render commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// ffmpeg executable name or path.
    pub ffmpeg: String,

    /// ffprobe executable name or path.
    pub ffprobe: String,

    /// VAAPI render node used for hardware encoding.
    pub vaapi_device: PathBuf,

    /// Set to false to always encode on the CPU.
    pub hardware_enabled: bool,

    /// Playback speed factor applied to video and audio alike.
    pub speed: f64,

    /// Preferred font file for drawn text, tried before `font_candidates`.
    pub font_file: Option<PathBuf>,

    /// Font search order when `font_file` is unset or missing.
    pub font_candidates: Vec<PathBuf>,

    /// Maximum number of characters of encoder stderr kept on failure.
    pub diagnostic_tail_chars: usize,
}

/// Thresholds for silence detection and removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceSettings {
    /// Noise floor passed to `silencedetect`, in dB.
    pub noise_db: i32,

    /// Minimum silence length reported by the scanner, in seconds.
    pub min_silence_secs: f64,

    /// Keep intervals shorter than this are dropped.
    pub min_keep_secs: f64,

    /// A single keep interval covering at least this share of the clip
    /// counts as "nothing to remove".
    pub full_span_ratio: f64,

    /// Edge tolerance for the full-span check, in seconds.
    pub full_span_epsilon_secs: f64,
}

/// Duration bounds for clips proposed by the clip-selection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipBounds {
    pub min_secs: f64,
    pub max_secs: f64,
}

/// External face detector invocation: `program [args..] <video> <seconds>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDetectorConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "shortmaker=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./shorts_clips"),
            remove_silence: false,
            render: RenderSettings::default(),
            silence: SilenceSettings::default(),
            clip_bounds: ClipBounds::default(),
            face_detector: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            vaapi_device: PathBuf::from("/dev/dri/renderD128"),
            hardware_enabled: true,
            speed: 1.2,
            font_file: None,
            font_candidates: [
                "/usr/share/fonts/TTF/Arialbd.TTF",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
                "/Library/Fonts/Arial Bold.ttf",
                "C:/Windows/Fonts/arialbd.ttf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            diagnostic_tail_chars: 500,
        }
    }
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            noise_db: -30,
            min_silence_secs: 0.5,
            min_keep_secs: 0.05,
            full_span_ratio: 0.99,
            full_span_epsilon_secs: 0.05,
        }
    }
}

impl Default for ClipBounds {
    fn default() -> Self {
        Self {
            min_secs: 15.0,
            max_secs: 60.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// Environment overrides are applied on top of whatever was loaded.
    pub fn load() -> Self {
        let config_path = config_file_path();
        let mut config = Self::default();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(loaded) => config = loaded,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        config.apply_env_overrides();
        config
    }

    /// Load config from an explicit path. A missing or malformed file is an error.
    pub fn load_from(path: &Path) -> ShortsResult<Self> {
        if !path.exists() {
            return Err(ShortsError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            ShortsError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `SHORT_MAKER_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_DISABLE_VAAPI) {
            if matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                self.render.hardware_enabled = false;
            }
        }
        if let Some(font) = lookup(ENV_FONT_FILE).filter(|v| !v.trim().is_empty()) {
            self.render.font_file = Some(PathBuf::from(font));
        }
    }
}

impl RenderSettings {
    /// Find the first existing font file: the override, then the candidates.
    ///
    /// `None` means drawn text falls back to ffmpeg's default font.
    pub fn resolve_font(&self) -> Option<PathBuf> {
        self.font_file
            .iter()
            .chain(self.font_candidates.iter())
            .find(|candidate| candidate.is_file())
            .cloned()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("shortmaker").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_render_constants() {
        let config = AppConfig::default();
        assert!((config.render.speed - 1.2).abs() < f64::EPSILON);
        assert_eq!(config.render.vaapi_device, PathBuf::from("/dev/dri/renderD128"));
        assert_eq!(config.silence.min_keep_secs, 0.05);
        assert_eq!(config.render.diagnostic_tail_chars, 500);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"remove_silence": true, "render": {"speed": 1.5}}"#).unwrap();
        assert!(config.remove_silence);
        assert!((config.render.speed - 1.5).abs() < f64::EPSILON);
        assert!(config.render.hardware_enabled);
        assert_eq!(config.clip_bounds.max_secs, 60.0);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| match key {
            ENV_DISABLE_VAAPI => Some(" Yes ".to_string()),
            ENV_FONT_FILE => Some("/fonts/custom.ttf".to_string()),
            _ => None,
        });
        assert!(!config.render.hardware_enabled);
        assert_eq!(config.render.font_file, Some(PathBuf::from("/fonts/custom.ttf")));
    }

    #[test]
    fn test_disable_flag_ignores_other_values() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| (key == ENV_DISABLE_VAAPI).then(|| "0".to_string()));
        assert!(config.render.hardware_enabled);
    }

    #[test]
    fn test_resolve_font_missing_everywhere() {
        let settings = RenderSettings {
            font_file: Some(PathBuf::from("/nonexistent/shortmaker-font.ttf")),
            font_candidates: vec![PathBuf::from("/nonexistent/other.ttf")],
            ..RenderSettings::default()
        };
        assert_eq!(settings.resolve_font(), None);
    }

    #[test]
    fn test_resolve_font_prefers_override() {
        let font = std::env::temp_dir().join("shortmaker-config-test-font.ttf");
        std::fs::write(&font, b"font").unwrap();
        let settings = RenderSettings {
            font_file: Some(font.clone()),
            ..RenderSettings::default()
        };
        assert_eq!(settings.resolve_font(), Some(font.clone()));
        std::fs::remove_file(font).ok();
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from(Path::new("/nonexistent/shortmaker.json")).unwrap_err();
        assert!(matches!(err, ShortsError::FileNotFound { .. }));
    }
}
