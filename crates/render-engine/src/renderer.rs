//! Per-clip render orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use shortmaker_clip_model::clip::{ClipDescriptor, ClipRequest};
use shortmaker_common::config::{AppConfig, RenderSettings};
use shortmaker_common::error::{ShortsError, ShortsResult};
use shortmaker_processing_core::framing::CropGeometry;
use shortmaker_processing_core::silence::{parse_silence_log, SilenceEdit, SilenceResolver};

use crate::analysis::{
    CenteredFace, CommandFaceLocator, FaceLocator, FfmpegSilenceScanner, SilenceScanner,
};
use crate::builder::{FilterGraphBuilder, GraphRequest};
use crate::command::{EncodePath, RenderTarget};
use crate::dispatch::{EncodeAttempt, EncodeDispatcher, HardwareSupport};
use crate::process::{diagnostic_tail, CommandRunner};

/// Where a render stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Validating,
    Framing,
    SilenceScan,
    BuildingGraph,
    Preparing,
    Encoding,
    Complete,
}

/// Why a render failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFailure {
    InvalidTimestamp,
    InvalidRange,
    InvalidGraph,
    HardwareEncodeFailure,
    SoftwareEncodeFailure,
    EmptyOutputArtifact,
    Io,
}

impl From<&ShortsError> for RenderFailure {
    fn from(err: &ShortsError) -> Self {
        match err {
            ShortsError::InvalidTimestamp { .. } => Self::InvalidTimestamp,
            ShortsError::InvalidRange { .. } => Self::InvalidRange,
            ShortsError::Graph { .. } => Self::InvalidGraph,
            ShortsError::HardwareEncodeFailure { .. } => Self::HardwareEncodeFailure,
            ShortsError::SoftwareEncodeFailure { .. } => Self::SoftwareEncodeFailure,
            ShortsError::EmptyOutputArtifact { .. } => Self::EmptyOutputArtifact,
            _ => Self::Io,
        }
    }
}

/// Outcome of rendering one clip.
#[derive(Debug, Clone, Serialize)]
pub struct RenderResult {
    pub title: String,
    pub succeeded: bool,
    pub output_path: PathBuf,
    /// Encoder that produced the output.
    pub encoder: Option<EncodePath>,
    pub stage: RenderStage,
    pub failure: Option<RenderFailure>,
    /// Tail of the failing process's error output, or the error message.
    pub diagnostic_tail: String,
    /// Number of keep intervals when silence was cut.
    pub segments: Option<usize>,
    pub attempts: Vec<EncodeAttempt>,
    pub elapsed_secs: f64,
}

impl RenderResult {
    fn new(title: &str, output: &Path) -> Self {
        Self {
            title: title.to_string(),
            succeeded: false,
            output_path: output.to_path_buf(),
            encoder: None,
            stage: RenderStage::Validating,
            failure: None,
            diagnostic_tail: String::new(),
            segments: None,
            attempts: Vec::new(),
            elapsed_secs: 0.0,
        }
    }

    fn fail(mut self, stage: RenderStage, err: &ShortsError, tail_chars: usize) -> Self {
        self.stage = stage;
        self.failure = Some(RenderFailure::from(err));
        self.diagnostic_tail = diagnostic_tail(&err.to_string(), tail_chars);
        self
    }
}

/// Renders clips into vertical shorts.
pub struct ClipRenderer {
    settings: RenderSettings,
    resolver: SilenceResolver,
    builder: FilterGraphBuilder,
    hardware: HardwareSupport,
    font_file: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
    faces: Arc<dyn FaceLocator>,
    scanner: Arc<dyn SilenceScanner>,
}

impl ClipRenderer {
    /// Renderer wired to the system: VAAPI probing, the configured face
    /// detector (or a centered crop) and an ffmpeg silence scanner sharing
    /// `runner`.
    pub fn new(config: &AppConfig, runner: Arc<dyn CommandRunner>) -> ShortsResult<Self> {
        let faces: Arc<dyn FaceLocator> = match &config.face_detector {
            Some(detector) => Arc::new(CommandFaceLocator::new(detector.clone())),
            None => Arc::new(CenteredFace),
        };
        let scanner = Arc::new(FfmpegSilenceScanner::new(
            Arc::clone(&runner),
            &config.render,
            &config.silence,
        ));

        let font_file = config.render.resolve_font();
        if font_file.is_none() {
            tracing::info!("No font file found, using ffmpeg default font");
        }

        Ok(Self {
            settings: config.render.clone(),
            resolver: SilenceResolver::new(&config.silence),
            builder: FilterGraphBuilder::new(config.render.speed)?,
            hardware: HardwareSupport::detect(&config.render),
            font_file,
            runner,
            faces,
            scanner,
        })
    }

    pub fn with_face_locator(mut self, faces: Arc<dyn FaceLocator>) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_silence_scanner(mut self, scanner: Arc<dyn SilenceScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_hardware(mut self, hardware: HardwareSupport) -> Self {
        self.hardware = hardware;
        self
    }

    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.font_file = font_file;
        self
    }

    pub fn with_geometry(mut self, geometry: CropGeometry) -> Self {
        self.builder = self.builder.with_geometry(geometry);
        self
    }

    pub fn hardware(&self) -> &HardwareSupport {
        &self.hardware
    }

    /// Render one clip of `video` to `output`.
    ///
    /// Never panics on bad input: every failure is reported in the result.
    /// Invalid timestamps or ranges fail before any process is started.
    pub fn render(
        &self,
        video: &Path,
        subtitles: Option<&Path>,
        descriptor: &ClipDescriptor,
        output: &Path,
        remove_silence: bool,
    ) -> RenderResult {
        let started = Instant::now();
        let tail_chars = self.settings.diagnostic_tail_chars;
        let mut result = RenderResult::new(&descriptor.title, output);

        let clip = match ClipRequest::from_descriptor(descriptor) {
            Ok(clip) => clip,
            Err(err) => {
                tracing::warn!(
                    title = %descriptor.title,
                    stage = "validate",
                    error = %err,
                    "Rejected clip"
                );
                return result.fail(RenderStage::Validating, &err, tail_chars);
            }
        };

        tracing::info!(
            title = %clip.title,
            start = %clip.start,
            end = %clip.end,
            "Rendering clip"
        );

        result.stage = RenderStage::Framing;
        let face_x = self.faces.locate(video, clip.start);
        let crop_offset = self.builder.geometry().offset_for(face_x);
        tracing::debug!(face_x, crop_offset, "Framed clip");

        let edit = if remove_silence {
            result.stage = RenderStage::SilenceScan;
            self.silence_edit(video, &clip)
        } else {
            SilenceEdit::Untouched
        };
        if let SilenceEdit::Cut(intervals) = &edit {
            tracing::info!(segments = intervals.len(), "Removing silence");
            result.segments = Some(intervals.len());
        }

        result.stage = RenderStage::BuildingGraph;
        let graph = match self.builder.build(&GraphRequest {
            clip_start_secs: clip.start.secs(),
            crop_offset,
            title: &clip.title,
            subtitles,
            font_file: self.font_file.as_deref(),
            edit: &edit,
        }) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::error!(title = %clip.title, stage = "graph", error = %err, "Invalid filter graph");
                return result.fail(RenderStage::BuildingGraph, &err, tail_chars);
            }
        };

        result.stage = RenderStage::Preparing;
        if let Err(err) = ensure_parent_dir(output) {
            tracing::error!(title = %clip.title, stage = "prepare", error = %err, "Cannot create output directory");
            return result.fail(RenderStage::Preparing, &err, tail_chars);
        }

        result.stage = RenderStage::Encoding;
        let dispatcher = EncodeDispatcher::new(self.runner.as_ref(), &self.settings, &self.hardware);
        let report = dispatcher.dispatch(
            RenderTarget {
                video,
                clip: &clip,
                output,
            },
            &graph,
        );
        result.attempts = report.attempts;
        result.elapsed_secs = started.elapsed().as_secs_f64();

        match report.result {
            Ok(encoder) => {
                tracing::info!(
                    title = %clip.title,
                    encoder = encoder.as_str(),
                    output = %output.display(),
                    elapsed_secs = result.elapsed_secs,
                    "Clip rendered"
                );
                result.succeeded = true;
                result.encoder = Some(encoder);
                result.stage = RenderStage::Complete;
                result
            }
            Err(err) => {
                tracing::error!(
                    title = %clip.title,
                    stage = "encode",
                    error = %err,
                    "Clip render failed"
                );
                result.fail(RenderStage::Encoding, &err, tail_chars)
            }
        }
    }

    /// Scan and resolve silence; scan failures leave the clip untouched.
    fn silence_edit(&self, video: &Path, clip: &ClipRequest) -> SilenceEdit {
        match self.scanner.scan(video, clip) {
            Ok(log) => {
                let events = parse_silence_log(&log).events();
                self.resolver.resolve(&events, clip.duration_secs())
            }
            Err(err) => {
                tracing::warn!(
                    title = %clip.title,
                    stage = "silence_scan",
                    error = %err,
                    "Silence scan failed, keeping full clip"
                );
                SilenceEdit::Untouched
            }
        }
    }
}

fn ensure_parent_dir(output: &Path) -> ShortsResult<()> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}
