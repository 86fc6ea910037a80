//! ShortMaker Render Engine
//!
//! Turns a clip of a long horizontal video into a vertical short by
//! building an ffmpeg filter graph and running it through the available
//! encoder.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ClipDescriptor ── validate ──► ClipRequest
//!                                    │
//! source.mp4 ── face locator ────────┤ crop offset
//!            └─ silence scan ────────┤ keep intervals (optional)
//!                                    ▼
//!                          FilterGraphBuilder
//!      blur bg ─┐                    │
//!      face fg ─┴─ overlay ── title ── subtitles ── call-to-action
//!                                    │
//!                    continuous shift │ or trim + concat
//!                                    ▼
//!                           EncodeDispatcher
//!                    h264_vaapi ──fail──► libx264
//!                                    │
//!                                    ▼
//!                               short.mp4
//! ```

pub mod analysis;
pub mod builder;
pub mod command;
pub mod dispatch;
pub mod graph;
pub mod process;
pub mod renderer;

pub use analysis::{CenteredFace, CommandFaceLocator, FaceLocator, FfmpegSilenceScanner, SilenceScanner};
pub use builder::{FilterGraphBuilder, GraphRequest};
pub use command::{EncodePath, RenderCommand, RenderTarget};
pub use dispatch::{EncodeAttempt, EncodeDispatcher, EncodeReport, HardwareSupport};
pub use graph::{Filter, FilterArg, FilterGraph, Stage};
pub use process::{CommandRunner, Invocation, ProcessOutcome, RenderProgress, SystemRunner};
pub use renderer::{ClipRenderer, RenderFailure, RenderResult, RenderStage};
