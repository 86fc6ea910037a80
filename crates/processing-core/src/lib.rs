//! ShortMaker Processing Core
//!
//! Turns the outputs of external analysis into editing decisions:
//! - **Silence:** Parse silence-scan logs and derive the keep intervals
//! - **Framing:** Map a face position to a vertical crop offset
//!
//! This crate is pure computation — no I/O, no process spawning.
//! All inputs are data; all outputs are data.

pub mod framing;
pub mod silence;

pub use framing::CropGeometry;
pub use silence::{parse_silence_log, SilenceEdit, SilenceLog, SilenceResolver};
