//! ShortMaker Common Utilities
//!
//! Shared infrastructure for all ShortMaker crates:
//! - Error types and result aliases
//! - Timestamp parsing and formatting
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
pub use timecode::Timestamp;
