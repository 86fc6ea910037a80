//! ShortMaker Clip Model
//!
//! Defines the data contracts shared by the rendering pipeline:
//! - **Clips:** Raw clip descriptors from the clip-selection layer and
//!   their validated form
//! - **Intervals:** Silence events and the keep intervals derived from them
//! - **Responses:** Parsing and validation of the clip-selection JSON
//!
//! All interval times are seconds relative to the start of the clip
//! segment they were measured in.

pub mod clip;
pub mod interval;
pub mod response;

pub use clip::*;
pub use interval::*;
pub use response::*;
