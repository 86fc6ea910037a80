//! Vertical framing.
//!
//! The foreground branch scales the source to a fixed width and cuts a
//! narrower 9:16-friendly window out of it. The window is placed so the
//! detected face sits in its horizontal center, pinned to the frame edges.

/// Face position reported when no face was found.
pub const UNKNOWN_FACE_X: f64 = 0.5;

/// Fixed geometry of the face-centered crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    /// Width the source is scaled to before cropping (pixels).
    pub scaled_width: u32,

    /// Width of the crop window (pixels).
    pub crop_width: u32,
}

impl Default for CropGeometry {
    fn default() -> Self {
        Self {
            scaled_width: 2160,
            crop_width: 1440,
        }
    }
}

impl CropGeometry {
    /// Largest valid horizontal offset.
    pub fn max_offset(&self) -> u32 {
        self.scaled_width.saturating_sub(self.crop_width)
    }

    /// Horizontal crop offset for a normalized face center.
    ///
    /// `face_x` is clamped to `[0, 1]`; a non-finite value is treated as
    /// [`UNKNOWN_FACE_X`].
    pub fn offset_for(&self, face_x: f64) -> u32 {
        let face_x = if face_x.is_finite() {
            face_x.clamp(0.0, 1.0)
        } else {
            UNKNOWN_FACE_X
        };
        let face_center_px = face_x * self.scaled_width as f64;
        let offset = face_center_px - self.crop_width as f64 / 2.0;
        offset.clamp(0.0, self.max_offset() as f64) as u32
    }
}
