use serde::{Deserialize, Serialize};

/// Target aspect ratio numerator (width).
pub const TARGET_ASPECT_W: u32 = 9;
/// Target aspect ratio denominator (height).
pub const TARGET_ASPECT_H: u32 = 16;

/// Crop rectangle in original-resolution pixel space.
///
/// Always fully inside the source frame. Near frame edges the width may be
/// narrower than the ideal 9:16 ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropPlan {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropPlan {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check that the rectangle lies inside a `width x height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }

    /// FFmpeg `crop` filter expression.
    pub fn to_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    /// The rectangle with width and height rounded down to even values,
    /// as libx264 requires for yuv420p.
    ///
    /// Never smaller than 2x2. A 1 px span grows back toward the origin so
    /// the rectangle stays inside the frame.
    pub fn even(&self) -> Self {
        let (x, width) = even_span(self.x, self.width);
        let (y, height) = even_span(self.y, self.height);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

fn even_span(start: u32, len: u32) -> (u32, u32) {
    let even = (len & !1).max(2);
    (start.saturating_sub(even.saturating_sub(len)), even)
}
