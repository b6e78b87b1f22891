//! Frame action analysis models.
//!
//! A [`FrameActionProfile`] is produced once per render request by the
//! profiler and consumed by window selection and focus aggregation.

use serde::{Deserialize, Serialize};

/// Width of the analysis resolution frames are downsampled to.
pub const ANALYSIS_WIDTH: u32 = 160;
/// Height of the analysis resolution frames are downsampled to.
pub const ANALYSIS_HEIGHT: u32 = 120;

/// Integer point in analysis (downsampled) pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center of a frame with the given dimensions.
    pub fn center_of(width: u32, height: u32) -> Self {
        Self::new((width / 2) as i32, (height / 2) as i32)
    }
}

/// Coordinate the crop is centered on.
pub type FocusPoint = Point;

/// Motion measurement for a single decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameAction {
    /// Number of analysis pixels that changed since the previous frame.
    pub intensity: u32,
    /// Location of the largest per-pixel change.
    pub peak: Point,
}

impl FrameAction {
    pub fn new(intensity: u32, peak: Point) -> Self {
        Self { intensity, peak }
    }
}

/// Per-frame motion intensities of a clip.
///
/// One entry per decoded frame. The first entry is always `(0, origin)`
/// because the first frame has no predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameActionProfile {
    pub frames: Vec<FrameAction>,
    /// Width of the analysis frames
    pub analysis_width: u32,
    /// Height of the analysis frames
    pub analysis_height: u32,
}

impl FrameActionProfile {
    pub fn new(frames: Vec<FrameAction>, analysis_width: u32, analysis_height: u32) -> Self {
        Self {
            frames,
            analysis_width,
            analysis_height,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Intensity scores in frame order.
    pub fn intensities(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.intensity).collect()
    }

    /// Peak locations inside `window`.
    ///
    /// Returns `None` for the whole-clip fallback window and for windows
    /// that reach past the end of the profile.
    pub fn peaks_in(&self, window: &SelectionWindow) -> Option<Vec<Point>> {
        if window.is_whole_clip() || window.end_frame() > self.frames.len() {
            return None;
        }
        Some(
            self.frames[window.start_frame..window.end_frame()]
                .iter()
                .map(|f| f.peak)
                .collect(),
        )
    }

    /// Center of the analysis frame.
    pub fn analysis_center(&self) -> Point {
        Point::center_of(self.analysis_width, self.analysis_height)
    }
}

/// Contiguous run of frames selected for the output.
///
/// `(0, 0)` is the whole-clip fallback used when the clip is shorter than
/// the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionWindow {
    pub start_frame: usize,
    pub frame_count: usize,
}

impl SelectionWindow {
    pub fn new(start_frame: usize, frame_count: usize) -> Self {
        Self {
            start_frame,
            frame_count,
        }
    }

    /// The "use every frame" window.
    pub fn whole_clip() -> Self {
        Self::default()
    }

    pub fn is_whole_clip(&self) -> bool {
        self.frame_count == 0
    }

    /// Exclusive end index.
    pub fn end_frame(&self) -> usize {
        self.start_frame + self.frame_count
    }

    /// Map this window into the frame index space of the same clip re-timed
    /// from `from_fps` to `to_fps`.
    pub fn rescale(&self, from_fps: f64, to_fps: f64) -> Self {
        if self.is_whole_clip() || from_fps <= 0.0 || to_fps <= 0.0 {
            return *self;
        }
        let ratio = to_fps / from_fps;
        Self {
            start_frame: (self.start_frame as f64 * ratio).round() as usize,
            frame_count: ((self.frame_count as f64 * ratio).round() as usize).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_of(peaks: &[(i32, i32)]) -> FrameActionProfile {
        let frames = peaks
            .iter()
            .map(|&(x, y)| FrameAction::new(1, Point::new(x, y)))
            .collect();
        FrameActionProfile::new(frames, ANALYSIS_WIDTH, ANALYSIS_HEIGHT)
    }

    #[test]
    fn test_peaks_in_window() {
        let profile = profile_of(&[(0, 0), (1, 1), (2, 2), (3, 3)]);
        let peaks = profile.peaks_in(&SelectionWindow::new(1, 2)).unwrap();
        assert_eq!(peaks, vec![Point::new(1, 1), Point::new(2, 2)]);
    }

    #[test]
    fn test_peaks_in_rejects_fallback_and_overflow() {
        let profile = profile_of(&[(0, 0), (1, 1)]);
        assert!(profile.peaks_in(&SelectionWindow::whole_clip()).is_none());
        assert!(profile.peaks_in(&SelectionWindow::new(1, 5)).is_none());
    }

    #[test]
    fn test_analysis_center() {
        let profile = profile_of(&[]);
        assert_eq!(profile.analysis_center(), Point::new(80, 60));
    }

    #[test]
    fn test_window_rescale() {
        let window = SelectionWindow::new(60, 90);
        assert_eq!(window.rescale(30.0, 25.0), SelectionWindow::new(50, 75));
        assert_eq!(
            SelectionWindow::whole_clip().rescale(30.0, 25.0),
            SelectionWindow::whole_clip()
        );
    }
}
