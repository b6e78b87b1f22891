//! Vertical crop planning.
//!
//! The crop keeps the full source height and takes an `H * 9 / 16` wide
//! slice centered on the focus column.

use sclip_models::crop::{TARGET_ASPECT_H, TARGET_ASPECT_W};
use sclip_models::{CropPlan, FocusPoint};

use crate::error::{MediaError, MediaResult};

/// Derive the crop rectangle for a focus point.
///
/// # Arguments
/// * `focus` - Focus point in analysis coordinates
/// * `analysis_width` - Width of the analysis frames the focus refers to
/// * `original_width` - Source frame width
/// * `original_height` - Source frame height
///
/// The rectangle is clamped to the frame: its left edge is pulled inside the
/// frame and its width shrinks when it would run past the right edge.
pub fn plan_crop(
    focus: FocusPoint,
    analysis_width: u32,
    original_width: u32,
    original_height: u32,
) -> MediaResult<CropPlan> {
    if analysis_width == 0 || original_width == 0 || original_height == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "cannot crop {}x{} frame from {}-wide analysis",
            original_width, original_height, analysis_width
        )));
    }

    let frame_w = original_width as i64;
    let desired_width =
        ((original_height as i64 * TARGET_ASPECT_W as i64) / TARGET_ASPECT_H as i64).max(1);

    let scaled_x = (focus.x as f64 / analysis_width as f64 * frame_w as f64) as i64;
    let x = (scaled_x - desired_width / 2).clamp(0, frame_w - 1);
    let width = if x + desired_width > frame_w {
        frame_w - x
    } else {
        desired_width
    };

    Ok(CropPlan::new(x as u32, 0, width as u32, original_height))
}
