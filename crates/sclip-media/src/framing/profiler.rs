//! Frame-level action scoring.
//!
//! Every frame is reduced to 160x120 luminance and compared with its
//! predecessor. The score is the number of pixels that changed at all and
//! the peak is where the change was largest.

use image::imageops::{self, FilterType};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use sclip_models::analysis::{ANALYSIS_HEIGHT, ANALYSIS_WIDTH};
use sclip_models::{FrameAction, FrameActionProfile, Point};

use super::decoder::{FfmpegGrayDecoder, FrameDecoder, LumaFrame};
use crate::error::{MediaError, MediaResult};

/// Computes a [`FrameActionProfile`] for a clip.
pub struct FrameActionProfiler {
    decoder: Arc<dyn FrameDecoder>,
    width: u32,
    height: u32,
}

impl Default for FrameActionProfiler {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegGrayDecoder::new(ANALYSIS_WIDTH, ANALYSIS_HEIGHT)))
    }
}

impl FrameActionProfiler {
    /// Create a profiler at the standard analysis resolution.
    pub fn new(decoder: Arc<dyn FrameDecoder>) -> Self {
        Self {
            decoder,
            width: ANALYSIS_WIDTH,
            height: ANALYSIS_HEIGHT,
        }
    }

    /// Profile a clip.
    ///
    /// The frame count comes from the decoder first, then the clip is decoded
    /// to score each frame.
    /// A clip that yields no frames is a decode failure.
    pub async fn profile(&self, source: &Path) -> MediaResult<FrameActionProfile> {
        let total = self.decoder.count_frames(source).await?;
        if total == 0 {
            return Err(MediaError::decode_failed(source, "clip has no decodable frames"));
        }
        debug!(source = %source.display(), total, "Profiling frames");

        let mut stream = self.decoder.open(source).await?;
        let mut frames = Vec::with_capacity(total);
        let mut previous: Option<LumaFrame> = None;

        while frames.len() < total {
            let Some(frame) = stream.next_frame().await? else {
                break;
            };
            let frame = self.normalize(frame);

            let action = match previous.as_ref() {
                Some(prev) => frame_difference(prev, &frame),
                None => FrameAction::new(0, Point::ORIGIN),
            };
            frames.push(action);
            previous = Some(frame);
        }

        if frames.is_empty() {
            return Err(MediaError::decode_failed(source, "second decode pass yielded no frames"));
        }
        if frames.len() < total {
            warn!(
                source = %source.display(),
                counted = total,
                decoded = frames.len(),
                "Second decode pass ended early"
            );
        }

        info!(
            source = %source.display(),
            frames = frames.len(),
            "Frame action profile complete"
        );
        Ok(FrameActionProfile::new(frames, self.width, self.height))
    }

    /// Bring a decoded frame to the analysis resolution.
    fn normalize(&self, frame: LumaFrame) -> LumaFrame {
        if frame.width() == self.width && frame.height() == self.height {
            frame
        } else {
            imageops::resize(&frame, self.width, self.height, FilterType::Triangle)
        }
    }
}

/// Score the change between two equally sized luminance frames.
///
/// Ties for the largest difference resolve to the first pixel in row-major
/// order; identical frames report the origin.
pub fn frame_difference(previous: &LumaFrame, current: &LumaFrame) -> FrameAction {
    let width = current.width().max(1) as usize;
    let mut changed = 0u32;
    let mut max_diff = 0u8;
    let mut max_index = 0usize;

    for (index, (a, b)) in previous
        .as_raw()
        .iter()
        .zip(current.as_raw().iter())
        .enumerate()
    {
        let diff = a.abs_diff(*b);
        if diff > 0 {
            changed += 1;
        }
        if diff > max_diff {
            max_diff = diff;
            max_index = index;
        }
    }

    let peak = Point::new((max_index % width) as i32, (max_index / width) as i32);
    FrameAction::new(changed, peak)
}
