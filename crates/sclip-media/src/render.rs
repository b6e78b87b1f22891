//! Rendering a planned crop window into a standalone clip.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use sclip_models::{CropPlan, SelectionWindow};

use crate::error::MediaResult;
use crate::probe::MediaProbe;
use crate::transcoder::Transcoder;

/// Frame rates closer than this are treated as equal.
const FPS_TOLERANCE: f64 = 0.01;

/// Prefix of frame-rate normalized intermediates.
pub const CONVERTED_FPS_PREFIX: &str = "convertedFps_";
/// Prefix of cropped intermediates.
pub const CROPPED_PREFIX: &str = "cropped_";

/// Crops a selection window out of a source clip.
///
/// The source file is never modified or deleted. Intermediates land in
/// `work_dir`.
#[derive(Clone)]
pub struct FrameRenderer {
    transcoder: Arc<dyn Transcoder>,
    probe: Arc<dyn MediaProbe>,
    work_dir: PathBuf,
}

impl FrameRenderer {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn MediaProbe>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transcoder,
            probe,
            work_dir: work_dir.into(),
        }
    }

    /// Render `window` of `source` cropped to `plan` at `target_fps`.
    ///
    /// A source at another frame rate is first re-encoded to `target_fps`
    /// and the window mapped onto the new frame indices.
    pub async fn render(
        &self,
        source: &Path,
        plan: &CropPlan,
        window: &SelectionWindow,
        target_fps: f64,
    ) -> MediaResult<PathBuf> {
        let info = self.probe.probe(source).await?;

        let (input, window) = if (info.fps - target_fps).abs() > FPS_TOLERANCE {
            let converted = self.work_dir.join(format!(
                "{}{}",
                CONVERTED_FPS_PREFIX,
                file_name_of(source)
            ));
            info!(
                source = %source.display(),
                from_fps = info.fps,
                to_fps = target_fps,
                "Source frame rate differs, re-encoding"
            );
            self.transcoder
                .reencode_fps(source, &converted, target_fps)
                .await?;
            (converted, window.rescale(info.fps, target_fps))
        } else {
            (source.to_path_buf(), *window)
        };

        let output = self
            .work_dir
            .join(format!("{}{}.mp4", CROPPED_PREFIX, Uuid::new_v4().simple()));

        debug!(
            start = window.start_frame,
            frames = window.frame_count,
            crop = %plan.to_filter(),
            "Cropping window"
        );
        self.transcoder
            .crop(&input, &output, plan, &window, target_fps)
            .await?;

        Ok(output)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source.mp4".to_string())
}
