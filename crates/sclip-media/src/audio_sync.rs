//! Narration muxing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use sclip_models::encoding::AUDIO_LEAD_OFFSET_SECS;

use crate::error::MediaResult;
use crate::transcoder::Transcoder;

/// Prefix of merged scene files.
pub const MERGED_PREFIX: &str = "merged_";

/// Muxes narration onto a rendered clip with a fixed lead offset.
#[derive(Clone)]
pub struct AudioSync {
    transcoder: Arc<dyn Transcoder>,
    work_dir: PathBuf,
    offset_secs: f64,
}

impl AudioSync {
    pub fn new(transcoder: Arc<dyn Transcoder>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            transcoder,
            work_dir: work_dir.into(),
            offset_secs: AUDIO_LEAD_OFFSET_SECS,
        }
    }

    pub fn with_offset(mut self, offset_secs: f64) -> Self {
        self.offset_secs = offset_secs;
        self
    }

    /// Merge `audio` into `video`, returning a freshly named output file.
    pub async fn merge(&self, video: &Path, audio: &Path) -> MediaResult<PathBuf> {
        let output = self.work_dir.join(merged_file_name());
        info!(
            video = %video.display(),
            audio = %audio.display(),
            offset = self.offset_secs,
            "Merging narration"
        );
        self.transcoder
            .mux(video, audio, &output, self.offset_secs)
            .await?;
        Ok(output)
    }
}

fn merged_file_name() -> String {
    format!("{}{}.mp4", MERGED_PREFIX, Uuid::new_v4().simple())
}
