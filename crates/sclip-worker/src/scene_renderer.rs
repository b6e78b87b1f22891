//! Single-scene rendering: footage + narration into one vertical clip.
//!
//! ```text
//! narration ──► length ──► desired frames
//!                               │
//! footage ──► profile ──► select_window ──► focus ──► plan_crop
//!                                                        │
//!                              FrameRenderer ◄───────────┘
//!                                    │
//!                               AudioSync::merge ──► merged_<id>.mp4
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use sclip_media::framing::{focus_for_window, frames_for_duration, plan_crop, select_window};
use sclip_media::fs_utils::remove_if_exists;
use sclip_media::{
    wav_duration, AudioSync, FrameActionProfiler, FrameRenderer, MediaProbe, Transcoder,
};
use sclip_models::EncodingConfig;

use crate::error::WorkerResult;

/// Scene length used when there is no narration.
pub const SILENT_SCENE_SECS: f64 = 2.0;

/// Renders one scene.
pub struct SceneRenderer {
    profiler: FrameActionProfiler,
    probe: Arc<dyn MediaProbe>,
    renderer: FrameRenderer,
    audio_sync: AudioSync,
    target_fps: f64,
    audio_offset_secs: f64,
}

impl SceneRenderer {
    pub fn new(
        profiler: FrameActionProfiler,
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn MediaProbe>,
        work_dir: impl Into<PathBuf>,
        encoding: &EncodingConfig,
    ) -> Self {
        let work_dir = work_dir.into();
        Self {
            profiler,
            renderer: FrameRenderer::new(transcoder.clone(), probe.clone(), work_dir.clone()),
            audio_sync: AudioSync::new(transcoder, work_dir).with_offset(encoding.audio_offset_secs),
            probe,
            target_fps: encoding.target_fps,
            audio_offset_secs: encoding.audio_offset_secs,
        }
    }

    /// Render `footage` framed around its most eventful stretch, long enough
    /// to carry `narration` plus the lead offset.
    ///
    /// Without narration the scene is a silent clip of [`SILENT_SCENE_SECS`].
    pub async fn render_scene(
        &self,
        footage: &Path,
        narration: Option<&Path>,
    ) -> WorkerResult<PathBuf> {
        let length_secs = match narration {
            Some(audio) => scene_length(wav_duration(audio).await?, self.audio_offset_secs),
            None => SILENT_SCENE_SECS,
        };

        let info = self.probe.probe(footage).await?;
        let profile = self.profiler.profile(footage).await?;

        let desired_frames = frames_for_duration(length_secs, info.fps);
        let window = select_window(&profile.intensities(), desired_frames);
        if window.is_whole_clip() {
            warn!(
                footage = %footage.display(),
                frames = profile.len(),
                desired_frames,
                "Clip shorter than scene, using whole clip"
            );
        }

        let focus = focus_for_window(&profile, &window);
        let plan = plan_crop(focus, profile.analysis_width, info.width, info.height)?;
        debug!(
            start = window.start_frame,
            frames = window.frame_count,
            focus_x = focus.x,
            focus_y = focus.y,
            crop = %plan.to_filter(),
            "Planned scene"
        );

        let cropped = self
            .renderer
            .render(footage, &plan, &window, self.target_fps)
            .await?;

        let Some(audio) = narration else {
            return Ok(cropped);
        };

        let merged = self.audio_sync.merge(&cropped, audio).await?;
        if let Err(e) = remove_if_exists(&cropped).await {
            warn!(path = %cropped.display(), "Failed to remove cropped intermediate: {}", e);
        }

        info!(
            footage = %footage.display(),
            length_secs,
            output = %merged.display(),
            "Scene rendered"
        );
        Ok(merged)
    }
}

/// Seconds of footage needed for `narration` delayed by `offset_secs`.
pub fn scene_length(narration: Duration, offset_secs: f64) -> f64 {
    narration.as_secs_f64() + offset_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_media::testing::{write_silent_wav, FixedProbe, RecordingTranscoder, ScriptedDecoder};
    use sclip_models::encoding::AUDIO_LEAD_OFFSET_SECS;
    use tempfile::TempDir;

    fn renderer_for(
        dir: &TempDir,
        transcoder: Arc<RecordingTranscoder>,
        frames: usize,
        fps: f64,
    ) -> SceneRenderer {
        SceneRenderer::new(
            FrameActionProfiler::new(Arc::new(ScriptedDecoder::moving_dot(frames))),
            transcoder,
            Arc::new(FixedProbe::new(1920, 1080, fps)),
            dir.path(),
            &EncodingConfig::default(),
        )
    }

    #[test]
    fn test_scene_length_adds_lead_offset() {
        let secs = scene_length(Duration::from_millis(1500), AUDIO_LEAD_OFFSET_SECS);
        assert!((secs - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_render_scene_crops_and_merges() {
        let dir = TempDir::new().unwrap();
        let speech = dir.path().join("speech.wav");
        // 1.5 s narration -> 2 s scene -> 50 frames at 25 fps
        write_silent_wav(&speech, 1.5).unwrap();

        let transcoder = Arc::new(RecordingTranscoder::default());
        let scene = renderer_for(&dir, transcoder.clone(), 120, 25.0);

        let output = scene.render_scene(Path::new("clip.mp4"), Some(&speech)).await.unwrap();

        let calls = transcoder.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("crop "), "{:?}", calls);
        assert!(calls[0].ends_with("+50 @25"), "{:?}", calls);
        assert_eq!(calls[1], "mux 0.5");
        assert!(output.file_name().unwrap().to_string_lossy().starts_with("merged_"));
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_short_clip_uses_whole_clip_centered() {
        let dir = TempDir::new().unwrap();
        let speech = dir.path().join("speech.wav");
        write_silent_wav(&speech, 3.0).unwrap();

        let transcoder = Arc::new(RecordingTranscoder::default());
        let scene = renderer_for(&dir, transcoder.clone(), 30, 25.0);

        scene.render_scene(Path::new("clip.mp4"), Some(&speech)).await.unwrap();

        // Whole-clip fallback focuses the analysis center: x 657, width 607
        assert_eq!(transcoder.calls()[0], "crop crop=607:1080:657:0 0+0 @25");
    }

    #[tokio::test]
    async fn test_silent_scene_is_not_merged() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(RecordingTranscoder::default());
        let scene = renderer_for(&dir, transcoder.clone(), 120, 25.0);

        let output = scene.render_scene(Path::new("clip.mp4"), None).await.unwrap();

        let calls = transcoder.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with("+50 @25"));
        assert!(output.file_name().unwrap().to_string_lossy().starts_with("cropped_"));
    }

    #[tokio::test]
    async fn test_undecodable_footage_fails() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(RecordingTranscoder::default());
        let scene = renderer_for(&dir, transcoder.clone(), 0, 25.0);

        let err = scene.render_scene(Path::new("clip.mp4"), None).await.unwrap_err();
        assert!(err.is_scene_level());
        assert!(transcoder.calls().is_empty());
    }
}
