//! External transcoder seam.
//!
//! Pipeline code talks to [`Transcoder`] only; [`FfmpegTranscoder`] is the
//! subprocess-backed implementation. Exit status decides success and no
//! output is parsed for data.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use sclip_models::{CropPlan, EncodingConfig, SelectionWindow};

use crate::command::{format_fps, FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Operations the pipeline needs from an external transcoder.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encode the whole input at a constant frame rate.
    async fn reencode_fps(&self, input: &Path, output: &Path, fps: f64) -> MediaResult<()>;

    /// Keep frames `start..=start+count` (all frames for the whole-clip
    /// window), crop them to `plan` and encode at `fps` without audio.
    async fn crop(
        &self,
        input: &Path,
        output: &Path,
        plan: &CropPlan,
        window: &SelectionWindow,
        fps: f64,
    ) -> MediaResult<()>;

    /// Copy the video stream and add `audio`, delayed by `audio_offset_secs`.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        audio_offset_secs: f64,
    ) -> MediaResult<()>;

    /// Concatenate the files listed in a `file '<path>'` list document.
    async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()>;

    /// Loudness-normalize an audio file.
    async fn normalize_loudness(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Cut audio to `duration_secs`, scale its volume and fade out the end.
    async fn trim_audio(
        &self,
        input: &Path,
        output: &Path,
        duration_secs: f64,
        volume: f64,
        fade_secs: f64,
    ) -> MediaResult<()>;

    /// Mix a music bed under the video's own audio track.
    async fn mix_music(&self, video: &Path, music: &Path, output: &Path) -> MediaResult<()>;
}

/// FFmpeg CLI transcoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    encoding: EncodingConfig,
    timeout_secs: Option<u64>,
}

impl FfmpegTranscoder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            timeout_secs: None,
        }
    }

    /// Kill any FFmpeg invocation that runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    fn encode_video(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.video_codec(&self.encoding.codec)
            .preset(&self.encoding.preset)
            .crf(self.encoding.crf)
            .output_args(["-pix_fmt", "yuv420p"])
    }

    fn encode_audio(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.audio_codec(&self.encoding.audio_codec)
            .audio_bitrate(&self.encoding.audio_bitrate)
    }

    pub fn reencode_command(&self, input: &Path, output: &Path, fps: f64) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(input, output).video_filter(format!("fps={}", format_fps(fps)));
        self.encode_video(cmd).audio_codec("copy")
    }

    pub fn crop_command(
        &self,
        input: &Path,
        output: &Path,
        plan: &CropPlan,
        window: &SelectionWindow,
        fps: f64,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(input, output)
            .video_filter(crop_filter(plan, window))
            .frame_rate(fps)
            .no_audio();
        self.encode_video(cmd)
    }

    pub fn mux_command(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        audio_offset_secs: f64,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(video, output)
            .add_input(["-itsoffset".to_string(), format!("{:.3}", audio_offset_secs)], audio)
            .output_args(["-map", "0:v:0", "-map", "1:a:0"])
            .video_codec("copy");
        self.encode_audio(cmd)
    }

    pub fn concat_command(&self, list_file: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(list_file, output)
            .input_args(["-f", "concat", "-safe", "0"])
            .codec_copy()
    }

    pub fn mix_command(&self, video: &Path, music: &Path, output: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(video, output)
            .add_input(Vec::<String>::new(), music)
            .filter_complex("[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]")
            .output_args(["-map", "0:v:0", "-map", "[aout]"])
            .video_codec("copy");
        self.encode_audio(cmd)
    }
}

/// Video filter chain for a cropped window.
///
/// `between` is inclusive on both ends, so the window writes
/// `frame_count + 1` frames. The crop is encoded at even dimensions.
pub fn crop_filter(plan: &CropPlan, window: &SelectionWindow) -> String {
    let crop = plan.even().to_filter();
    if window.is_whole_clip() {
        crop
    } else {
        format!(
            "select='between(n,{},{})',setpts=N/FRAME_RATE/TB,{}",
            window.start_frame,
            window.end_frame(),
            crop
        )
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn reencode_fps(&self, input: &Path, output: &Path, fps: f64) -> MediaResult<()> {
        info!(input = %input.display(), fps, "Normalizing frame rate");
        self.runner().run(&self.reencode_command(input, output, fps)).await
    }

    async fn crop(
        &self,
        input: &Path,
        output: &Path,
        plan: &CropPlan,
        window: &SelectionWindow,
        fps: f64,
    ) -> MediaResult<()> {
        let cmd = self.crop_command(input, output, plan, window, fps);
        let expected =
            if window.is_whole_clip() { 0 } else { window.frame_count as u64 + 1 };
        self.runner()
            .run_with_progress(&cmd, move |p| {
                if expected > 0 {
                    debug!("Crop progress: {:.0}%", p.frame_percentage(expected));
                }
            })
            .await
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        audio_offset_secs: f64,
    ) -> MediaResult<()> {
        self.runner()
            .run(&self.mux_command(video, audio, output, audio_offset_secs))
            .await
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()> {
        info!(list = %list_file.display(), "Concatenating scenes");
        self.runner().run(&self.concat_command(list_file, output)).await
    }

    async fn normalize_loudness(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output).audio_filter("loudnorm=I=-16:TP=-1.5:LRA=11");
        self.runner().run(&self.encode_audio(cmd)).await
    }

    async fn trim_audio(
        &self,
        input: &Path,
        output: &Path,
        duration_secs: f64,
        volume: f64,
        fade_secs: f64,
    ) -> MediaResult<()> {
        let fade_start = (duration_secs - fade_secs).max(0.0);
        let cmd = FfmpegCommand::new(input, output)
            .duration(duration_secs)
            .audio_filter(format!(
                "volume={:.2},afade=t=out:st={:.3}:d={:.3}",
                volume, fade_start, fade_secs
            ));
        self.runner().run(&self.encode_audio(cmd)).await
    }

    async fn mix_music(&self, video: &Path, music: &Path, output: &Path) -> MediaResult<()> {
        info!(video = %video.display(), music = %music.display(), "Mixing music bed");
        self.runner().run(&self.mix_command(video, music, output)).await
    }
}

/// Write a concat list document: one `file '<path>'` line per entry.
///
/// The concat demuxer resolves relative entries against the list's own
/// directory, so relative paths are made absolute first. Single quotes are
/// escaped the way the demuxer expects.
pub async fn write_concat_list(paths: &[PathBuf], list_file: &Path) -> MediaResult<()> {
    let cwd = std::env::current_dir()?;
    let absolute: Vec<PathBuf> = paths
        .iter()
        .map(|p| if p.is_absolute() { p.clone() } else { cwd.join(p) })
        .collect();
    tokio::fs::write(list_file, concat_list_body(&absolute)).await?;
    Ok(())
}

fn concat_list_body(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::plan_crop;
    use sclip_models::Point;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let i = args.iter().position(|a| a == flag).unwrap();
        &args[i + 1]
    }

    #[test]
    fn test_crop_filter_for_window() {
        let plan = CropPlan::new(657, 0, 607, 1080);
        assert_eq!(
            crop_filter(&plan, &SelectionWindow::new(10, 50)),
            "select='between(n,10,60)',setpts=N/FRAME_RATE/TB,crop=606:1080:657:0"
        );
        assert_eq!(
            crop_filter(&plan, &SelectionWindow::whole_clip()),
            "crop=606:1080:657:0"
        );
    }

    #[test]
    fn test_1080p_crop_is_encoded_at_even_size() {
        let plan = plan_crop(Point::new(80, 60), 160, 1920, 1080).unwrap();
        assert_eq!(plan.width, 607);

        let t = FfmpegTranscoder::default();
        let args = t
            .crop_command(
                Path::new("in.mp4"),
                Path::new("out.mp4"),
                &plan,
                &SelectionWindow::new(0, 50),
                25.0,
            )
            .build_args();
        let filter = arg_after(&args, "-vf");
        assert!(filter.ends_with(",crop=606:1080:657:0"), "{}", filter);
        assert_eq!(arg_after(&args, "-pix_fmt"), "yuv420p");
    }

    #[test]
    fn test_crop_command_drops_audio() {
        let t = FfmpegTranscoder::default();
        let cmd = t.crop_command(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &CropPlan::new(0, 0, 607, 1080),
            &SelectionWindow::new(0, 25),
            25.0,
        );
        let args = cmd.build_args();
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(arg_after(&args, "-r"), "25");
        assert_eq!(arg_after(&args, "-c:v"), "libx264");
    }

    #[test]
    fn test_reencode_command() {
        let t = FfmpegTranscoder::default();
        let args = t
            .reencode_command(Path::new("in.mp4"), Path::new("convertedFps_in.mp4"), 25.0)
            .build_args();
        assert_eq!(arg_after(&args, "-vf"), "fps=25");
        assert_eq!(arg_after(&args, "-c:a"), "copy");
    }

    #[test]
    fn test_mux_command_offsets_audio() {
        let t = FfmpegTranscoder::default();
        let args = t
            .mux_command(Path::new("v.mp4"), Path::new("s.wav"), Path::new("o.mp4"), 0.5)
            .build_args();
        assert_eq!(arg_after(&args, "-itsoffset"), "0.500");
        assert_eq!(arg_after(&args, "-c:v"), "copy");
        assert_eq!(arg_after(&args, "-c:a"), "aac");
    }

    #[test]
    fn test_concat_command() {
        let t = FfmpegTranscoder::default();
        let args = t
            .concat_command(Path::new("scenes.txt"), Path::new("video.mp4"))
            .build_args();
        assert_eq!(arg_after(&args, "-f"), "concat");
        assert_eq!(arg_after(&args, "-safe"), "0");
        assert_eq!(arg_after(&args, "-c"), "copy");
    }

    #[test]
    fn test_concat_list_body() {
        let body = concat_list_body(&[
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/it's.mp4"),
        ]);
        assert_eq!(body, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[tokio::test]
    async fn test_write_concat_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("scenes.txt");
        write_concat_list(&[PathBuf::from("/x/1.mp4"), PathBuf::from("rel/2.mp4")], &list)
            .await
            .unwrap();

        let body = tokio::fs::read_to_string(&list).await.unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "file '/x/1.mp4'");
        let expected = std::env::current_dir().unwrap().join("rel/2.mp4");
        assert_eq!(lines[1], format!("file '{}'", expected.display()));
    }
}
