//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Number of non-progress stderr lines kept for error diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// An additional input with its own pre-`-i` arguments.
#[derive(Debug, Clone)]
struct ExtraInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands.
///
/// Output is always overwritten and FFmpeg's own logging is limited to
/// errors; progress goes to stderr as `key=value` lines.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before the primary `-i`
    input_args: Vec<String>,
    /// Further inputs (e.g. a narration track to mux)
    extra_inputs: Vec<ExtraInput>,
    /// Arguments placed after all inputs
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            extra_inputs: Vec::new(),
            output_args: Vec::new(),
        }
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add another input, preceded by its own arguments.
    pub fn add_input<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_inputs.push(ExtraInput {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn option(self, flag: &str, value: impl Into<String>) -> Self {
        self.output_arg(flag).output_arg(value)
    }

    /// Limit the output to `seconds`.
    pub fn duration(self, seconds: f64) -> Self {
        self.option("-t", format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.option("-vf", filter)
    }

    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.option("-af", filter)
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.option("-filter_complex", filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.option("-c:v", codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.option("-c:a", codec)
    }

    /// Copy every stream without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.option("-c", "copy")
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Constant output frame rate.
    pub fn frame_rate(self, fps: f64) -> Self {
        self.option("-r", format_fps(fps))
    }

    pub fn crf(self, crf: u8) -> Self {
        self.option("-crf", crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.option("-preset", preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.option("-b:a", bitrate)
    }

    /// Full argument list, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .into_iter()
            .map(String::from)
            .collect();

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());

        for extra in &self.extra_inputs {
            args.extend(extra.args.iter().cloned());
            args.push("-i".to_string());
            args.push(extra.path.to_string_lossy().into_owned());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Format a frame rate without trailing zeros ("25", "29.97").
pub fn format_fps(fps: f64) -> String {
    let s = format!("{:.3}", fps);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Runs FFmpeg commands, keeping a stderr tail for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process after `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, reporting every progress block to `on_progress`.
    ///
    /// On a non-zero exit the last diagnostic stderr lines are attached to
    /// the returned [`MediaError::FfmpegFailed`].
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current) {
                        on_progress(progress);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            Vec::from(tail).join("\n")
        });

        let result = self.wait(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        match result {
            Err(MediaError::FfmpegFailed {
                message, exit_code, ..
            }) => {
                warn!(exit_code = ?exit_code, "FFmpeg failed: {}", stderr_tail);
                Err(MediaError::ffmpeg_failed(
                    message,
                    (!stderr_tail.is_empty()).then_some(stderr_tail),
                    exit_code,
                ))
            }
            other => other,
        }
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<()> {
        let status = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        let _ = child.kill().await;
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait().await?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "stream_0_0_q",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

fn is_progress_line(line: &str) -> bool {
    line.trim()
        .split_once('=')
        .is_some_and(|(key, _)| PROGRESS_KEYS.contains(&key))
}

/// Parse a progress line from FFmpeg's -progress output.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            "out_time_ms" | "out_time_us" => {
                // FFmpeg reports microseconds under both keys
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    current.frame = frame;
                }
            }
            "speed" => {
                // Format: "1.5x" or "N/A"
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    current.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .video_filter("crop=606:1080:657:0")
            .video_codec("libx264")
            .crf(18);

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"crop=606:1080:657:0".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_extra_input_ordering() {
        let cmd = FfmpegCommand::new("video.mp4", "out.mp4")
            .add_input(["-itsoffset", "0.500"], "speech.wav")
            .output_args(["-c:v", "copy"]);

        let args = cmd.build_args();
        let video = args.iter().position(|a| a == "video.mp4").unwrap();
        let offset = args.iter().position(|a| a == "-itsoffset").unwrap();
        let speech = args.iter().position(|a| a == "speech.wav").unwrap();
        let copy = args.iter().position(|a| a == "copy").unwrap();
        assert!(video < offset && offset < speech && speech < copy);
        assert_eq!(args[speech - 1], "-i");
    }

    #[test]
    fn test_format_fps() {
        assert_eq!(format_fps(25.0), "25");
        assert_eq!(format_fps(29.97), "29.97");
    }

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        parse_progress_line("out_time_us=5000000", &mut progress);
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let result = parse_progress_line("progress=end", &mut progress);
        assert!(result.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_progress_line_detection() {
        assert!(is_progress_line("frame=120"));
        assert!(is_progress_line("progress=continue"));
        assert!(!is_progress_line("Error opening input file in.mp4."));
        assert!(!is_progress_line("[h264 @ 0x55] decode_slice_header error"));
    }
}
