//! Sequential luminance frame decoding.
//!
//! The profiler needs only two capabilities from a footage source: a frame
//! count and a sequential stream of single-channel frames. [`FrameDecoder`]
//! captures both so the FFmpeg implementation can be replaced by one that
//! buffers a single pass.

use async_trait::async_trait;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// A single-channel analysis frame.
pub type LumaFrame = GrayImage;

/// Sequential, forward-only frame stream.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> MediaResult<Option<LumaFrame>>;
}

/// Source of luminance frames for a media file.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Total number of decodable frames.
    async fn count_frames(&self, path: &Path) -> MediaResult<usize>;

    /// Open a fresh sequential stream positioned at frame zero.
    async fn open(&self, path: &Path) -> MediaResult<Box<dyn FrameStream>>;
}

/// Decoder that pipes FFmpeg `gray` rawvideo at the analysis resolution.
///
/// Counting trusts the container's `nb_frames` when FFprobe reports one and
/// otherwise performs a full decode.
#[derive(Debug, Clone)]
pub struct FfmpegGrayDecoder {
    width: u32,
    height: u32,
}

impl FfmpegGrayDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn frame_size(&self) -> usize {
        (self.width * self.height) as usize
    }

    fn spawn(&self, path: &Path) -> MediaResult<RawPipe> {
        check_ffmpeg()?;

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(raw_gray_output_args(self.width, self.height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::decode_failed(path, format!("failed to spawn FFmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::decode_failed(path, "FFmpeg stdout not captured"))?;
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        Ok(RawPipe {
            path: path.to_path_buf(),
            child,
            stdout,
            stderr_task: Some(stderr_task),
        })
    }
}

/// Output arguments that turn any input into packed 8-bit luminance frames.
fn raw_gray_output_args(width: u32, height: u32) -> Vec<String> {
    vec![
        "-map".to_string(),
        "0:v:0".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", width, height),
        "-pix_fmt".to_string(),
        "gray".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-".to_string(),
    ]
}

#[async_trait]
impl FrameDecoder for FfmpegGrayDecoder {
    async fn count_frames(&self, path: &Path) -> MediaResult<usize> {
        match probe_video(path).await {
            Ok(info) => {
                if let Some(frames) = header_frame_count(&info) {
                    debug!(path = %path.display(), frames, "Frame count from container header");
                    return Ok(frames);
                }
            }
            Err(e) => debug!(path = %path.display(), "FFprobe unavailable for counting: {}", e),
        }

        let mut pipe = self.spawn(path)?;
        let mut buf = vec![0u8; self.frame_size() * 16];
        let mut total_bytes = 0usize;

        loop {
            let n = pipe.stdout.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total_bytes += n;
        }

        let frames = total_bytes / self.frame_size();
        pipe.finish(frames).await?;
        debug!(path = %path.display(), frames, "Counted decodable frames");
        Ok(frames)
    }

    async fn open(&self, path: &Path) -> MediaResult<Box<dyn FrameStream>> {
        let pipe = self.spawn(path)?;
        Ok(Box::new(FfmpegFrameStream {
            pipe,
            width: self.width,
            height: self.height,
            frames_read: 0,
            done: false,
        }))
    }
}

/// Frame count declared by the container, if usable.
fn header_frame_count(info: &VideoInfo) -> Option<usize> {
    info.frame_count
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
}

/// Running FFmpeg process with its stdout pipe.
struct RawPipe {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    stderr_task: Option<JoinHandle<String>>,
}

impl RawPipe {
    /// Reap the process. A failed exit is only fatal if nothing decoded.
    async fn finish(&mut self, frames_read: usize) -> MediaResult<()> {
        let status = self.child.wait().await?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if frames_read == 0 {
            let reason = if stderr.trim().is_empty() {
                format!("no frames decoded (exit status {:?})", status.code())
            } else {
                stderr.trim().to_string()
            };
            return Err(MediaError::decode_failed(&self.path, reason));
        }

        if !status.success() {
            debug!(
                path = %self.path.display(),
                exit_code = ?status.code(),
                "FFmpeg exited with errors after {} frames: {}",
                frames_read,
                stderr.trim()
            );
        }
        Ok(())
    }
}

struct FfmpegFrameStream {
    pipe: RawPipe,
    width: u32,
    height: u32,
    frames_read: usize,
    done: bool,
}

#[async_trait]
impl FrameStream for FfmpegFrameStream {
    async fn next_frame(&mut self) -> MediaResult<Option<LumaFrame>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; (self.width * self.height) as usize];
        if read_full(&mut self.pipe.stdout, &mut buf).await? {
            self.frames_read += 1;
            let frame = GrayImage::from_raw(self.width, self.height, buf)
                .ok_or_else(|| MediaError::internal("raw frame size mismatch"))?;
            return Ok(Some(frame));
        }

        self.done = true;
        self.pipe.finish(self.frames_read).await?;
        Ok(None)
    }
}

/// Fill `buf` completely. Returns `false` on end of stream; a trailing
/// partial frame is discarded.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> MediaResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_gray_args() {
        let args = raw_gray_output_args(160, 120);
        assert!(args.contains(&"scale=160:120".to_string()));
        assert!(args.contains(&"gray".to_string()));
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn test_header_frame_count() {
        let mut info = VideoInfo {
            duration: 12.5,
            width: 1920,
            height: 1080,
            fps: 29.97,
            frame_count: Some(374),
            codec: "h264".to_string(),
        };
        assert_eq!(header_frame_count(&info), Some(374));

        info.frame_count = Some(0);
        assert_eq!(header_frame_count(&info), None);
        info.frame_count = None;
        assert_eq!(header_frame_count(&info), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_counted() {
        let decoder = FfmpegGrayDecoder::new(160, 120);
        let err = decoder
            .count_frames(Path::new("/nonexistent/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_) | MediaError::FfmpegNotFound));
    }

    #[tokio::test]
    async fn test_read_full_discards_partial_frame() {
        let data: Vec<u8> = (0..10).collect();
        let mut reader = &data[..];
        let mut buf = [0u8; 4];

        assert!(read_full(&mut reader, &mut buf).await.unwrap());
        assert_eq!(buf, [0, 1, 2, 3]);
        assert!(read_full(&mut reader, &mut buf).await.unwrap());
        assert!(!read_full(&mut reader, &mut buf).await.unwrap());
    }
}
