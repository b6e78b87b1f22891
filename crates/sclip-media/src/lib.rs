//! FFmpeg CLI wrapper and frame analysis for footage auto-framing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a cancellable runner
//! - Frame-difference profiling, window selection and crop planning
//! - Rendering, narration muxing and the [`Transcoder`] seam
//! - Download watching, WAV duration reading and file helpers
//!
//! The `test-support` feature exposes the in-memory collaborators in the
//! `testing` module to downstream test suites.

pub mod audio_sync;
pub mod command;
pub mod download_watch;
pub mod error;
pub mod framing;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transcoder;
pub mod wav;

pub use audio_sync::AudioSync;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download_watch::{
    downloaded_file, snapshot_dir, wait_for_download_completion, wait_for_download_start,
    DownloadWatch,
};
pub use error::{MediaError, MediaResult};
pub use framing::{
    average_point, focus_for_window, frames_for_duration, plan_crop, select_window,
    FfmpegGrayDecoder, FrameActionProfiler, FrameDecoder, FrameStream, LumaFrame,
};
pub use probe::{probe_video, FfprobeProbe, MediaProbe, VideoInfo};
pub use progress::FfmpegProgress;
pub use render::FrameRenderer;
pub use transcoder::{write_concat_list, FfmpegTranscoder, Transcoder};
pub use wav::{read_wav_duration, wav_duration};
