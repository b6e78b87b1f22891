//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}{}", stderr_tail(.stderr))]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Cannot decode {path}: {message}")]
    DecodeFailed { path: PathBuf, message: String },

    #[error("Download did not {stage} within {secs} seconds")]
    DownloadTimeout { stage: &'static str, secs: u64 },

    #[error("Cannot average an empty set of focus points")]
    EmptyFocusSet,

    #[error("Invalid WAV file: {0}")]
    InvalidWav(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hound::Error> for MediaError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => MediaError::Io(e),
            other => MediaError::InvalidWav(other.to_string()),
        }
    }
}

/// Lines of FFmpeg stderr kept in the error message.
const STDERR_TAIL_LINES: usize = 3;

/// The last non-empty stderr lines, formatted as a message suffix.
fn stderr_tail(stderr: &Option<String>) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    format!(" ({})", lines[start..].join(" | "))
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a decode failure error.
    pub fn decode_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid WAV error.
    pub fn invalid_wav(message: impl Into<String>) -> Self {
        Self::InvalidWav(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a download or process timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MediaError::DownloadTimeout { .. } | MediaError::Timeout(_))
    }
}
