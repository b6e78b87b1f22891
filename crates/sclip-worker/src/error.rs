//! Worker error types.

use thiserror::Error;

use sclip_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("{operation} did not succeed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Scene skipped: {0}")]
    SceneSkipped(String),

    #[error("No scene could be rendered")]
    NoScenes,

    #[error("Provider failed: {0}")]
    ProviderFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sclip_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn scene_skipped(msg: impl Into<String>) -> Self {
        Self::SceneSkipped(msg.into())
    }

    pub fn provider_failed(msg: impl Into<String>) -> Self {
        Self::ProviderFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is a download or process timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkerError::Media(e) if e.is_timeout())
    }

    /// `result` label recorded for a scene skipped because of this error.
    pub fn skip_label(&self) -> &'static str {
        if self.is_timeout() {
            "timed_out"
        } else {
            "skipped"
        }
    }

    /// Check if the error only concerns the scene being rendered.
    ///
    /// Scene-level errors skip the scene; anything else aborts the run.
    pub fn is_scene_level(&self) -> bool {
        match self {
            WorkerError::JobFailed(_)
            | WorkerError::MaxRetriesExceeded { .. }
            | WorkerError::SceneSkipped(_)
            | WorkerError::ProviderFailed(_) => true,
            WorkerError::Media(e) => !matches!(
                e,
                MediaError::FfmpegNotFound | MediaError::FfprobeNotFound
            ),
            _ => false,
        }
    }
}
