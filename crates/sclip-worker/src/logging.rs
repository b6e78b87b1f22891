//! Structured scene logging utilities.

use tracing::{error, info, warn, Span};

/// Scene logger for consistent per-scene lifecycle lines.
///
/// Every line carries the scene's position in the script and its keywords.
#[derive(Debug, Clone)]
pub struct SceneLogger {
    scene: usize,
    total: usize,
    keywords: String,
}

impl SceneLogger {
    /// Create a logger for the 0-based scene `index` of `total`.
    pub fn new(index: usize, total: usize, keywords: &[String]) -> Self {
        Self {
            scene: index + 1,
            total,
            keywords: keywords.join(","),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            scene = self.scene,
            total = self.total,
            keywords = %self.keywords,
            "Scene started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            scene = self.scene,
            total = self.total,
            keywords = %self.keywords,
            "Scene progress: {}", message
        );
    }

    pub fn log_skipped(&self, reason: &str) {
        warn!(
            scene = self.scene,
            total = self.total,
            keywords = %self.keywords,
            "Scene skipped: {}", reason
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            scene = self.scene,
            total = self.total,
            keywords = %self.keywords,
            "Scene error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            scene = self.scene,
            total = self.total,
            keywords = %self.keywords,
            "Scene completed: {}", message
        );
    }

    /// 1-based scene number.
    pub fn scene(&self) -> usize {
        self.scene
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("scene", scene = self.scene, total = self.total)
    }
}
