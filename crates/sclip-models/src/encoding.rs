//! Video encoding configuration.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 18;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Frame rate every clip is normalized to before cropping.
pub const NORMALIZED_FPS: f64 = 25.0;
/// Narration starts this many seconds after the first video frame.
pub const AUDIO_LEAD_OFFSET_SECS: f64 = 0.5;
/// Background music volume relative to narration.
pub const DEFAULT_MUSIC_VOLUME: f64 = 0.3;
/// Fade-out applied to the end of the music bed.
pub const DEFAULT_MUSIC_FADE_SECS: f64 = 2.0;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Normalized output frame rate
    #[serde(default = "default_fps")]
    pub target_fps: f64,

    /// Narration delay relative to frame zero, in seconds
    #[serde(default = "default_audio_offset")]
    pub audio_offset_secs: f64,

    /// Music bed volume (0.0-1.0)
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,

    /// Music fade-out length in seconds
    #[serde(default = "default_music_fade")]
    pub music_fade_secs: f64,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_fps() -> f64 {
    NORMALIZED_FPS
}
fn default_audio_offset() -> f64 {
    AUDIO_LEAD_OFFSET_SECS
}
fn default_music_volume() -> f64 {
    DEFAULT_MUSIC_VOLUME
}
fn default_music_fade() -> f64 {
    DEFAULT_MUSIC_FADE_SECS
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            target_fps: NORMALIZED_FPS,
            audio_offset_secs: AUDIO_LEAD_OFFSET_SECS,
            music_volume: DEFAULT_MUSIC_VOLUME,
            music_fade_secs: DEFAULT_MUSIC_FADE_SECS,
        }
    }
}

impl EncodingConfig {
    /// Set the normalized frame rate.
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }
}
