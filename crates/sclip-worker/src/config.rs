//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sclip_media::DownloadWatch;
use sclip_models::EncodingConfig;

use crate::retry::PollConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Footage downloads, rendered scenes and the concatenated video
    pub work_dir: PathBuf,
    /// Synthesized narration files
    pub speech_dir: PathBuf,
    /// Downloaded music beds
    pub music_dir: PathBuf,
    /// Final renderings
    pub renderings_dir: PathBuf,
    /// Persisted asset cache document
    pub cache_path: PathBuf,
    /// Encoding settings, including the normalized frame rate
    pub encoding: EncodingConfig,
    /// External footage downloader
    pub footage_cmd: Option<String>,
    /// External speech synthesizer
    pub narration_cmd: Option<String>,
    /// External music downloader
    pub music_cmd: Option<String>,
    /// Speech synthesis poll budget
    pub tts_max_attempts: u32,
    pub tts_initial_delay: Duration,
    pub tts_backoff: Duration,
    /// Wait between submitting a speech job and the first poll
    pub narration_warmup: Duration,
    /// Music candidates tried before giving up
    pub music_max_candidates: u32,
    /// Download watching timeouts
    pub download_start_timeout: Duration,
    pub download_timeout: Duration,
    /// Kill any single FFmpeg invocation after this long
    pub ffmpeg_timeout: Option<Duration>,
    /// Keyword added to every scene before footage search
    pub general_keyword: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./stock-footage"),
            speech_dir: PathBuf::from("./speech"),
            music_dir: PathBuf::from("./music"),
            renderings_dir: PathBuf::from("./renderings"),
            cache_path: PathBuf::from("./storage.json"),
            encoding: EncodingConfig::default(),
            footage_cmd: None,
            narration_cmd: None,
            music_cmd: None,
            tts_max_attempts: 10,
            tts_initial_delay: Duration::from_millis(1000),
            tts_backoff: Duration::from_millis(1000),
            narration_warmup: Duration::from_millis(5000),
            music_max_candidates: 3,
            download_start_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(300),
            ffmpeg_timeout: None,
            general_keyword: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let encoding = match env_parse::<f64>("SCLIP_TARGET_FPS").filter(|fps| *fps > 0.0) {
            Some(fps) => defaults.encoding.clone().with_target_fps(fps),
            None => defaults.encoding.clone(),
        };

        Self {
            work_dir: env_string("SCLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            speech_dir: env_string("SCLIP_SPEECH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.speech_dir),
            music_dir: env_string("SCLIP_MUSIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.music_dir),
            renderings_dir: env_string("SCLIP_RENDERINGS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.renderings_dir),
            cache_path: env_string("SCLIP_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            encoding,
            footage_cmd: env_string("SCLIP_FOOTAGE_CMD"),
            narration_cmd: env_string("SCLIP_NARRATION_CMD"),
            music_cmd: env_string("SCLIP_MUSIC_CMD"),
            tts_max_attempts: env_parse("SCLIP_TTS_MAX_ATTEMPTS").unwrap_or(defaults.tts_max_attempts),
            tts_initial_delay: env_parse("SCLIP_TTS_INITIAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.tts_initial_delay),
            tts_backoff: env_parse("SCLIP_TTS_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.tts_backoff),
            narration_warmup: env_parse("SCLIP_NARRATION_WARMUP_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.narration_warmup),
            music_max_candidates: env_parse("SCLIP_MUSIC_MAX_CANDIDATES")
                .unwrap_or(defaults.music_max_candidates),
            download_start_timeout: env_parse("SCLIP_DOWNLOAD_START_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_start_timeout),
            download_timeout: env_parse("SCLIP_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            ffmpeg_timeout: env_parse("SCLIP_FFMPEG_TIMEOUT_SECS").map(Duration::from_secs),
            general_keyword: env_string("SCLIP_GENERAL_KEYWORD"),
        }
    }

    /// Poll budget for speech synthesis jobs.
    pub fn tts_poll(&self) -> PollConfig {
        PollConfig::new("speech synthesis")
            .with_max_attempts(self.tts_max_attempts)
            .with_initial_delay(self.tts_initial_delay)
            .with_backoff_increment(self.tts_backoff)
    }

    /// Attempt budget for walking music candidates.
    pub fn music_poll(&self) -> PollConfig {
        PollConfig::new("music selection")
            .with_max_attempts(self.music_max_candidates)
            .with_initial_delay(Duration::ZERO)
            .with_backoff_increment(Duration::ZERO)
    }

    /// Download watching with the configured timeouts.
    pub fn download_watch(&self) -> DownloadWatch {
        DownloadWatch {
            start_timeout: self.download_start_timeout,
            completion_timeout: self.download_timeout,
            ..DownloadWatch::default()
        }
    }

    pub fn target_fps(&self) -> f64 {
        self.encoding.target_fps
    }

    /// Final output path for a script title.
    pub fn rendering_path(&self, title: &str) -> PathBuf {
        self.renderings_dir
            .join(format!("{}.mp4", sclip_models::to_snake_case(title)))
    }
}
