//! In-memory asset providers for pipeline tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use sclip_media::testing::write_silent_wav;
use sclip_models::SoundtrackPrompt;

use crate::error::{WorkerError, WorkerResult};
use crate::providers::{FootageProvider, MusicProvider, NarrationProvider};

/// Footage provider writing `<first keyword>.mp4`; keywords containing
/// `"missing"` fail.
#[derive(Default)]
pub struct FakeFootage {
    pub calls: AtomicU32,
}

#[async_trait]
impl FootageProvider for FakeFootage {
    async fn fetch(&self, keywords: &[String], dir: &Path) -> WorkerResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if keywords.iter().any(|k| k.contains("missing")) {
            return Err(WorkerError::provider_failed("no footage found"));
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.mp4", keywords.join("_")));
        std::fs::write(&path, b"footage")?;
        Ok(path)
    }
}

/// Narration provider writing 1.5 s WAV files.
#[derive(Default)]
pub struct FakeNarration {
    pub calls: AtomicU32,
}

#[async_trait]
impl NarrationProvider for FakeNarration {
    async fn synthesize(&self, text: &str, dir: &Path) -> WorkerResult<PathBuf> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("speech_{}_{}.wav", n, text.len()));
        write_silent_wav(&path, 1.5)?;
        Ok(path)
    }
}

/// Music provider whose first `failures` candidates fail.
pub struct FakeMusic {
    pub failures: u32,
    pub calls: AtomicU32,
}

impl FakeMusic {
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl MusicProvider for FakeMusic {
    async fn fetch(
        &self,
        prompt: &SoundtrackPrompt,
        candidate: u32,
        dir: &Path,
    ) -> WorkerResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if candidate < self.failures {
            return Err(WorkerError::provider_failed(format!("candidate {} unavailable", candidate)));
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_{}.mp3", prompt.mood, candidate));
        std::fs::write(&path, b"music")?;
        Ok(path)
    }
}
