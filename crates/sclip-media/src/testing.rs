//! In-memory media collaborators shared by this crate's tests and, behind
//! the `test-support` feature, by downstream crates.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use sclip_models::analysis::{ANALYSIS_HEIGHT, ANALYSIS_WIDTH};
use sclip_models::{CropPlan, SelectionWindow};

use crate::error::{MediaError, MediaResult};
use crate::framing::{FrameDecoder, FrameStream, LumaFrame};
use crate::probe::{MediaProbe, VideoInfo};
use crate::transcoder::Transcoder;

/// Transcoder that records one line per call and creates empty outputs.
///
/// Recorded forms: `reencode F`, `crop <filter> S+C @F`, `mux O`,
/// `concat N` (entries in the list file), `normalize`, `trim D V`, `mix`.
#[derive(Default)]
pub struct RecordingTranscoder {
    calls: Mutex<Vec<String>>,
}

impl RecordingTranscoder {
    pub fn calls(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of recorded calls whose first word is `op`.
    pub fn count(&self, op: &str) -> usize {
        self.lock()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: String, output: &Path) -> MediaResult<()> {
        self.lock().push(call);
        std::fs::write(output, b"")?;
        Ok(())
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn reencode_fps(&self, _input: &Path, output: &Path, fps: f64) -> MediaResult<()> {
        self.record(format!("reencode {}", fps), output)
    }

    async fn crop(
        &self,
        _input: &Path,
        output: &Path,
        plan: &CropPlan,
        window: &SelectionWindow,
        fps: f64,
    ) -> MediaResult<()> {
        self.record(
            format!(
                "crop {} {}+{} @{}",
                plan.to_filter(),
                window.start_frame,
                window.frame_count,
                fps
            ),
            output,
        )
    }

    async fn mux(
        &self,
        _video: &Path,
        _audio: &Path,
        output: &Path,
        audio_offset_secs: f64,
    ) -> MediaResult<()> {
        self.record(format!("mux {}", audio_offset_secs), output)
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()> {
        let entries = std::fs::read_to_string(list_file)?.lines().count();
        self.record(format!("concat {}", entries), output)
    }

    async fn normalize_loudness(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        self.record("normalize".to_string(), output)
    }

    async fn trim_audio(
        &self,
        _input: &Path,
        output: &Path,
        duration_secs: f64,
        volume: f64,
        _fade_secs: f64,
    ) -> MediaResult<()> {
        self.record(format!("trim {} {}", duration_secs, volume), output)
    }

    async fn mix_music(&self, _video: &Path, _music: &Path, output: &Path) -> MediaResult<()> {
        self.record("mix".to_string(), output)
    }
}

/// Reports one fixed 8 second h264 stream for every file.
pub struct FixedProbe(pub VideoInfo);

impl FixedProbe {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self(VideoInfo {
            duration: 8.0,
            width,
            height,
            fps,
            frame_count: None,
            codec: "h264".to_string(),
        })
    }
}

#[async_trait]
impl MediaProbe for FixedProbe {
    async fn probe(&self, _path: &Path) -> MediaResult<VideoInfo> {
        Ok(self.0.clone())
    }
}

/// Serves the same pre-built frames for every file.
pub struct ScriptedDecoder {
    frames: Vec<LumaFrame>,
}

impl ScriptedDecoder {
    pub fn new(frames: Vec<LumaFrame>) -> Self {
        Self { frames }
    }

    /// `count` analysis frames with one bright pixel drifting right.
    pub fn moving_dot(count: usize) -> Self {
        let frames = (0..count)
            .map(|i| {
                let dot_x = (i as u32 * 3) % ANALYSIS_WIDTH;
                let dot_y = ANALYSIS_HEIGHT / 2;
                LumaFrame::from_fn(ANALYSIS_WIDTH, ANALYSIS_HEIGHT, |x, y| {
                    image::Luma([if x == dot_x && y == dot_y { 255 } else { 0 }])
                })
            })
            .collect();
        Self { frames }
    }

    /// `count` analysis frames alternating between black and a flat grey.
    pub fn flicker(count: usize) -> Self {
        let frames = (0..count)
            .map(|i| {
                let value = if i % 2 == 0 { 0 } else { 200 };
                LumaFrame::from_pixel(ANALYSIS_WIDTH, ANALYSIS_HEIGHT, image::Luma([value]))
            })
            .collect();
        Self { frames }
    }
}

struct ScriptedStream {
    frames: std::vec::IntoIter<LumaFrame>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_frame(&mut self) -> MediaResult<Option<LumaFrame>> {
        Ok(self.frames.next())
    }
}

#[async_trait]
impl FrameDecoder for ScriptedDecoder {
    async fn count_frames(&self, _path: &Path) -> MediaResult<usize> {
        Ok(self.frames.len())
    }

    async fn open(&self, _path: &Path) -> MediaResult<Box<dyn FrameStream>> {
        Ok(Box::new(ScriptedStream {
            frames: self.frames.clone().into_iter(),
        }))
    }
}

/// Sample rate of [`write_silent_wav`] output.
pub const SILENT_WAV_RATE: u32 = 8_000;

/// Write `secs` seconds of mono 16-bit silence to `path`.
pub fn write_silent_wav(path: &Path, secs: f64) -> MediaResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SILENT_WAV_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let samples = (secs * SILENT_WAV_RATE as f64).round() as u64;
    for _ in 0..samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Patch the `data` chunk size of a WAV file to the 0xFFFFFFFF streaming
/// placeholder.
pub fn set_streaming_data_size(path: &Path) -> MediaResult<()> {
    let mut bytes = std::fs::read(path)?;
    let at = bytes
        .windows(4)
        .position(|w| w == b"data")
        .ok_or_else(|| MediaError::invalid_wav("no data chunk"))?;
    bytes[at + 4..at + 8].copy_from_slice(&u32::MAX.to_le_bytes());
    std::fs::write(path, bytes)?;
    Ok(())
}
