//! WAV duration reading.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use crate::error::{MediaError, MediaResult};

/// Playback duration of a PCM WAV file.
pub async fn wav_duration(path: impl AsRef<Path>) -> MediaResult<Duration> {
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path));
    }

    tokio::task::spawn_blocking(move || read_wav_duration(&path))
        .await
        .map_err(|e| MediaError::internal(format!("WAV reader task failed: {}", e)))?
}

/// Blocking duration read: frames per channel over the sample rate.
pub fn read_wav_duration(path: &Path) -> MediaResult<Duration> {
    let mut bytes = std::fs::read(path)?;
    clamp_data_size(&mut bytes);

    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(MediaError::invalid_wav("zero sample rate"));
    }
    Ok(Duration::from_secs_f64(
        reader.duration() as f64 / spec.sample_rate as f64,
    ))
}

/// Shrink a `data` chunk size that runs past the end of the file to the
/// bytes present, rounded down to whole frames.
///
/// Encoders writing to a pipe leave the 0xFFFFFFFF placeholder in place.
fn clamp_data_size(bytes: &mut [u8]) {
    let mut offset = 12;
    let mut block_align = 1;

    while let Some(size) = le_u32(bytes, offset + 4) {
        let size = size as usize;
        let body = offset + 8;
        match &bytes[offset..offset + 4] {
            b"fmt " => {
                block_align = le_u16(bytes, body + 12).unwrap_or(1).max(1) as usize;
            }
            b"data" => {
                let present = bytes.len() - body;
                if size > present {
                    let clamped = (present - present % block_align) as u32;
                    bytes[offset + 4..body].copy_from_slice(&clamped.to_le_bytes());
                }
                return;
            }
            _ => {}
        }
        // Chunks are word aligned
        offset = body + size + (size & 1);
    }
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{set_streaming_data_size, write_silent_wav};

    #[tokio::test]
    async fn test_wav_duration_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        write_silent_wav(&path, 1.5).unwrap();

        let d = tokio_test::assert_ok!(wav_duration(&path).await);
        assert_eq!(d, Duration::from_millis(1500));
    }

    #[test]
    fn test_stereo_counts_frames_not_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..44_100 * 3 {
            writer.write_sample(0i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let d = read_wav_duration(&path).unwrap();
        assert!((d.as_secs_f64() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_streaming_placeholder_size_uses_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamed.wav");
        write_silent_wav(&path, 2.0).unwrap();
        set_streaming_data_size(&path).unwrap();

        let d = read_wav_duration(&path).unwrap();
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn test_truncated_data_counts_whole_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.wav");
        write_silent_wav(&path, 1.0).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 8_001);
        std::fs::write(&path, bytes).unwrap();

        let d = read_wav_duration(&path).unwrap();
        assert_eq!(d, Duration::from_secs_f64(3_999.0 / 8_000.0));
    }

    #[test]
    fn test_rejects_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.mp3");
        std::fs::write(&path, b"ID3\x03 not a wav file").unwrap();

        assert!(matches!(
            read_wav_duration(&path),
            Err(MediaError::InvalidWav(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = tokio_test::assert_err!(wav_duration("/nonexistent/speech.wav").await);
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
