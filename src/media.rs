use std::path::Path;
use std::sync::Arc;

use crate::errors::{SignalEngineError, SignalEngineResult};

/// デコード済みオーディオバッファ - モノラルf32サンプル列
///
/// The engine treats message audio as an opaque array of floating-point
/// samples at a known sample rate. Multi-channel input is mixed down at
/// decode time: the subliminal streams drive a gain parameter, which is a
/// mono control signal by nature.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self { samples, sample_rate }
    }

    /// インターリーブ済みマルチチャンネルサンプルからモノラルへミックスダウン
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: f32) -> Self {
        if channels <= 1 {
            return Self::new(interleaved.to_vec(), sample_rate);
        }

        let frames = interleaved.len() / channels;
        let mut samples = Vec::with_capacity(frames);
        for frame in 0..frames {
            let mut sum = 0.0;
            for ch in 0..channels {
                sum += interleaved[frame * channels + ch];
            }
            samples.push(sum / channels as f32);
        }
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// WAVファイルをデコードしてバッファを返す
///
/// Decode failures surface as `BufferDecode`; callers are expected to fall
/// back to carrier-only subliminal mode rather than treat this as fatal.
pub fn load_wav<P: AsRef<Path>>(path: P) -> SignalEngineResult<Arc<AudioBuffer>> {
    let path_str = path.as_ref().display().to_string();

    let mut reader = hound::WavReader::open(&path)
        .map_err(|e| SignalEngineError::buffer_decode(&path_str, &e.to_string()))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate as f32;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples: Result<Vec<f32>, _> = reader.samples::<f32>().collect();
            samples.map_err(|e| SignalEngineError::buffer_decode(&path_str, &e.to_string()))?
        }
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            let samples: Result<Vec<i32>, _> = reader.samples::<i32>().collect();
            samples
                .map_err(|e| SignalEngineError::buffer_decode(&path_str, &e.to_string()))?
                .into_iter()
                .map(|s| s as f32 / scale)
                .collect()
        }
    };

    if interleaved.is_empty() {
        return Err(SignalEngineError::buffer_decode(&path_str, "file contains no samples"));
    }

    Ok(Arc::new(AudioBuffer::from_interleaved(
        &interleaved,
        channels,
        sample_rate,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_mixdown_stereo() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 44100.0);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.samples()[0], 0.5);
        assert_eq!(buffer.samples()[1], 0.5);
        assert_eq!(buffer.samples()[2], 0.0);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 22050], 22050.0);
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        write_test_wav(&path, 1, &[0, 16384, -16384, 32767]);

        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.sample_rate(), 22050.0);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-3);
        assert!((buffer.samples()[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_load_stereo_wav_mixes_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Two frames: (L=16384, R=0) and (L=0, R=16384)
        write_test_wav(&path, 2, &[16384, 0, 0, 16384]);

        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.len(), 2);
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-3);
        assert!((buffer.samples()[1] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_load_missing_file_is_decode_error() {
        let result = load_wav("/nonexistent/voice.wav");
        match result {
            Err(SignalEngineError::BufferDecode { .. }) => (),
            _ => panic!("Expected BufferDecode error"),
        }
    }
}
