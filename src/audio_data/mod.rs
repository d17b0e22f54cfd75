mod load_options;
mod loader;
mod resampler;
mod symphonia_loader;

use crate::error::{KeyToneError, Result};
pub use load_options::{ConvertToMono, LoadOptions};
pub use loader::AudioDataLoader;
pub use resampler::AudioResampler;
use std::sync::Arc;
use std::time::Duration;
pub use symphonia_loader::SymphoniaLoader;

/// Decoded pack audio, shared between the loaded pack and every voice slicing it.
///
/// Samples are stored **interleaved** (`[L0, R0, L1, R1, ...]` for stereo).
/// The data never changes after decoding, so cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct KeyToneAudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
struct AudioDataInner {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl KeyToneAudioData {
    /// Wraps interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns [`KeyToneError::AudioFormat`] for a zero sample rate or channel count.
    pub fn from_interleaved(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(KeyToneError::AudioFormat(format!(
                "Invalid layout: {} Hz, {} channels",
                sample_rate, channels
            )));
        }

        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);
        Ok(Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Whole-millisecond length of the buffer, rounded down.
    pub fn duration_ms(&self) -> u64 {
        self.inner.total_frames as u64 * 1000 / self.inner.sample_rate as u64
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Frame index at the given millisecond position, clamped to the buffer.
    pub fn frame_at_ms(&self, ms: u64) -> usize {
        let frame = ms.saturating_mul(self.inner.sample_rate as u64) / 1000;
        (frame as usize).min(self.inner.total_frames)
    }

    /// Half-open frame span `[start, end)` covering `duration_ms` from `offset_ms`.
    pub fn frame_span(&self, offset_ms: u64, duration_ms: u64) -> (usize, usize) {
        let start = self.frame_at_ms(offset_ms);
        let end = self.frame_at_ms(offset_ms.saturating_add(duration_ms));
        (start, end)
    }

    /// Convert to mono by averaging all channels
    pub fn to_mono(&self) -> Result<Self> {
        if self.inner.channels == 1 {
            return Ok(self.clone());
        }

        let channels = self.inner.channels as f32;
        let mono_samples: Vec<f32> = self
            .inner
            .samples
            .chunks(self.inner.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / channels)
            .collect();

        Self::from_interleaved(mono_samples, self.inner.sample_rate, 1)
    }

    /// Resample to a different sample rate using rubato, returns a new instance
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        let resampler = AudioResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;

        let resampled_samples = resampler.resample_interleaved(&self.inner.samples)?;
        Self::from_interleaved(resampled_samples, target_sample_rate, self.inner.channels)
    }
}
