use crate::config::KeyToneConfig;
use crate::error::{KeyToneError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Callback function type for filling audio samples
///
/// The callback receives:
/// - `buffer`: interleaved slice to fill, already zeroed
/// - `sample_rate`: sample rate of the open stream
/// - `channels`: number of output channels
///
/// Returns the number of frames actually filled (frames = samples / channels)
pub type AudioFillCallback = dyn Fn(&mut [f32], u32, u16) -> usize + Send + Sync;

/// Owns the output stream and drives a fill callback from the audio thread.
pub struct KeyToneEngine {
    config: KeyToneConfig,
    sample_rate: u32,
    channels: u16,
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    fill_callback: Option<Arc<AudioFillCallback>>,
}

impl KeyToneEngine {
    pub fn new(config: KeyToneConfig) -> Result<Self> {
        if config.channels == 0 || config.sample_rate == 0 {
            return Err(KeyToneError::Configuration(format!(
                "Output needs at least one channel and a sample rate, got {} ch at {} Hz",
                config.channels, config.sample_rate
            )));
        }

        Ok(Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            config,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
            fill_callback: None,
        })
    }

    /// Set the callback that fills each output buffer. Must not block.
    pub fn set_fill_callback<F>(&mut self, callback: F)
    where
        F: Fn(&mut [f32], u32, u16) -> usize + Send + Sync + 'static,
    {
        self.fill_callback = Some(Arc::new(callback));
    }

    /// Opens the default output device and starts the stream.
    ///
    /// If the device does not support the configured sample rate, its default
    /// configuration is used instead; [`sample_rate`](Self::sample_rate) reports
    /// what was actually opened.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let fill_callback = self.fill_callback.clone().ok_or_else(|| {
            KeyToneError::Configuration("No fill callback set before starting engine".into())
        })?;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            KeyToneError::AudioSubsystemUnavailable("No default output device available".into())
        })?;

        let default_config = device.default_output_config().map_err(|e| {
            KeyToneError::AudioSubsystemUnavailable(format!("Failed to get default config: {}", e))
        })?;

        let (sample_rate, channels) = self.negotiate(&device, &default_config);
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: match self.config.block_size {
                0 => cpal::BufferSize::Default,
                size => cpal::BufferSize::Fixed(size as u32),
            },
        };

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                self.create_stream::<f32>(&device, &config, fill_callback)
            }
            cpal::SampleFormat::I16 => {
                self.create_stream::<i16>(&device, &config, fill_callback)
            }
            cpal::SampleFormat::U16 => {
                self.create_stream::<u16>(&device, &config, fill_callback)
            }
            other => {
                return Err(KeyToneError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }?;

        stream.play().map_err(|e| {
            KeyToneError::AudioSubsystemUnavailable(format!("Failed to start stream: {}", e))
        })?;

        log::info!(
            "Audio output started: {} Hz, {} ch, {:?}",
            sample_rate,
            channels,
            default_config.sample_format()
        );

        self.sample_rate = sample_rate;
        self.channels = channels;
        self.stream = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);

        Ok(())
    }

    /// Picks the configured rate and channel count if the device offers them,
    /// otherwise the device default.
    fn negotiate(
        &self,
        device: &cpal::Device,
        default_config: &cpal::SupportedStreamConfig,
    ) -> (u32, u16) {
        let wanted_rate = cpal::SampleRate(self.config.sample_rate);
        let supported = device
            .supported_output_configs()
            .map(|mut configs| {
                configs.any(|range| {
                    range.channels() == self.config.channels
                        && range.sample_format() == default_config.sample_format()
                        && range.min_sample_rate() <= wanted_rate
                        && wanted_rate <= range.max_sample_rate()
                })
            })
            .unwrap_or(false);

        if supported {
            (self.config.sample_rate, self.config.channels)
        } else {
            log::warn!(
                "Output device does not support {} Hz / {} ch, using its default {} Hz / {} ch",
                self.config.sample_rate,
                self.config.channels,
                default_config.sample_rate().0,
                default_config.channels()
            );
            (default_config.sample_rate().0, default_config.channels())
        }
    }

    /// Stop the audio engine
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            log::info!("Audio output stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Sample rate of the open stream, or the configured rate before [`start`](Self::start).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get the number of audio frames processed since start
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &KeyToneConfig {
        &self.config
    }

    /// Create a typed audio stream
    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        fill_callback: Arc<AudioFillCallback>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let is_running = self.is_running.clone();
        let frames_processed = self.frames_processed.clone();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;
        let scratch_frames = match config.buffer_size {
            cpal::BufferSize::Fixed(frames) => frames as usize,
            cpal::BufferSize::Default => DEFAULT_SCRATCH_FRAMES,
        };
        let mut scratch = vec![0.0f32; scratch_frames.max(1) * channels as usize];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !is_running.load(Ordering::Relaxed) {
                        data.fill(T::from_sample(0.0f32));
                        return;
                    }

                    let frames_filled = render_chunked(data, &mut scratch, |buffer| {
                        fill_callback(buffer, sample_rate, channels)
                    });
                    frames_processed.fetch_add(frames_filled, Ordering::Relaxed);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                KeyToneError::AudioSubsystemUnavailable(format!("Failed to build stream: {}", e))
            })
    }
}

/// Scratch size used when the host picks the buffer size.
const DEFAULT_SCRATCH_FRAMES: usize = 4096;

/// Renders `data` through the fixed-size `scratch` buffer, calling `fill` once
/// per scratch-sized chunk so the audio thread never allocates.
///
/// `scratch.len()` must be a multiple of the channel count.
fn render_chunked<T, F>(data: &mut [T], scratch: &mut [f32], mut fill: F) -> usize
where
    T: SizedSample + FromSample<f32>,
    F: FnMut(&mut [f32]) -> usize,
{
    let mut frames = 0;
    for chunk in data.chunks_mut(scratch.len()) {
        let buffer = &mut scratch[..chunk.len()];
        buffer.fill(0.0);
        frames += fill(buffer);
        for (out, sample) in chunk.iter_mut().zip(buffer.iter()) {
            *out = T::from_sample(*sample);
        }
    }
    frames
}

impl Drop for KeyToneEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
