//! Voices and the handle the input path uses to start them.

use crate::audio_data::KeyToneAudioData;
use crate::mixer::VoiceMixer;
use crate::soundpack::SpriteTiming;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// One in-flight click: a frame span of the shared pack audio.
#[derive(Debug)]
pub struct Voice {
    audio: Arc<KeyToneAudioData>,
    cursor: usize,
    end: usize,
}

impl Voice {
    /// Voice over frames `[start, end)` of `audio`. Bounds are clamped to the buffer.
    pub fn new(audio: Arc<KeyToneAudioData>, start: usize, end: usize) -> Self {
        let total = audio.total_frames();
        let end = end.min(total);
        Self {
            audio,
            cursor: start.min(end),
            end,
        }
    }

    /// Voice for a sprite timing, or `None` if the slice holds no frames.
    pub fn for_sprite(audio: &Arc<KeyToneAudioData>, timing: SpriteTiming) -> Option<Self> {
        let (start, end) = audio.frame_span(timing.offset_ms, timing.duration_ms);
        (end > start).then(|| Self::new(audio.clone(), start, end))
    }

    pub fn remaining_frames(&self) -> usize {
        self.end - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.end
    }

    pub fn audio(&self) -> &Arc<KeyToneAudioData> {
        &self.audio
    }

    /// Mixes this voice into an interleaved buffer, advancing its cursor.
    ///
    /// Mono sources are copied to every output channel; otherwise output
    /// channel `c` reads source channel `c % source_channels`.
    /// Returns the number of frames written.
    pub fn fill_buffer(&mut self, buffer: &mut [f32], channels: u16) -> usize {
        let out_channels = channels as usize;
        if out_channels == 0 {
            return 0;
        }

        let src_channels = self.audio.channels() as usize;
        let samples = self.audio.samples();
        let frames = (buffer.len() / out_channels).min(self.remaining_frames());

        for (frame, out) in buffer.chunks_exact_mut(out_channels).take(frames).enumerate() {
            let base = (self.cursor + frame) * src_channels;
            for (channel, sample) in out.iter_mut().enumerate() {
                *sample += samples[base + channel % src_channels];
            }
        }

        self.cursor += frames;
        frames
    }
}

/// Commands consumed by the [`VoiceMixer`] on the audio thread.
#[derive(Debug)]
pub enum PlaybackCommand {
    Start(Voice),
}

/// The single gain stage every voice passes through.
///
/// Stored as `f32` bits so the audio thread reads it without locking.
#[derive(Debug, Clone)]
pub struct SharedGain(Arc<AtomicU32>);

impl SharedGain {
    pub fn new(level: f32) -> Self {
        Self(Arc::new(AtomicU32::new(level.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }
}

/// Cheap, cloneable handle for starting voices and adjusting the gain.
///
/// Every call returns immediately; voices are handed to the mixer over a
/// channel. When inactive or unavailable, calls do nothing.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    command_sender: Option<Sender<PlaybackCommand>>,
    gain: SharedGain,
    active: Arc<AtomicBool>,
    voices_started: Arc<AtomicU64>,
}

impl PlaybackEngine {
    /// Default gain of a fresh engine.
    pub const DEFAULT_VOLUME: f32 = 0.5;

    /// Creates a handle and the mixer it feeds. The handle starts inactive.
    pub fn new() -> (Self, VoiceMixer) {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        let gain = SharedGain::new(Self::DEFAULT_VOLUME);
        let engine = Self {
            command_sender: Some(command_sender),
            gain: gain.clone(),
            active: Arc::new(AtomicBool::new(false)),
            voices_started: Arc::new(AtomicU64::new(0)),
        };
        (engine, VoiceMixer::new(command_receiver, gain))
    }

    /// Handle for a process without usable audio output. Every call is a no-op.
    pub fn unavailable() -> Self {
        Self {
            command_sender: None,
            gain: SharedGain::new(Self::DEFAULT_VOLUME),
            active: Arc::new(AtomicBool::new(false)),
            voices_started: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_available(&self) -> bool {
        self.command_sender.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Gates [`play`](Self::play) and [`set_volume`](Self::set_volume).
    /// Voices already in flight play to their end either way.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Starts one voice for `timing` of `audio`. Returns whether a voice started.
    pub fn play(&self, audio: &Arc<KeyToneAudioData>, timing: SpriteTiming) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(sender) = &self.command_sender else {
            return false;
        };
        let Some(voice) = Voice::for_sprite(audio, timing) else {
            log::debug!(
                "Sprite {}+{} ms is empty at {} Hz, not playing",
                timing.offset_ms,
                timing.duration_ms,
                audio.sample_rate()
            );
            return false;
        };

        if sender.send(PlaybackCommand::Start(voice)).is_err() {
            log::warn!("Mixer is gone, dropping voice");
            return false;
        }
        self.voices_started.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Sets the shared gain, clamped to `[0, 1]`. Applies to voices already playing.
    pub fn set_volume(&self, level: f32) {
        if !self.is_active() || !self.is_available() {
            return;
        }
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.gain.set(level);
    }

    pub fn volume(&self) -> f32 {
        self.gain.get()
    }

    /// Number of voices started since creation.
    pub fn voices_started(&self) -> u64 {
        self.voices_started.load(Ordering::Relaxed)
    }
}
