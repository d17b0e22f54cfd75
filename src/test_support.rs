//! Fakes shared by the unit tests.

use crate::audio_data::{AudioDataLoader, KeyToneAudioData, LoadOptions};
use crate::error::{KeyToneError, Result};
use crate::keymap::CanonicalKeyCode;
use crate::soundpack::{ResourceFetcher, SoundPackDescriptor, SoundPackRegistry, SpriteTiming};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sample rate of audio produced by [`SyntheticDecoder`]: one frame per millisecond.
pub const SYNTHETIC_RATE: u32 = 1000;

/// 16-bit PCM WAV file holding `samples` (interleaved).
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer
                .write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Audio reference understood by [`FakeFetcher`] and [`SyntheticDecoder`].
pub fn synthetic_ref(id: &str, duration_ms: u64) -> String {
    format!("{}:{}", id, duration_ms)
}

fn pack_of(reference: &str) -> &str {
    reference.split(':').next().unwrap_or(reference)
}

/// Descriptor whose audio is `1000` ms of synthetic audio.
pub fn descriptor(id: &str, defines: &[(&str, u64, u64)]) -> SoundPackDescriptor {
    let sprite_map = defines
        .iter()
        .map(|(key, offset, duration)| {
            (CanonicalKeyCode::parse(key), SpriteTiming::new(*offset, *duration))
        })
        .collect();
    SoundPackDescriptor::new(id, id.to_uppercase(), sprite_map, synthetic_ref(id, 1000))
}

/// Registry of packs mapping Q press to `(0, 120)` and Q release to `(500, 80)`.
pub fn registry(packs: &[(&str, u64)]) -> Arc<SoundPackRegistry> {
    Arc::new(SoundPackRegistry::from_descriptors(packs.iter().map(
        |(id, duration_ms)| {
            let mut descriptor = descriptor(id, &[("16", 0, 120), ("16-up", 500, 80)]);
            descriptor.audio_ref = synthetic_ref(id, *duration_ms);
            descriptor
        },
    )))
}

/// Returns the reference itself as the resource bytes.
#[derive(Default)]
pub struct FakeFetcher {
    fail: bool,
}

impl FakeFetcher {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl ResourceFetcher for FakeFetcher {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(KeyToneError::FetchFailed {
                reference: reference.to_string(),
                reason: "offline".into(),
            });
        }
        Ok(reference.as_bytes().to_vec())
    }
}

/// Like [`FakeFetcher`] but each pack's fetch blocks until [`release`](Self::release)d.
#[derive(Clone, Default)]
pub struct GatedFetcher {
    gates: Arc<Mutex<HashMap<String, (Sender<()>, Receiver<()>)>>>,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn gate(&self, id: &str) -> (Sender<()>, Receiver<()>) {
        self.gates
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(crossbeam_channel::unbounded)
            .clone()
    }

    pub fn release(&self, id: &str) {
        self.gate(id).0.send(()).unwrap();
    }
}

impl ResourceFetcher for GatedFetcher {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let (_, opened) = self.gate(pack_of(reference));
        opened
            .recv_timeout(Duration::from_secs(10))
            .map_err(|e| KeyToneError::FetchFailed {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;
        Ok(reference.as_bytes().to_vec())
    }
}

enum DecoderMode {
    Ok,
    Fail,
    Panic,
}

/// Decodes `id:duration_ms` into that many frames of mono audio at [`SYNTHETIC_RATE`].
pub struct SyntheticDecoder {
    mode: DecoderMode,
}

impl Default for SyntheticDecoder {
    fn default() -> Self {
        Self {
            mode: DecoderMode::Ok,
        }
    }
}

impl SyntheticDecoder {
    pub fn failing() -> Self {
        Self {
            mode: DecoderMode::Fail,
        }
    }

    pub fn panicking() -> Self {
        Self {
            mode: DecoderMode::Panic,
        }
    }
}

impl AudioDataLoader for SyntheticDecoder {
    fn decode(
        &self,
        bytes: Vec<u8>,
        _extension: Option<&str>,
        _options: &LoadOptions,
    ) -> Result<Arc<KeyToneAudioData>> {
        match self.mode {
            DecoderMode::Ok => {}
            DecoderMode::Fail => return Err(KeyToneError::DecodeFailed("corrupt stream".into())),
            DecoderMode::Panic => panic!("decoder blew up"),
        }

        let text = String::from_utf8(bytes).unwrap();
        let duration_ms: usize = text
            .rsplit(':')
            .next()
            .and_then(|d| d.parse().ok())
            .unwrap_or(1000);
        let audio =
            KeyToneAudioData::from_interleaved(vec![0.25; duration_ms], SYNTHETIC_RATE, 1)?;
        Ok(Arc::new(audio))
    }
}
