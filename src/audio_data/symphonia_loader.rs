use crate::{
    audio_data::{AudioDataLoader, ConvertToMono, KeyToneAudioData, LoadOptions},
    error::{KeyToneError, Result},
};
use std::io::Cursor;
use std::sync::Arc;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Default decoder built on Symphonia (OGG/Vorbis, WAV, FLAC, MP3 with the
/// matching features).
pub struct SymphoniaLoader;

impl AudioDataLoader for SymphoniaLoader {
    fn decode(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Arc<KeyToneAudioData>> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| KeyToneError::DecodeFailed(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| KeyToneError::DecodeFailed("No default audio track found".into()))?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| KeyToneError::DecodeFailed("Sample rate not found".into()))?;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| KeyToneError::DecodeFailed(format!("Failed to create decoder: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break, // end-of-stream
                Err(e) => {
                    return Err(KeyToneError::DecodeFailed(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break,
                Err(Error::DecodeError(e)) => {
                    log::debug!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(KeyToneError::DecodeFailed(format!(
                        "Error decoding packet: {}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            // Vorbis only reports its layout once the first packet is decoded.
            channels.get_or_insert(spec.channels.count() as u16);

            let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            tmp.copy_interleaved_ref(decoded);
            samples.extend_from_slice(tmp.samples());
        }

        let channels = channels
            .ok_or_else(|| KeyToneError::DecodeFailed("Channel count not found".into()))?;
        if samples.is_empty() {
            return Err(KeyToneError::DecodeFailed("Stream contained no audio".into()));
        }

        let mut audio_data = KeyToneAudioData::from_interleaved(samples, sample_rate, channels)
            .map_err(|e| KeyToneError::DecodeFailed(e.to_string()))?;

        if options.convert_to_mono == ConvertToMono::ForceMono {
            audio_data = audio_data.to_mono()?;
        }

        if let Some(target_rate) = options.target_sample_rate {
            if target_rate != audio_data.sample_rate() {
                log::debug!(
                    "Resampling pack audio {} Hz -> {} Hz",
                    audio_data.sample_rate(),
                    target_rate
                );
                audio_data = audio_data.resample(target_rate)?;
            }
        }

        Ok(Arc::new(audio_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wav_bytes;

    #[test]
    fn decodes_wav_from_memory() {
        let bytes = wav_bytes(8000, 2, &[0.5; 1600]);
        let audio = SymphoniaLoader
            .decode(bytes, Some("wav"), &LoadOptions::default())
            .unwrap();
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.total_frames(), 800);
        assert_eq!(audio.duration_ms(), 100);
        assert!((audio.samples()[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn force_mono_downmixes() {
        let bytes = wav_bytes(8000, 2, &[0.25; 800]);
        let options = LoadOptions::new().convert_to_mono(ConvertToMono::ForceMono);
        let audio = SymphoniaLoader.decode(bytes, Some("wav"), &options).unwrap();
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.total_frames(), 400);
    }

    #[test]
    fn resamples_to_target_rate() {
        let bytes = wav_bytes(24000, 1, &[0.1; 2400]);
        let options = LoadOptions::new().target_sample_rate(48000);
        let audio = SymphoniaLoader.decode(bytes, Some("wav"), &options).unwrap();
        assert_eq!(audio.sample_rate(), 48000);
        assert_eq!(audio.total_frames(), 4800);
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let err = SymphoniaLoader
            .decode(b"definitely not audio".to_vec(), Some("ogg"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, KeyToneError::DecodeFailed(_)));
    }
}
