use crate::audio_data::{KeyToneAudioData, LoadOptions};
use crate::error::Result;
use std::sync::Arc;

/// Trait for decoding fetched pack audio into samples.
///
/// KeyTone ships [`SymphoniaLoader`](super::SymphoniaLoader); other decoders
/// can be plugged into the sound pack loader by implementing this trait.
///
/// # Example
///
/// ```ignore
/// use keytone::audio_data::{AudioDataLoader, KeyToneAudioData, LoadOptions};
/// use keytone::error::Result;
/// use std::sync::Arc;
///
/// struct RawPcmLoader;
///
/// impl AudioDataLoader for RawPcmLoader {
///     fn decode(
///         &self,
///         bytes: Vec<u8>,
///         _extension: Option<&str>,
///         _options: &LoadOptions,
///     ) -> Result<Arc<KeyToneAudioData>> {
///         let samples = bytes.iter().map(|b| *b as f32 / 128.0 - 1.0).collect();
///         Ok(Arc::new(KeyToneAudioData::from_interleaved(samples, 8000, 1)?))
///     }
/// }
/// ```
pub trait AudioDataLoader: Send + Sync {
    /// Decodes an encoded audio resource.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The complete encoded resource
    /// * `extension` - File extension of the resource, used as a format hint
    /// * `options` - Channel and sample rate conversion to apply
    ///
    /// # Errors
    ///
    /// Returns [`KeyToneError::DecodeFailed`](crate::KeyToneError::DecodeFailed)
    /// when the data cannot be decoded.
    fn decode(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
        options: &LoadOptions,
    ) -> Result<Arc<KeyToneAudioData>>;
}
