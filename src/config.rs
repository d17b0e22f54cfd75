//! Configuration for KeyTone

use crate::audio_data::ConvertToMono;
use serde::{Deserialize, Serialize};

/// Output and decoding configuration, fixed for the lifetime of a controller.
#[derive(Debug, Clone)]
pub struct KeyToneConfig {
    /// Requested output sample rate. Packs are resampled to the rate the
    /// device actually opened with.
    pub sample_rate: u32,
    /// Frames per audio callback.
    pub block_size: usize,
    /// Output channel count.
    pub channels: u16,
    /// Channel handling when decoding pack audio.
    pub convert_to_mono: ConvertToMono,
}

impl Default for KeyToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
            convert_to_mono: ConvertToMono::ForceMono,
        }
    }
}

impl KeyToneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn convert_to_mono(mut self, convert: ConvertToMono) -> Self {
        self.convert_to_mono = convert;
        self
    }
}

/// Settings pushed in by the surrounding application.
///
/// This is the whole inbound surface of the engine: persistence and the UI
/// that edits these values live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub enabled: bool,
    pub volume: f32,
    pub selected_pack_id: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: 0.5,
            selected_pack_id: "pack1".to_string(),
        }
    }
}

/// State reported back to the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_loading: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_use_camel_case_keys() {
        let settings: EngineSettings = serde_json::from_str(
            r#"{"enabled": true, "volume": 0.25, "selectedPackId": "cherry"}"#,
        )
        .unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.volume, 0.25);
        assert_eq!(settings.selected_pack_id, "cherry");
    }

    #[test]
    fn default_settings_start_disabled() {
        let settings = EngineSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.volume, 0.5);
        assert_eq!(settings.selected_pack_id, "pack1");
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = KeyToneConfig::new()
            .sample_rate(44100)
            .channels(1)
            .block_size(256)
            .convert_to_mono(ConvertToMono::Original);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.block_size, 256);
        assert_eq!(config.convert_to_mono, ConvertToMono::Original);
    }
}
