/// Defines how to handle channel conversion during audio loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertToMono {
    /// Keep original channels: stereo if input is stereo, mono if input is mono.
    Original,

    /// Force mono: stereo input is averaged down to one channel.
    ///
    /// Click sounds are short and centered, so mono halves the memory held by
    /// every loaded pack without an audible difference.
    ForceMono,
}

/// Options for controlling how pack audio is decoded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How to handle mono conversion during audio loading.
    pub convert_to_mono: ConvertToMono,
    /// Target sample rate for resampling (None = keep original)
    pub target_sample_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            convert_to_mono: ConvertToMono::Original,
            target_sample_rate: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_to_mono(mut self, convert: ConvertToMono) -> Self {
        self.convert_to_mono = convert;
        self
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }
}
