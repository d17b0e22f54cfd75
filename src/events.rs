//! Event types for KeyTone

/// Notices the controller reports to the surrounding application.
///
/// Each load attempt reports at most once, and only if it was still the
/// latest attempt when it finished.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyToneEvent {
    PackLoaded { pack_id: String, generation: u64 },
    PackLoadFailed { pack_id: String, error: String },
    Enabled,
    Disabled,
    VolumeChanged { old_volume: f32, new_volume: f32 },
    AudioUnavailable { reason: String },
}

impl KeyToneEvent {
    pub fn pack_id(&self) -> Option<&str> {
        match self {
            Self::PackLoaded { pack_id, .. } | Self::PackLoadFailed { pack_id, .. } => {
                Some(pack_id)
            }
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::PackLoadFailed { .. } | Self::AudioUnavailable { .. }
        )
    }
}
