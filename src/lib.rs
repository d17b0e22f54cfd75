//! Keystroke click sounds.
//!
//! A sound pack is one audio resource holding every key's click, plus a sprite
//! map from key codes to `(offset, duration)` slices of it. Key events are
//! normalized to canonical codes, resolved against the current pack's sprite
//! map and played as overlapping voices through one shared gain stage.
//!
//! [`KeyToneController`] ties it together: it opens the audio output, loads
//! the selected pack in the background, and subscribes to an
//! [`InputSource`] while enabled.

pub mod audio_data;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod keymap;
pub mod mixer;
pub mod playback;
pub mod resolver;
pub mod soundpack;

#[cfg(test)]
mod test_support;

pub use audio_data::{ConvertToMono, KeyToneAudioData, LoadOptions};
pub use config::{EngineSettings, EngineStatus, KeyToneConfig};
pub use controller::{EngineState, KeyPipeline, KeyToneController, LifecycleState};
pub use engine::{AudioFillCallback, KeyToneEngine};
pub use error::{KeyToneError, Result};
pub use events::KeyToneEvent;
pub use input::{InputSource, KeyHandler, ManualInput, RawKeyEvent, SubscriptionId};
pub use keymap::{CanonicalKeyCode, KeyPhase, normalize};
pub use mixer::VoiceMixer;
pub use playback::{PlaybackEngine, Voice};
pub use resolver::SpriteResolver;
pub use soundpack::{
    LoadedPack, SoundPackDescriptor, SoundPackLoader, SoundPackRegistry, SpriteMap, SpriteTiming,
};
