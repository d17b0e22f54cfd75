//! Sound packs: descriptors, sprite maps, discovery and loading.
//!
//! A pack is one audio resource holding every key's click back to back, plus
//! a descriptor mapping canonical key codes to `(offset, duration)` slices of
//! that resource.

mod fetch;
mod loader;
mod registry;

pub use fetch::{FileFetcher, ResourceFetcher};
pub use loader::{LoadCompletion, LoadedPack, SoundPackLoader};
pub use registry::{DESCRIPTOR_FILE, DEFAULT_SOUND_FILE, SoundPackRegistry};

use crate::keymap::{CanonicalKeyCode, KeyPhase};
use serde::Deserialize;
use std::collections::HashMap;

/// Where a key's click sits in the pack audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteTiming {
    pub offset_ms: u64,
    pub duration_ms: u64,
}

impl SpriteTiming {
    /// Reserved value meaning "no authored sound". Never played.
    pub const SENTINEL: Self = Self::new(0, 0);

    pub const fn new(offset_ms: u64, duration_ms: u64) -> Self {
        Self {
            offset_ms,
            duration_ms,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    pub fn end_ms(&self) -> u64 {
        self.offset_ms.saturating_add(self.duration_ms)
    }
}

/// Key-to-timing table of one pack.
///
/// Alongside the exact table, the non-sentinel timings of each phase are kept
/// in key order so a fallback pick is a single index into a slice.
#[derive(Debug, Clone, Default)]
pub struct SpriteMap {
    entries: HashMap<CanonicalKeyCode, SpriteTiming>,
    press_candidates: Vec<SpriteTiming>,
    release_candidates: Vec<SpriteTiming>,
}

impl SpriteMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &CanonicalKeyCode) -> Option<SpriteTiming> {
        self.entries.get(code).copied()
    }

    /// Non-sentinel timings authored for the given phase, in key order.
    pub fn candidates(&self, phase: KeyPhase) -> &[SpriteTiming] {
        match phase {
            KeyPhase::Press => &self.press_candidates,
            KeyPhase::Release => &self.release_candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalKeyCode, &SpriteTiming)> {
        self.entries.iter()
    }

    /// Copy of this map without the entries reaching past `limit_ms`.
    ///
    /// Returns the filtered map and the codes that were removed.
    pub fn retain_within(&self, limit_ms: u64) -> (Self, Vec<CanonicalKeyCode>) {
        let mut dropped = Vec::new();
        let kept = self
            .entries
            .iter()
            .filter(|(code, timing)| {
                let fits = timing.end_ms() <= limit_ms;
                if !fits {
                    dropped.push((*code).clone());
                }
                fits
            })
            .map(|(code, timing)| (code.clone(), *timing));
        let map: SpriteMap = kept.collect();
        dropped.sort();
        (map, dropped)
    }
}

impl FromIterator<(CanonicalKeyCode, SpriteTiming)> for SpriteMap {
    fn from_iter<I: IntoIterator<Item = (CanonicalKeyCode, SpriteTiming)>>(iter: I) -> Self {
        let entries: HashMap<_, _> = iter.into_iter().collect();

        let mut ordered: Vec<_> = entries
            .iter()
            .filter(|(_, timing)| !timing.is_sentinel())
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));

        let mut press_candidates = Vec::new();
        let mut release_candidates = Vec::new();
        for (code, timing) in ordered {
            match code.phase() {
                KeyPhase::Press => press_candidates.push(*timing),
                KeyPhase::Release => release_candidates.push(*timing),
            }
        }

        Self {
            entries,
            press_candidates,
            release_candidates,
        }
    }
}

/// How a pack's `defines` should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDefineType {
    /// One shared audio resource sliced by `[offset, duration]`.
    #[default]
    Single,
    /// One file per key. Not playable by this engine.
    Multi,
}

/// Immutable description of one sound pack.
#[derive(Debug, Clone)]
pub struct SoundPackDescriptor {
    pub id: String,
    pub display_name: String,
    pub sprite_map: SpriteMap,
    /// Reference handed to the [`ResourceFetcher`] to obtain the audio bytes.
    pub audio_ref: String,
    pub key_define_type: KeyDefineType,
    pub includes_numpad: bool,
}

impl SoundPackDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        sprite_map: SpriteMap,
        audio_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            sprite_map,
            audio_ref: audio_ref.into(),
            key_define_type: KeyDefineType::Single,
            includes_numpad: false,
        }
    }

    /// Extension of the audio resource, used as a decoder hint.
    pub fn audio_extension(&self) -> Option<&str> {
        std::path::Path::new(&self.audio_ref)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// On-disk shape of a pack's `config.json`. Its own `id` field is ignored;
/// the pack directory name is the id.
#[derive(Debug, Deserialize)]
pub(crate) struct DescriptorFile {
    pub name: String,
    #[serde(default)]
    pub key_define_type: KeyDefineType,
    #[serde(default)]
    pub includes_numpad: bool,
    #[serde(default)]
    pub sound: Option<String>,
    pub defines: HashMap<String, Option<[u64; 2]>>,
}

impl DescriptorFile {
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn sprite_map(&self) -> SpriteMap {
        self.defines
            .iter()
            .filter_map(|(key, value)| {
                value.map(|[offset, duration]| {
                    (CanonicalKeyCode::parse(key), SpriteTiming::new(offset, duration))
                })
            })
            .collect()
    }
}
