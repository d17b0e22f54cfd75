//! Picks the sprite to play for a key.

use crate::keymap::CanonicalKeyCode;
use crate::soundpack::{SpriteMap, SpriteTiming};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Resolves canonical key codes against a pack's [`SpriteMap`].
///
/// An authored, non-sentinel entry always wins. A key without one borrows a
/// uniformly random timing authored for the same phase, so unmapped keys still
/// click and releases never borrow press sounds. If the pack authored nothing
/// for that phase the key stays silent.
#[derive(Debug)]
pub struct SpriteResolver<R: Rng = StdRng> {
    rng: R,
}

impl SpriteResolver<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Resolver with a reproducible fallback sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SpriteResolver<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SpriteResolver<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn resolve(&mut self, code: &CanonicalKeyCode, map: &SpriteMap) -> Option<SpriteTiming> {
        if let Some(timing) = map.get(code).filter(|t| !t.is_sentinel()) {
            return Some(timing);
        }

        let candidates = map.candidates(code.phase());
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[self.rng.gen_range(0..candidates.len())])
    }
}
