//! Lifecycle controller: enable/disable, pack switching and the key pipeline.

use crate::config::{EngineSettings, EngineStatus, KeyToneConfig};
use crate::engine::KeyToneEngine;
use crate::error::{KeyToneError, Result};
use crate::events::KeyToneEvent;
use crate::input::{InputSource, RawKeyEvent, SubscriptionId};
use crate::keymap::normalize;
use crate::playback::PlaybackEngine;
use crate::resolver::SpriteResolver;
use crate::soundpack::{LoadCompletion, LoadedPack, SoundPackLoader, SoundPackRegistry, SpriteTiming};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Disabled,
    Loading,
    /// A pack is loaded and key events play.
    Ready,
    /// The latest load failed. A previously loaded pack, if any, keeps playing.
    Error,
}

/// Process-wide engine state. Written only by the controller.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub enabled: bool,
    pub volume: f32,
    pub selected_pack_id: String,
    pub current_pack: Option<Arc<LoadedPack>>,
    pub lifecycle: LifecycleState,
    pub last_error: Option<String>,
}

impl EngineState {
    fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            enabled: false,
            volume: settings.volume.clamp(0.0, 1.0),
            selected_pack_id: settings.selected_pack_id.clone(),
            current_pack: None,
            lifecycle: LifecycleState::Disabled,
            last_error: None,
        }
    }

    pub fn current_pack_id(&self) -> Option<&str> {
        self.current_pack.as_deref().map(LoadedPack::id)
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalize → resolve → play, run synchronously for every key event.
///
/// Locks are held only long enough to clone the current pack handle and to
/// draw from the resolver's RNG.
#[derive(Clone)]
pub struct KeyPipeline {
    state: Arc<Mutex<EngineState>>,
    resolver: Arc<Mutex<SpriteResolver>>,
    playback: PlaybackEngine,
}

impl KeyPipeline {
    /// Plays the click for `event`, returning the timing that was chosen.
    pub fn handle(&self, event: &RawKeyEvent) -> Option<SpriteTiming> {
        if !self.playback.is_active() {
            return None;
        }
        let pack = lock(&self.state).current_pack.clone()?;

        let code = normalize(&event.code, event.phase);
        let timing = self
            .resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(&code, pack.sprite_map())?;

        self.playback.play(pack.audio(), timing);
        Some(timing)
    }
}

/// Owns the engine state and drives loads, playback gating and the input subscription.
///
/// Load completions are committed on the controller's thread, from
/// [`poll_events`](Self::poll_events) or [`wait_for_load`](Self::wait_for_load).
pub struct KeyToneController<I: InputSource> {
    state: Arc<Mutex<EngineState>>,
    loader: SoundPackLoader,
    playback: PlaybackEngine,
    pipeline: KeyPipeline,
    input: I,
    subscription: Option<SubscriptionId>,
    requested_pack_id: Option<String>,
    // Selected pack whose latest load failed; not retried until reselected or re-enabled.
    failed_pack_id: Option<String>,
    pending_events: Vec<KeyToneEvent>,
    // Kept alive for the stream; dropped last.
    engine: Option<KeyToneEngine>,
}

impl<I: InputSource> KeyToneController<I> {
    /// Opens the default audio output and builds a disabled controller.
    ///
    /// If no output can be opened the controller still works but stays
    /// silent, and the first [`poll_events`](Self::poll_events) reports
    /// [`KeyToneEvent::AudioUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyToneError::Configuration`] for an unusable `config`.
    pub fn open(config: KeyToneConfig, registry: Arc<SoundPackRegistry>, input: I) -> Result<Self> {
        let mut engine = KeyToneEngine::new(config.clone())?;
        let (playback, mixer) = PlaybackEngine::new();
        let mixer = Mutex::new(mixer);
        engine.set_fill_callback(move |buffer, _sample_rate, channels| {
            let Ok(mut mixer) = mixer.try_lock() else {
                log::warn!("Failed to acquire mixer lock in audio callback");
                return 0;
            };
            mixer.fill(buffer, channels)
        });

        let options = crate::audio_data::LoadOptions::new().convert_to_mono(config.convert_to_mono);
        let mut loader = SoundPackLoader::new(registry).with_options(options);

        let (playback, engine, unavailable) = match engine.start() {
            Ok(()) => {
                loader.set_target_sample_rate(engine.sample_rate());
                (playback, Some(engine), None)
            }
            Err(e @ KeyToneError::Configuration(_)) => return Err(e),
            Err(e) => {
                log::warn!("Running without audio output: {}", e);
                (PlaybackEngine::unavailable(), None, Some(e.to_string()))
            }
        };

        let mut controller = Self::with_playback(loader, playback, input);
        controller.engine = engine;
        if let Some(reason) = unavailable {
            controller
                .pending_events
                .push(KeyToneEvent::AudioUnavailable { reason });
        }
        Ok(controller)
    }

    /// Builds a disabled controller around an existing loader and playback handle.
    pub fn with_playback(loader: SoundPackLoader, playback: PlaybackEngine, input: I) -> Self {
        let state = Arc::new(Mutex::new(EngineState::from_settings(
            &EngineSettings::default(),
        )));
        let pipeline = KeyPipeline {
            state: state.clone(),
            resolver: Arc::new(Mutex::new(SpriteResolver::new())),
            playback: playback.clone(),
        };

        Self {
            state,
            loader,
            playback,
            pipeline,
            input,
            subscription: None,
            requested_pack_id: None,
            failed_pack_id: None,
            pending_events: Vec::new(),
            engine: None,
        }
    }

    /// Replaces the resolver, e.g. with a seeded one.
    pub fn with_resolver(self, resolver: SpriteResolver) -> Self {
        *self
            .pipeline
            .resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = resolver;
        self
    }

    /// Applies the whole inbound settings record.
    pub fn apply_settings(&mut self, settings: &EngineSettings) {
        self.set_volume(settings.volume);
        self.select_pack(&settings.selected_pack_id);
        self.set_enabled(settings.enabled);
    }

    /// Outbound status. Commits any finished load first, so `is_loading`
    /// drops as soon as the worker is done; the matching notice is kept for
    /// [`poll_events`](Self::poll_events).
    pub fn status(&mut self) -> EngineStatus {
        self.drain_completions();
        EngineStatus {
            is_loading: self.loader.is_loading(),
        }
    }

    /// Snapshot of the engine state.
    pub fn state(&self) -> EngineState {
        lock(&self.state).clone()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        let was_enabled = lock(&self.state).enabled;
        if enabled == was_enabled {
            return;
        }

        if enabled {
            let volume = {
                let mut state = lock(&self.state);
                state.enabled = true;
                state.volume
            };
            self.playback.set_active(true);
            self.playback.set_volume(volume);
            self.attach();
            log::info!("Keystroke sounds enabled");
            self.pending_events.push(KeyToneEvent::Enabled);
            self.failed_pack_id = None;
            self.ensure_selected_pack();
        } else {
            {
                let mut state = lock(&self.state);
                state.enabled = false;
                state.lifecycle = LifecycleState::Disabled;
            }
            self.detach();
            self.playback.set_active(false);
            log::info!("Keystroke sounds disabled");
            self.pending_events.push(KeyToneEvent::Disabled);
        }
    }

    /// Selects the pack to play. While enabled this starts loading it.
    pub fn select_pack(&mut self, pack_id: &str) {
        let enabled = {
            let mut state = lock(&self.state);
            if state.selected_pack_id != pack_id {
                log::info!("Selected sound pack {}", pack_id);
                state.selected_pack_id = pack_id.to_string();
                self.failed_pack_id = None;
            }
            state.enabled
        };
        if enabled {
            self.ensure_selected_pack();
        }
    }

    /// Sets the shared volume, clamped to `[0, 1]`.
    ///
    /// The level is remembered while disabled and applied on enable.
    pub fn set_volume(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        let old_volume = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut state.volume, level)
        };
        self.playback.set_volume(level);
        if old_volume != level {
            self.pending_events.push(KeyToneEvent::VolumeChanged {
                old_volume,
                new_volume: level,
            });
        }
    }

    /// Starts a load unless the selected pack is already loaded, loading, or
    /// has just failed to load.
    fn ensure_selected_pack(&mut self) {
        let (selected, current) = {
            let state = lock(&self.state);
            (
                state.selected_pack_id.clone(),
                state.current_pack_id().map(str::to_string),
            )
        };

        let is_selected = |id: Option<&str>| id == Some(selected.as_str());
        let settled = if self.loader.is_loading() {
            is_selected(self.requested_pack_id.as_deref()).then_some(LifecycleState::Loading)
        } else if is_selected(current.as_deref()) {
            Some(LifecycleState::Ready)
        } else if is_selected(self.failed_pack_id.as_deref()) {
            Some(LifecycleState::Error)
        } else {
            None
        };

        if let Some(lifecycle) = settled {
            lock(&self.state).lifecycle = lifecycle;
            return;
        }

        let generation = self.loader.load(&selected);
        log::debug!("Loading {} as generation {}", selected, generation);
        self.requested_pack_id = Some(selected);
        lock(&self.state).lifecycle = LifecycleState::Loading;
    }

    fn commit(&mut self, completion: LoadCompletion) {
        let mut state = lock(&self.state);
        match completion.result {
            Ok(pack) => {
                log::info!(
                    "Sound pack {} ready ({} sprites)",
                    pack.id(),
                    pack.sprite_map().len()
                );
                state.current_pack = Some(pack);
                state.last_error = None;
                self.failed_pack_id = None;
                if state.enabled {
                    state.lifecycle = LifecycleState::Ready;
                }
                self.pending_events.push(KeyToneEvent::PackLoaded {
                    pack_id: completion.pack_id,
                    generation: completion.generation,
                });
            }
            Err(e) => {
                match state.current_pack_id() {
                    Some(kept) => log::warn!(
                        "Failed to load sound pack {}, keeping {}: {}",
                        completion.pack_id,
                        kept,
                        e
                    ),
                    None => log::warn!("Failed to load sound pack {}: {}", completion.pack_id, e),
                }
                state.last_error = Some(e.to_string());
                self.failed_pack_id = Some(completion.pack_id.clone());
                if state.enabled {
                    state.lifecycle = LifecycleState::Error;
                }
                self.pending_events.push(KeyToneEvent::PackLoadFailed {
                    pack_id: completion.pack_id,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Commits finished loads and returns the notices raised since the last call.
    pub fn poll_events(&mut self) -> Vec<KeyToneEvent> {
        self.drain_completions();
        std::mem::take(&mut self.pending_events)
    }

    fn drain_completions(&mut self) {
        while let Some(completion) = self.loader.try_next() {
            self.commit(completion);
        }
    }

    /// Blocks up to `timeout` for the latest load to finish and commits it.
    ///
    /// Returns true if no load is outstanding afterwards.
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        if self.loader.is_loading() {
            if let Some(completion) = self.loader.wait_next(timeout) {
                self.commit(completion);
            }
        }
        !self.loader.is_loading()
    }

    fn attach(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        let pipeline = self.pipeline.clone();
        let id = self.input.register(Box::new(move |event| {
            pipeline.handle(event);
        }));
        self.subscription = Some(id);
    }

    fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.input.unregister(id);
        }
    }

    pub fn pipeline(&self) -> &KeyPipeline {
        &self.pipeline
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn registry(&self) -> &Arc<SoundPackRegistry> {
        self.loader.registry()
    }

    /// The audio output, if one was opened.
    pub fn engine(&self) -> Option<&KeyToneEngine> {
        self.engine.as_ref()
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }
}

impl<I: InputSource> Drop for KeyToneController<I> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ManualInput;
    use crate::mixer::VoiceMixer;
    use crate::test_support::{FakeFetcher, GatedFetcher, SyntheticDecoder, descriptor, registry};

    const WAIT: Duration = Duration::from_secs(5);

    fn controller(
        loader: SoundPackLoader,
    ) -> (KeyToneController<ManualInput>, VoiceMixer) {
        let (playback, mixer) = PlaybackEngine::new();
        let controller = KeyToneController::with_playback(loader, playback, ManualInput::new())
            .with_resolver(SpriteResolver::seeded(11));
        (controller, mixer)
    }

    fn fake_loader(packs: &[(&str, u64)]) -> SoundPackLoader {
        SoundPackLoader::new(registry(packs))
            .with_fetcher(FakeFetcher::default())
            .with_decoder(SyntheticDecoder::default())
    }

    #[test]
    fn enable_loads_selected_pack() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        assert_eq!(controller.state().lifecycle, LifecycleState::Disabled);

        controller.set_enabled(true);
        assert_eq!(controller.state().lifecycle, LifecycleState::Loading);
        assert!(controller.wait_for_load(WAIT));

        let state = controller.state();
        assert_eq!(state.lifecycle, LifecycleState::Ready);
        assert_eq!(state.current_pack_id(), Some("pack1"));
        assert!(!controller.status().is_loading);

        let events = controller.poll_events();
        assert_eq!(events[0], KeyToneEvent::Enabled);
        assert!(matches!(
            events[1],
            KeyToneEvent::PackLoaded { ref pack_id, .. } if pack_id == "pack1"
        ));
    }

    #[test]
    fn key_events_play_resolved_sprites() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_enabled(true);
        controller.wait_for_load(WAIT);

        let pipeline = controller.pipeline().clone();
        assert_eq!(
            pipeline.handle(&RawKeyEvent::press("KeyQ")),
            Some(SpriteTiming::new(0, 120))
        );
        assert_eq!(
            pipeline.handle(&RawKeyEvent::release("KeyQ")),
            Some(SpriteTiming::new(500, 80))
        );
        assert_eq!(
            pipeline.handle(&RawKeyEvent::press("KeyW")),
            Some(SpriteTiming::new(0, 120))
        );
        assert_eq!(controller.playback().voices_started(), 3);

        controller.input_mut().tap("Space");
        assert_eq!(controller.playback().voices_started(), 5);
    }

    #[test]
    fn disabled_controller_plays_nothing() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_enabled(true);
        controller.wait_for_load(WAIT);
        assert_eq!(controller.input().subscriber_count(), 1);

        controller.set_enabled(false);
        assert_eq!(controller.input().subscriber_count(), 0);
        for _ in 0..50 {
            controller.input_mut().tap("KeyQ");
        }
        assert_eq!(
            controller.pipeline().handle(&RawKeyEvent::press("KeyQ")),
            None
        );
        assert_eq!(controller.playback().voices_started(), 0);
        assert_eq!(controller.state().lifecycle, LifecycleState::Disabled);
    }

    #[test]
    fn empty_sprite_map_never_plays() {
        let registry = Arc::new(SoundPackRegistry::from_descriptors([descriptor("pack1", &[])]));
        let loader = SoundPackLoader::new(registry)
            .with_fetcher(FakeFetcher::default())
            .with_decoder(SyntheticDecoder::default());
        let (mut controller, _mixer) = controller(loader);
        controller.set_enabled(true);
        controller.wait_for_load(WAIT);

        controller.input_mut().tap("KeyQ");
        controller.input_mut().tap("Enter");
        assert_eq!(controller.playback().voices_started(), 0);
    }

    #[test]
    fn latest_selection_wins_when_it_finishes_first() {
        let fetcher = GatedFetcher::new();
        let loader = SoundPackLoader::new(registry(&[("a", 1000), ("b", 2000)]))
            .with_fetcher(fetcher.clone())
            .with_decoder(SyntheticDecoder::default());
        let (mut controller, _mixer) = controller(loader);

        controller.select_pack("a");
        controller.set_enabled(true);
        controller.select_pack("b");
        assert!(controller.status().is_loading);

        fetcher.release("b");
        assert!(controller.wait_for_load(WAIT));
        assert_eq!(controller.state().current_pack_id(), Some("b"));

        fetcher.release("a");
        std::thread::sleep(Duration::from_millis(200));
        controller.poll_events();
        assert_eq!(controller.state().current_pack_id(), Some("b"));
        assert_eq!(controller.state().lifecycle, LifecycleState::Ready);
    }

    #[test]
    fn latest_selection_wins_when_it_finishes_last() {
        let fetcher = GatedFetcher::new();
        let loader = SoundPackLoader::new(registry(&[("a", 1000), ("b", 2000)]))
            .with_fetcher(fetcher.clone())
            .with_decoder(SyntheticDecoder::default());
        let (mut controller, _mixer) = controller(loader);

        controller.select_pack("a");
        controller.set_enabled(true);
        controller.select_pack("b");

        fetcher.release("a");
        std::thread::sleep(Duration::from_millis(200));
        let events = controller.poll_events();
        assert!(events.iter().all(|e| e.pack_id().is_none()));
        assert!(controller.state().current_pack.is_none());
        assert!(controller.status().is_loading);

        fetcher.release("b");
        assert!(controller.wait_for_load(WAIT));
        let state = controller.state();
        assert_eq!(state.current_pack_id(), Some("b"));
        assert_eq!(state.current_pack.unwrap().audio().duration_ms(), 2000);
    }

    #[test]
    fn failed_switch_keeps_previous_pack() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_enabled(true);
        controller.wait_for_load(WAIT);
        controller.poll_events();

        controller.select_pack("missing");
        assert!(controller.wait_for_load(WAIT));

        let state = controller.state();
        assert_eq!(state.lifecycle, LifecycleState::Error);
        assert_eq!(state.current_pack_id(), Some("pack1"));
        assert!(state.last_error.unwrap().contains("missing"));
        assert!(!controller.status().is_loading);

        let events = controller.poll_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());

        controller.input_mut().tap("KeyQ");
        assert_eq!(controller.playback().voices_started(), 2);
    }

    #[test]
    fn failed_first_load_is_reported_once() {
        let loader = SoundPackLoader::new(registry(&[("pack1", 1000)]))
            .with_fetcher(FakeFetcher::failing())
            .with_decoder(SyntheticDecoder::default());
        let (mut controller, _mixer) = controller(loader);
        controller.set_enabled(true);
        assert!(controller.wait_for_load(WAIT));

        let failures: Vec<_> = controller
            .poll_events()
            .into_iter()
            .filter(KeyToneEvent::is_error)
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(controller.poll_events().is_empty());
        assert_eq!(controller.state().lifecycle, LifecycleState::Error);
        assert!(controller.state().current_pack.is_none());
    }

    #[test]
    fn volume_is_remembered_while_disabled() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_volume(0.2);
        assert_eq!(controller.state().volume, 0.2);
        assert_eq!(controller.playback().volume(), PlaybackEngine::DEFAULT_VOLUME);

        controller.set_enabled(true);
        assert_eq!(controller.playback().volume(), 0.2);

        controller.set_volume(3.0);
        assert_eq!(controller.playback().volume(), 1.0);
    }

    #[test]
    fn apply_settings_drives_everything() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000), ("pack2", 1500)]));
        controller.apply_settings(&EngineSettings {
            enabled: true,
            volume: 0.3,
            selected_pack_id: "pack2".into(),
        });
        assert_eq!(controller.state().lifecycle, LifecycleState::Loading);
        assert!(controller.wait_for_load(WAIT));

        let state = controller.state();
        assert!(state.enabled);
        assert_eq!(state.current_pack_id(), Some("pack2"));
        assert_eq!(controller.playback().volume(), 0.3);

        // Re-applying the same settings does not reload.
        controller.apply_settings(&EngineSettings {
            enabled: true,
            volume: 0.3,
            selected_pack_id: "pack2".into(),
        });
        assert!(!controller.status().is_loading);
    }

    #[test]
    fn reenabling_keeps_loaded_pack() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_enabled(true);
        controller.wait_for_load(WAIT);
        let generation = controller.state().current_pack.unwrap().generation();

        controller.set_enabled(false);
        controller.set_enabled(true);
        assert!(!controller.status().is_loading);
        assert_eq!(controller.state().lifecycle, LifecycleState::Ready);
        assert_eq!(
            controller.state().current_pack.unwrap().generation(),
            generation
        );
    }

    #[test]
    fn reenabling_during_a_load_reports_loading() {
        let fetcher = GatedFetcher::new();
        let loader = SoundPackLoader::new(registry(&[("a", 1000)]))
            .with_fetcher(fetcher.clone())
            .with_decoder(SyntheticDecoder::default());
        let (mut controller, _mixer) = controller(loader);
        controller.select_pack("a");

        controller.set_enabled(true);
        controller.set_enabled(false);
        assert_eq!(controller.state().lifecycle, LifecycleState::Disabled);
        controller.set_enabled(true);
        assert!(controller.status().is_loading);
        assert_eq!(controller.state().lifecycle, LifecycleState::Loading);

        fetcher.release("a");
        assert!(controller.wait_for_load(WAIT));
        assert_eq!(controller.state().lifecycle, LifecycleState::Ready);
        assert_eq!(controller.state().current_pack_id(), Some("a"));
    }

    #[test]
    fn unchanged_settings_do_not_retry_a_failed_pack() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        let mut settings = EngineSettings {
            enabled: true,
            volume: 0.5,
            selected_pack_id: "missing".into(),
        };
        controller.apply_settings(&settings);
        assert!(controller.wait_for_load(WAIT));
        let failures = controller.poll_events().into_iter().filter(KeyToneEvent::is_error).count();
        assert_eq!(failures, 1);

        for volume in [0.4, 0.3, 0.2] {
            settings.volume = volume;
            controller.apply_settings(&settings);
            assert!(!controller.status().is_loading);
        }
        assert!(!controller.poll_events().iter().any(KeyToneEvent::is_error));
        assert_eq!(controller.state().lifecycle, LifecycleState::Error);
        assert_eq!(controller.playback().volume(), 0.2);

        // Re-enabling is an explicit retry.
        controller.set_enabled(false);
        controller.set_enabled(true);
        assert!(controller.wait_for_load(WAIT));
        let failures = controller.poll_events().into_iter().filter(KeyToneEvent::is_error).count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn reselecting_after_a_failure_loads_again() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.select_pack("missing");
        controller.set_enabled(true);
        assert!(controller.wait_for_load(WAIT));

        controller.select_pack("pack1");
        assert!(controller.wait_for_load(WAIT));
        assert_eq!(controller.state().lifecycle, LifecycleState::Ready);

        controller.select_pack("missing");
        assert_eq!(controller.state().lifecycle, LifecycleState::Loading);
        assert!(controller.wait_for_load(WAIT));
        assert_eq!(controller.state().lifecycle, LifecycleState::Error);
        assert_eq!(controller.state().current_pack_id(), Some("pack1"));
    }

    #[test]
    fn status_commits_finished_loads() {
        let (mut controller, _mixer) = controller(fake_loader(&[("pack1", 1000)]));
        controller.set_enabled(true);

        let deadline = std::time::Instant::now() + WAIT;
        while controller.status().is_loading {
            assert!(std::time::Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(controller.state().current_pack_id(), Some("pack1"));
        assert!(controller.poll_events().iter().any(|e| matches!(
            e,
            KeyToneEvent::PackLoaded { pack_id, .. } if pack_id == "pack1"
        )));
    }
}
