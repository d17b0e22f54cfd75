use crate::audio_data::{AudioDataLoader, KeyToneAudioData, LoadOptions, SymphoniaLoader};
use crate::error::{KeyToneError, Result};
use crate::soundpack::{FileFetcher, ResourceFetcher, SoundPackDescriptor, SoundPackRegistry, SpriteMap};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A decoded pack ready for playback. Never mutated; a newer load replaces it.
#[derive(Debug)]
pub struct LoadedPack {
    descriptor: Arc<SoundPackDescriptor>,
    sprite_map: SpriteMap,
    audio: Arc<KeyToneAudioData>,
    generation: u64,
}

impl LoadedPack {
    /// Pairs a descriptor with its decoded audio.
    ///
    /// Sprite entries that reach past the end of `audio` are dropped so every
    /// timing in [`sprite_map`](Self::sprite_map) slices real samples.
    pub fn new(
        descriptor: Arc<SoundPackDescriptor>,
        audio: Arc<KeyToneAudioData>,
        generation: u64,
    ) -> Self {
        let (sprite_map, dropped) = descriptor.sprite_map.retain_within(audio.duration_ms());
        if !dropped.is_empty() {
            log::warn!(
                "Sound pack {}: ignoring {} sprite(s) past the end of its {} ms audio: {}",
                descriptor.id,
                dropped.len(),
                audio.duration_ms(),
                dropped
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Self {
            descriptor,
            sprite_map,
            audio,
            generation,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &SoundPackDescriptor {
        &self.descriptor
    }

    /// The descriptor's sprite map, restricted to timings inside the audio.
    pub fn sprite_map(&self) -> &SpriteMap {
        &self.sprite_map
    }

    pub fn audio(&self) -> &Arc<KeyToneAudioData> {
        &self.audio
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Terminal outcome of one load attempt.
#[derive(Debug)]
pub struct LoadCompletion {
    pub pack_id: String,
    pub generation: u64,
    pub result: Result<Arc<LoadedPack>>,
}

/// Everything a worker thread needs to load one pack.
struct LoadJob {
    descriptor: Arc<SoundPackDescriptor>,
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn AudioDataLoader>,
    options: LoadOptions,
    generation: u64,
}

impl LoadJob {
    fn run(&self) -> Result<Arc<LoadedPack>> {
        let descriptor = &self.descriptor;
        log::info!(
            "Loading sound pack {} ({}), generation {}",
            descriptor.id,
            descriptor.display_name,
            self.generation
        );

        let bytes = self.fetcher.fetch(&descriptor.audio_ref)?;
        let audio = self
            .decoder
            .decode(bytes, descriptor.audio_extension(), &self.options)?;

        log::info!(
            "Sound pack {} decoded: {} Hz, {} ch, {} ms",
            descriptor.id,
            audio.sample_rate(),
            audio.channels(),
            audio.duration_ms()
        );
        Ok(Arc::new(LoadedPack::new(
            descriptor.clone(),
            audio,
            self.generation,
        )))
    }

    /// Runs the job, turning a panic in a fetcher or decoder into an error so
    /// the attempt still completes.
    fn run_catching(&self) -> Result<Arc<LoadedPack>> {
        catch_unwind(AssertUnwindSafe(|| self.run())).unwrap_or_else(|_| {
            Err(KeyToneError::DecodeFailed(format!(
                "Loader for {} panicked",
                self.descriptor.id
            )))
        })
    }
}

/// Loads sound packs on background threads.
///
/// Every [`load`](Self::load) issues a new generation. Only the completion of
/// the latest generation is handed out by [`try_next`](Self::try_next) and
/// [`wait_next`](Self::wait_next); older ones still run to the end but are
/// dropped when they arrive.
pub struct SoundPackLoader {
    registry: Arc<SoundPackRegistry>,
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn AudioDataLoader>,
    options: LoadOptions,
    latest_generation: u64,
    in_flight: bool,
    completion_sender: Sender<LoadCompletion>,
    completion_receiver: Receiver<LoadCompletion>,
}

impl SoundPackLoader {
    /// Loader reading pack audio from disk and decoding it with Symphonia.
    pub fn new(registry: Arc<SoundPackRegistry>) -> Self {
        let (completion_sender, completion_receiver) = crossbeam_channel::unbounded();
        Self {
            registry,
            fetcher: Arc::new(FileFetcher),
            decoder: Arc::new(SymphoniaLoader),
            options: LoadOptions::default(),
            latest_generation: 0,
            in_flight: false,
            completion_sender,
            completion_receiver,
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl ResourceFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_decoder(mut self, decoder: impl AudioDataLoader + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<SoundPackRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Sample rate packs are resampled to; applies to loads started afterwards.
    pub fn set_target_sample_rate(&mut self, rate: u32) {
        self.options.target_sample_rate = Some(rate);
    }

    /// True while the latest issued load has not completed.
    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    fn next_generation(&mut self) -> u64 {
        self.latest_generation += 1;
        self.latest_generation
    }

    fn job(&self, id: &str, generation: u64) -> Result<LoadJob> {
        let descriptor = self
            .registry
            .shared(id)
            .ok_or_else(|| KeyToneError::DescriptorNotFound(id.to_string()))?;
        Ok(LoadJob {
            descriptor,
            fetcher: self.fetcher.clone(),
            decoder: self.decoder.clone(),
            options: self.options.clone(),
            generation,
        })
    }

    /// Starts loading `id` in the background and returns its generation.
    ///
    /// The result arrives through [`try_next`](Self::try_next) or
    /// [`wait_next`](Self::wait_next), unless another load is started first.
    pub fn load(&mut self, id: &str) -> u64 {
        let generation = self.next_generation();
        self.in_flight = true;
        let sender = self.completion_sender.clone();
        let pack_id = id.to_string();

        let job = match self.job(id, generation) {
            Ok(job) => job,
            Err(e) => {
                let _ = sender.send(LoadCompletion {
                    pack_id,
                    generation,
                    result: Err(e),
                });
                return generation;
            }
        };

        let worker_sender = sender.clone();
        let worker_pack_id = pack_id.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("keytone-load-{}", generation))
            .spawn(move || {
                let result = job.run_catching();
                let _ = worker_sender.send(LoadCompletion {
                    pack_id: worker_pack_id,
                    generation,
                    result,
                });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn loader thread: {}", e);
            let _ = sender.send(LoadCompletion {
                pack_id,
                generation,
                result: Err(KeyToneError::Io(e)),
            });
        }

        generation
    }

    /// Loads `id` on the calling thread, superseding any background load.
    pub fn load_blocking(&mut self, id: &str) -> Result<Arc<LoadedPack>> {
        let generation = self.next_generation();
        self.in_flight = false;
        self.job(id, generation)?.run_catching()
    }

    /// Keeps `completion` only if it belongs to the latest generation.
    fn accept(&mut self, completion: LoadCompletion) -> Option<LoadCompletion> {
        if completion.generation != self.latest_generation {
            log::debug!(
                "Discarding stale load of {} (generation {}, latest {})",
                completion.pack_id,
                completion.generation,
                self.latest_generation
            );
            return None;
        }

        self.in_flight = false;
        Some(completion)
    }

    /// Returns the latest load's completion if it has arrived, without blocking.
    pub fn try_next(&mut self) -> Option<LoadCompletion> {
        while let Ok(completion) = self.completion_receiver.try_recv() {
            if let Some(completion) = self.accept(completion) {
                return Some(completion);
            }
        }
        None
    }

    /// Like [`try_next`](Self::try_next) but waits up to `timeout` for it.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    if let Some(completion) = self.accept(completion) {
                        return Some(completion);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}
