use crate::error::Result;
use crate::soundpack::{DescriptorFile, KeyDefineType, SoundPackDescriptor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Descriptor file looked for in each pack directory.
pub const DESCRIPTOR_FILE: &str = "config.json";

/// Audio file used when a descriptor does not name one.
pub const DEFAULT_SOUND_FILE: &str = "sound.ogg";

/// The sound packs available to this process.
///
/// Built once at startup, either by scanning a directory with
/// [`discover`](Self::discover) or from an explicit manifest with
/// [`from_descriptors`](Self::from_descriptors). The registry never rescans
/// on its own; build a new one to pick up new packs.
#[derive(Debug, Clone, Default)]
pub struct SoundPackRegistry {
    order: Vec<String>,
    packs: HashMap<String, Arc<SoundPackDescriptor>>,
}

impl SoundPackRegistry {
    /// Scans the immediate subdirectories of `root` for packs.
    ///
    /// A directory is a pack when it holds [`DESCRIPTOR_FILE`] and the audio file
    /// it references. The directory name is the pack id. Packs are ordered by
    /// directory name. Directories that fail to parse or reference missing audio
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an IO error only if `root` itself cannot be listed.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut dirs: Vec<_> = std::fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut descriptors = Vec::new();
        for dir in dirs {
            let Some(id) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let descriptor_path = dir.join(DESCRIPTOR_FILE);
            if !descriptor_path.is_file() {
                continue;
            }

            let file = match std::fs::read_to_string(&descriptor_path)
                .map_err(|e| e.to_string())
                .and_then(|json| DescriptorFile::parse(&json).map_err(|e| e.to_string()))
            {
                Ok(file) => file,
                Err(e) => {
                    log::warn!("Skipping sound pack {}: bad {}: {}", id, DESCRIPTOR_FILE, e);
                    continue;
                }
            };

            if file.key_define_type == KeyDefineType::Multi {
                log::warn!("Skipping sound pack {}: multi-file packs are not supported", id);
                continue;
            }

            let sound_file = file.sound.as_deref().unwrap_or(DEFAULT_SOUND_FILE);
            let audio_path = dir.join(sound_file);
            if !audio_path.is_file() {
                log::warn!(
                    "Skipping sound pack {}: audio file {} is missing",
                    id,
                    audio_path.display()
                );
                continue;
            }

            let mut descriptor = SoundPackDescriptor::new(
                id,
                file.name.clone(),
                file.sprite_map(),
                audio_path.to_string_lossy(),
            );
            descriptor.key_define_type = file.key_define_type;
            descriptor.includes_numpad = file.includes_numpad;
            descriptors.push(descriptor);
        }

        log::info!(
            "Discovered {} sound pack(s) in {}",
            descriptors.len(),
            root.display()
        );
        Ok(Self::from_descriptors(descriptors))
    }

    /// Builds a registry from an explicit list, keeping its order.
    ///
    /// A later descriptor with an id already seen replaces the earlier one but
    /// keeps the earlier position.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SoundPackDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            if !registry.packs.contains_key(&descriptor.id) {
                registry.order.push(descriptor.id.clone());
            }
            registry.packs.insert(descriptor.id.clone(), Arc::new(descriptor));
        }
        registry
    }

    /// Pack ids in discovery order.
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn get(&self, id: &str) -> Option<&SoundPackDescriptor> {
        self.packs.get(id).map(Arc::as_ref)
    }

    pub(crate) fn shared(&self, id: &str) -> Option<Arc<SoundPackDescriptor>> {
        self.packs.get(id).cloned()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SoundPackDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.packs.get(id).map(Arc::as_ref))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
