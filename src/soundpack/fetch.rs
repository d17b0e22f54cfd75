use crate::error::{KeyToneError, Result};

/// Source of the encoded bytes behind a descriptor's `audio_ref`.
///
/// Loads call this from a worker thread, so it may block.
pub trait ResourceFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`KeyToneError::FetchFailed`] if the resource cannot be read.
    fn fetch(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Reads `audio_ref` as a filesystem path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl ResourceFetcher for FileFetcher {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        std::fs::read(reference).map_err(|e| KeyToneError::FetchFailed {
            reference: reference.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sound.ogg");
        std::fs::write(&path, b"abc").unwrap();

        let bytes = FileFetcher.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"abc");
    }

    #[test]
    fn missing_file_is_fetch_failure() {
        let err = FileFetcher.fetch("/nonexistent/keytone/sound.ogg").unwrap_err();
        match err {
            KeyToneError::FetchFailed { reference, .. } => {
                assert_eq!(reference, "/nonexistent/keytone/sound.ogg")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
