//! Error types for KeyTone

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyToneError {
    #[error("Sound pack not found: {0}")]
    DescriptorNotFound(String),

    #[error("Failed to fetch audio resource {reference}: {reason}")]
    FetchFailed { reference: String, reason: String },

    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("Audio subsystem unavailable: {0}")]
    AudioSubsystemUnavailable(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeyToneError>;
