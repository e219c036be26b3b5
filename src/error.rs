//! Error types for the guidance audio core

use thiserror::Error;

/// Result type alias for guidance audio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or driving guidance audio
///
/// Runtime operations on the control facade never return these; they are
/// logged and absorbed where they happen. Only construction paths surface them.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or mixer error
    #[error("audio error: {0}")]
    Audio(String),

    /// Sound resource could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Speech synthesis unavailable or failed
    #[error("speech error: {0}")]
    Speech(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
