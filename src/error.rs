//! Error types for drumfill

use thiserror::Error;

/// Result alias for fallible drumfill operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Errors surfaced by the outer layers (config, audio, MIDI).
///
/// The sequencing core itself never fails: out-of-range input is clamped or
/// ignored, and trigger dispatch is fire-and-forget.
#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Failed to decode shared state: {0}")]
    Codec(#[from] crate::codec::CodecError),

    #[error("Audio output unavailable: {0}")]
    Audio(String),

    #[error("MIDI error: {0}")]
    Midi(String),
}
