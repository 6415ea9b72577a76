//! Error types for textlm

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextLayoutError>;

/// Main error type for textlm
///
/// Nothing here is retried internally: shaping is deterministic, so the same
/// input would fail the same way. Callers decide how to fall back.
#[derive(Debug, Clone, Error)]
pub enum TextLayoutError {
    #[error("Invalid layout constraints: {0}")]
    InvalidConstraints(String),

    #[error("Shaping failed: {0}")]
    Shaping(#[from] ShapingError),

    #[error("Layout cache corrupted: {0}")]
    CacheCorruption(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TextLayoutError {
    /// Whether the caller can reasonably fall back to a simpler render
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Shaping(_))
    }
}

/// Shaping errors
///
/// Cloneable so one failed shaping run can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapingError {
    #[error("Script not supported: {0}")]
    UnsupportedScript(String),

    #[error("No glyph for {ch:?} at byte {offset}")]
    MissingGlyph { ch: char, offset: usize },

    #[error("Backend produced an invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
