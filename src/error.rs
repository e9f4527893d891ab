//! Error types for litoverlay operations.

use thiserror::Error;

/// Errors surfaced by rule loading and the audio session.
///
/// Per-rule injection failures are not errors; they are reported as
/// [`RuleOutcome`](crate::inject::RuleOutcome) values so one bad rule never
/// aborts a chapter.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Unknown audio track: {0}")]
    UnknownTrack(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),
}

/// Reasons the platform refused to start playback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Autoplay policy: playback needs a user gesture first.
    #[error("playback not allowed before user interaction")]
    NotAllowed,

    #[error("playback failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
