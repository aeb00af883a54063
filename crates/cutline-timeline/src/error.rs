//! Error types for the timeline model.

use thiserror::Error;

/// Main error type for timeline operations.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid coordinate: track {track} item {item}")]
    InvalidCoordinate { track: usize, item: usize },

    #[error("timeline error: {0}")]
    Model(String),
}

/// Result type alias for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
