//! Error types for the controllers.

use cutline_timeline::TimelineError;
use thiserror::Error;

/// Policy violations and contract failures surfaced by the controllers.
///
/// Policy violations abort the operation with no mutation and no history
/// entry; the controller has already emitted the matching user-visible
/// notice when one of these is returned.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("track {0} is locked")]
    TrackLocked(usize),

    #[error("the source is not seekable")]
    NonSeekableSource,

    #[error("the source is this project's own output")]
    SourceIsProject,

    #[error("a transition cannot be split")]
    SplitTransition,

    #[error("fade duration cannot be negative")]
    NegativeFade,

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ControlError>;
