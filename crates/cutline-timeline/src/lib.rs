//! Cutline Timeline - Multitrack edit model
//!
//! Implements the model side of the timeline:
//! - Tracks holding clips, blanks, and transitions
//! - Validity predicates and mutating operations for every edit gesture
//! - Change notifications over a queued channel
//! - Reversible commands and a depth-bounded undo journal

pub mod clip;
pub mod command;
pub mod error;
pub mod journal;
pub mod model;
pub mod track;

pub use clip::{Clip, Filter, Producer, Service};
pub use command::{TimelineCommand, TrackSnapshot};
pub use error::{Result, TimelineError};
pub use journal::UndoJournal;
pub use model::{ClipInfo, ModelEvent, MultitrackModel};
pub use track::{Track, TrackItem, TrackKind};
