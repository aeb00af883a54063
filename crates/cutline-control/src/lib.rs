//! Cutline Control - Timeline and property-panel controllers
//!
//! The presentation layer between user gestures and the multitrack model:
//! - Selection state and the shared clip resolution policy
//! - The edit coordinator turning intents into undoable commands
//! - The trim/transition gesture session (one undo command per gesture)
//! - The pending clip-update side channel for property panels
//! - The still-image source property controller

pub mod controller;
pub mod error;
pub mod events;
pub mod image;
pub mod resolve;
pub mod selection;
pub mod trim;
pub mod update;

pub use controller::{SourceClip, TimelineController};
pub use error::{ControlError, Result};
pub use events::UiEvent;
pub use image::{FsProbe, ImageSourceController, ImageUpdate, SequenceProbe};
pub use resolve::choose_clip_at_position;
pub use selection::{ClipCoordinate, ClipList, Selection};
pub use trim::{TrimBranch, TrimEdge, TrimSession};
pub use update::{compose_selected_producer, PendingUpdate};
