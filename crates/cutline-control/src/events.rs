//! Typed events the controllers expose to the front-end view layer.
//!
//! Replaces dynamic signal dispatch with an explicit event queue the
//! front-end drains after each call into the controller.

use cutline_timeline::Producer;

/// An event for the front-end to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The selection changed in any way.
    SelectionChanged,
    /// A clip became the current selection (its composed producer,
    /// effect window widened over adjacent transitions), or nothing is
    /// selected anymore.
    Selected(Option<Box<Producer>>),
    /// A track head became the current selection.
    TrackHeadSelected(usize),
    /// The whole multitrack became the current selection.
    MultitrackSelected,
    /// A gesture hit a locked track; flash its lock control.
    TrackLockPulse(usize),
    StatusMessage(String),
    /// The playhead was moved by the controller.
    Seeked(i64),
    PositionChanged(i64),
    CurrentTrackChanged(usize),
    FadeInChanged(i64),
    FadeOutChanged(i64),
    /// The copy buffer now holds a clip.
    ClipCopied,
    /// A trim changed the duration of a still-image clip.
    ImageDurationChanged,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    TracksShorter,
    TracksTaller,
}
