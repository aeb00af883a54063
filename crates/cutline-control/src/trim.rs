//! The trim/transition gesture session.
//!
//! A drag trim delivers many incremental deltas. The session coalesces them
//! into exactly one undo command per gesture: each applied delta replaces the
//! pending command with one parameterized by the cumulative counters, and the
//! commit pushes that single command, with the gesture's before/after track
//! snapshots attached, to the journal. A gesture that nets out to zero
//! produces no history entry.
//!
//! Each delta is re-evaluated against adjacency state, in priority order:
//! create a transition by trimming into the neighbor, remove a transition by
//! over-trimming past it, resize an abutting transition, or a plain trim.
//! The first three only apply outside ripple mode.

use tracing::debug;

use cutline_timeline::{MultitrackModel, TimelineCommand, TrackSnapshot, UndoJournal};

/// Which edge of a clip a trim gesture grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEdge {
    In,
    Out,
}

/// The branch a trim delta resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimBranch {
    /// The neighbor shrank and a transition covers the overlap.
    CreateTransition { transition: usize },
    /// An existing transition was retracted past and removed.
    RemoveTransition { clip: usize },
    /// An abutting transition was resized in place.
    ResizeTransition,
    /// The clip edge moved; `clip` is its possibly shifted index.
    Plain { clip: usize },
}

/// Accumulator for one continuous trim gesture.
///
/// Idle until the first applied delta, then accumulating until [`commit`]
/// flushes it back to idle.
///
/// [`commit`]: TrimSession::commit
#[derive(Debug, Default)]
pub struct TrimSession {
    trim_delta: i64,
    transition_delta: i64,
    pending: Option<TimelineCommand>,
    before: Option<TrackSnapshot>,
    track: Option<usize>,
}

impl TrimSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn trim_delta(&self) -> i64 {
        self.trim_delta
    }

    pub fn transition_delta(&self) -> i64 {
        self.transition_delta
    }

    fn snapshot_before(&mut self, model: &MultitrackModel, track: usize) {
        if self.before.is_none() {
            self.before = Some(TrackSnapshot::capture(model, track));
            self.track = Some(track);
        }
    }

    /// Apply one incremental delta to a clip's in edge. Positive delta moves
    /// the edge right (shortens the clip). Returns the branch taken, or
    /// `None` when the delta is rejected with no state change.
    pub fn trim_in(
        &mut self,
        model: &mut MultitrackModel,
        track: usize,
        index: usize,
        delta: i64,
        ripple: bool,
    ) -> Option<TrimBranch> {
        if !ripple && model.add_transition_by_trim_in_valid(track, index, delta) {
            self.snapshot_before(model, track);
            let transition = model.add_transition_by_trim_in(track, index, delta);
            self.transition_delta += delta;
            self.pending = Some(TimelineCommand::AddTransitionByTrimIn {
                track,
                index: transition,
                transition_delta: self.transition_delta,
                trim_delta: self.trim_delta,
                before: None,
                after: None,
            });
            Some(TrimBranch::CreateTransition { transition })
        } else if !ripple && model.remove_transition_by_trim_in_valid(track, index, delta) {
            self.snapshot_before(model, track);
            let length = model.transition_length(track, index - 1).unwrap_or(0);
            // Lift the transition and extend the clip back over the exposed
            // range, then re-apply whatever delta remains as a plain trim.
            model.lift(track, index - 1);
            let clip = model.trim_clip_in(track, index, -length, false);
            let remaining = delta + length;
            let clip = if remaining != 0 && model.trim_clip_in_valid(track, clip, remaining, false) {
                model.trim_clip_in(track, clip, remaining, false)
            } else {
                clip
            };
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::RemoveTransitionByTrimIn {
                track,
                index: clip,
                trim_delta: self.trim_delta,
                removed_length: length,
                before: None,
                after: None,
            });
            Some(TrimBranch::RemoveTransition { clip })
        } else if !ripple && model.trim_transition_out_valid(track, index, delta) {
            self.snapshot_before(model, track);
            model.trim_transition_out(track, index, delta);
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::TrimTransitionOut {
                track,
                index,
                delta: self.trim_delta,
                before: None,
                after: None,
            });
            Some(TrimBranch::ResizeTransition)
        } else if model.trim_clip_in_valid(track, index, delta, ripple) {
            self.snapshot_before(model, track);
            let clip = model.trim_clip_in(track, index, delta, ripple);
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::TrimClipIn {
                track,
                index: clip,
                delta: self.trim_delta,
                ripple,
                before: None,
                after: None,
            });
            Some(TrimBranch::Plain { clip })
        } else {
            None
        }
    }

    /// Apply one incremental delta to a clip's out edge. Positive delta
    /// moves the edge right (lengthens the clip).
    pub fn trim_out(
        &mut self,
        model: &mut MultitrackModel,
        track: usize,
        index: usize,
        delta: i64,
        ripple: bool,
    ) -> Option<TrimBranch> {
        if !ripple && model.add_transition_by_trim_out_valid(track, index, delta) {
            self.snapshot_before(model, track);
            let transition = model.add_transition_by_trim_out(track, index, delta);
            self.transition_delta += delta;
            self.pending = Some(TimelineCommand::AddTransitionByTrimOut {
                track,
                index: transition,
                transition_delta: self.transition_delta,
                trim_delta: self.trim_delta,
                before: None,
                after: None,
            });
            Some(TrimBranch::CreateTransition { transition })
        } else if !ripple && model.remove_transition_by_trim_out_valid(track, index, delta) {
            self.snapshot_before(model, track);
            let length = model.transition_length(track, index + 1).unwrap_or(0);
            model.lift(track, index + 1);
            model.trim_clip_out(track, index, length, false);
            let remaining = delta - length;
            if remaining != 0 && model.trim_clip_out_valid(track, index, remaining, false) {
                model.trim_clip_out(track, index, remaining, false);
            }
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::RemoveTransitionByTrimOut {
                track,
                index,
                trim_delta: self.trim_delta,
                removed_length: length,
                before: None,
                after: None,
            });
            Some(TrimBranch::RemoveTransition { clip: index })
        } else if !ripple && model.trim_transition_in_valid(track, index, delta) {
            self.snapshot_before(model, track);
            model.trim_transition_in(track, index, delta);
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::TrimTransitionIn {
                track,
                index,
                delta: self.trim_delta,
                before: None,
                after: None,
            });
            Some(TrimBranch::ResizeTransition)
        } else if model.trim_clip_out_valid(track, index, delta, ripple) {
            self.snapshot_before(model, track);
            model.trim_clip_out(track, index, delta, ripple);
            self.trim_delta += delta;
            self.pending = Some(TimelineCommand::TrimClipOut {
                track,
                index,
                delta: self.trim_delta,
                ripple,
                before: None,
                after: None,
            });
            Some(TrimBranch::Plain { clip: index })
        } else {
            None
        }
    }

    /// End the gesture. Pushes the pending command iff a cumulative delta is
    /// non-zero, then resets to idle. Returns whether a command was pushed.
    pub fn commit(&mut self, model: &MultitrackModel, journal: &mut UndoJournal) -> bool {
        let pushed = match self.pending.take() {
            Some(mut command) if self.trim_delta != 0 || self.transition_delta != 0 => {
                let after = self.track.map(|t| TrackSnapshot::capture(model, t));
                command.attach_snapshots(self.before.take(), after);
                debug!(
                    trim_delta = self.trim_delta,
                    transition_delta = self.transition_delta,
                    "committing trim gesture"
                );
                journal.push(command);
                true
            }
            _ => false,
        };
        self.trim_delta = 0;
        self.transition_delta = 0;
        self.pending = None;
        self.before = None;
        self.track = None;
        pushed
    }
}
