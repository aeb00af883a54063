//! Reversible edit commands.
//!
//! Uses the Command pattern: every mutation the coordinator performs is
//! recorded as a [`TimelineCommand`] that can re-apply itself (`redo`) and
//! invert itself (`undo`). Commands are pushed to the journal *after* their
//! effect has been applied; `push` never executes anything.
//!
//! Operations that restructure a track's item list carry a [`TrackSnapshot`]
//! of the before-state and invert by restoring it. Simple property edits
//! (fades, track toggles) invert algebraically. Gesture commands (the trim
//! family) additionally carry an after-snapshot attached at commit so that
//! redo replays the whole gesture in one step, however many branches the
//! gesture crossed.

use crate::clip::Clip;
use crate::model::MultitrackModel;
use crate::track::{Track, TrackItem, TrackKind};

/// The item list of one track, frozen at a point in time.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    pub track: usize,
    pub items: Vec<TrackItem>,
}

impl TrackSnapshot {
    pub fn capture(model: &MultitrackModel, track: usize) -> Self {
        Self {
            track,
            items: model
                .track(track)
                .map(|t| t.items.clone())
                .unwrap_or_default(),
        }
    }

    pub fn restore(&self, model: &mut MultitrackModel) {
        model.restore_items(self.track, self.items.clone());
    }
}

/// A reversible edit operation, one variant per user-facing mutation.
#[derive(Debug, Clone)]
pub enum TimelineCommand {
    Append {
        track: usize,
        index: usize,
        clip: Clip,
    },
    Insert {
        track: usize,
        position: i64,
        clip: Clip,
        before: TrackSnapshot,
    },
    Overwrite {
        track: usize,
        position: i64,
        clip: Clip,
        before: TrackSnapshot,
    },
    Remove {
        track: usize,
        index: usize,
        /// The removed item; reinserting it is the exact inverse.
        item: TrackItem,
    },
    Lift {
        track: usize,
        index: usize,
        before: TrackSnapshot,
    },
    Split {
        track: usize,
        index: usize,
        position: i64,
        before: TrackSnapshot,
    },
    MoveClip {
        from_track: usize,
        to_track: usize,
        index: usize,
        position: i64,
        ripple: bool,
        before: Vec<TrackSnapshot>,
    },
    AddTransitionOnDrop {
        track: usize,
        index: usize,
        position: i64,
        ripple: bool,
        transition_index: usize,
        before: TrackSnapshot,
    },
    TrimClipIn {
        track: usize,
        index: usize,
        delta: i64,
        ripple: bool,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    TrimClipOut {
        track: usize,
        index: usize,
        delta: i64,
        ripple: bool,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    AddTransitionByTrimIn {
        track: usize,
        index: usize,
        transition_delta: i64,
        trim_delta: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    AddTransitionByTrimOut {
        track: usize,
        index: usize,
        transition_delta: i64,
        trim_delta: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    RemoveTransitionByTrimIn {
        track: usize,
        index: usize,
        trim_delta: i64,
        removed_length: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    RemoveTransitionByTrimOut {
        track: usize,
        index: usize,
        trim_delta: i64,
        removed_length: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    TrimTransitionIn {
        track: usize,
        index: usize,
        delta: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    TrimTransitionOut {
        track: usize,
        index: usize,
        delta: i64,
        before: Option<TrackSnapshot>,
        after: Option<TrackSnapshot>,
    },
    FadeIn {
        track: usize,
        index: usize,
        duration: i64,
        previous: i64,
    },
    FadeOut {
        track: usize,
        index: usize,
        duration: i64,
        previous: i64,
    },
    AddTrack {
        kind: TrackKind,
        index: usize,
    },
    InsertTrack {
        index: usize,
    },
    RemoveTrack {
        index: usize,
        removed: Track,
    },
    NameTrack {
        index: usize,
        name: String,
        previous: String,
    },
    MuteTrack {
        index: usize,
    },
    HideTrack {
        index: usize,
    },
    CompositeTrack {
        index: usize,
        composite: bool,
        previous: bool,
    },
    LockTrack {
        index: usize,
        lock: bool,
        previous: bool,
    },
    Merge {
        track: usize,
        index: usize,
        before: TrackSnapshot,
    },
    DetachAudio {
        track: usize,
        index: usize,
        position: i64,
        payload: String,
        audio_track: usize,
        created_track: bool,
        before: Vec<TrackSnapshot>,
    },
    UpdateClip {
        track: usize,
        index: usize,
        position: i64,
        before: String,
        after: String,
    },
    /// A group of commands that undo/redo atomically.
    Batch {
        label: String,
        commands: Vec<TimelineCommand>,
    },
}

impl TimelineCommand {
    /// Re-apply this command's effect.
    pub fn redo(&self, model: &mut MultitrackModel) {
        match self {
            Self::Append { track, clip, .. } => {
                model.append(*track, clip.clone());
            }
            Self::Insert {
                track,
                position,
                clip,
                ..
            } => {
                model.insert(*track, *position, clip.clone());
            }
            Self::Overwrite {
                track,
                position,
                clip,
                ..
            } => {
                model.overwrite(*track, *position, clip.clone());
            }
            Self::Remove { track, index, .. } => model.remove(*track, *index),
            Self::Lift { track, index, .. } => model.lift(*track, *index),
            Self::Split {
                track,
                index,
                position,
                ..
            } => model.split(*track, *index, *position),
            Self::MoveClip {
                from_track,
                to_track,
                index,
                position,
                ripple,
                ..
            } => {
                model.move_clip(*from_track, *to_track, *index, *position, *ripple);
            }
            Self::AddTransitionOnDrop {
                track,
                index,
                position,
                ..
            } => {
                model.add_transition_on_drop(*track, *index, *position);
            }
            Self::TrimClipIn {
                track,
                index,
                delta,
                ripple,
                after,
                ..
            } => match after {
                Some(snapshot) => snapshot.restore(model),
                None => {
                    model.trim_clip_in(*track, *index, *delta, *ripple);
                }
            },
            Self::TrimClipOut {
                track,
                index,
                delta,
                ripple,
                after,
                ..
            } => match after {
                Some(snapshot) => snapshot.restore(model),
                None => model.trim_clip_out(*track, *index, *delta, *ripple),
            },
            Self::AddTransitionByTrimIn { after, .. }
            | Self::AddTransitionByTrimOut { after, .. }
            | Self::RemoveTransitionByTrimIn { after, .. }
            | Self::RemoveTransitionByTrimOut { after, .. }
            | Self::TrimTransitionIn { after, .. }
            | Self::TrimTransitionOut { after, .. } => {
                debug_assert!(after.is_some(), "gesture command pushed without snapshots");
                if let Some(snapshot) = after {
                    snapshot.restore(model);
                }
            }
            Self::FadeIn {
                track,
                index,
                duration,
                ..
            } => {
                model.set_fade_in(*track, *index, *duration);
            }
            Self::FadeOut {
                track,
                index,
                duration,
                ..
            } => {
                model.set_fade_out(*track, *index, *duration);
            }
            Self::AddTrack { kind, .. } => {
                model.add_track(*kind);
            }
            Self::InsertTrack { index } => model.insert_track(*index),
            Self::RemoveTrack { index, .. } => {
                model.remove_track(*index);
            }
            Self::NameTrack { index, name, .. } => {
                model.set_track_name(*index, name.clone());
            }
            Self::MuteTrack { index } => {
                model.toggle_mute(*index);
            }
            Self::HideTrack { index } => {
                model.toggle_hidden(*index);
            }
            Self::CompositeTrack {
                index, composite, ..
            } => {
                model.set_composite(*index, *composite);
            }
            Self::LockTrack { index, lock, .. } => {
                model.set_lock(*index, *lock);
            }
            Self::Merge { track, index, .. } => model.merge_with_next(*track, *index),
            Self::DetachAudio {
                track,
                index,
                position,
                payload,
                created_track,
                audio_track,
                ..
            } => {
                let Ok(audio_clip) = Clip::from_payload(payload) else {
                    debug_assert!(false, "detach-audio payload does not parse");
                    return;
                };
                if let Some(clip) = model.clip(*track, *index).cloned() {
                    let mut clip = clip;
                    clip.producer.audio_index = -1;
                    model.replace_clip(*track, *index, clip);
                }
                if *created_track {
                    model.add_track(TrackKind::Audio);
                }
                model.overwrite(*audio_track, *position, audio_clip);
            }
            Self::UpdateClip {
                track,
                index,
                after,
                ..
            } => {
                let Ok(clip) = Clip::from_payload(after) else {
                    debug_assert!(false, "update payload does not parse");
                    return;
                };
                model.replace_clip(*track, *index, clip);
            }
            Self::Batch { commands, .. } => {
                for command in commands {
                    command.redo(model);
                }
            }
        }
    }

    /// Invert this command's effect.
    pub fn undo(&self, model: &mut MultitrackModel) {
        match self {
            Self::Append { track, index, .. } => model.remove(*track, *index),
            Self::Insert { before, .. }
            | Self::Overwrite { before, .. }
            | Self::Lift { before, .. }
            | Self::Split { before, .. }
            | Self::Merge { before, .. }
            | Self::AddTransitionOnDrop { before, .. } => before.restore(model),
            Self::Remove { track, index, item } => {
                model.insert_item(*track, *index, item.clone());
            }
            Self::MoveClip { before, .. } => {
                for snapshot in before {
                    snapshot.restore(model);
                }
            }
            Self::TrimClipIn { before, .. }
            | Self::TrimClipOut { before, .. }
            | Self::AddTransitionByTrimIn { before, .. }
            | Self::AddTransitionByTrimOut { before, .. }
            | Self::RemoveTransitionByTrimIn { before, .. }
            | Self::RemoveTransitionByTrimOut { before, .. }
            | Self::TrimTransitionIn { before, .. }
            | Self::TrimTransitionOut { before, .. } => {
                debug_assert!(before.is_some(), "gesture command pushed without snapshots");
                if let Some(snapshot) = before {
                    snapshot.restore(model);
                }
            }
            Self::FadeIn {
                track,
                index,
                previous,
                ..
            } => {
                model.set_fade_in(*track, *index, *previous);
            }
            Self::FadeOut {
                track,
                index,
                previous,
                ..
            } => {
                model.set_fade_out(*track, *index, *previous);
            }
            Self::AddTrack { index, .. } => {
                model.remove_track(*index);
            }
            Self::InsertTrack { index } => {
                model.remove_track(*index);
            }
            Self::RemoveTrack { index, removed } => {
                model.insert_track_at(*index, removed.clone());
            }
            Self::NameTrack {
                index, previous, ..
            } => {
                model.set_track_name(*index, previous.clone());
            }
            Self::MuteTrack { index } => {
                model.toggle_mute(*index);
            }
            Self::HideTrack { index } => {
                model.toggle_hidden(*index);
            }
            Self::CompositeTrack {
                index, previous, ..
            } => {
                model.set_composite(*index, *previous);
            }
            Self::LockTrack {
                index, previous, ..
            } => {
                model.set_lock(*index, *previous);
            }
            Self::DetachAudio {
                created_track,
                audio_track,
                before,
                ..
            } => {
                if *created_track {
                    model.remove_track(*audio_track);
                }
                for snapshot in before {
                    snapshot.restore(model);
                }
            }
            Self::UpdateClip {
                track,
                index,
                before,
                ..
            } => {
                let Ok(clip) = Clip::from_payload(before) else {
                    debug_assert!(false, "update payload does not parse");
                    return;
                };
                model.replace_clip(*track, *index, clip);
            }
            Self::Batch { commands, .. } => {
                for command in commands.iter().rev() {
                    command.undo(model);
                }
            }
        }
    }

    /// Attach the gesture snapshots captured by the trim session. Only
    /// meaningful for the trim-family variants; a no-op elsewhere.
    pub fn attach_snapshots(
        &mut self,
        before_snapshot: Option<TrackSnapshot>,
        after_snapshot: Option<TrackSnapshot>,
    ) {
        match self {
            Self::TrimClipIn { before, after, .. }
            | Self::TrimClipOut { before, after, .. }
            | Self::AddTransitionByTrimIn { before, after, .. }
            | Self::AddTransitionByTrimOut { before, after, .. }
            | Self::RemoveTransitionByTrimIn { before, after, .. }
            | Self::RemoveTransitionByTrimOut { before, after, .. }
            | Self::TrimTransitionIn { before, after, .. }
            | Self::TrimTransitionOut { before, after, .. } => {
                *before = before_snapshot;
                *after = after_snapshot;
            }
            _ => {}
        }
    }
}
