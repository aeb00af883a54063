//! The timeline controller.
//!
//! Mediates user gestures against the multitrack model and the undo journal:
//! selection, the clip resolution policy, the edit coordinator operations,
//! and the trim/transition gesture session. The model and journal are handed
//! in at construction; the front-end drains typed [`UiEvent`]s instead of
//! binding to signals.
//!
//! Model change notifications arrive over a channel and are drained *after*
//! each mutating call returns, so selection reconciliation never re-enters
//! the mutation that caused it.

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use cutline_timeline::{
    Clip, ModelEvent, MultitrackModel, Service, TimelineCommand, TrackKind, TrackSnapshot,
    UndoJournal,
};

use crate::error::{ControlError, Result};
use crate::events::UiEvent;
use crate::resolve::choose_clip_at_position;
use crate::selection::{ClipCoordinate, ClipList, Selection};
use crate::trim::{TrimBranch, TrimEdge, TrimSession};
use crate::update::{compose_selected_producer, PendingUpdate, INDETERMINATE_POSITION};

static NON_SEEKABLE_WARNING: &str = "You cannot add a non-seekable source.";

/// The source clip currently open in the player, as far as the timeline is
/// concerned: its payload, whether it can be edited in, and whether it is
/// this project's own output (which must never be inserted into itself).
#[derive(Debug, Clone)]
pub struct SourceClip {
    pub payload: String,
    pub seekable: bool,
    pub is_project_output: bool,
}

impl SourceClip {
    pub fn seekable(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            seekable: true,
            is_project_output: false,
        }
    }
}

/// Presentation-layer controller for the timeline.
pub struct TimelineController {
    model: MultitrackModel,
    journal: UndoJournal,
    model_events: Receiver<ModelEvent>,
    ui_events: Vec<UiEvent>,

    selection: Selection,
    saved_selection: Option<Selection>,
    position: i64,
    current_track: usize,
    ripple: bool,
    ignore_next_position_change: bool,

    trim: TrimSession,
    update: Option<PendingUpdate>,
    /// Copy buffer: payload of the most recently copied clip.
    saved_producer: Option<String>,
    source: Option<SourceClip>,
}

impl TimelineController {
    pub fn new(
        model: MultitrackModel,
        model_events: Receiver<ModelEvent>,
        journal: UndoJournal,
    ) -> Self {
        Self {
            model,
            journal,
            model_events,
            ui_events: Vec::new(),
            selection: Selection::default(),
            saved_selection: None,
            position: 0,
            current_track: 0,
            ripple: false,
            ignore_next_position_change: false,
            trim: TrimSession::new(),
            update: None,
            saved_producer: None,
            source: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn model(&self) -> &MultitrackModel {
        &self.model
    }

    /// Direct model access for project assembly. Call
    /// [`drain_model_events`](Self::drain_model_events) afterwards so
    /// selection reconciliation catches up.
    pub fn model_mut(&mut self) -> &mut MultitrackModel {
        &mut self.model
    }

    pub fn journal(&self) -> &UndoJournal {
        &self.journal
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn current_track(&self) -> usize {
        self.current_track
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_ripple(&self) -> bool {
        self.ripple
    }

    pub fn set_ripple(&mut self, ripple: bool) {
        self.ripple = ripple;
    }

    pub fn set_source(&mut self, source: Option<SourceClip>) {
        self.source = source;
    }

    pub fn saved_producer(&self) -> Option<&str> {
        self.saved_producer.as_deref()
    }

    /// Take the queued UI events. The front-end calls this after each call
    /// into the controller.
    pub fn drain_ui_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.ui_events)
    }

    fn emit(&mut self, event: UiEvent) {
        self.ui_events.push(event);
    }

    fn pulse_lock_button(&mut self, track: usize) {
        self.emit(UiEvent::TrackLockPulse(track));
        self.emit(UiEvent::StatusMessage("This track is locked".into()));
    }

    // ── Playhead ────────────────────────────────────────────────

    pub fn set_position(&mut self, position: i64) {
        let length = self.model.total_length();
        if position <= length {
            self.position = position.max(0);
            self.emit(UiEvent::Seeked(self.position));
        } else {
            self.position = length;
            self.emit(UiEvent::PositionChanged(self.position));
        }
    }

    /// Playback frame callback. Ignored once right after a selection was
    /// emitted, so binding a property panel does not yank the playhead.
    pub fn on_frame_shown(&mut self, position: i64) {
        if self.ignore_next_position_change {
            self.ignore_next_position_change = false;
        } else {
            self.position = position;
            self.emit(UiEvent::PositionChanged(position));
        }
    }

    pub fn set_current_track(&mut self, track: usize) {
        let count = self.model.track_count();
        let clamped = if count == 0 { 0 } else { track.min(count - 1) };
        if clamped != self.current_track {
            self.current_track = clamped;
            self.emit(UiEvent::CurrentTrackChanged(clamped));
        }
    }

    /// Move the current track by a relative amount, clamped to the ends.
    pub fn select_track(&mut self, by: i64) {
        let count = self.model.track_count();
        if count == 0 {
            return;
        }
        let target = (self.current_track as i64 + by).clamp(0, count as i64 - 1);
        self.set_current_track(target as usize);
    }

    /// Seek to the nearest edit boundary at or before the playhead across
    /// all tracks.
    pub fn seek_previous_edit(&mut self) {
        let mut new_position = -1;
        for track in 0..self.model.track_count() {
            let count = self.model.clip_count(track);
            if count == 0 {
                continue;
            }
            let index = match self.model.index_at_position(track, self.position) {
                Some(i) if self.position == self.model.item_start(track, i) => {
                    match i.checked_sub(1) {
                        Some(prev) => prev,
                        None => continue,
                    }
                }
                Some(i) => i,
                // Past the end of this track: its last item is the boundary.
                None if self.position >= self.model.track_length(track) => count - 1,
                None => continue,
            };
            new_position = new_position.max(self.model.item_start(track, index));
        }
        if new_position >= 0 && new_position != self.position {
            self.set_position(new_position);
        }
    }

    /// Seek to the nearest edit boundary after the playhead across all
    /// tracks.
    pub fn seek_next_edit(&mut self) {
        let mut new_position = i64::MAX;
        for track in 0..self.model.track_count() {
            if let Some(index) = self.model.index_at_position(track, self.position) {
                let next = index + 1;
                if next < self.model.clip_count(track) {
                    new_position = new_position.min(self.model.item_start(track, next));
                } else {
                    new_position = new_position.min(self.model.track_length(track));
                }
            }
        }
        if new_position != i64::MAX && new_position != self.position {
            self.set_position(new_position);
        }
    }

    /// Seek to the start of a clip on the current track.
    pub fn seek_in_point(&mut self, clip_index: usize) {
        if clip_index >= self.model.clip_count(self.current_track) {
            return;
        }
        let start = self.model.item_start(self.current_track, clip_index);
        if self.position != start {
            self.set_position(start);
        }
    }

    // ── Selection ───────────────────────────────────────────────

    /// Replace the selection iff it differs by value. On change, emits
    /// `SelectionChanged`, then either the derived clip-selected producer or
    /// a nothing-selected notification.
    pub fn set_selection(&mut self, clips: ClipList, track: Option<usize>, multitrack: bool) {
        debug_assert!(
            !multitrack || (clips.is_empty() && track.is_none()),
            "a multitrack selection carries no clips and no track"
        );
        let new = Selection {
            clips,
            track,
            multitrack,
        };
        if new == self.selection {
            return;
        }
        debug!(clips = new.clips.len(), ?track, multitrack, "changing selection");
        self.selection = new;
        self.emit(UiEvent::SelectionChanged);
        if !self.selection.clips.is_empty() {
            self.emit_selected_from_selection();
        } else {
            self.update = None;
            self.emit(UiEvent::Selected(None));
        }
    }

    /// Select a single clip.
    pub fn select_clip(&mut self, track: usize, clip: usize) {
        let mut clips = ClipList::new();
        clips.push(ClipCoordinate::new(track, clip));
        self.set_selection(clips, None, false);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(ClipList::new(), None, false);
    }

    /// Resolve and select the clip under the playhead. A locked-track hit
    /// blocks selection and pulses the lock control instead.
    pub fn select_clip_under_playhead(&mut self) {
        match choose_clip_at_position(&self.model, self.position, None, self.current_track) {
            Some(coord) => {
                self.set_current_track(coord.track);
                self.select_clip(coord.track, coord.clip);
            }
            None => {
                if self.model.is_locked(self.current_track) {
                    self.pulse_lock_button(self.current_track);
                    return;
                }
                match self.model.index_at_position(self.current_track, self.position) {
                    Some(index) => self.select_clip(self.current_track, index),
                    None => self.clear_selection(),
                }
            }
        }
    }

    /// Select every non-blank item across all tracks in ascending
    /// (track, clip) order.
    pub fn select_all(&mut self) {
        let mut clips = ClipList::new();
        for track in 0..self.model.track_count() {
            for clip in 0..self.model.clip_count(track) {
                if !self.model.is_blank(track, clip) {
                    clips.push(ClipCoordinate::new(track, clip));
                }
            }
        }
        self.set_selection(clips, None, false);
    }

    pub fn select_track_head(&mut self, track: usize) {
        if track >= self.model.track_count() {
            return;
        }
        self.set_selection(ClipList::new(), Some(track), false);
        self.emit(UiEvent::TrackHeadSelected(track));
    }

    pub fn select_multitrack(&mut self) {
        self.set_selection(ClipList::new(), None, true);
        self.emit(UiEvent::MultitrackSelected);
    }

    /// Snapshot and clear the selection, so a downstream operation sees
    /// nothing selected without losing the user's context.
    pub fn save_and_clear_selection(&mut self) {
        self.saved_selection = Some(self.selection.clone());
        self.selection = Selection::default();
        self.emit(UiEvent::SelectionChanged);
    }

    pub fn restore_selection(&mut self) {
        if let Some(saved) = self.saved_selection.take() {
            self.selection = saved;
            self.emit(UiEvent::SelectionChanged);
            self.emit_selected_from_selection();
        }
    }

    /// Publish the first selected clip's composed producer and arm the
    /// pending update with its before-state.
    fn emit_selected_from_selection(&mut self) {
        if self.model.track_count() == 0 {
            self.update = None;
            self.emit(UiEvent::Selected(None));
            return;
        }
        let (track, clip) = match self.selection.first() {
            Some(coord) => (coord.track, coord.clip),
            None => (self.current_track, 0),
        };
        if let Some(producer) = compose_selected_producer(&self.model, track, clip) {
            self.update = PendingUpdate::capture(&self.model, track, clip);
            self.ignore_next_position_change = true;
            self.emit(UiEvent::Selected(Some(Box::new(producer))));
        }
    }

    // ── Model event reconciliation ──────────────────────────────

    /// Drain queued model change notifications. Called at the end of every
    /// mutating operation; also callable by the embedder after direct model
    /// access.
    pub fn drain_model_events(&mut self) {
        while let Ok(event) = self.model_events.try_recv() {
            match event {
                ModelEvent::RowsInserted { track, first, last } => {
                    self.on_rows_inserted(track, first, last);
                }
                ModelEvent::RowsRemoved { track, first, last } => {
                    self.on_rows_removed(track, first, last);
                }
                ModelEvent::Inserted { track, clip }
                | ModelEvent::Overwritten { track, clip } => {
                    self.select_clip(track, clip);
                }
                ModelEvent::Modified => self.clear_selection_if_invalid(),
            }
        }
    }

    fn reconciling(&self) -> bool {
        self.selection.track.is_none()
            && !self.selection.multitrack
            && !self.selection.clips.is_empty()
    }

    fn on_rows_inserted(&mut self, track: usize, first: usize, last: usize) {
        if !self.reconciling() {
            return;
        }
        let count = last - first + 1;
        let clips: ClipList = self
            .selection
            .clips
            .iter()
            .map(|c| {
                if c.track == track && c.clip >= first {
                    ClipCoordinate::new(c.track, c.clip + count)
                } else {
                    *c
                }
            })
            .collect();
        self.set_selection(clips, None, false);
    }

    fn on_rows_removed(&mut self, track: usize, first: usize, last: usize) {
        if !self.reconciling() {
            return;
        }
        let count = last - first + 1;
        let clips: ClipList = self
            .selection
            .clips
            .iter()
            .filter_map(|c| {
                if c.track != track || c.clip < first {
                    Some(*c)
                } else if c.clip > last {
                    Some(ClipCoordinate::new(c.track, c.clip - count))
                } else {
                    None
                }
            })
            .collect();
        self.set_selection(clips, None, false);
    }

    fn clear_selection_if_invalid(&mut self) {
        if self.selection.clips.is_empty() {
            return;
        }
        let count = self.model.clip_count(self.current_track);
        let clips: ClipList = self
            .selection
            .clips
            .iter()
            .copied()
            .filter(|c| c.clip < count)
            .collect();
        self.set_selection(clips, None, false);
    }

    // ── Source intake ───────────────────────────────────────────

    fn source_payload(&self) -> Option<String> {
        match &self.source {
            Some(source) if source.seekable => Some(source.payload.clone()),
            _ => self.saved_producer.clone(),
        }
    }

    fn guard_source(&mut self, track: usize) -> Result<String> {
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        if self.source.as_ref().is_some_and(|s| s.is_project_output) {
            return Err(ControlError::SourceIsProject);
        }
        match self.source_payload() {
            Some(payload) => Ok(payload),
            None => {
                self.emit(UiEvent::StatusMessage(NON_SEEKABLE_WARNING.into()));
                Err(ControlError::NonSeekableSource)
            }
        }
    }

    // ── Edit operations ─────────────────────────────────────────

    /// Append the active source (or the copy buffer) to the end of a track.
    pub fn append(&mut self, track: Option<usize>) -> Result<()> {
        let track = track.unwrap_or(self.current_track);
        let payload = self.guard_source(track)?;
        let clip = Clip::from_payload(&payload).map_err(ControlError::from)?;
        let index = self.model.append(track, clip.clone());
        info!(track, index, "appended clip");
        self.journal.push(TimelineCommand::Append { track, index, clip });
        self.drain_model_events();
        self.select_clip_under_playhead();
        Ok(())
    }

    /// Insert at a position, shifting everything after it. A `payload`
    /// argument bypasses the active source.
    pub fn insert(
        &mut self,
        track: Option<usize>,
        position: Option<i64>,
        payload: Option<String>,
    ) -> Result<()> {
        let track = track.unwrap_or(self.current_track);
        let payload = match payload {
            Some(payload) => {
                if self.model.is_locked(track) {
                    self.pulse_lock_button(track);
                    return Err(ControlError::TrackLocked(track));
                }
                payload
            }
            None => self.guard_source(track)?,
        };
        let mut position = position.unwrap_or(self.position);
        if self.model.track_length(track) == 0 {
            position = 0;
        }
        let clip = Clip::from_payload(&payload).map_err(ControlError::from)?;
        let before = TrackSnapshot::capture(&self.model, track);
        self.model.insert(track, position, clip.clone());
        info!(track, position, "inserted clip");
        self.journal.push(TimelineCommand::Insert {
            track,
            position,
            clip,
            before,
        });
        self.drain_model_events();
        Ok(())
    }

    /// Place at a position, consuming whatever the covered range held.
    pub fn overwrite(
        &mut self,
        track: Option<usize>,
        position: Option<i64>,
        payload: Option<String>,
    ) -> Result<()> {
        let track = track.unwrap_or(self.current_track);
        let payload = match payload {
            Some(payload) => {
                if self.model.is_locked(track) {
                    self.pulse_lock_button(track);
                    return Err(ControlError::TrackLocked(track));
                }
                payload
            }
            None => self.guard_source(track)?,
        };
        let mut position = position.unwrap_or(self.position);
        if self.model.track_length(track) == 0 {
            position = 0;
        }
        let clip = Clip::from_payload(&payload).map_err(ControlError::from)?;
        let before = TrackSnapshot::capture(&self.model, track);
        self.model.overwrite(track, position, clip.clone());
        info!(track, position, "overwrote clip");
        self.journal.push(TimelineCommand::Overwrite {
            track,
            position,
            clip,
            before,
        });
        self.drain_model_events();
        Ok(())
    }

    fn remove_clip(&mut self, track: usize, index: usize) -> Result<()> {
        if self.model.track_count() == 0 {
            return Ok(());
        }
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        let Some(item) = self.model.item(track, index).cloned() else {
            debug_assert!(false, "remove of invalid coordinate {track}:{index}");
            return Ok(());
        };
        self.model.remove(track, index);
        self.journal.push(TimelineCommand::Remove { track, index, item });
        Ok(())
    }

    /// Ripple-remove one item; downstream items shift left.
    pub fn remove(&mut self, track: usize, index: usize) -> Result<()> {
        let result = self.remove_clip(track, index);
        self.drain_model_events();
        result
    }

    fn lift_clip(&mut self, track: usize, index: usize) -> Result<()> {
        if self.model.track_count() == 0 {
            return Ok(());
        }
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        if self.model.item(track, index).is_none() {
            debug_assert!(false, "lift of invalid coordinate {track}:{index}");
            return Ok(());
        }
        if self.model.is_blank(track, index) {
            return Ok(());
        }
        let before = TrackSnapshot::capture(&self.model, track);
        self.model.lift(track, index);
        self.journal.push(TimelineCommand::Lift {
            track,
            index,
            before,
        });
        Ok(())
    }

    /// Remove one item but leave a gap in its place.
    pub fn lift(&mut self, track: usize, index: usize) -> Result<()> {
        let result = self.lift_clip(track, index);
        self.clear_selection();
        self.drain_model_events();
        result
    }

    /// Remove the selection. With copy ("cut") this copies then removes the
    /// first selected clip only; without, it ripple-deletes every selected
    /// clip, adjusting indices for clips already removed on the same track.
    pub fn remove_selection(&mut self, with_copy: bool) -> Result<()> {
        if self.model.is_locked(self.current_track) {
            self.pulse_lock_button(self.current_track);
            return Err(ControlError::TrackLocked(self.current_track));
        }
        if self.selection.clips.is_empty() {
            self.select_clip_under_playhead();
        }
        let Some(first) = self.selection.first() else {
            return Ok(());
        };

        if with_copy {
            self.copy_clip(first.track, first.clip);
            let result = self.remove_clip(first.track, first.clip);
            self.drain_model_events();
            return result;
        }

        let clips = self.selection.clips.clone();
        let n = clips.len();
        if n > 1 {
            self.journal.begin_macro(format!("Remove {n} from timeline"));
        }
        let mut removed: Vec<ClipCoordinate> = Vec::new();
        for coord in clips {
            if removed.contains(&coord) {
                continue;
            }
            let adjustment = removed
                .iter()
                .filter(|i| coord.track == i.track && coord.clip > i.clip)
                .count();
            removed.push(coord);
            let _ = self.remove_clip(coord.track, coord.clip - adjustment);
        }
        if n > 1 {
            self.journal.end_macro();
        }
        self.drain_model_events();
        Ok(())
    }

    /// Lift the selection, leaving gaps. A blank next to a lifted clip
    /// coalesces into its gap, so the coordinate is marked consumed to keep
    /// later adjustments correct.
    pub fn lift_selection(&mut self) -> Result<()> {
        if self.model.is_locked(self.current_track) {
            self.pulse_lock_button(self.current_track);
            return Err(ControlError::TrackLocked(self.current_track));
        }
        if self.selection.clips.is_empty() {
            self.select_clip_under_playhead();
        }
        if self.selection.clips.is_empty() {
            return Ok(());
        }
        let clips = self.selection.clips.clone();
        let n = clips.len();
        if n > 1 {
            self.journal.begin_macro(format!("Lift {n} from timeline"));
        }
        let mut consumed: Vec<ClipCoordinate> = Vec::new();
        for coord in clips {
            let adjustment = consumed
                .iter()
                .filter(|i| coord.track == i.track && coord.clip > i.clip)
                .count();
            let coord = ClipCoordinate::new(coord.track, coord.clip - adjustment);
            if coord.clip > 0 && self.model.is_blank(coord.track, coord.clip - 1) {
                consumed.push(coord);
            }
            if self.model.is_blank(coord.track, coord.clip + 1) {
                consumed.push(coord);
            }
            let _ = self.lift_clip(coord.track, coord.clip);
        }
        if n > 1 {
            self.journal.end_macro();
        }
        self.clear_selection();
        self.drain_model_events();
        Ok(())
    }

    /// Copy a clip, with its source window, into the copy buffer.
    pub fn copy_clip(&mut self, track: usize, index: usize) {
        let Some(clip) = self.model.clip(track, index) else {
            debug_assert!(false, "copy of invalid coordinate {track}:{index}");
            return;
        };
        match clip.to_payload() {
            Ok(payload) => {
                self.saved_producer = Some(payload);
                self.emit(UiEvent::ClipCopied);
            }
            Err(err) => warn!(%err, "could not serialize clip for the copy buffer"),
        }
    }

    /// Split the clip under the playhead (or an explicit coordinate) at the
    /// playhead. Transitions cannot be split; the playhead must lie strictly
    /// inside the clip's span.
    pub fn split_clip(&mut self, track: Option<usize>, clip: Option<usize>) -> Result<()> {
        let (track, index) = match (track, clip) {
            (Some(t), Some(c)) => (t, c),
            _ => {
                match choose_clip_at_position(&self.model, self.position, None, self.current_track)
                {
                    Some(coord) => (coord.track, coord.clip),
                    None => return Ok(()),
                }
            }
        };
        self.set_current_track(track);
        if self.model.is_transition(track, index) {
            self.emit(UiEvent::StatusMessage("You cannot split a transition.".into()));
            return Err(ControlError::SplitTransition);
        }
        let Some(info) = self.model.clip_info(track, index) else {
            return Ok(());
        };
        if self.position > info.start && self.position < info.start + info.frame_count {
            let before = TrackSnapshot::capture(&self.model, track);
            self.model.split(track, index, self.position);
            self.journal.push(TimelineCommand::Split {
                track,
                index,
                position: self.position,
                before,
            });
            self.drain_model_events();
        }
        Ok(())
    }

    // ── Trim gestures ───────────────────────────────────────────

    /// One incremental delta of a drag trim on a clip's in edge. Returns
    /// whether the delta was applied.
    pub fn trim_clip_in(&mut self, track: usize, index: usize, delta: i64) -> bool {
        let ripple = self.ripple;
        let Some(branch) = self.trim.trim_in(&mut self.model, track, index, delta, ripple) else {
            return false;
        };
        match branch {
            TrimBranch::Plain { clip } => {
                self.notify_image_trim(track, clip);
                if let Some(update) = &mut self.update {
                    if update.track == track && update.clip == index {
                        let position = update.position() + delta;
                        update.set_position(track, clip, position);
                    }
                }
            }
            TrimBranch::CreateTransition { .. } => {
                if let Some(update) = &mut self.update {
                    if update.track == track && update.clip == index {
                        update.set_position(track, index, INDETERMINATE_POSITION);
                    }
                }
            }
            TrimBranch::RemoveTransition { clip } => {
                if let Some(update) = &mut self.update {
                    if update.track == track && update.clip == index {
                        update.set_position(track, clip, INDETERMINATE_POSITION);
                    }
                }
            }
            TrimBranch::ResizeTransition => {}
        }
        self.drain_model_events();
        true
    }

    /// One incremental delta of a drag trim on a clip's out edge.
    pub fn trim_clip_out(&mut self, track: usize, index: usize, delta: i64) -> bool {
        let ripple = self.ripple;
        let Some(branch) = self.trim.trim_out(&mut self.model, track, index, delta, ripple) else {
            return false;
        };
        match branch {
            TrimBranch::Plain { clip } => {
                self.notify_image_trim(track, clip);
                if let Some(update) = &mut self.update {
                    if update.track == track && update.clip == index {
                        update.set_position(track, clip, INDETERMINATE_POSITION);
                    }
                }
            }
            TrimBranch::CreateTransition { .. } | TrimBranch::RemoveTransition { .. } => {
                if let Some(update) = &mut self.update {
                    if update.track == track && update.clip == index {
                        update.set_position(track, index, INDETERMINATE_POSITION);
                    }
                }
            }
            TrimBranch::ResizeTransition => {}
        }
        self.drain_model_events();
        true
    }

    fn notify_image_trim(&mut self, track: usize, clip: usize) {
        if let Some(info) = self.model.clip_info(track, clip) {
            if info.producer.service == Service::Image && !info.producer.is_sequence {
                self.emit(UiEvent::ImageDurationChanged);
            }
        }
    }

    /// End the trim gesture: push its single command if it netted a change.
    pub fn commit_trim(&mut self) -> bool {
        self.trim.commit(&self.model, &mut self.journal)
    }

    /// One-shot trim of the clip edge under the playhead to the playhead.
    pub fn trim_clip_at_playhead(&mut self, edge: TrimEdge) {
        let Some(coord) = choose_clip_at_position(
            &self.model,
            self.position,
            Some(self.current_track),
            self.current_track,
        ) else {
            return;
        };
        self.set_current_track(coord.track);
        let Some(info) = self.model.clip_info(coord.track, coord.clip) else {
            return;
        };
        match edge {
            TrimEdge::In => {
                let delta = self.position - info.start;
                if self.trim_clip_in(coord.track, coord.clip, delta) {
                    self.commit_trim();
                    if self.ripple {
                        self.set_position(info.start);
                    }
                }
            }
            TrimEdge::Out => {
                let delta = self.position - (info.start + info.frame_count);
                if self.trim_clip_out(coord.track, coord.clip, delta) {
                    self.commit_trim();
                }
            }
        }
    }

    // ── Move / drop ─────────────────────────────────────────────

    /// Handle a drag-drop of a clip. A valid plain move produces a move
    /// command; an overlapping drop onto an adjacent clip produces a
    /// transition command instead. Exactly one command per drop.
    pub fn move_clip(
        &mut self,
        from_track: usize,
        to_track: usize,
        index: usize,
        position: i64,
        ripple: bool,
    ) -> bool {
        if self.model.is_locked(from_track) {
            self.pulse_lock_button(from_track);
            return false;
        }
        if self.model.is_locked(to_track) {
            self.pulse_lock_button(to_track);
            return false;
        }
        if self.model.move_clip_valid(from_track, to_track, index, position, ripple) {
            let mut before = vec![TrackSnapshot::capture(&self.model, from_track)];
            if to_track != from_track {
                before.push(TrackSnapshot::capture(&self.model, to_track));
            }
            let new_index = self.model.move_clip(from_track, to_track, index, position, ripple);
            info!(from_track, to_track, position, "moved clip");
            self.journal.push(TimelineCommand::MoveClip {
                from_track,
                to_track,
                index,
                position,
                ripple,
                before,
            });
            if let Some(update) = &mut self.update {
                if update.track == from_track && update.clip == index {
                    update.set_position(to_track, new_index, position);
                }
            }
            self.drain_model_events();
            true
        } else if self.model.add_transition_valid(from_track, to_track, index, position) {
            // Clearing the selection first keeps the selected-producer
            // cascade away from coordinates the drop is about to shuffle.
            self.clear_selection();
            let before = TrackSnapshot::capture(&self.model, from_track);
            let transition_index = self.model.add_transition_on_drop(from_track, index, position);
            info!(track = from_track, transition_index, "added transition on drop");
            self.journal.push(TimelineCommand::AddTransitionOnDrop {
                track: from_track,
                index,
                position,
                ripple,
                transition_index,
                before,
            });
            self.drain_model_events();
            self.select_clip(from_track, transition_index);
            true
        } else {
            false
        }
    }

    // ── Clip property operations ────────────────────────────────

    /// Merge a clip with the next when they are contiguous cuts of the same
    /// source. `dryrun` only reports feasibility.
    pub fn merge_clip_with_next(&mut self, track: usize, index: usize, dryrun: bool) -> bool {
        if dryrun {
            return self.model.merge_with_next_valid(track, index);
        }
        if !self.model.merge_with_next_valid(track, index) {
            return false;
        }
        let before = TrackSnapshot::capture(&self.model, track);
        self.model.merge_with_next(track, index);
        self.journal.push(TimelineCommand::Merge {
            track,
            index,
            before,
        });
        self.drain_model_events();
        true
    }

    /// Detach a clip's audio onto an audio track as a standalone copy,
    /// creating the track when none exists.
    pub fn detach_audio(&mut self, track: usize, index: usize) -> Result<()> {
        if self.model.track_count() == 0 {
            return Ok(());
        }
        let Some(clip) = self.model.clip(track, index).cloned() else {
            debug_assert!(false, "detach audio of invalid coordinate {track}:{index}");
            return Ok(());
        };
        if clip.producer.audio_index < 0 {
            return Ok(());
        }
        let position = self.model.item_start(track, index);
        let payload = clip.to_payload().map_err(ControlError::from)?;

        let audio_track = (0..self.model.track_count())
            .find(|&t| self.model.track(t).is_some_and(|tr| tr.kind == TrackKind::Audio));
        let created_track = audio_track.is_none();

        let mut before = vec![TrackSnapshot::capture(&self.model, track)];
        if let Some(at) = audio_track {
            if at != track {
                before.push(TrackSnapshot::capture(&self.model, at));
            }
        }

        let mut video_clip = clip.clone();
        video_clip.producer.audio_index = -1;
        self.model.replace_clip(track, index, video_clip);
        let audio_track = match audio_track {
            Some(at) => at,
            None => self.model.add_track(TrackKind::Audio),
        };
        self.model.overwrite(audio_track, position, clip);
        info!(track, index, audio_track, "detached audio");

        self.journal.push(TimelineCommand::DetachAudio {
            track,
            index,
            position,
            payload,
            audio_track,
            created_track,
            before,
        });
        self.drain_model_events();
        Ok(())
    }

    pub fn fade_in(&mut self, track: usize, index: usize, duration: i64) -> Result<()> {
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        if duration < 0 {
            return Err(ControlError::NegativeFade);
        }
        let Some(previous) = self.model.set_fade_in(track, index, duration) else {
            debug_assert!(false, "fade on invalid coordinate {track}:{index}");
            return Ok(());
        };
        self.journal.push(TimelineCommand::FadeIn {
            track,
            index,
            duration,
            previous,
        });
        self.emit(UiEvent::FadeInChanged(duration));
        self.drain_model_events();
        Ok(())
    }

    pub fn fade_out(&mut self, track: usize, index: usize, duration: i64) -> Result<()> {
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        if duration < 0 {
            return Err(ControlError::NegativeFade);
        }
        let Some(previous) = self.model.set_fade_out(track, index, duration) else {
            debug_assert!(false, "fade on invalid coordinate {track}:{index}");
            return Ok(());
        };
        self.journal.push(TimelineCommand::FadeOut {
            track,
            index,
            duration,
            previous,
        });
        self.emit(UiEvent::FadeOutChanged(duration));
        self.drain_model_events();
        Ok(())
    }

    // ── Track operations ────────────────────────────────────────

    pub fn insert_track(&mut self) {
        let index = self.current_track;
        self.model.insert_track(index);
        self.journal.push(TimelineCommand::InsertTrack { index });
        self.drain_model_events();
    }

    pub fn remove_track(&mut self) {
        if self.model.track_count() == 0 {
            return;
        }
        let index = self.current_track;
        if let Some(removed) = self.model.remove_track(index) {
            self.journal.push(TimelineCommand::RemoveTrack { index, removed });
        }
        let count = self.model.track_count();
        if count > 0 && self.current_track >= count {
            self.set_current_track(count - 1);
        }
        self.drain_model_events();
    }

    pub fn add_audio_track(&mut self) {
        let index = self.model.add_track(TrackKind::Audio);
        self.journal.push(TimelineCommand::AddTrack {
            kind: TrackKind::Audio,
            index,
        });
        self.drain_model_events();
    }

    pub fn add_video_track(&mut self) {
        let index = self.model.add_track(TrackKind::Video);
        self.journal.push(TimelineCommand::AddTrack {
            kind: TrackKind::Video,
            index,
        });
        self.drain_model_events();
    }

    pub fn set_track_name(&mut self, index: usize, name: &str) {
        if let Some(previous) = self.model.set_track_name(index, name) {
            self.journal.push(TimelineCommand::NameTrack {
                index,
                name: name.into(),
                previous,
            });
        }
        self.drain_model_events();
    }

    pub fn toggle_track_mute(&mut self, index: usize) {
        if self.model.toggle_mute(index).is_some() {
            self.journal.push(TimelineCommand::MuteTrack { index });
        }
        self.drain_model_events();
    }

    pub fn toggle_track_hidden(&mut self, index: usize) {
        if self.model.toggle_hidden(index).is_some() {
            self.journal.push(TimelineCommand::HideTrack { index });
        }
        self.drain_model_events();
    }

    pub fn set_track_composite(&mut self, index: usize, composite: bool) {
        if let Some(previous) = self.model.set_composite(index, composite) {
            self.journal.push(TimelineCommand::CompositeTrack {
                index,
                composite,
                previous,
            });
        }
        self.drain_model_events();
    }

    pub fn set_track_lock(&mut self, index: usize, lock: bool) {
        if let Some(previous) = self.model.set_lock(index, lock) {
            self.journal.push(TimelineCommand::LockTrack {
                index,
                lock,
                previous,
            });
        }
        self.drain_model_events();
    }

    // ── Producer update side channel ────────────────────────────

    /// Commit an edited producer for the solely selected clip: rescale its
    /// cut and filter windows by the old/new speed ratio, then consume the
    /// pending update into one before/after command.
    pub fn producer_changed(&mut self, after: cutline_timeline::Producer) -> Result<()> {
        let track = self.current_track;
        if self.selection.clips.is_empty() || self.update.is_none() {
            return Ok(());
        }
        if self.model.is_locked(track) {
            self.pulse_lock_button(track);
            return Err(ControlError::TrackLocked(track));
        }
        let Some(first) = self.selection.first() else {
            return Ok(());
        };
        let Some(old) = self.model.clip(track, first.clip).cloned() else {
            return Ok(());
        };

        let old_speed = if old.producer.speed != 0.0 { old.producer.speed } else { 1.0 };
        let new_speed = if after.speed != 0.0 { after.speed } else { 1.0 };
        let ratio = old_speed / new_speed;

        let mut after = after;
        let length = ((old.producer.length as f64) * ratio).round() as i64;
        let frame_in = (((old.frame_in as f64) * ratio).round() as i64).min(length - 1);
        let frame_out = (((old.frame_out as f64) * ratio).round() as i64).min(length - 1);
        after.length = length;
        for filter in &mut after.filters {
            if !filter.loader {
                filter.frame_in =
                    (((filter.frame_in as f64) * ratio).round() as i64).min(length - 1);
                filter.frame_out =
                    (((filter.frame_out as f64) * ratio).round() as i64).min(length - 1);
            }
        }

        let mut clip = Clip::with_range(after, frame_in, frame_out);
        clip.fade_in = old.fade_in;
        clip.fade_out = old.fade_out;
        let payload_after = clip.to_payload().map_err(ControlError::from)?;

        let Some(update) = self.update.take() else {
            return Ok(());
        };
        let (utrack, uclip) = (update.track, update.clip);
        // Clearing the selection before the push keeps the producer-changed
        // cascade from re-entering with a stale coordinate.
        self.clear_selection();
        self.model.replace_clip(utrack, uclip, clip);
        debug!(track = utrack, clip = uclip, "updated clip producer");
        self.journal.push(update.into_command(payload_after));
        self.drain_model_events();
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let done = self.journal.undo(&mut self.model);
        if done {
            self.drain_model_events();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.journal.redo(&mut self.model);
        if done {
            self.drain_model_events();
        }
        done
    }

    // ── View triggers ───────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.emit(UiEvent::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.emit(UiEvent::ZoomOut);
    }

    pub fn reset_zoom(&mut self) {
        self.emit(UiEvent::ZoomReset);
    }

    pub fn make_tracks_shorter(&mut self) {
        self.emit(UiEvent::TracksShorter);
    }

    pub fn make_tracks_taller(&mut self) {
        self.emit(UiEvent::TracksTaller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_timeline::Producer;
    use smallvec::smallvec;

    fn controller_with_tracks(n: usize) -> TimelineController {
        let (mut model, rx) = MultitrackModel::new();
        for _ in 0..n {
            model.add_track(TrackKind::Video);
        }
        let mut controller = TimelineController::new(model, rx, UndoJournal::new(100));
        controller.drain_model_events();
        controller.drain_ui_events();
        controller
    }

    fn clip(resource: &str, len: i64) -> Clip {
        Clip::new(Producer::avformat(resource, len, 0))
    }

    fn payload(resource: &str, len: i64) -> String {
        clip(resource, len).to_payload().unwrap()
    }

    #[test]
    fn test_selection_change_emits_consistent_events() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        c.drain_ui_events();

        c.select_clip(0, 0);
        let events = c.drain_ui_events();
        assert!(events.contains(&UiEvent::SelectionChanged));
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Selected(Some(_)))));

        c.clear_selection();
        let events = c.drain_ui_events();
        assert!(events.contains(&UiEvent::SelectionChanged));
        assert!(events.contains(&UiEvent::Selected(None)));

        // Unchanged selection emits nothing.
        c.clear_selection();
        assert!(c.drain_ui_events().is_empty());
    }

    #[test]
    fn test_append_requires_source() {
        let mut c = controller_with_tracks(1);
        assert!(matches!(
            c.append(None),
            Err(ControlError::NonSeekableSource)
        ));
        assert!(c
            .drain_ui_events()
            .iter()
            .any(|e| matches!(e, UiEvent::StatusMessage(_))));
    }

    #[test]
    fn test_append_refuses_locked_track() {
        let mut c = controller_with_tracks(1);
        c.set_source(Some(SourceClip::seekable(payload("a.mp4", 10))));
        c.model_mut().set_lock(0, true);
        c.drain_model_events();

        assert!(matches!(c.append(None), Err(ControlError::TrackLocked(0))));
        assert_eq!(c.model().clip_count(0), 0);
        assert!(!c.journal().can_undo());
        assert!(c
            .drain_ui_events()
            .contains(&UiEvent::TrackLockPulse(0)));
    }

    #[test]
    fn test_append_refuses_project_as_source() {
        let mut c = controller_with_tracks(1);
        c.set_source(Some(SourceClip {
            payload: payload("project.cutline", 100),
            seekable: true,
            is_project_output: true,
        }));
        assert!(matches!(c.append(None), Err(ControlError::SourceIsProject)));
        assert!(!c.journal().can_undo());
    }

    #[test]
    fn test_append_selects_under_playhead() {
        let mut c = controller_with_tracks(1);
        c.set_source(Some(SourceClip::seekable(payload("a.mp4", 10))));
        c.append(None).unwrap();
        assert_eq!(c.model().clip_count(0), 1);
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 0)));
        assert!(c.journal().can_undo());
    }

    #[test]
    fn test_insert_selects_inserted_clip() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        c.insert(None, Some(4), Some(payload("b.mp4", 5))).unwrap();
        // The model's inserted notification selects the new clip.
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 1)));
    }

    #[test]
    fn test_insert_on_empty_track_forces_position_zero() {
        let mut c = controller_with_tracks(1);
        c.set_position(0);
        c.position = 50; // playhead beyond the empty track
        c.insert(None, None, Some(payload("a.mp4", 10))).unwrap();
        assert_eq!(c.model().item_start(0, 0), 0);
        assert_eq!(c.model().clip_count(0), 1);
    }

    #[test]
    fn test_rows_inserted_shifts_selection() {
        let mut c = controller_with_tracks(1);
        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
            c.model_mut().append(0, clip(name, 10));
        }
        c.drain_model_events();
        c.set_selection(smallvec![ClipCoordinate::new(0, 2)], None, false);
        c.drain_ui_events();

        // A non-ripple head trim inserts a blank row before the clip,
        // shifting the selected coordinate right.
        c.model_mut().trim_clip_in(0, 1, 3, false);
        c.drain_model_events();
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 3)));

        // A row inserted after the coordinate leaves it in place.
        c.model_mut().trim_clip_in(0, 4, 2, false);
        c.drain_model_events();
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 3)));
    }

    #[test]
    fn test_rows_removed_drops_and_shifts_selection() {
        let mut c = controller_with_tracks(1);
        for name in ["a.mp4", "b.mp4", "c.mp4"] {
            c.model_mut().append(0, clip(name, 10));
        }
        c.drain_model_events();
        c.set_selection(
            smallvec![ClipCoordinate::new(0, 0), ClipCoordinate::new(0, 2)],
            None,
            false,
        );
        c.drain_ui_events();

        c.model_mut().remove(0, 1);
        c.drain_model_events();
        let clips = &c.selection().clips;
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0], ClipCoordinate::new(0, 0));
        assert_eq!(clips[1], ClipCoordinate::new(0, 1));
    }

    #[test]
    fn test_reconciliation_skips_track_head_selection() {
        let mut c = controller_with_tracks(2);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        c.select_track_head(1);
        c.drain_ui_events();

        c.model_mut().append(0, clip("b.mp4", 10));
        c.drain_model_events();
        assert_eq!(c.selection().track, Some(1));
    }

    #[test]
    fn test_select_all_orders_by_track_then_clip() {
        let mut c = controller_with_tracks(2);
        c.model_mut().append_blank(0, 5);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.model_mut().append(0, clip("b.mp4", 10));
        c.model_mut().append(1, clip("c.mp4", 10));
        c.model_mut().append_blank(1, 5);
        c.drain_model_events();

        c.select_all();
        let clips: Vec<_> = c.selection().clips.iter().copied().collect();
        assert_eq!(
            clips,
            vec![
                ClipCoordinate::new(0, 1),
                ClipCoordinate::new(0, 2),
                ClipCoordinate::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_select_clip_under_playhead_skips_locked() {
        let mut c = controller_with_tracks(2);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.model_mut().append(1, clip("b.mp4", 10));
        c.model_mut().set_lock(0, true);
        c.drain_model_events();

        c.set_position(5);
        c.select_clip_under_playhead();
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(1, 0)));
        assert_eq!(c.current_track(), 1);
    }

    #[test]
    fn test_save_restore_selection() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        c.select_clip(0, 0);
        c.drain_ui_events();

        c.save_and_clear_selection();
        assert!(c.selection().is_empty());
        let events = c.drain_ui_events();
        assert!(events.contains(&UiEvent::SelectionChanged));

        c.restore_selection();
        assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 0)));
        let events = c.drain_ui_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Selected(Some(_)))));
    }

    #[test]
    fn test_split_refuses_transition() {
        let mut c = controller_with_tracks(1);
        let mut b = clip("b.mp4", 10);
        b.frame_in = 5;
        b.frame_out = 14;
        b.producer.length = 20;
        c.model_mut().append(0, clip("a.mp4", 10));
        c.model_mut().append(0, b);
        c.model_mut().add_transition_by_trim_in(0, 1, -4);
        c.drain_model_events();

        c.position = 8; // inside the transition
        assert!(matches!(
            c.split_clip(Some(0), Some(1)),
            Err(ControlError::SplitTransition)
        ));
        assert!(!c.journal().can_undo());
    }

    #[test]
    fn test_split_requires_playhead_inside_clip() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();

        c.position = 0; // at the clip start: no-op
        c.split_clip(Some(0), Some(0)).unwrap();
        assert_eq!(c.model().clip_count(0), 1);

        c.position = 4;
        c.split_clip(Some(0), Some(0)).unwrap();
        assert_eq!(c.model().clip_count(0), 2);
        assert!(c.journal().can_undo());
    }

    #[test]
    fn test_fade_rejects_negative_duration() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        assert!(matches!(
            c.fade_in(0, 0, -1),
            Err(ControlError::NegativeFade)
        ));
        assert!(!c.journal().can_undo());

        c.fade_in(0, 0, 5).unwrap();
        assert_eq!(c.model().clip(0, 0).unwrap().fade_in, 5);
        assert!(c.drain_ui_events().contains(&UiEvent::FadeInChanged(5)));
    }

    #[test]
    fn test_remove_track_clamps_current() {
        let mut c = controller_with_tracks(3);
        c.set_current_track(2);
        c.remove_track();
        assert_eq!(c.model().track_count(), 2);
        assert_eq!(c.current_track(), 1);
        // Undo restores the track.
        assert!(c.undo());
        assert_eq!(c.model().track_count(), 3);
    }

    #[test]
    fn test_merge_dryrun_does_not_mutate() {
        let mut c = controller_with_tracks(1);
        let producer = Producer::avformat("a.mp4", 100, 0);
        c.model_mut().append(0, Clip::with_range(producer.clone(), 0, 9));
        c.model_mut().append(0, Clip::with_range(producer, 10, 29));
        c.drain_model_events();

        assert!(c.merge_clip_with_next(0, 0, true));
        assert_eq!(c.model().clip_count(0), 2);
        assert!(!c.journal().can_undo());

        assert!(c.merge_clip_with_next(0, 0, false));
        assert_eq!(c.model().clip_count(0), 1);
        assert!(c.journal().can_undo());
    }

    #[test]
    fn test_detach_audio_creates_audio_track() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();

        c.detach_audio(0, 0).unwrap();
        assert_eq!(c.model().track_count(), 2);
        assert_eq!(c.model().track(1).unwrap().kind, TrackKind::Audio);
        assert_eq!(c.model().clip(0, 0).unwrap().producer.audio_index, -1);
        assert_eq!(c.model().clip(1, 0).unwrap().producer.audio_index, 0);

        assert!(c.undo());
        assert_eq!(c.model().track_count(), 1);
        assert_eq!(c.model().clip(0, 0).unwrap().producer.audio_index, 0);
    }

    #[test]
    fn test_detach_audio_requires_audio_stream() {
        let mut c = controller_with_tracks(1);
        c.model_mut()
            .append(0, Clip::new(Producer::avformat("mute.mp4", 10, -1)));
        c.drain_model_events();
        c.detach_audio(0, 0).unwrap();
        assert_eq!(c.model().track_count(), 1);
        assert!(!c.journal().can_undo());
    }

    #[test]
    fn test_producer_changed_pushes_one_update_command() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 100));
        c.drain_model_events();
        c.select_clip(0, 0);
        c.drain_ui_events();

        let mut after = c.model().clip(0, 0).unwrap().producer.clone();
        after.comment = "graded".into();
        c.producer_changed(after).unwrap();

        // Selection was cleared before the push.
        assert!(c.selection().is_empty());
        assert_eq!(c.journal().undo_count(), 1);
        assert_eq!(c.model().clip(0, 0).unwrap().producer.comment, "graded");

        assert!(c.undo());
        assert_eq!(c.model().clip(0, 0).unwrap().producer.comment, "");
    }

    #[test]
    fn test_producer_changed_rescales_for_speed() {
        let mut c = controller_with_tracks(1);
        let mut slow = clip("a.mp4", 100);
        slow.frame_in = 10;
        slow.frame_out = 49;
        c.model_mut().append(0, slow);
        c.drain_model_events();
        c.select_clip(0, 0);

        let mut after = c.model().clip(0, 0).unwrap().producer.clone();
        after.speed = 2.0;
        after.filters.push(cutline_timeline::Filter::new("blur", 10, 49));
        c.producer_changed(after).unwrap();

        let updated = c.model().clip(0, 0).unwrap();
        assert_eq!(updated.producer.length, 50);
        assert_eq!(updated.frame_in, 5);
        assert_eq!(updated.frame_out, 25);
        assert_eq!(updated.producer.filters[0].frame_in, 5);
        assert_eq!(updated.producer.filters[0].frame_out, 25);
    }

    #[test]
    fn test_copy_clip_fills_buffer() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.drain_model_events();
        c.copy_clip(0, 0);
        assert!(c.saved_producer().is_some());
        assert!(c.drain_ui_events().contains(&UiEvent::ClipCopied));

        // The buffer is a valid append source.
        c.set_source(None);
        c.append(None).unwrap();
        assert_eq!(c.model().clip_count(0), 2);
    }

    #[test]
    fn test_seek_edits() {
        let mut c = controller_with_tracks(1);
        c.model_mut().append(0, clip("a.mp4", 10));
        c.model_mut().append(0, clip("b.mp4", 10));
        c.drain_model_events();

        c.position = 4;
        c.seek_next_edit();
        assert_eq!(c.position(), 10);
        c.seek_next_edit();
        assert_eq!(c.position(), 20);

        c.seek_previous_edit();
        assert_eq!(c.position(), 10);
        c.seek_previous_edit();
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_move_clip_falls_back_to_transition() {
        let mut c = controller_with_tracks(1);
        let mut a = clip("a.mp4", 10);
        a.producer.length = 20;
        let mut b = clip("b.mp4", 20);
        b.frame_in = 5;
        b.frame_out = 14;
        c.model_mut().append(0, a);
        c.model_mut().append(0, b);
        c.drain_model_events();

        // Dropping b three frames into a overlaps: a transition, not a move.
        assert!(c.move_clip(0, 0, 1, 7, false));
        assert_eq!(c.journal().undo_count(), 1);
        assert!(matches!(
            c.journal().last(),
            Some(TimelineCommand::AddTransitionOnDrop { .. })
        ));
        // The created transition is selected.
        let first = c.selection().first().unwrap();
        assert!(c.model().is_transition(first.track, first.clip));
    }
}
