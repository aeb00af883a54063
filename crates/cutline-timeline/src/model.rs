//! The multitrack edit model.
//!
//! Tracks hold playlists of clips, blanks, and transitions. Positions are
//! derived from item lengths, so `(track, index)` coordinates are not stable
//! across mutations; consumers reconcile through the change notifications.
//!
//! Every mutation fires [`ModelEvent`]s over an unbounded channel. The
//! events are drained by the owning controller *after* the mutating call
//! returns, which keeps notification handling non-reentrant.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::clip::{Clip, Producer};
use crate::track::{Track, TrackItem, TrackKind};

/// Change notification fired by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    RowsInserted { track: usize, first: usize, last: usize },
    RowsRemoved { track: usize, first: usize, last: usize },
    /// A clip was inserted by an insert operation.
    Inserted { track: usize, clip: usize },
    /// A clip was placed by an overwrite operation.
    Overwritten { track: usize, clip: usize },
    /// Some content changed without the row count changing.
    Modified,
}

/// A resolved view of one playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// Timeline start of the item on its track.
    pub start: i64,
    pub frame_in: i64,
    pub frame_out: i64,
    /// Length of the item on the timeline.
    pub frame_count: i64,
    /// Total length of the backing producer.
    pub length: i64,
    pub producer: Producer,
}

/// The multitrack model: an ordered list of tracks.
#[derive(Debug)]
pub struct MultitrackModel {
    tracks: Vec<Track>,
    events: Sender<ModelEvent>,
}

impl MultitrackModel {
    /// Create an empty model together with the receiving end of its
    /// change-notification channel.
    pub fn new() -> (Self, Receiver<ModelEvent>) {
        let (events, rx) = unbounded();
        (
            Self {
                tracks: Vec::new(),
                events,
            },
            rx,
        )
    }

    fn emit(&self, event: ModelEvent) {
        // A dropped receiver just means nobody is listening.
        let _ = self.events.send(event);
    }

    fn rows_inserted(&self, track: usize, first: usize, last: usize) {
        self.emit(ModelEvent::RowsInserted { track, first, last });
    }

    fn rows_removed(&self, track: usize, first: usize, last: usize) {
        self.emit(ModelEvent::RowsRemoved { track, first, last });
    }

    fn modified(&self) {
        self.emit(ModelEvent::Modified);
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Number of playlist entries on a track, blanks and transitions
    /// included.
    pub fn clip_count(&self, track: usize) -> usize {
        self.tracks.get(track).map_or(0, |t| t.items.len())
    }

    pub fn item(&self, track: usize, index: usize) -> Option<&TrackItem> {
        self.tracks.get(track).and_then(|t| t.items.get(index))
    }

    pub fn clip(&self, track: usize, index: usize) -> Option<&Clip> {
        self.tracks.get(track).and_then(|t| t.clip_at(index))
    }

    pub fn index_at_position(&self, track: usize, position: i64) -> Option<usize> {
        self.tracks.get(track).and_then(|t| t.index_at(position))
    }

    pub fn item_start(&self, track: usize, index: usize) -> i64 {
        self.tracks.get(track).map_or(0, |t| t.item_start(index))
    }

    pub fn track_length(&self, track: usize) -> i64 {
        self.tracks.get(track).map_or(0, Track::length)
    }

    /// Length of the longest track.
    pub fn total_length(&self) -> i64 {
        self.tracks.iter().map(Track::length).max().unwrap_or(0)
    }

    pub fn is_blank(&self, track: usize, index: usize) -> bool {
        self.item(track, index).is_some_and(TrackItem::is_blank)
    }

    pub fn is_transition(&self, track: usize, index: usize) -> bool {
        self.item(track, index).is_some_and(TrackItem::is_transition)
    }

    pub fn is_locked(&self, track: usize) -> bool {
        self.tracks.get(track).is_some_and(|t| t.lock)
    }

    pub fn transition_length(&self, track: usize, index: usize) -> Option<i64> {
        match self.item(track, index) {
            Some(TrackItem::Transition { length }) => Some(*length),
            _ => None,
        }
    }

    /// Resolve a clip item into a [`ClipInfo`]. Returns `None` for blanks
    /// and transitions.
    pub fn clip_info(&self, track: usize, index: usize) -> Option<ClipInfo> {
        let t = self.tracks.get(track)?;
        let clip = t.clip_at(index)?;
        Some(ClipInfo {
            start: t.item_start(index),
            frame_in: clip.frame_in,
            frame_out: clip.frame_out,
            frame_count: clip.length(),
            length: clip.producer.length,
            producer: clip.producer.clone(),
        })
    }

    // ── Item primitives ─────────────────────────────────────────

    /// Insert an item at an exact index. Used by command inversion.
    pub(crate) fn insert_item(&mut self, track: usize, index: usize, item: TrackItem) {
        if let Some(t) = self.tracks.get_mut(track) {
            let index = index.min(t.items.len());
            t.items.insert(index, item);
            self.rows_inserted(track, index, index);
            self.modified();
        }
    }

    /// Replace a track's entire item list. Used by snapshot restore.
    pub(crate) fn restore_items(&mut self, track: usize, items: Vec<TrackItem>) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.items = items;
            self.modified();
        }
    }

    /// Ensure an item boundary at `position` and return the index of the
    /// item starting there. Splits a straddling blank or clip; pads the
    /// track with a blank when the position lies beyond its end.
    fn cut_at(&mut self, track: usize, position: i64) -> usize {
        let len = self.track_length(track);
        if position >= len {
            if position > len {
                let idx = self.tracks[track].items.len();
                self.tracks[track].items.push(TrackItem::Blank {
                    length: position - len,
                });
                self.rows_inserted(track, idx, idx);
            }
            return self.tracks[track].items.len();
        }
        let idx = match self.tracks[track].index_at(position) {
            Some(i) => i,
            None => return self.tracks[track].items.len(),
        };
        let start = self.tracks[track].item_start(idx);
        if position == start {
            return idx;
        }
        let offset = position - start;
        let right = match &mut self.tracks[track].items[idx] {
            TrackItem::Blank { length } => {
                let rest = *length - offset;
                *length = offset;
                TrackItem::Blank { length: rest }
            }
            TrackItem::Clip(clip) => {
                let mut right = clip.clone();
                right.frame_in = clip.frame_in + offset;
                right.fade_in = 0;
                clip.frame_out = clip.frame_in + offset - 1;
                clip.fade_out = 0;
                TrackItem::Clip(right)
            }
            // A transition cannot be cut; its start is the boundary.
            TrackItem::Transition { .. } => return idx,
        };
        self.tracks[track].items.insert(idx + 1, right);
        self.rows_inserted(track, idx + 1, idx + 1);
        idx + 1
    }

    // ── Clip operations ─────────────────────────────────────────

    /// Append a clip to the end of a track. Returns its index.
    pub fn append(&mut self, track: usize, clip: Clip) -> usize {
        let Some(t) = self.tracks.get_mut(track) else {
            debug_assert!(false, "append on invalid track {track}");
            return 0;
        };
        let idx = t.items.len();
        t.items.push(TrackItem::Clip(clip));
        self.rows_inserted(track, idx, idx);
        self.modified();
        idx
    }

    /// Append a blank to the end of a track. Returns its index.
    pub fn append_blank(&mut self, track: usize, length: i64) -> usize {
        let Some(t) = self.tracks.get_mut(track) else {
            debug_assert!(false, "append_blank on invalid track {track}");
            return 0;
        };
        let idx = t.items.len();
        t.items.push(TrackItem::Blank { length });
        self.rows_inserted(track, idx, idx);
        self.modified();
        idx
    }

    /// Insert a clip at a position, shifting everything after it.
    /// Returns the clip's index.
    pub fn insert(&mut self, track: usize, position: i64, clip: Clip) -> usize {
        if track >= self.tracks.len() {
            debug_assert!(false, "insert on invalid track {track}");
            return 0;
        }
        let idx = self.cut_at(track, position);
        self.tracks[track].items.insert(idx, TrackItem::Clip(clip));
        self.rows_inserted(track, idx, idx);
        self.emit(ModelEvent::Inserted { track, clip: idx });
        self.modified();
        idx
    }

    /// Place a clip at a position, consuming whatever the covered range
    /// held. Returns the clip's index.
    pub fn overwrite(&mut self, track: usize, position: i64, clip: Clip) -> usize {
        if track >= self.tracks.len() {
            debug_assert!(false, "overwrite on invalid track {track}");
            return 0;
        }
        let len = clip.length();
        let first = self.cut_at(track, position);
        let end = if position + len >= self.track_length(track) {
            self.tracks[track].items.len()
        } else {
            self.cut_at(track, position + len)
        };
        if end > first {
            for _ in first..end {
                self.tracks[track].items.remove(first);
            }
            self.rows_removed(track, first, end - 1);
        }
        self.tracks[track].items.insert(first, TrackItem::Clip(clip));
        self.rows_inserted(track, first, first);
        self.emit(ModelEvent::Overwritten { track, clip: first });
        self.modified();
        first
    }

    /// Remove an item, shifting subsequent items left (ripple removal).
    pub fn remove(&mut self, track: usize, index: usize) {
        if self.item(track, index).is_none() {
            debug_assert!(false, "remove on invalid coordinate {track}:{index}");
            return;
        }
        self.tracks[track].items.remove(index);
        self.rows_removed(track, index, index);
        self.modified();
    }

    /// Remove an item but leave a blank in its place. Adjacent blanks
    /// coalesce; a blank left at the end of the track is dropped.
    pub fn lift(&mut self, track: usize, index: usize) {
        let Some(length) = self.item(track, index).map(TrackItem::length) else {
            debug_assert!(false, "lift on invalid coordinate {track}:{index}");
            return;
        };
        self.tracks[track].items[index] = TrackItem::Blank { length };
        self.modified();

        let mut index = index;
        // Merge the following blank into this one.
        if index + 1 < self.tracks[track].items.len() && self.tracks[track].items[index + 1].is_blank()
        {
            let extra = self.tracks[track].items.remove(index + 1).length();
            if let TrackItem::Blank { length } = &mut self.tracks[track].items[index] {
                *length += extra;
            }
            self.rows_removed(track, index + 1, index + 1);
        }
        // Merge into a preceding blank.
        if index > 0 && self.tracks[track].items[index - 1].is_blank() {
            let extra = self.tracks[track].items.remove(index - 1).length();
            index -= 1;
            if let TrackItem::Blank { length } = &mut self.tracks[track].items[index] {
                *length += extra;
            }
            self.rows_removed(track, index, index);
        }
        // A gap at the end of the track carries no content.
        if index + 1 == self.tracks[track].items.len() {
            self.tracks[track].items.remove(index);
            self.rows_removed(track, index, index);
        }
    }

    /// Split the clip at `index` at an absolute position strictly inside
    /// its span. The left half keeps the fade-in, the right half the
    /// fade-out.
    pub fn split(&mut self, track: usize, index: usize, position: i64) {
        let valid = self.clip(track, index).is_some_and(|_| {
            let start = self.item_start(track, index);
            let len = self.item(track, index).map_or(0, TrackItem::length);
            position > start && position < start + len
        });
        if !valid {
            debug_assert!(false, "split outside clip span {track}:{index}@{position}");
            return;
        }
        self.cut_at(track, position);
        self.modified();
    }

    /// Swap the clip at an index for another one.
    pub fn replace_clip(&mut self, track: usize, index: usize, clip: Clip) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        if index < t.items.len() {
            t.items[index] = TrackItem::Clip(clip);
            self.modified();
        }
    }

    // ── Move / drop transitions ─────────────────────────────────

    /// A plain move is valid when the target range is free: blanks, space
    /// beyond the track's end, or the moving clip's own span.
    pub fn move_clip_valid(
        &self,
        from: usize,
        to: usize,
        index: usize,
        position: i64,
        _ripple: bool,
    ) -> bool {
        let Some(clip) = self.clip(from, index) else {
            return false;
        };
        if position < 0 || to >= self.tracks.len() {
            return false;
        }
        let len = clip.length();
        let target = &self.tracks[to];
        let mut start = 0;
        for (i, item) in target.items.iter().enumerate() {
            let end = start + item.length();
            let overlaps = start < position + len && end > position;
            if overlaps && !item.is_blank() && !(from == to && i == index) {
                return false;
            }
            start = end;
        }
        true
    }

    /// Move a clip. Ripple closes the gap it leaves behind; otherwise the
    /// gap stays. Returns the clip's new index.
    pub fn move_clip(
        &mut self,
        from: usize,
        to: usize,
        index: usize,
        position: i64,
        ripple: bool,
    ) -> usize {
        let Some(clip) = self.clip(from, index).cloned() else {
            debug_assert!(false, "move of invalid coordinate {from}:{index}");
            return index;
        };
        if ripple {
            self.remove(from, index);
        } else {
            self.lift(from, index);
        }
        self.overwrite(to, position, clip)
    }

    /// A drop that cannot be a plain move may still create a transition if
    /// it overlaps a directly adjacent clip by part of both lengths.
    pub fn add_transition_valid(
        &self,
        from: usize,
        to: usize,
        index: usize,
        position: i64,
    ) -> bool {
        if from != to {
            return false;
        }
        let Some(clip) = self.clip(from, index) else {
            return false;
        };
        let start = self.item_start(from, index);
        let delta = position - start;
        let len = clip.length();
        if delta > 0 && delta < len {
            // Overlap onto the next clip.
            return self
                .clip(from, index + 1)
                .is_some_and(|next| delta < next.length());
        }
        if delta < 0 && -delta < len && index > 0 {
            // Overlap onto the previous clip.
            return self
                .clip(from, index - 1)
                .is_some_and(|prev| -delta < prev.length());
        }
        false
    }

    /// Turn an overlapping drop into a cross-fade region. Returns the
    /// transition's index.
    pub fn add_transition_on_drop(&mut self, track: usize, index: usize, position: i64) -> usize {
        let start = self.item_start(track, index);
        let delta = position - start;
        if delta > 0 {
            // Dragged right onto the next clip: gap opens behind, the next
            // clip's head becomes the transition.
            let d = delta;
            if let Some(clip) = self.tracks[track].clip_at_mut(index) {
                clip.frame_out -= d;
            }
            if let Some(next) = self.tracks[track].clip_at_mut(index + 1) {
                next.frame_in += d;
            }
            self.tracks[track]
                .items
                .insert(index + 1, TrackItem::Transition { length: d });
            self.rows_inserted(track, index + 1, index + 1);
            self.tracks[track]
                .items
                .insert(index, TrackItem::Blank { length: d });
            self.rows_inserted(track, index, index);
            self.modified();
            index + 2
        } else {
            // Dragged left onto the previous clip.
            let d = -delta;
            if let Some(prev) = self.tracks[track].clip_at_mut(index - 1) {
                prev.frame_out -= d;
            }
            if let Some(clip) = self.tracks[track].clip_at_mut(index) {
                clip.frame_in += d;
            }
            self.tracks[track]
                .items
                .insert(index, TrackItem::Transition { length: d });
            self.rows_inserted(track, index, index);
            // The clip's end pulled left; open a gap unless it was last.
            if index + 2 < self.tracks[track].items.len() {
                self.tracks[track]
                    .items
                    .insert(index + 2, TrackItem::Blank { length: d });
                self.rows_inserted(track, index + 2, index + 2);
            }
            self.modified();
            index
        }
    }

    // ── Trims ───────────────────────────────────────────────────

    pub fn trim_clip_in_valid(&self, track: usize, index: usize, delta: i64, ripple: bool) -> bool {
        let Some(t) = self.track(track) else {
            return false;
        };
        let Some(clip) = t.clip_at(index) else {
            return false;
        };
        if clip.length() - delta < 1 || clip.frame_in + delta < 0 {
            return false;
        }
        if !ripple {
            let prev = index.checked_sub(1).and_then(|i| t.items.get(i));
            if delta < 0 {
                match prev {
                    Some(TrackItem::Blank { length }) if *length >= -delta => {}
                    _ => return false,
                }
            } else if matches!(prev, Some(TrackItem::Transition { .. })) {
                return false;
            }
        }
        true
    }

    /// Trim the clip's in point by `delta` frames. Without ripple the
    /// preceding blank absorbs the change so downstream items stay put;
    /// with ripple they shift. Returns the clip's possibly changed index.
    pub fn trim_clip_in(&mut self, track: usize, index: usize, delta: i64, ripple: bool) -> usize {
        let mut index = index;
        let Some(clip) = self.tracks.get_mut(track).and_then(|t| t.clip_at_mut(index)) else {
            debug_assert!(false, "trim_clip_in on invalid coordinate {track}:{index}");
            return index;
        };
        clip.frame_in += delta;
        if !ripple && delta != 0 {
            if delta > 0 {
                if index > 0 && self.tracks[track].items[index - 1].is_blank() {
                    if let TrackItem::Blank { length } = &mut self.tracks[track].items[index - 1] {
                        *length += delta;
                    }
                } else {
                    self.tracks[track]
                        .items
                        .insert(index, TrackItem::Blank { length: delta });
                    self.rows_inserted(track, index, index);
                    index += 1;
                }
            } else if index > 0 {
                let mut emptied = false;
                if let TrackItem::Blank { length } = &mut self.tracks[track].items[index - 1] {
                    *length += delta;
                    emptied = *length == 0;
                }
                if emptied {
                    self.tracks[track].items.remove(index - 1);
                    self.rows_removed(track, index - 1, index - 1);
                    index -= 1;
                }
            }
        }
        self.modified();
        index
    }

    pub fn trim_clip_out_valid(&self, track: usize, index: usize, delta: i64, ripple: bool) -> bool {
        let Some(t) = self.track(track) else {
            return false;
        };
        let Some(clip) = t.clip_at(index) else {
            return false;
        };
        if clip.length() + delta < 1 {
            return false;
        }
        if delta > 0 && clip.frame_out + delta > clip.producer.length - 1 {
            return false;
        }
        if !ripple {
            match t.items.get(index + 1) {
                None => {}
                Some(TrackItem::Blank { length }) => {
                    if delta > 0 && *length < delta {
                        return false;
                    }
                }
                Some(TrackItem::Clip(_)) => {
                    if delta > 0 {
                        return false;
                    }
                }
                Some(TrackItem::Transition { .. }) => return false,
            }
        }
        true
    }

    /// Trim the clip's out point by `delta` frames.
    pub fn trim_clip_out(&mut self, track: usize, index: usize, delta: i64, ripple: bool) {
        let Some(clip) = self.tracks.get_mut(track).and_then(|t| t.clip_at_mut(index)) else {
            debug_assert!(false, "trim_clip_out on invalid coordinate {track}:{index}");
            return;
        };
        clip.frame_out += delta;
        if !ripple && delta != 0 && index + 1 < self.tracks[track].items.len() {
            if delta > 0 {
                let mut emptied = false;
                if let TrackItem::Blank { length } = &mut self.tracks[track].items[index + 1] {
                    *length -= delta;
                    emptied = *length == 0;
                }
                if emptied {
                    self.tracks[track].items.remove(index + 1);
                    self.rows_removed(track, index + 1, index + 1);
                }
            } else if self.tracks[track].items[index + 1].is_blank() {
                if let TrackItem::Blank { length } = &mut self.tracks[track].items[index + 1] {
                    *length -= delta;
                }
            } else {
                self.tracks[track]
                    .items
                    .insert(index + 1, TrackItem::Blank { length: -delta });
                self.rows_inserted(track, index + 1, index + 1);
            }
        }
        self.modified();
    }

    // ── Transitions by trim ─────────────────────────────────────

    /// Dragging a clip's in edge into the previous clip's span creates a
    /// cross-fade between them.
    pub fn add_transition_by_trim_in_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        if delta >= 0 || index == 0 {
            return false;
        }
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        let Some(prev) = self.clip(track, index - 1) else {
            return false;
        };
        -delta <= prev.length() - 1 && clip.frame_in >= -delta
    }

    /// Returns the new transition's index. The current clip moves to
    /// `index + 1`.
    pub fn add_transition_by_trim_in(&mut self, track: usize, index: usize, delta: i64) -> usize {
        let d = -delta;
        if let Some(prev) = self.tracks[track].clip_at_mut(index - 1) {
            prev.frame_out -= d;
        }
        self.tracks[track]
            .items
            .insert(index, TrackItem::Transition { length: d });
        self.rows_inserted(track, index, index);
        self.modified();
        index
    }

    /// Dragging a clip's out edge into the next clip's span.
    pub fn add_transition_by_trim_out_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        if delta <= 0 {
            return false;
        }
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        let Some(next) = self.clip(track, index + 1) else {
            return false;
        };
        delta <= next.length() - 1 && clip.frame_out + delta <= clip.producer.length - 1
    }

    /// Returns the new transition's index (`index + 1`).
    pub fn add_transition_by_trim_out(&mut self, track: usize, index: usize, delta: i64) -> usize {
        if let Some(next) = self.tracks[track].clip_at_mut(index + 1) {
            next.frame_in += delta;
        }
        self.tracks[track]
            .items
            .insert(index + 1, TrackItem::Transition { length: delta });
        self.rows_inserted(track, index + 1, index + 1);
        self.modified();
        index + 1
    }

    /// Resizing a transition from the right: the clip's in edge abuts a
    /// transition on its left. Positive delta extends the transition over
    /// the clip.
    pub fn trim_transition_out_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        if index == 0 {
            return false;
        }
        let Some(len) = self.transition_length(track, index - 1) else {
            return false;
        };
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        len + delta >= 1 && clip.length() - delta >= 1 && clip.frame_in + delta >= 0
    }

    pub fn trim_transition_out(&mut self, track: usize, index: usize, delta: i64) {
        if let Some(TrackItem::Transition { length }) = self.tracks[track].items.get_mut(index - 1)
        {
            *length += delta;
        }
        if let Some(clip) = self.tracks[track].clip_at_mut(index) {
            clip.frame_in += delta;
        }
        self.modified();
    }

    /// Resizing a transition from the left: the clip's out edge abuts a
    /// transition on its right. Positive delta extends the clip into the
    /// transition.
    pub fn trim_transition_in_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        let Some(len) = self.transition_length(track, index + 1) else {
            return false;
        };
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        len - delta >= 1 && clip.length() + delta >= 1 && clip.frame_out + delta <= clip.producer.length - 1
    }

    pub fn trim_transition_in(&mut self, track: usize, index: usize, delta: i64) {
        if let Some(TrackItem::Transition { length }) = self.tracks[track].items.get_mut(index + 1)
        {
            *length -= delta;
        }
        if let Some(clip) = self.tracks[track].clip_at_mut(index) {
            clip.frame_out += delta;
        }
        self.modified();
    }

    /// Dragging the in edge left past the whole extent of the transition
    /// on its left removes the transition.
    pub fn remove_transition_by_trim_in_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        if delta >= 0 || index == 0 {
            return false;
        }
        let Some(len) = self.transition_length(track, index - 1) else {
            return false;
        };
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        -delta >= len && clip.frame_in >= len
    }

    /// Dragging the out edge right past the whole extent of the transition
    /// on its right removes the transition.
    pub fn remove_transition_by_trim_out_valid(&self, track: usize, index: usize, delta: i64) -> bool {
        if delta <= 0 {
            return false;
        }
        let Some(len) = self.transition_length(track, index + 1) else {
            return false;
        };
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        delta >= len && clip.frame_out + len <= clip.producer.length - 1
    }

    // ── Merge ───────────────────────────────────────────────────

    /// Two clips merge when they are contiguous cuts of the same source at
    /// the same speed.
    pub fn merge_with_next_valid(&self, track: usize, index: usize) -> bool {
        let Some(clip) = self.clip(track, index) else {
            return false;
        };
        let Some(next) = self.clip(track, index + 1) else {
            return false;
        };
        clip.producer.resource == next.producer.resource
            && clip.producer.speed == next.producer.speed
            && next.frame_in == clip.frame_out + 1
    }

    pub fn merge_with_next(&mut self, track: usize, index: usize) {
        if !self.merge_with_next_valid(track, index) {
            debug_assert!(false, "merge of non-contiguous clips {track}:{index}");
            return;
        }
        let Some(next) = self.tracks[track].clip_at(index + 1).cloned() else {
            return;
        };
        let (next_out, next_fade) = (next.frame_out, next.fade_out);
        if let Some(clip) = self.tracks[track].clip_at_mut(index) {
            clip.frame_out = next_out;
            clip.fade_out = next_fade;
        }
        self.tracks[track].items.remove(index + 1);
        self.rows_removed(track, index + 1, index + 1);
        self.modified();
    }

    // ── Fades ───────────────────────────────────────────────────

    pub fn set_fade_in(&mut self, track: usize, index: usize, duration: i64) -> Option<i64> {
        let clip = self.tracks.get_mut(track)?.clip_at_mut(index)?;
        let previous = clip.fade_in;
        clip.fade_in = duration;
        self.modified();
        Some(previous)
    }

    pub fn set_fade_out(&mut self, track: usize, index: usize, duration: i64) -> Option<i64> {
        let clip = self.tracks.get_mut(track)?.clip_at_mut(index)?;
        let previous = clip.fade_out;
        clip.fade_out = duration;
        self.modified();
        Some(previous)
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Append a new track of the given kind. Returns its index.
    pub fn add_track(&mut self, kind: TrackKind) -> usize {
        let n = self.tracks.iter().filter(|t| t.kind == kind).count() + 1;
        let track = match kind {
            TrackKind::Video => Track::new_video(format!("V{n}")),
            TrackKind::Audio => Track::new_audio(format!("A{n}")),
        };
        self.tracks.push(track);
        self.modified();
        self.tracks.len() - 1
    }

    /// Insert a new video track at an index.
    pub fn insert_track(&mut self, index: usize) {
        let n = self
            .tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Video)
            .count()
            + 1;
        let index = index.min(self.tracks.len());
        self.tracks.insert(index, Track::new_video(format!("V{n}")));
        self.modified();
    }

    /// Reinsert a previously removed track. Used by command inversion.
    pub(crate) fn insert_track_at(&mut self, index: usize, track: Track) {
        let index = index.min(self.tracks.len());
        self.tracks.insert(index, track);
        self.modified();
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        self.modified();
        Some(removed)
    }

    pub fn set_track_name(&mut self, index: usize, name: impl Into<String>) -> Option<String> {
        let t = self.tracks.get_mut(index)?;
        let previous = std::mem::replace(&mut t.name, name.into());
        self.modified();
        Some(previous)
    }

    /// Toggle and return the new state.
    pub fn toggle_mute(&mut self, index: usize) -> Option<bool> {
        let t = self.tracks.get_mut(index)?;
        t.mute = !t.mute;
        let state = t.mute;
        self.modified();
        Some(state)
    }

    pub fn toggle_hidden(&mut self, index: usize) -> Option<bool> {
        let t = self.tracks.get_mut(index)?;
        t.hidden = !t.hidden;
        let state = t.hidden;
        self.modified();
        Some(state)
    }

    pub fn set_composite(&mut self, index: usize, composite: bool) -> Option<bool> {
        let t = self.tracks.get_mut(index)?;
        let previous = std::mem::replace(&mut t.composite, composite);
        self.modified();
        Some(previous)
    }

    pub fn set_lock(&mut self, index: usize, lock: bool) -> Option<bool> {
        let t = self.tracks.get_mut(index)?;
        let previous = std::mem::replace(&mut t.lock, lock);
        self.modified();
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Producer;

    fn model_with_track() -> (MultitrackModel, Receiver<ModelEvent>) {
        let (mut model, rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        (model, rx)
    }

    fn clip(resource: &str, len: i64) -> Clip {
        Clip::new(Producer::avformat(resource, len, 0))
    }

    fn drain(rx: &Receiver<ModelEvent>) -> Vec<ModelEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn test_append_fires_rows_inserted() {
        let (mut model, rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        let events = drain(&rx);
        assert!(events.contains(&ModelEvent::RowsInserted {
            track: 0,
            first: 0,
            last: 0
        }));
    }

    #[test]
    fn test_insert_into_blank_splits_it() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.trim_clip_in(0, 0, 4, false); // leading blank of 4
        assert!(model.is_blank(0, 0));

        let idx = model.insert(0, 2, clip("b.mp4", 5));
        assert_eq!(idx, 1);
        assert_eq!(model.clip_count(0), 4); // blank, clip, blank, clip
        assert_eq!(model.item_start(0, 1), 2);
    }

    #[test]
    fn test_insert_into_clip_splits_it() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        let idx = model.insert(0, 4, clip("b.mp4", 5));
        assert_eq!(idx, 1);
        assert_eq!(model.clip(0, 0).unwrap().length(), 4);
        assert_eq!(model.clip(0, 1).unwrap().length(), 5);
        assert_eq!(model.clip(0, 2).unwrap().length(), 6);
        assert_eq!(model.clip(0, 2).unwrap().frame_in, 4);
    }

    #[test]
    fn test_overwrite_carves_range() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        let idx = model.overwrite(0, 5, clip("c.mp4", 10));
        assert_eq!(idx, 1);
        assert_eq!(model.track_length(0), 20);
        assert_eq!(model.clip(0, 0).unwrap().length(), 5);
        assert_eq!(model.clip(0, 1).unwrap().producer.resource, "c.mp4");
        assert_eq!(model.clip(0, 2).unwrap().length(), 5);
        assert_eq!(model.clip(0, 2).unwrap().frame_in, 5);
    }

    #[test]
    fn test_overwrite_beyond_end_pads_blank() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        let idx = model.overwrite(0, 15, clip("b.mp4", 5));
        assert_eq!(idx, 2);
        assert!(model.is_blank(0, 1));
        assert_eq!(model.track_length(0), 20);
    }

    #[test]
    fn test_lift_coalesces_blanks() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        model.append(0, clip("c.mp4", 10));
        model.lift(0, 1);
        assert!(model.is_blank(0, 1));
        // Lifting the neighbor merges the two blanks, and the merged gap
        // sits at the end of the track, so it is dropped entirely.
        model.lift(0, 2);
        assert_eq!(model.clip_count(0), 1);
        assert_eq!(model.track_length(0), 10);
    }

    #[test]
    fn test_lift_last_drops_trailing_blank() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        model.lift(0, 1);
        assert_eq!(model.clip_count(0), 1);
        assert_eq!(model.track_length(0), 10);
    }

    #[test]
    fn test_split_preserves_fades_on_outer_edges() {
        let (mut model, _rx) = model_with_track();
        let mut c = clip("a.mp4", 10);
        c.fade_in = 2;
        c.fade_out = 3;
        model.append(0, c);
        model.split(0, 0, 6);
        assert_eq!(model.clip(0, 0).unwrap().fade_in, 2);
        assert_eq!(model.clip(0, 0).unwrap().fade_out, 0);
        assert_eq!(model.clip(0, 1).unwrap().fade_in, 0);
        assert_eq!(model.clip(0, 1).unwrap().fade_out, 3);
        assert_eq!(model.clip(0, 0).unwrap().length(), 6);
        assert_eq!(model.clip(0, 1).unwrap().length(), 4);
    }

    #[test]
    fn test_trim_in_non_ripple_keeps_downstream_starts() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        let idx = model.trim_clip_in(0, 0, 3, false);
        assert_eq!(idx, 1); // a blank now precedes the clip
        assert_eq!(model.item_start(0, 2), 10); // b did not move
        assert_eq!(model.clip(0, 1).unwrap().frame_in, 3);
    }

    #[test]
    fn test_trim_in_ripple_shifts_downstream() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        let idx = model.trim_clip_in(0, 0, 3, true);
        assert_eq!(idx, 0);
        assert_eq!(model.item_start(0, 1), 7); // b moved left
    }

    #[test]
    fn test_trim_in_undo_direction_consumes_blank() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        let idx = model.trim_clip_in(0, 0, 3, false);
        let idx = model.trim_clip_in(0, idx, -3, false);
        assert_eq!(idx, 0);
        assert_eq!(model.clip_count(0), 1);
        assert_eq!(model.clip(0, 0).unwrap().frame_in, 0);
    }

    #[test]
    fn test_trim_out_respects_source_headroom() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        assert!(!model.trim_clip_out_valid(0, 0, 1, false));
        model.trim_clip_out(0, 0, -4, false);
        assert!(model.trim_clip_out_valid(0, 0, 4, false));
    }

    #[test]
    fn test_add_transition_by_trim_in() {
        let (mut model, _rx) = model_with_track();
        let mut b = clip("b.mp4", 10);
        b.frame_in = 5;
        b.frame_out = 14;
        b.producer.length = 20;
        model.append(0, clip("a.mp4", 10));
        model.append(0, b);

        assert!(model.add_transition_by_trim_in_valid(0, 1, -4));
        let old_len = model.track_length(0);
        let tindex = model.add_transition_by_trim_in(0, 1, -4);
        assert_eq!(tindex, 1);
        assert!(model.is_transition(0, 1));
        assert_eq!(model.transition_length(0, 1), Some(4));
        assert_eq!(model.clip(0, 0).unwrap().length(), 6);
        assert_eq!(model.track_length(0), old_len);
    }

    #[test]
    fn test_add_transition_by_trim_out() {
        let (mut model, _rx) = model_with_track();
        let mut a = clip("a.mp4", 10);
        a.producer.length = 20;
        model.append(0, a);
        model.append(0, clip("b.mp4", 10));

        assert!(model.add_transition_by_trim_out_valid(0, 0, 4));
        let old_len = model.track_length(0);
        let tindex = model.add_transition_by_trim_out(0, 0, 4);
        assert_eq!(tindex, 1);
        assert_eq!(model.transition_length(0, 1), Some(4));
        assert_eq!(model.clip(0, 2).unwrap().frame_in, 4);
        assert_eq!(model.track_length(0), old_len);
    }

    #[test]
    fn test_resize_transition() {
        let (mut model, _rx) = model_with_track();
        let mut b = clip("b.mp4", 10);
        b.frame_in = 5;
        b.frame_out = 14;
        b.producer.length = 20;
        model.append(0, clip("a.mp4", 10));
        model.append(0, b);
        model.add_transition_by_trim_in(0, 1, -4);

        // Clip is now at index 2, preceded by the transition.
        assert!(model.trim_transition_out_valid(0, 2, 2));
        model.trim_transition_out(0, 2, 2);
        assert_eq!(model.transition_length(0, 1), Some(6));
        assert_eq!(model.clip(0, 2).unwrap().frame_in, 7);
    }

    #[test]
    fn test_merge_with_next() {
        let (mut model, _rx) = model_with_track();
        let producer = Producer::avformat("a.mp4", 100, 0);
        let left = Clip::with_range(producer.clone(), 0, 9);
        let right = Clip::with_range(producer, 10, 29);
        model.append(0, left);
        model.append(0, right);

        assert!(model.merge_with_next_valid(0, 0));
        model.merge_with_next(0, 0);
        assert_eq!(model.clip_count(0), 1);
        assert_eq!(model.clip(0, 0).unwrap().frame_out, 29);
    }

    #[test]
    fn test_merge_rejects_gap_in_source() {
        let (mut model, _rx) = model_with_track();
        let producer = Producer::avformat("a.mp4", 100, 0);
        model.append(0, Clip::with_range(producer.clone(), 0, 9));
        model.append(0, Clip::with_range(producer, 12, 29));
        assert!(!model.merge_with_next_valid(0, 0));
    }

    #[test]
    fn test_track_naming() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        model.add_track(TrackKind::Audio);
        model.add_track(TrackKind::Video);
        assert_eq!(model.track(0).unwrap().name, "V1");
        assert_eq!(model.track(1).unwrap().name, "A1");
        assert_eq!(model.track(2).unwrap().name, "V2");
    }

    #[test]
    fn test_move_clip_valid_onto_blank_only() {
        let (mut model, _rx) = model_with_track();
        model.add_track(TrackKind::Video);
        model.append(0, clip("a.mp4", 10));
        model.append(1, clip("b.mp4", 10));

        assert!(!model.move_clip_valid(0, 1, 0, 5, false));
        assert!(model.move_clip_valid(0, 1, 0, 10, false));
        // Moving within its own span is fine.
        assert!(model.move_clip_valid(0, 0, 0, 0, false));
    }

    #[test]
    fn test_move_clip_leaves_gap_without_ripple() {
        let (mut model, _rx) = model_with_track();
        model.append(0, clip("a.mp4", 10));
        model.append(0, clip("b.mp4", 10));
        let idx = model.move_clip(0, 0, 0, 25, false);
        // a gap where the clip was, plus padding up to 25
        assert!(model.is_blank(0, 0));
        assert_eq!(model.item_start(0, idx), 25);
    }
}
