//! The pending clip-update side channel.
//!
//! While a single clip is the current selection, property-panel edits to its
//! composed producer must become one before/after undo command. The "before"
//! payload is captured when selection narrows to the clip; the "after" is
//! supplied when a new producer is committed, which consumes the pending
//! update into an [`TimelineCommand::UpdateClip`].

use cutline_timeline::{MultitrackModel, Producer, TimelineCommand};

/// Position value meaning "no longer meaningful for this update".
pub const INDETERMINATE_POSITION: i64 = -1;

/// The captured before-state of the solely selected clip.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub track: usize,
    pub clip: usize,
    position: i64,
    before: String,
}

impl PendingUpdate {
    /// Capture the clip at the coordinate as the "before" state. Returns
    /// `None` for blanks and transitions.
    pub fn capture(model: &MultitrackModel, track: usize, clip: usize) -> Option<Self> {
        let before = model.clip(track, clip)?.to_payload().ok()?;
        Some(Self {
            track,
            clip,
            position: model.item_start(track, clip),
            before,
        })
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Re-point the update after the clip moved or its start shifted.
    /// [`INDETERMINATE_POSITION`] marks the position as unknown.
    pub fn set_position(&mut self, track: usize, clip: usize, position: i64) {
        self.track = track;
        self.clip = clip;
        self.position = position;
    }

    /// Turn the pending update into the undo command recording the edit.
    pub fn into_command(self, after: String) -> TimelineCommand {
        TimelineCommand::UpdateClip {
            track: self.track,
            index: self.clip,
            position: self.position,
            before: self.before,
            after,
        }
    }
}

/// Compose the producer to publish for a selected clip.
///
/// Time-based effects need to see the span of the cut together with any
/// cross-fade it participates in, so an immediately adjacent transition
/// widens the filter window by its duration: a transition on the left
/// extends `filter_in` backwards and moves `playlist_start` to the
/// transition's start; one on the right extends `filter_out`.
pub fn compose_selected_producer(
    model: &MultitrackModel,
    track: usize,
    clip: usize,
) -> Option<Producer> {
    let info = model.clip_info(track, clip)?;
    let mut producer = info.producer.clone();

    let left = clip
        .checked_sub(1)
        .and_then(|i| model.transition_length(track, i).map(|len| (i, len)));
    if let Some((index, length)) = left {
        producer.filter_in = info.frame_in - length;
        producer.playlist_start = model.item_start(track, index);
    } else {
        producer.filter_in = info.frame_in;
        producer.playlist_start = info.start;
    }

    if let Some(length) = model.transition_length(track, clip + 1) {
        producer.filter_out = info.frame_out + length;
    } else {
        producer.filter_out = info.frame_out;
    }

    producer.multitrack_item = Some((track, clip));
    Some(producer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_timeline::{Clip, Producer, TrackKind};

    fn model_with_transition() -> MultitrackModel {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        let mut b = Clip::new(Producer::avformat("b.mp4", 20, 0));
        b.frame_in = 5;
        b.frame_out = 14;
        model.append(0, Clip::new(Producer::avformat("a.mp4", 10, 0)));
        model.append(0, b);
        // a(6) | transition(4) | b
        model.add_transition_by_trim_in(0, 1, -4);
        model
    }

    #[test]
    fn test_plain_clip_window_matches_cut() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        model.append_blank(0, 5);
        let mut clip = Clip::new(Producer::avformat("a.mp4", 20, 0));
        clip.frame_in = 2;
        clip.frame_out = 11;
        model.append(0, clip);

        let p = compose_selected_producer(&model, 0, 1).unwrap();
        assert_eq!(p.filter_in, 2);
        assert_eq!(p.filter_out, 11);
        assert_eq!(p.playlist_start, 5);
        assert_eq!(p.multitrack_item, Some((0, 1)));
    }

    #[test]
    fn test_left_transition_widens_window() {
        let model = model_with_transition();
        // b sits at index 2, behind the 4-frame transition starting at 6.
        let p = compose_selected_producer(&model, 0, 2).unwrap();
        assert_eq!(p.filter_in, 5 - 4);
        assert_eq!(p.filter_out, 14);
        assert_eq!(p.playlist_start, 6);
    }

    #[test]
    fn test_right_transition_widens_window() {
        let model = model_with_transition();
        let p = compose_selected_producer(&model, 0, 0).unwrap();
        assert_eq!(p.filter_in, 0);
        assert_eq!(p.filter_out, 5 + 4);
        assert_eq!(p.playlist_start, 0);
    }

    #[test]
    fn test_no_producer_for_blank_or_transition() {
        let model = model_with_transition();
        assert!(compose_selected_producer(&model, 0, 1).is_none());
        assert!(compose_selected_producer(&model, 0, 9).is_none());
    }

    #[test]
    fn test_pending_update_command_roundtrip() {
        let model = model_with_transition();
        let update = PendingUpdate::capture(&model, 0, 0).unwrap();
        assert_eq!(update.position(), 0);

        let after = model.clip(0, 0).unwrap().to_payload().unwrap();
        match update.into_command(after) {
            TimelineCommand::UpdateClip { track, index, .. } => {
                assert_eq!((track, index), (0, 0));
            }
            other => panic!("expected UpdateClip, got {other:?}"),
        }
    }
}
