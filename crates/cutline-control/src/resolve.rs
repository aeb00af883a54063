//! The shared clip resolution policy.

use cutline_timeline::MultitrackModel;

use crate::selection::ClipCoordinate;

/// Resolve the clip at a playhead position.
///
/// Tried in order, first hit wins:
/// 1. the hint track, if unlocked and the position maps to a non-blank item;
/// 2. the current track, if unlocked, with an out-of-range index clamped
///    back to the last item;
/// 3. every other unlocked track in ascending index order.
///
/// Locked tracks never yield a hit. Deterministic: re-running with
/// unchanged state returns the same coordinate.
pub fn choose_clip_at_position(
    model: &MultitrackModel,
    position: i64,
    hint_track: Option<usize>,
    current_track: usize,
) -> Option<ClipCoordinate> {
    if let Some(track) = hint_track {
        if track < model.track_count() && !model.is_locked(track) {
            if let Some(index) = model.index_at_position(track, position) {
                if !model.is_blank(track, index) {
                    return Some(ClipCoordinate::new(track, index));
                }
            }
        }
    }

    let track = current_track;
    if track < model.track_count() && !model.is_locked(track) {
        let count = model.clip_count(track);
        if count > 0 {
            let index = model
                .index_at_position(track, position)
                .unwrap_or(count)
                .min(count - 1);
            if !model.is_blank(track, index) {
                return Some(ClipCoordinate::new(track, index));
            }
        }
    }

    for track in 0..model.track_count() {
        if track == current_track || model.is_locked(track) {
            continue;
        }
        if let Some(index) = model.index_at_position(track, position) {
            if !model.is_blank(track, index) {
                return Some(ClipCoordinate::new(track, index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_timeline::{Clip, Producer, TrackKind};
    use proptest::prelude::*;

    fn clip(len: i64) -> Clip {
        Clip::new(Producer::avformat("t.mp4", len, 0))
    }

    /// Two video tracks: track 0 = [clip 10, blank 10, clip 10],
    /// track 1 = [blank 5, clip 20].
    fn fixture() -> MultitrackModel {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        model.add_track(TrackKind::Video);
        model.append(0, clip(10));
        model.append_blank(0, 10);
        model.append(0, clip(10));
        model.append_blank(1, 5);
        model.append(1, clip(20));
        model
    }

    #[test]
    fn test_hint_track_wins() {
        let model = fixture();
        let hit = choose_clip_at_position(&model, 8, Some(1), 0);
        assert_eq!(hit, Some(ClipCoordinate::new(1, 1)));
    }

    #[test]
    fn test_blank_on_hint_falls_through_to_current() {
        let model = fixture();
        // Position 12 is blank on track 0 (hint) but a clip on track 1.
        let hit = choose_clip_at_position(&model, 12, Some(0), 1);
        assert_eq!(hit, Some(ClipCoordinate::new(1, 1)));
    }

    #[test]
    fn test_current_track_clamps_past_end() {
        let model = fixture();
        // Beyond the end of track 0 resolves to its last clip.
        let hit = choose_clip_at_position(&model, 100, None, 0);
        assert_eq!(hit, Some(ClipCoordinate::new(0, 2)));
    }

    #[test]
    fn test_locked_hint_track_is_skipped() {
        let mut model = fixture();
        model.set_lock(1, true);
        // Hint and fallback scan must both skip the locked track; blank on
        // current track 0 at position 12, so nothing matches.
        let hit = choose_clip_at_position(&model, 12, Some(1), 0);
        assert!(hit.is_none() || hit.unwrap().track != 1);
    }

    #[test]
    fn test_scan_skips_current_track() {
        let model = fixture();
        // Position 2: clip on both tracks; current is 1, so its clamp rule
        // hits first. The blank head of track 1 means the clamp resolves
        // index 0 which is blank, falling through to the scan of track 0.
        let hit = choose_clip_at_position(&model, 2, None, 1);
        assert_eq!(hit, Some(ClipCoordinate::new(0, 0)));
    }

    #[test]
    fn test_nothing_matches_empty_model() {
        let (model, _rx) = MultitrackModel::new();
        assert!(choose_clip_at_position(&model, 0, None, 0).is_none());
    }

    proptest! {
        /// The policy is deterministic and order-stable, and never
        /// resolves onto a locked track.
        #[test]
        fn prop_resolution_deterministic_and_lock_safe(
            lens in proptest::collection::vec(
                proptest::collection::vec((any::<bool>(), 1i64..20), 0..6),
                1..4,
            ),
            locks in proptest::collection::vec(any::<bool>(), 4),
            position in 0i64..120,
            current in 0usize..4,
            hint in proptest::option::of(0usize..4),
        ) {
            let (mut model, _rx) = MultitrackModel::new();
            for items in &lens {
                let t = model.add_track(TrackKind::Video);
                for (blank, len) in items {
                    if *blank {
                        model.append_blank(t, *len);
                    } else {
                        model.append(t, clip(*len));
                    }
                }
            }
            for (t, lock) in locks.iter().enumerate().take(model.track_count()) {
                model.set_lock(t, *lock);
            }
            let current = current.min(model.track_count() - 1);

            let first = choose_clip_at_position(&model, position, hint, current);
            let second = choose_clip_at_position(&model, position, hint, current);
            prop_assert_eq!(first, second);

            if let Some(hit) = first {
                prop_assert!(!model.is_locked(hit.track));
                prop_assert!(!model.is_blank(hit.track, hit.clip));
            }
        }
    }
}
