//! Selection, resolution policy, and reconciliation across model changes.

use cutline_control::{ClipCoordinate, ClipList, UiEvent};
use smallvec::smallvec;

use crate::common::{clip, controller};

// ── Notification consistency ───────────────────────────────────

#[test]
fn selected_notification_tracks_selection_emptiness() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(1, clip("b.mp4", 10));
    c.drain_model_events();
    c.drain_ui_events();

    let sequences: Vec<ClipList> = vec![
        smallvec![ClipCoordinate::new(0, 0)],
        smallvec![ClipCoordinate::new(1, 0)],
        smallvec![],
        smallvec![ClipCoordinate::new(0, 0), ClipCoordinate::new(1, 0)],
        smallvec![],
    ];
    for clips in sequences {
        let expect_some = !clips.is_empty();
        c.set_selection(clips, None, false);
        let events = c.drain_ui_events();
        assert!(events.contains(&UiEvent::SelectionChanged));
        if expect_some {
            assert!(
                events.iter().any(|e| matches!(e, UiEvent::Selected(Some(_)))),
                "non-empty selection must publish a producer"
            );
        } else {
            assert!(
                events.contains(&UiEvent::Selected(None)),
                "empty selection must publish nothing-selected"
            );
        }
    }
}

#[test]
fn selected_producer_carries_its_coordinate() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();
    c.drain_ui_events();

    c.select_clip(0, 1);
    let events = c.drain_ui_events();
    let producer = events
        .iter()
        .find_map(|e| match e {
            UiEvent::Selected(Some(p)) => Some(p),
            _ => None,
        })
        .expect("clip selection publishes its producer");
    assert_eq!(producer.multitrack_item, Some((0, 1)));
    assert_eq!(producer.playlist_start, 10);
}

// ── select_all ─────────────────────────────────────────────────

#[test]
fn select_all_walks_tracks_in_ascending_order() {
    // track 0: [blank, A, B]   track 1: [C, blank]
    let mut c = controller(2);
    c.model_mut().append_blank(0, 5);
    c.model_mut().append(0, clip("A.mp4", 10));
    c.model_mut().append(0, clip("B.mp4", 10));
    c.model_mut().append(1, clip("C.mp4", 10));
    c.model_mut().append_blank(1, 5);
    c.drain_model_events();

    c.select_all();
    let clips: Vec<ClipCoordinate> = c.selection().clips.iter().copied().collect();
    assert_eq!(
        clips,
        vec![
            ClipCoordinate::new(0, 1),
            ClipCoordinate::new(0, 2),
            ClipCoordinate::new(1, 0),
        ]
    );
}

// ── Playhead resolution ────────────────────────────────────────

#[test]
fn playhead_selection_prefers_current_track() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(1, clip("b.mp4", 10));
    c.drain_model_events();

    c.set_current_track(1);
    c.set_position(5);
    c.select_clip_under_playhead();
    assert_eq!(c.selection().first(), Some(ClipCoordinate::new(1, 0)));
}

#[test]
fn playhead_selection_never_lands_on_locked_track() {
    let mut c = controller(3);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(1, clip("b.mp4", 10));
    c.model_mut().append(2, clip("c.mp4", 10));
    c.model_mut().set_lock(0, true);
    c.model_mut().set_lock(1, true);
    c.drain_model_events();

    c.set_position(5);
    c.select_clip_under_playhead();
    let hit = c.selection().first().expect("unlocked track 2 matches");
    assert_eq!(hit.track, 2);
}

#[test]
fn fully_locked_project_pulses_instead_of_selecting() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().set_lock(0, true);
    c.drain_model_events();
    c.drain_ui_events();

    c.set_position(5);
    c.select_clip_under_playhead();
    assert!(c.selection().is_empty());
    let events = c.drain_ui_events();
    assert!(events.contains(&UiEvent::TrackLockPulse(0)));
}

// ── Reconciliation across row changes ──────────────────────────

#[test]
fn reconciliation_is_queued_not_reentrant() {
    let mut c = controller(1);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        c.model_mut().append(0, clip(name, 10));
    }
    c.drain_model_events();
    c.set_selection(smallvec![ClipCoordinate::new(0, 1)], None, false);
    c.drain_ui_events();

    // A head trim inserts a blank row before clip 0. Until the controller
    // drains its event queue the selection is untouched.
    c.model_mut().trim_clip_in(0, 0, 3, false);
    assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 1)));

    c.drain_model_events();
    assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 2)));
}

#[test]
fn rows_removed_drops_covered_coordinates() {
    let mut c = controller(1);
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        c.model_mut().append(0, clip(name, 10));
    }
    c.drain_model_events();
    c.set_selection(
        smallvec![
            ClipCoordinate::new(0, 1),
            ClipCoordinate::new(0, 3),
            ClipCoordinate::new(0, 0),
        ],
        None,
        false,
    );
    c.drain_ui_events();

    c.model_mut().remove(0, 1);
    c.drain_model_events();

    // (0,1) was removed, (0,3) shifted down, (0,0) untouched; click order
    // is preserved.
    let clips: Vec<ClipCoordinate> = c.selection().clips.iter().copied().collect();
    assert_eq!(
        clips,
        vec![ClipCoordinate::new(0, 2), ClipCoordinate::new(0, 0)]
    );
}

#[test]
fn explicit_track_selection_is_not_reconciled() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.drain_model_events();

    c.select_track_head(1);
    c.drain_ui_events();
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    assert_eq!(c.selection().track, Some(1));
    assert!(c.selection().clips.is_empty());
}

// ── Save / restore bracketing ──────────────────────────────────

#[test]
fn save_restore_round_trips_through_an_operation() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();
    c.select_clip(0, 1);
    c.drain_ui_events();

    c.save_and_clear_selection();
    assert!(c.selection().is_empty());

    // A downstream operation running with the selection suspended.
    c.fade_in(0, 0, 5).unwrap();

    c.restore_selection();
    assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 1)));
    let events = c.drain_ui_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::Selected(Some(_)))));
}
