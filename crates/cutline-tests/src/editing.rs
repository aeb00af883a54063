//! Edit coordinator operations: remove/lift bookkeeping, cut, drops,
//! detach, and history grouping.

use cutline_control::{ClipCoordinate, ClipList, SourceClip, UiEvent};
use cutline_timeline::{Clip, Producer, TimelineCommand, TrackKind};
use smallvec::smallvec;

use crate::common::{clip, controller, resources};

// ── Ripple delete ──────────────────────────────────────────────

#[test]
fn ripple_delete_is_order_independent() {
    for order in [[0usize, 1, 2], [2, 0, 1], [2, 1, 0], [1, 2, 0]] {
        let mut c = controller(1);
        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
            c.model_mut().append(0, clip(name, 10));
        }
        c.drain_model_events();

        let clips: ClipList = order.iter().map(|&i| ClipCoordinate::new(0, i)).collect();
        c.set_selection(clips, None, false);
        c.remove_selection(false).unwrap();

        assert_eq!(resources(&c, 0), vec!["d.mp4"], "order {order:?}");
        // More than one removal groups into a single macro.
        assert_eq!(c.journal().undo_count(), 1);
        assert!(matches!(
            c.journal().last(),
            Some(TimelineCommand::Batch { commands, .. }) if commands.len() == 3
        ));

        assert!(c.undo());
        assert_eq!(
            resources(&c, 0),
            vec!["a.mp4", "b.mp4", "c.mp4", "d.mp4"],
            "undo of order {order:?}"
        );
    }
}

#[test]
fn duplicate_coordinates_are_removed_once() {
    let mut c = controller(1);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        c.model_mut().append(0, clip(name, 10));
    }
    c.drain_model_events();

    c.set_selection(
        smallvec![
            ClipCoordinate::new(0, 1),
            ClipCoordinate::new(0, 1),
            ClipCoordinate::new(0, 2),
        ],
        None,
        false,
    );
    c.remove_selection(false).unwrap();
    assert_eq!(resources(&c, 0), vec!["a.mp4"]);
}

#[test]
fn single_removal_is_not_macro_wrapped() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    c.set_selection(smallvec![ClipCoordinate::new(0, 0)], None, false);
    c.remove_selection(false).unwrap();
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::Remove { .. })
    ));
}

#[test]
fn empty_selection_removes_clip_under_playhead() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    c.set_position(15);
    c.remove_selection(false).unwrap();
    assert_eq!(resources(&c, 0), vec!["a.mp4"]);
}

// ── Cut ────────────────────────────────────────────────────────

#[test]
fn cut_copies_then_removes_first_selected_only() {
    let mut c = controller(1);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        c.model_mut().append(0, clip(name, 10));
    }
    c.drain_model_events();
    c.drain_ui_events();

    // Click order b, then c: cut targets b only, multi-selection or not.
    c.set_selection(
        smallvec![ClipCoordinate::new(0, 1), ClipCoordinate::new(0, 2)],
        None,
        false,
    );
    c.remove_selection(true).unwrap();

    assert_eq!(resources(&c, 0), vec!["a.mp4", "c.mp4"]);
    assert!(c.drain_ui_events().contains(&UiEvent::ClipCopied));

    // The buffer holds b and can be edited back in.
    let payload = c.saved_producer().unwrap().to_string();
    let copied = Clip::from_payload(&payload).unwrap();
    assert_eq!(copied.producer.resource, "b.mp4");
}

// ── Lift ───────────────────────────────────────────────────────

#[test]
fn lift_leaves_a_gap() {
    let mut c = controller(1);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        c.model_mut().append(0, clip(name, 10));
    }
    c.drain_model_events();

    c.lift(0, 1).unwrap();
    assert_eq!(resources(&c, 0), vec!["a.mp4", "<blank>", "c.mp4"]);
    assert_eq!(c.model().item_start(0, 2), 20);
}

#[test]
fn lift_selection_accounts_for_coalescing_gaps() {
    // [A, blank, B, C]: lifting B merges its gap into the blank, shifting
    // C left before its own lift.
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append_blank(0, 5);
    c.model_mut().append(0, clip("b.mp4", 10));
    c.model_mut().append(0, clip("c.mp4", 10));
    c.drain_model_events();

    c.set_selection(
        smallvec![ClipCoordinate::new(0, 2), ClipCoordinate::new(0, 3)],
        None,
        false,
    );
    c.lift_selection().unwrap();

    // Both lifted; the merged trailing gap is dropped with the track end.
    assert_eq!(resources(&c, 0), vec!["a.mp4"]);

    assert!(c.undo());
    assert_eq!(
        resources(&c, 0),
        vec!["a.mp4", "<blank>", "b.mp4", "c.mp4"]
    );
}

// ── Append / insert / overwrite intake ─────────────────────────

#[test]
fn append_uses_the_copy_buffer_without_a_source() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.drain_model_events();

    c.copy_clip(0, 0);
    c.set_source(None);
    c.append(None).unwrap();
    assert_eq!(resources(&c, 0), vec!["a.mp4", "a.mp4"]);
}

#[test]
fn overwrite_defaults_to_playhead() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 30));
    c.drain_model_events();
    c.set_position(10);
    c.set_source(Some(SourceClip::seekable(
        clip("b.mp4", 10).to_payload().unwrap(),
    )));

    c.overwrite(None, None, None).unwrap();
    assert_eq!(resources(&c, 0), vec!["a.mp4", "b.mp4", "a.mp4"]);
    assert_eq!(c.model().item_start(0, 1), 10);
    // The overwritten clip becomes the selection.
    assert_eq!(c.selection().first(), Some(ClipCoordinate::new(0, 1)));
}

#[test]
fn intake_refuses_non_seekable_source() {
    let mut c = controller(1);
    c.set_source(Some(SourceClip {
        payload: clip("stream.ts", 10).to_payload().unwrap(),
        seekable: false,
        is_project_output: false,
    }));

    assert!(c.append(None).is_err());
    assert!(c.insert(None, None, None).is_err());
    assert!(c.overwrite(None, None, None).is_err());
    assert_eq!(c.model().clip_count(0), 0);
    assert!(!c.journal().can_undo());
}

// ── Drag and drop ──────────────────────────────────────────────

#[test]
fn drop_produces_exactly_one_command() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(1, clip("b.mp4", 10));
    c.drain_model_events();

    // Plain move across tracks.
    assert!(c.move_clip(0, 1, 0, 20, false));
    assert_eq!(c.journal().undo_count(), 1);
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::MoveClip { .. })
    ));
    assert_eq!(resources(&c, 1), vec!["b.mp4", "<blank>", "a.mp4"]);

    assert!(c.undo());
    assert_eq!(resources(&c, 0), vec!["a.mp4"]);
    assert_eq!(resources(&c, 1), vec!["b.mp4"]);
}

#[test]
fn overlapping_drop_becomes_transition_and_selects_it() {
    let mut c = controller(1);
    let mut a = clip("a.mp4", 10);
    a.producer.length = 20;
    let mut b = clip("b.mp4", 20);
    b.frame_in = 5;
    b.frame_out = 14;
    c.model_mut().append(0, a);
    c.model_mut().append(0, b);
    c.drain_model_events();

    // Dropping b three frames into a is no valid move, but a cross-fade.
    assert!(c.move_clip(0, 0, 1, 7, false));
    assert_eq!(c.journal().undo_count(), 1);
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::AddTransitionOnDrop { .. })
    ));

    let selected = c.selection().first().unwrap();
    assert!(c.model().is_transition(selected.track, selected.clip));
    assert_eq!(c.model().transition_length(0, selected.clip), Some(3));

    assert!(c.undo());
    assert_eq!(resources(&c, 0), vec!["a.mp4", "b.mp4"]);
}

#[test]
fn invalid_drop_produces_no_command() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(1, clip("b.mp4", 10));
    c.drain_model_events();

    // Fully covering an unrelated clip is neither a move nor a transition.
    assert!(!c.move_clip(0, 1, 0, 0, false));
    assert!(!c.journal().can_undo());
}

// ── Detach audio ───────────────────────────────────────────────

#[test]
fn detach_audio_uses_existing_audio_track() {
    let mut c = controller(1);
    c.model_mut().add_track(TrackKind::Audio);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.drain_model_events();

    c.detach_audio(0, 0).unwrap();
    assert_eq!(c.model().track_count(), 2);
    assert_eq!(c.model().clip(1, 0).unwrap().producer.resource, "a.mp4");
    assert_eq!(c.model().clip(0, 0).unwrap().producer.audio_index, -1);

    assert!(c.undo());
    assert_eq!(c.model().clip(0, 0).unwrap().producer.audio_index, 0);
    assert_eq!(c.model().clip_count(1), 0);
}

#[test]
fn detach_audio_lands_at_source_position() {
    let mut c = controller(1);
    c.model_mut().add_track(TrackKind::Audio);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    c.detach_audio(0, 1).unwrap();
    assert_eq!(c.model().item_start(1, 1), 10);
    assert_eq!(c.model().clip(1, 1).unwrap().producer.resource, "b.mp4");
}

// ── Merge ──────────────────────────────────────────────────────

#[test]
fn merge_dry_run_reports_without_history() {
    let mut c = controller(1);
    let producer = Producer::avformat("a.mp4", 100, 0);
    c.model_mut().append(0, Clip::with_range(producer.clone(), 0, 9));
    c.model_mut().append(0, Clip::with_range(producer.clone(), 10, 29));
    c.model_mut().append(0, Clip::with_range(producer, 40, 49));
    c.drain_model_events();

    assert!(c.merge_clip_with_next(0, 0, true));
    assert!(!c.merge_clip_with_next(0, 1, true)); // source gap
    assert_eq!(c.model().clip_count(0), 3);
    assert!(!c.journal().can_undo());

    assert!(c.merge_clip_with_next(0, 0, false));
    assert_eq!(c.model().clip_count(0), 2);
    assert_eq!(c.model().clip(0, 0).unwrap().frame_out, 29);

    assert!(c.undo());
    assert_eq!(c.model().clip_count(0), 3);
}

// ── Track operations ───────────────────────────────────────────

#[test]
fn track_operations_are_single_undo_steps() {
    let mut c = controller(2);
    c.set_track_name(0, "Main");
    c.toggle_track_mute(0);
    c.toggle_track_hidden(1);
    c.set_track_lock(1, true);
    c.set_track_composite(0, false);
    assert_eq!(c.journal().undo_count(), 5);

    assert_eq!(c.model().track(0).unwrap().name, "Main");
    assert!(c.model().track(0).unwrap().mute);
    assert!(c.model().track(1).unwrap().hidden);
    assert!(c.model().is_locked(1));
    assert!(!c.model().track(0).unwrap().composite);

    for _ in 0..5 {
        assert!(c.undo());
    }
    assert_eq!(c.model().track(0).unwrap().name, "V1");
    assert!(!c.model().track(0).unwrap().mute);
    assert!(!c.model().track(1).unwrap().hidden);
    assert!(!c.model().is_locked(1));
    assert!(c.model().track(0).unwrap().composite);
}

#[test]
fn remove_track_round_trips_contents() {
    let mut c = controller(2);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.drain_model_events();

    c.set_current_track(0);
    c.remove_track();
    assert_eq!(c.model().track_count(), 1);

    assert!(c.undo());
    assert_eq!(c.model().track_count(), 2);
    assert_eq!(resources(&c, 0), vec!["a.mp4"]);
}

// ── Locked tracks abort without history ────────────────────────

#[test]
fn locked_track_operations_leave_no_trace() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().set_lock(0, true);
    c.drain_model_events();
    c.drain_ui_events();

    assert!(c.remove(0, 0).is_err());
    assert!(c.lift(0, 0).is_err());
    assert!(c.fade_in(0, 0, 10).is_err());
    assert!(c.remove_selection(false).is_err());
    assert!(!c.move_clip(0, 0, 0, 20, false));

    assert_eq!(resources(&c, 0), vec!["a.mp4"]);
    assert!(!c.journal().can_undo());
    assert!(c
        .drain_ui_events()
        .iter()
        .any(|e| matches!(e, UiEvent::TrackLockPulse(0))));
}
