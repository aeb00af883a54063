//! Trim gestures, the update side channel, and the image property panel.

use cutline_control::{ImageSourceController, ImageUpdate, SequenceProbe, TrimEdge, UiEvent};
use cutline_timeline::{Clip, Producer, TimelineCommand};

use crate::common::{clip, controller, find_clip, resources};

// ── Gesture coalescing ─────────────────────────────────────────

#[test]
fn zero_net_gesture_leaves_no_history() {
    let mut c = controller(1);
    let mut a = clip("a.mp4", 20);
    a.frame_in = 8;
    a.frame_out = 17;
    c.model_mut().append(0, a);
    c.drain_model_events();

    for delta in [5, 3, -8] {
        let index = find_clip(&c, 0, "a.mp4");
        assert!(c.trim_clip_in(0, index, delta));
    }
    assert!(!c.commit_trim());

    assert!(!c.journal().can_undo());
    assert_eq!(c.model().clip(0, 0).unwrap().frame_in, 8);
    assert_eq!(c.model().clip_count(0), 1);
}

#[test]
fn gesture_deltas_collapse_into_one_command() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 20));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    for delta in [4, 2, 1] {
        let index = find_clip(&c, 0, "a.mp4");
        assert!(c.trim_clip_in(0, index, delta));
    }
    assert!(c.commit_trim());

    assert_eq!(c.journal().undo_count(), 1);
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::TrimClipIn { delta: 7, .. })
    ));

    // One undo reverses the whole gesture; one redo replays it.
    assert!(c.undo());
    assert_eq!(resources(&c, 0), vec!["a.mp4", "b.mp4"]);
    assert_eq!(c.model().clip(0, 0).unwrap().frame_in, 0);

    assert!(c.redo());
    assert_eq!(resources(&c, 0), vec!["<blank>", "a.mp4", "b.mp4"]);
    assert_eq!(c.model().clip(0, 1).unwrap().frame_in, 7);
}

#[test]
fn gesture_crossing_into_transition_is_one_command() {
    let mut c = controller(1);
    let mut a = clip("a.mp4", 10);
    a.producer.length = 30;
    c.model_mut().append(0, a);
    c.model_mut().append_blank(0, 5);
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    // The first delta swallows the blank as a plain trim; the second
    // crosses into b and reclassifies as create-transition.
    assert!(c.trim_clip_out(0, 0, 5));
    assert!(c.trim_clip_out(0, 0, 3));
    assert!(c.commit_trim());

    assert_eq!(c.journal().undo_count(), 1);
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::AddTransitionByTrimOut {
            transition_delta: 3,
            trim_delta: 5,
            ..
        })
    ));
    assert_eq!(
        resources(&c, 0),
        vec!["a.mp4", "<transition>", "b.mp4"]
    );

    assert!(c.undo());
    assert_eq!(resources(&c, 0), vec!["a.mp4", "<blank>", "b.mp4"]);
    assert_eq!(c.model().clip(0, 0).unwrap().frame_out, 9);
}

#[test]
fn separate_gestures_produce_separate_commands() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 20));
    c.drain_model_events();

    c.set_ripple(true);
    assert!(c.trim_clip_out(0, 0, -3));
    assert!(c.commit_trim());
    assert!(c.trim_clip_out(0, 0, -2));
    assert!(c.commit_trim());

    assert_eq!(c.journal().undo_count(), 2);
    assert_eq!(c.model().clip(0, 0).unwrap().length(), 15);
}

#[test]
fn rejected_deltas_do_not_start_a_gesture() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.drain_model_events();

    // Out-trimming past the source's end is refused.
    assert!(!c.trim_clip_out(0, 0, 5));
    assert!(!c.commit_trim());
    assert!(!c.journal().can_undo());
}

#[test]
fn one_shot_trim_to_playhead() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 20));
    c.drain_model_events();

    c.set_position(6);
    c.trim_clip_at_playhead(TrimEdge::In);
    assert_eq!(c.journal().undo_count(), 1);
    let index = find_clip(&c, 0, "a.mp4");
    assert_eq!(c.model().clip(0, index).unwrap().frame_in, 6);
    assert_eq!(c.model().item_start(0, index), 6);

    c.set_position(14);
    c.trim_clip_at_playhead(TrimEdge::Out);
    assert_eq!(c.journal().undo_count(), 2);
    let index = find_clip(&c, 0, "a.mp4");
    assert_eq!(c.model().clip(0, index).unwrap().length(), 8);
}

#[test]
fn ripple_trim_shifts_downstream_clips() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, clip("b.mp4", 10));
    c.drain_model_events();

    c.set_ripple(true);
    assert!(c.trim_clip_out(0, 0, -4));
    assert!(c.commit_trim());
    assert_eq!(c.model().item_start(0, 1), 6);

    assert!(c.undo());
    assert_eq!(c.model().item_start(0, 1), 10);
}

#[test]
fn image_clip_trim_reports_duration_change() {
    let mut c = controller(1);
    c.model_mut().append(0, Clip::new(Producer::image("poster.png", 100)));
    c.drain_model_events();
    c.drain_ui_events();

    assert!(c.trim_clip_out(0, 0, -10));
    assert!(c
        .drain_ui_events()
        .contains(&UiEvent::ImageDurationChanged));
    c.commit_trim();

    // Sequences are not reported; their duration is the file count.
    let mut seq = Producer::image("img_%04d.png", 100);
    seq.is_sequence = true;
    c.model_mut().append(0, Clip::new(seq));
    c.drain_model_events();
    c.drain_ui_events();
    assert!(c.trim_clip_out(0, 1, -10));
    assert!(!c
        .drain_ui_events()
        .contains(&UiEvent::ImageDurationChanged));
    c.commit_trim();
}

// ── Update side channel ────────────────────────────────────────

#[test]
fn selection_widens_filter_window_over_transitions() {
    let mut c = controller(1);
    let mut b = clip("b.mp4", 20);
    b.frame_in = 5;
    b.frame_out = 14;
    c.model_mut().append(0, clip("a.mp4", 10));
    c.model_mut().append(0, b);
    c.model_mut().add_transition_by_trim_in(0, 1, -4);
    c.drain_model_events();
    c.drain_ui_events();

    // b sits behind the transition at index 1.
    c.select_clip(0, 2);
    let events = c.drain_ui_events();
    let producer = events
        .iter()
        .find_map(|e| match e {
            UiEvent::Selected(Some(p)) => Some(p),
            _ => None,
        })
        .expect("selection publishes the composed producer");
    assert_eq!(producer.filter_in, 1); // 5 - transition length 4
    assert_eq!(producer.filter_out, 14);
    assert_eq!(producer.playlist_start, 6);
}

#[test]
fn producer_commit_is_one_undoable_step() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 100));
    c.drain_model_events();
    c.select_clip(0, 0);
    c.drain_ui_events();

    let mut after = c.model().clip(0, 0).unwrap().producer.clone();
    after.comment = "color pass".into();
    c.producer_changed(after).unwrap();

    assert!(c.selection().is_empty());
    assert_eq!(c.journal().undo_count(), 1);
    assert!(matches!(
        c.journal().last(),
        Some(TimelineCommand::UpdateClip { .. })
    ));
    assert_eq!(c.model().clip(0, 0).unwrap().producer.comment, "color pass");

    assert!(c.undo());
    assert_eq!(c.model().clip(0, 0).unwrap().producer.comment, "");
    assert!(c.redo());
    assert_eq!(c.model().clip(0, 0).unwrap().producer.comment, "color pass");
}

#[test]
fn commit_without_selection_is_ignored() {
    let mut c = controller(1);
    c.model_mut().append(0, clip("a.mp4", 100));
    c.drain_model_events();

    let after = c.model().clip(0, 0).unwrap().producer.clone();
    c.producer_changed(after).unwrap();
    assert!(!c.journal().can_undo());
}

// ── Image panel round trip ─────────────────────────────────────

struct NoFiles;

impl SequenceProbe for NoFiles {
    fn exists(&self, _path: &str) -> bool {
        false
    }
}

#[test]
fn panel_edit_round_trips_through_the_timeline() {
    let mut c = controller(1);
    c.model_mut().append(0, Clip::new(Producer::image("poster.png", 100)));
    c.drain_model_events();
    c.select_clip(0, 0);

    // The panel binds the producer published for the selection.
    let events = c.drain_ui_events();
    let bound = events
        .iter()
        .find_map(|e| match e {
            UiEvent::Selected(Some(p)) => Some((**p).clone()),
            _ => None,
        })
        .unwrap();
    let mut panel = ImageSourceController::new(NoFiles);
    panel.set_producer(bound);

    let update = panel.set_aspect_ratio(16, 9).unwrap();
    let ImageUpdate::Changed(after) = update else {
        panic!("timeline-bound producers are handed back, not reopened");
    };
    c.producer_changed(after).unwrap();

    let committed = c.model().clip(0, 0).unwrap();
    assert_eq!(committed.producer.aspect_ratio, Some((16, 9)));
    assert_eq!(c.journal().undo_count(), 1);

    assert!(c.undo());
    assert_eq!(c.model().clip(0, 0).unwrap().producer.aspect_ratio, None);
}
