//! Shared builders for the integration tests.

use cutline_control::TimelineController;
use cutline_timeline::{Clip, MultitrackModel, Producer, TrackKind, UndoJournal};

pub fn controller(tracks: usize) -> TimelineController {
    let (mut model, rx) = MultitrackModel::new();
    for _ in 0..tracks {
        model.add_track(TrackKind::Video);
    }
    let mut controller = TimelineController::new(model, rx, UndoJournal::new(100));
    controller.drain_model_events();
    controller.drain_ui_events();
    controller
}

pub fn clip(resource: &str, len: i64) -> Clip {
    Clip::new(Producer::avformat(resource, len, 0))
}

/// The resources on a track in order, with blanks and transitions marked.
pub fn resources(controller: &TimelineController, track: usize) -> Vec<String> {
    (0..controller.model().clip_count(track))
        .map(|i| {
            if controller.model().is_blank(track, i) {
                "<blank>".to_string()
            } else if controller.model().is_transition(track, i) {
                "<transition>".to_string()
            } else {
                controller
                    .model()
                    .clip(track, i)
                    .map(|c| c.producer.resource.clone())
                    .unwrap_or_default()
            }
        })
        .collect()
}

/// Index of the clip backed by a resource, for re-locating a clip whose
/// index shifted during a gesture.
pub fn find_clip(controller: &TimelineController, track: usize, resource: &str) -> usize {
    (0..controller.model().clip_count(track))
        .find(|&i| {
            controller
                .model()
                .clip(track, i)
                .is_some_and(|c| c.producer.resource == resource)
        })
        .unwrap_or_else(|| panic!("no clip backed by {resource} on track {track}"))
}
