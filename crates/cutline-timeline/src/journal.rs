//! Undo/redo journal.

use crate::command::TimelineCommand;
use crate::model::MultitrackModel;

/// Depth-bounded undo/redo history.
///
/// Commands are pushed after their effect has been applied; the journal
/// never executes a command on push. `begin_macro`/`end_macro` collect the
/// commands pushed in between into one atomic [`TimelineCommand::Batch`].
#[derive(Debug)]
pub struct UndoJournal {
    /// Commands that have been executed (most recent last).
    undo: Vec<TimelineCommand>,
    /// Commands that have been undone (most recent last).
    redo: Vec<TimelineCommand>,
    /// An open macro collecting pushes, with its label.
    open_macro: Option<(String, Vec<TimelineCommand>)>,
    /// Maximum history depth.
    max_depth: usize,
}

impl UndoJournal {
    /// Create a new journal with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            open_macro: None,
            max_depth,
        }
    }

    /// Record an already-applied command. Clears the redo history.
    pub fn push(&mut self, command: TimelineCommand) {
        self.redo.clear();
        if let Some((_, commands)) = &mut self.open_macro {
            commands.push(command);
            return;
        }
        self.undo.push(command);
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }

    /// Start collecting pushes into one atomic step.
    pub fn begin_macro(&mut self, label: impl Into<String>) {
        debug_assert!(self.open_macro.is_none(), "nested macros are not supported");
        self.open_macro = Some((label.into(), Vec::new()));
    }

    /// Close the open macro. An empty macro records nothing.
    pub fn end_macro(&mut self) {
        let Some((label, commands)) = self.open_macro.take() else {
            debug_assert!(false, "end_macro without begin_macro");
            return;
        };
        if !commands.is_empty() {
            self.push(TimelineCommand::Batch { label, commands });
        }
    }

    /// Undo the most recent command against the model.
    pub fn undo(&mut self, model: &mut MultitrackModel) -> bool {
        let Some(command) = self.undo.pop() else {
            return false;
        };
        command.undo(model);
        self.redo.push(command);
        true
    }

    /// Redo the most recently undone command against the model.
    pub fn redo(&mut self, model: &mut MultitrackModel) -> bool {
        let Some(command) = self.redo.pop() else {
            return false;
        };
        command.redo(model);
        self.undo.push(command);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// The most recently recorded command, if any.
    pub fn last(&self) -> Option<&TimelineCommand> {
        self.undo.last()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open_macro = None;
    }
}

impl Default for UndoJournal {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Clip, Producer};
    use crate::track::TrackKind;

    fn applied_append(model: &mut MultitrackModel, resource: &str) -> TimelineCommand {
        let clip = Clip::new(Producer::avformat(resource, 10, 0));
        let index = model.append(0, clip.clone());
        TimelineCommand::Append {
            track: 0,
            index,
            clip,
        }
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        let mut journal = UndoJournal::new(100);

        journal.push(applied_append(&mut model, "a.mp4"));
        assert!(journal.can_undo());
        assert!(!journal.can_redo());

        assert!(journal.undo(&mut model));
        assert_eq!(model.clip_count(0), 0);
        assert!(journal.can_redo());

        assert!(journal.redo(&mut model));
        assert_eq!(model.clip_count(0), 1);
    }

    #[test]
    fn test_new_push_clears_redo() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        let mut journal = UndoJournal::new(100);

        journal.push(applied_append(&mut model, "a.mp4"));
        journal.undo(&mut model);
        assert!(journal.can_redo());

        journal.push(applied_append(&mut model, "b.mp4"));
        assert!(!journal.can_redo());
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        let mut journal = UndoJournal::new(3);
        for i in 0..5 {
            journal.push(applied_append(&mut model, &format!("{i}.mp4")));
        }
        assert_eq!(journal.undo_count(), 3);
    }

    #[test]
    fn test_macro_collects_into_batch() {
        let (mut model, _rx) = MultitrackModel::new();
        model.add_track(TrackKind::Video);
        let mut journal = UndoJournal::new(100);

        journal.begin_macro("Remove 2 from timeline");
        journal.push(applied_append(&mut model, "a.mp4"));
        journal.push(applied_append(&mut model, "b.mp4"));
        journal.end_macro();

        assert_eq!(journal.undo_count(), 1);
        assert!(matches!(
            journal.last(),
            Some(TimelineCommand::Batch { commands, .. }) if commands.len() == 2
        ));

        journal.undo(&mut model);
        assert_eq!(model.clip_count(0), 0);
    }

    #[test]
    fn test_empty_macro_records_nothing() {
        let mut journal = UndoJournal::new(100);
        journal.begin_macro("nothing");
        journal.end_macro();
        assert!(!journal.can_undo());
    }
}
