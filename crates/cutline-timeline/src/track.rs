//! Track types for the multitrack model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::Clip;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// An item in a track's playlist: a clip, a blank, or a transition.
///
/// Transitions are addressable by item index just like clips; a blank is a
/// placeholder occupying a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackItem {
    Clip(Clip),
    Blank { length: i64 },
    Transition { length: i64 },
}

impl TrackItem {
    /// Length of this item on the timeline.
    pub fn length(&self) -> i64 {
        match self {
            TrackItem::Clip(clip) => clip.length(),
            TrackItem::Blank { length } => *length,
            TrackItem::Transition { length } => *length,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, TrackItem::Blank { .. })
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, TrackItem::Transition { .. })
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            TrackItem::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut Clip> {
        match self {
            TrackItem::Clip(clip) => Some(clip),
            _ => None,
        }
    }
}

/// A track: a playlist of items plus its head controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub name: String,
    pub kind: TrackKind,
    pub items: Vec<TrackItem>,
    pub mute: bool,
    pub hidden: bool,
    pub lock: bool,
    pub composite: bool,
}

impl Track {
    /// Create a new video track.
    pub fn new_video(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: TrackKind::Video,
            items: Vec::new(),
            mute: false,
            hidden: false,
            lock: false,
            composite: true,
        }
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: TrackKind::Audio,
            items: Vec::new(),
            mute: false,
            hidden: false,
            lock: false,
            composite: false,
        }
    }

    /// Total length of this track in frames.
    pub fn length(&self) -> i64 {
        self.items.iter().map(TrackItem::length).sum()
    }

    /// Timeline start of the item at the given index.
    pub fn item_start(&self, index: usize) -> i64 {
        self.items[..index.min(self.items.len())]
            .iter()
            .map(TrackItem::length)
            .sum()
    }

    /// Index of the item covering the given position, if any.
    pub fn index_at(&self, position: i64) -> Option<usize> {
        if position < 0 {
            return None;
        }
        let mut start = 0;
        for (i, item) in self.items.iter().enumerate() {
            let end = start + item.length();
            if position >= start && position < end {
                return Some(i);
            }
            start = end;
        }
        None
    }

    /// The clip at the given index, if that item is a clip.
    pub fn clip_at(&self, index: usize) -> Option<&Clip> {
        self.items.get(index).and_then(TrackItem::as_clip)
    }

    pub fn clip_at_mut(&mut self, index: usize) -> Option<&mut Clip> {
        self.items.get_mut(index).and_then(TrackItem::as_clip_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Producer;

    fn clip(len: i64) -> TrackItem {
        TrackItem::Clip(Clip::new(Producer::avformat("t.mp4", len, 0)))
    }

    #[test]
    fn test_track_length_and_starts() {
        let mut track = Track::new_video("V1");
        track.items.push(clip(10));
        track.items.push(TrackItem::Blank { length: 5 });
        track.items.push(clip(20));

        assert_eq!(track.length(), 35);
        assert_eq!(track.item_start(0), 0);
        assert_eq!(track.item_start(1), 10);
        assert_eq!(track.item_start(2), 15);
    }

    #[test]
    fn test_index_at_boundaries() {
        let mut track = Track::new_video("V1");
        track.items.push(clip(10));
        track.items.push(clip(10));

        assert_eq!(track.index_at(0), Some(0));
        assert_eq!(track.index_at(9), Some(0));
        assert_eq!(track.index_at(10), Some(1));
        assert_eq!(track.index_at(19), Some(1));
        assert_eq!(track.index_at(20), None);
        assert_eq!(track.index_at(-1), None);
    }

    #[test]
    fn test_clip_at_skips_blanks() {
        let mut track = Track::new_video("V1");
        track.items.push(TrackItem::Blank { length: 5 });
        track.items.push(clip(10));

        assert!(track.clip_at(0).is_none());
        assert!(track.clip_at(1).is_some());
    }
}
