//! Selection state: which clips, track head, or multitrack the user has
//! selected.

use smallvec::SmallVec;

/// Identifies a clip slot within a track's ordered item list.
///
/// Not stable across insert/remove; the controller reconciles coordinates
/// when the model reports row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipCoordinate {
    pub track: usize,
    pub clip: usize,
}

impl ClipCoordinate {
    pub fn new(track: usize, clip: usize) -> Self {
        Self { track, clip }
    }
}

/// The selected clip coordinates in click order.
pub type ClipList = SmallVec<[ClipCoordinate; 8]>;

/// The current selection. Exactly one of {empty, clip set, track head,
/// multitrack} is active: a multitrack selection has no clips and no
/// track, a track-head selection has no clips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected clips, insertion order = click order.
    pub clips: ClipList,
    /// A whole-track selection, when one is active.
    pub track: Option<usize>,
    pub multitrack: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty() && self.track.is_none() && !self.multitrack
    }

    /// The first-clicked clip; operations on "the" selected clip target
    /// this one.
    pub fn first(&self) -> Option<ClipCoordinate> {
        self.clips.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_empty_states() {
        assert!(Selection::default().is_empty());

        let clips = Selection {
            clips: smallvec![ClipCoordinate::new(0, 1)],
            ..Default::default()
        };
        assert!(!clips.is_empty());

        let track_head = Selection {
            track: Some(2),
            ..Default::default()
        };
        assert!(!track_head.is_empty());

        let multitrack = Selection {
            multitrack: true,
            ..Default::default()
        };
        assert!(!multitrack.is_empty());
    }

    #[test]
    fn test_first_is_click_order() {
        let selection = Selection {
            clips: smallvec![ClipCoordinate::new(0, 5), ClipCoordinate::new(0, 1)],
            ..Default::default()
        };
        assert_eq!(selection.first(), Some(ClipCoordinate::new(0, 5)));
    }
}
