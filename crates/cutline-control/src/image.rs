//! Property controller for still-image and image-sequence sources.
//!
//! UI-free counterpart of the image source property panel: edits duration,
//! aspect ratio, repeat, sequence detection, and comments on an image
//! producer, rebuilding the producer when a change requires it. The
//! filesystem is reached only through the injected [`SequenceProbe`], so
//! sequence length counting is testable without touching disk.

use tracing::{debug, info};

use cutline_timeline::Producer;

/// Answers "does this sequence frame exist?" during length counting.
pub trait SequenceProbe {
    fn exists(&self, path: &str) -> bool;
}

/// Probes the real filesystem.
#[derive(Debug, Default)]
pub struct FsProbe;

impl SequenceProbe for FsProbe {
    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).exists()
    }
}

/// How an edit propagates.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageUpdate {
    /// The producer backs a timeline clip; commit it through the timeline
    /// controller's producer-changed channel.
    Changed(Producer),
    /// A standalone source; reopen it in the player.
    Reopened(Producer),
}

impl ImageUpdate {
    pub fn producer(&self) -> &Producer {
        match self {
            ImageUpdate::Changed(p) | ImageUpdate::Reopened(p) => p,
        }
    }
}

/// The trailing digit run of a file name, as a printf-style pattern.
#[derive(Debug, Clone, PartialEq)]
struct SequencePattern {
    stem: String,
    digits: usize,
    begin: i64,
    suffix: String,
}

impl SequencePattern {
    /// Find the last run of digits in a file name.
    fn detect(name: &str) -> Option<Self> {
        let chars: Vec<char> = name.chars().collect();
        let mut end = chars.len();
        while end > 0 && !chars[end - 1].is_ascii_digit() {
            end -= 1;
        }
        let mut start = end;
        while start > 0 && chars[start - 1].is_ascii_digit() {
            start -= 1;
        }
        if start == end {
            return None;
        }
        let run: String = chars[start..end].iter().collect();
        Some(Self {
            stem: chars[..start].iter().collect(),
            digits: end - start,
            begin: run.parse().ok()?,
            suffix: chars[end..].iter().collect(),
        })
    }

    fn printf_name(&self) -> String {
        format!("{}%0{}d{}", self.stem, self.digits, self.suffix)
    }

    fn file_name(&self, frame: i64) -> String {
        format!(
            "{}{:0width$}{}",
            self.stem,
            frame,
            self.suffix,
            width = self.digits
        )
    }
}

fn split_resource(resource: &str) -> (&str, &str) {
    match resource.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", resource),
    }
}

fn join_resource(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Controller for one image producer's editable properties.
pub struct ImageSourceController<P = FsProbe> {
    producer: Option<Producer>,
    default_duration: i64,
    probe: P,
    /// Called every 100 file probes so the embedder can keep its event
    /// queue responsive while a long sequence is counted.
    yield_fn: Option<Box<dyn FnMut()>>,
}

impl Default for ImageSourceController<FsProbe> {
    fn default() -> Self {
        Self::new(FsProbe)
    }
}

impl<P: SequenceProbe> ImageSourceController<P> {
    pub fn new(probe: P) -> Self {
        Self {
            producer: None,
            default_duration: -1,
            probe,
            yield_fn: None,
        }
    }

    pub fn on_yield(&mut self, yield_fn: impl FnMut() + 'static) {
        self.yield_fn = Some(Box::new(yield_fn));
    }

    /// Bind a producer to the panel. The first bound producer's length
    /// becomes the default duration restored when sequence mode turns off.
    pub fn set_producer(&mut self, mut producer: Producer) {
        if self.default_duration == -1 {
            self.default_duration = producer.length;
        }
        if producer.original_resource.is_none() {
            producer.ttl = 1;
        }
        self.producer = Some(producer);
    }

    pub fn producer(&self) -> Option<&Producer> {
        self.producer.as_ref()
    }

    pub fn default_duration(&self) -> i64 {
        self.default_duration
    }

    /// The resource to display: what the user opened, not the rewritten
    /// sequence pattern.
    pub fn display_resource(&self) -> Option<&str> {
        let p = self.producer.as_ref()?;
        Some(p.original_resource.as_deref().unwrap_or(&p.resource))
    }

    /// Duration honors the selected cut's effect window when one is set.
    pub fn duration(&self) -> i64 {
        match &self.producer {
            Some(p) if p.filter_out > 0 => p.filter_out - p.filter_in + 1,
            Some(p) => p.playtime(),
            None => 0,
        }
    }

    /// Rebuild the producer around the bound one, carrying its properties
    /// and filters over. Timeline-bound producers are handed back for the
    /// update command; standalone ones are adopted and reopened.
    fn rebuild(&mut self, duration: i64) -> Option<ImageUpdate> {
        let old = self.producer.clone()?;
        let mut p = Producer::image(old.resource.clone(), duration.max(1));
        p.speed = old.speed;
        p.ttl = old.ttl;
        p.begin = old.begin;
        p.is_sequence = old.is_sequence;
        p.original_resource = old.original_resource.clone();
        p.force_aspect_ratio = old.force_aspect_ratio;
        p.aspect_ratio = old.aspect_ratio;
        p.comment = old.comment.clone();
        p.filters = old.filters.clone();
        p.multitrack_item = old.multitrack_item;
        debug!(resource = %p.resource, duration, "rebuilt image producer");
        if old.multitrack_item.is_some() {
            Some(ImageUpdate::Changed(p))
        } else {
            self.producer = Some(p.clone());
            Some(ImageUpdate::Reopened(p))
        }
    }

    /// Change the playable duration. No-op when unchanged.
    pub fn set_duration(&mut self, frames: i64) -> Option<ImageUpdate> {
        let current = self.producer.as_ref()?.playtime();
        if frames == current || frames < 1 {
            return None;
        }
        self.rebuild(frames)
    }

    /// Force the sample aspect ratio.
    pub fn set_aspect_ratio(&mut self, numerator: i64, denominator: i64) -> Option<ImageUpdate> {
        if denominator == 0 || numerator <= 0 {
            return None;
        }
        let p = self.producer.as_mut()?;
        let new_sar = numerator as f64 / denominator as f64;
        let implicit = p
            .aspect_ratio
            .map_or(1.0, |(n, d)| n as f64 / d as f64);
        if p.force_aspect_ratio.is_some() || (new_sar - implicit).abs() > f64::EPSILON {
            p.force_aspect_ratio = Some(new_sar);
            p.aspect_ratio = Some((numerator, denominator));
        }
        if p.multitrack_item.is_some() {
            Some(ImageUpdate::Changed(p.clone()))
        } else {
            Some(ImageUpdate::Reopened(p.clone()))
        }
    }

    /// Change frames-per-image of a sequence; total length follows.
    pub fn set_repeat(&mut self, ttl: i64) -> Option<ImageUpdate> {
        let mut old = self.producer.clone()?;
        let images = if old.ttl > 0 {
            old.length / old.ttl
        } else {
            old.length
        };
        old.ttl = ttl.max(1);
        let duration = images * old.ttl;
        self.producer = Some(old);
        self.rebuild(duration)
    }

    /// Toggle image-sequence mode. Turning it on detects the trailing digit
    /// run of the file name, rewrites the resource to the printf-style
    /// pattern, and counts consecutive files to derive the length; turning
    /// it off restores the original resource and default duration.
    pub fn set_sequence(&mut self, checked: bool) -> Option<ImageUpdate> {
        let mut p = self.producer.clone()?;
        if checked && p.original_resource.is_none() {
            p.original_resource = Some(p.resource.clone());
        }
        p.is_sequence = checked;
        if p.ttl < 1 {
            p.ttl = 1;
        }

        let duration;
        if checked {
            let resource = p
                .original_resource
                .clone()
                .unwrap_or_else(|| p.resource.clone());
            let (dir, name) = split_resource(&resource);
            let Some(pattern) = SequencePattern::detect(name) else {
                // No digits in the name: nothing to sequence over.
                self.producer = Some(p);
                return None;
            };
            p.begin = pattern.begin;
            p.resource = join_resource(dir, &pattern.printf_name());

            info!(resource = %p.resource, begin = pattern.begin, "counting image sequence");
            let mut frame = pattern.begin;
            let mut probes: u64 = 0;
            while self
                .probe
                .exists(&join_resource(dir, &pattern.file_name(frame)))
            {
                frame += 1;
                probes += 1;
                if probes % 100 == 0 {
                    if let Some(yield_fn) = &mut self.yield_fn {
                        yield_fn();
                    }
                }
            }
            let images = frame - pattern.begin;
            duration = images * p.ttl;
            p.length = duration;
        } else {
            if let Some(original) = p.original_resource.clone() {
                p.resource = original;
            }
            duration = self.default_duration;
            p.length = duration;
        }
        self.producer = Some(p);
        self.rebuild(duration)
    }

    /// Rebuild from the original resource, dropping sequence rewriting.
    pub fn reset(&mut self) -> Option<ImageUpdate> {
        let mut p = self.producer.clone()?;
        if let Some(original) = p.original_resource.clone() {
            p.resource = original;
        }
        self.producer = Some(p);
        self.rebuild(self.default_duration)
    }

    /// Returns whether the comment actually changed.
    pub fn set_comment(&mut self, text: &str) -> bool {
        let Some(p) = self.producer.as_mut() else {
            return false;
        };
        if p.comment == text {
            return false;
        }
        p.comment = text.into();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    struct FakeProbe {
        files: HashSet<String>,
    }

    impl FakeProbe {
        fn range(stem: &str, digits: usize, suffix: &str, range: std::ops::Range<i64>) -> Self {
            let files = range
                .map(|i| format!("{stem}{i:0width$}{suffix}", width = digits))
                .collect();
            Self { files }
        }
    }

    impl SequenceProbe for FakeProbe {
        fn exists(&self, path: &str) -> bool {
            self.files.contains(path)
        }
    }

    fn still(resource: &str, length: i64) -> Producer {
        Producer::image(resource, length)
    }

    #[test]
    fn test_pattern_detection() {
        let p = SequencePattern::detect("shot_0007.png").unwrap();
        assert_eq!(p.stem, "shot_");
        assert_eq!(p.digits, 4);
        assert_eq!(p.begin, 7);
        assert_eq!(p.suffix, ".png");
        assert_eq!(p.printf_name(), "shot_%04d.png");
        assert_eq!(p.file_name(12), "shot_0012.png");
    }

    #[test]
    fn test_pattern_uses_last_digit_run() {
        let p = SequencePattern::detect("take2_frame010.jpg").unwrap();
        assert_eq!(p.stem, "take2_frame");
        assert_eq!(p.begin, 10);
    }

    #[test]
    fn test_pattern_requires_digits() {
        assert!(SequencePattern::detect("poster.png").is_none());
    }

    #[test]
    fn test_set_producer_defaults() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        panel.set_producer(still("shots/poster.png", 150));
        assert_eq!(panel.default_duration(), 150);
        assert_eq!(panel.producer().unwrap().ttl, 1);
        assert_eq!(panel.duration(), 150);
        assert_eq!(panel.display_resource(), Some("shots/poster.png"));
    }

    #[test]
    fn test_duration_honors_filter_window() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        let mut p = still("poster.png", 150);
        p.filter_in = 10;
        p.filter_out = 39;
        panel.set_producer(p);
        assert_eq!(panel.duration(), 30);
    }

    #[test]
    fn test_set_duration_rebuilds_standalone() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        panel.set_producer(still("poster.png", 150));
        assert!(panel.set_duration(150).is_none());

        match panel.set_duration(90) {
            Some(ImageUpdate::Reopened(p)) => assert_eq!(p.length, 90),
            other => panic!("expected reopen, got {other:?}"),
        }
        // The rebuilt producer was adopted.
        assert_eq!(panel.producer().unwrap().length, 90);
    }

    #[test]
    fn test_timeline_bound_edits_are_handed_back() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        let mut p = still("poster.png", 150);
        p.multitrack_item = Some((0, 2));
        panel.set_producer(p);

        match panel.set_duration(60) {
            Some(ImageUpdate::Changed(p)) => {
                assert_eq!(p.length, 60);
                assert_eq!(p.multitrack_item, Some((0, 2)));
            }
            other => panic!("expected changed, got {other:?}"),
        }
        // The panel's own producer is untouched until the commit round-trips.
        assert_eq!(panel.producer().unwrap().length, 150);
    }

    #[test]
    fn test_sequence_detection_counts_files() {
        let probe = FakeProbe::range("shots/img_", 4, ".png", 7..20);
        let mut panel = ImageSourceController::new(probe);
        panel.set_producer(still("shots/img_0007.png", 150));

        let update = panel.set_sequence(true).unwrap();
        let p = update.producer();
        assert_eq!(p.resource, "shots/img_%04d.png");
        assert_eq!(p.begin, 7);
        assert!(p.is_sequence);
        assert_eq!(p.length, 13); // 13 consecutive files, ttl 1
        assert_eq!(p.original_resource.as_deref(), Some("shots/img_0007.png"));
    }

    #[test]
    fn test_sequence_respects_ttl() {
        let probe = FakeProbe::range("img_", 3, ".png", 1..6);
        let mut panel = ImageSourceController::new(probe);
        let mut p = still("img_001.png", 150);
        p.original_resource = Some("img_001.png".into());
        p.ttl = 5;
        panel.set_producer(p);

        let update = panel.set_sequence(true).unwrap();
        assert_eq!(update.producer().length, 5 * 5);
    }

    #[test]
    fn test_sequence_off_restores_original() {
        let probe = FakeProbe::range("img_", 3, ".png", 1..6);
        let mut panel = ImageSourceController::new(probe);
        panel.set_producer(still("img_001.png", 150));
        panel.set_sequence(true).unwrap();

        let update = panel.set_sequence(false).unwrap();
        let p = update.producer();
        assert_eq!(p.resource, "img_001.png");
        assert!(!p.is_sequence);
        assert_eq!(p.length, 150);
    }

    #[test]
    fn test_sequence_without_digits_is_a_noop() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        panel.set_producer(still("poster.png", 150));
        assert!(panel.set_sequence(true).is_none());
    }

    #[test]
    fn test_yield_callback_fires_every_100_probes() {
        let probe = FakeProbe::range("f", 5, ".png", 0..250);
        let mut panel = ImageSourceController::new(probe);
        let yields = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&yields);
        panel.on_yield(move || *counter.borrow_mut() += 1);
        panel.set_producer(still("f00000.png", 150));

        panel.set_sequence(true).unwrap();
        assert_eq!(*yields.borrow(), 2); // 250 hits, yields at 100 and 200
    }

    #[test]
    fn test_set_repeat_scales_length() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        let mut p = still("img_%03d.png", 20);
        p.original_resource = Some("img_001.png".into());
        p.is_sequence = true;
        p.ttl = 2;
        panel.set_producer(p);

        match panel.set_repeat(4) {
            Some(ImageUpdate::Reopened(p)) => {
                assert_eq!(p.ttl, 4);
                assert_eq!(p.length, 40);
            }
            other => panic!("expected reopen, got {other:?}"),
        }
    }

    #[test]
    fn test_aspect_ratio_forces_sar() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        panel.set_producer(still("poster.png", 150));

        match panel.set_aspect_ratio(16, 9) {
            Some(ImageUpdate::Reopened(p)) => {
                assert_eq!(p.aspect_ratio, Some((16, 9)));
                assert!((p.force_aspect_ratio.unwrap() - 16.0 / 9.0).abs() < 1e-9);
            }
            other => panic!("expected reopen, got {other:?}"),
        }
        assert!(panel.set_aspect_ratio(16, 0).is_none());
    }

    #[test]
    fn test_aspect_ratio_on_timeline_clip_is_handed_back() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        let mut p = still("poster.png", 150);
        p.multitrack_item = Some((0, 1));
        panel.set_producer(p);

        assert!(matches!(
            panel.set_aspect_ratio(4, 3),
            Some(ImageUpdate::Changed(_))
        ));
    }

    #[test]
    fn test_comment_reports_changes_only() {
        let mut panel = ImageSourceController::new(FakeProbe {
            files: HashSet::new(),
        });
        panel.set_producer(still("poster.png", 150));
        assert!(panel.set_comment("hero frame"));
        assert!(!panel.set_comment("hero frame"));
        assert_eq!(panel.producer().unwrap().comment, "hero frame");
    }
}
