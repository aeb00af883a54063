//! Producer and clip types for the multitrack model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Kind of service backing a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    /// Demuxed audio/video media.
    Avformat,
    /// A still image or an image sequence.
    Image,
    /// A solid color generator.
    Color,
}

/// A filter attached to a producer.
///
/// Loader filters are implicit normalizers; speed rescaling leaves their
/// windows alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub service: String,
    pub frame_in: i64,
    pub frame_out: i64,
    pub loader: bool,
}

impl Filter {
    pub fn new(service: impl Into<String>, frame_in: i64, frame_out: i64) -> Self {
        Self {
            service: service.into(),
            frame_in,
            frame_out,
            loader: false,
        }
    }
}

/// A media source instance together with the properties the controllers
/// read and write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: Uuid,
    pub service: Service,
    pub resource: String,
    /// Total source length in frames.
    pub length: i64,
    pub seekable: bool,
    /// Audio stream index, -1 when the source carries no audio.
    pub audio_index: i32,
    /// Playback speed, 1.0 = normal. A retimed source scales its windows.
    pub speed: f64,
    pub filters: Vec<Filter>,

    // Still image / image sequence properties.
    /// Frames per image when playing a sequence.
    pub ttl: i64,
    /// First frame number of a detected sequence.
    pub begin: i64,
    pub is_sequence: bool,
    /// The resource as it was before sequence detection rewrote it.
    pub original_resource: Option<String>,
    pub force_aspect_ratio: Option<f64>,
    pub aspect_ratio: Option<(i64, i64)>,
    pub comment: String,

    // Selection side channel: the window time-based effects should see
    // for the currently selected cut, and where that cut begins on its
    // track. Widened by adjacent transitions when the clip is emitted as
    // the current selection.
    pub filter_in: i64,
    pub filter_out: i64,
    pub playlist_start: i64,
    /// Set on emitted producers that represent a timeline item.
    pub multitrack_item: Option<(usize, usize)>,
}

impl Producer {
    pub fn new(service: Service, resource: impl Into<String>, length: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            resource: resource.into(),
            length,
            seekable: true,
            audio_index: -1,
            speed: 1.0,
            filters: Vec::new(),
            ttl: 0,
            begin: 0,
            is_sequence: false,
            original_resource: None,
            force_aspect_ratio: None,
            aspect_ratio: None,
            comment: String::new(),
            filter_in: 0,
            filter_out: 0,
            playlist_start: 0,
            multitrack_item: None,
        }
    }

    /// An audio/video media source.
    pub fn avformat(resource: impl Into<String>, length: i64, audio_index: i32) -> Self {
        let mut p = Self::new(Service::Avformat, resource, length);
        p.audio_index = audio_index;
        p
    }

    /// A still-image source.
    pub fn image(resource: impl Into<String>, length: i64) -> Self {
        Self::new(Service::Image, resource, length)
    }

    /// Frames this producer plays at its current length.
    pub fn playtime(&self) -> i64 {
        self.length
    }
}

/// A clip on a track: a producer with a source window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub producer: Producer,
    /// Source in point.
    pub frame_in: i64,
    /// Source out point (inclusive).
    pub frame_out: i64,
    /// Fade-in duration in frames.
    pub fade_in: i64,
    /// Fade-out duration in frames.
    pub fade_out: i64,
}

impl Clip {
    /// Create a clip covering the whole producer.
    pub fn new(producer: Producer) -> Self {
        let frame_out = producer.length - 1;
        Self {
            producer,
            frame_in: 0,
            frame_out,
            fade_in: 0,
            fade_out: 0,
        }
    }

    /// Create a clip with an explicit source window.
    pub fn with_range(producer: Producer, frame_in: i64, frame_out: i64) -> Self {
        Self {
            producer,
            frame_in,
            frame_out,
            fade_in: 0,
            fade_out: 0,
        }
    }

    /// Length of the clip on the timeline.
    pub fn length(&self) -> i64 {
        self.frame_out - self.frame_in + 1
    }

    /// Serialize the clip, producer included, into a payload string.
    ///
    /// Payload strings travel through commands, the copy buffer, and
    /// detached-audio copies.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a clip from a payload string.
    pub fn from_payload(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_length() {
        let clip = Clip::with_range(Producer::avformat("a.mp4", 100, 0), 10, 39);
        assert_eq!(clip.length(), 30);
    }

    #[test]
    fn test_payload_roundtrip() {
        let mut clip = Clip::new(Producer::image("still.png", 150));
        clip.producer.comment = "hero frame".into();
        clip.fade_in = 12;

        let payload = clip.to_payload().unwrap();
        let restored = Clip::from_payload(&payload).unwrap();
        assert_eq!(restored, clip);
    }

    #[test]
    fn test_from_payload_rejects_garbage() {
        assert!(Clip::from_payload("not json").is_err());
    }
}
