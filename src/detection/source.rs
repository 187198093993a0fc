//! Detection source abstraction.
//!
//! The classifier and camera sit behind [`DetectionSource`]; the tick loop
//! only ever sees the detections of one frame at a time. A scripted
//! implementation replays a fixed scenario for demos and tests.

use super::sample::{Detection, Label, Region};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while pulling detections.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No more frames will be produced.
    #[error("detection source exhausted")]
    Exhausted,
    /// Camera or classifier failure.
    #[error("detection source failed: {0}")]
    Failed(String),
    /// A scenario segment could not be parsed.
    #[error("invalid scenario segment {segment:?}: {reason}")]
    Scenario {
        /// Segment text as given.
        segment: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Trait for per-frame detection producers.
///
/// One call corresponds to one camera frame run through the classifier.
/// An empty vector means no face was found in that frame.
pub trait DetectionSource {
    /// Returns all detections for the next frame.
    fn next_detections(&mut self) -> Result<Vec<Detection>, SourceError>;
}

/// What a scenario segment shows the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    /// A single face with a fixed label and confidence.
    Face {
        /// Label reported on every frame.
        label: Label,
        /// Confidence reported on every frame.
        confidence: f64,
    },
    /// No face in view.
    Empty,
}

/// A run of identical frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Content of each frame.
    pub kind: SegmentKind,
    /// Number of frames in the run.
    pub frames: u32,
}

impl Segment {
    /// A run of frames showing one face.
    pub fn face(label: Label, confidence: f64, frames: u32) -> Self {
        Self {
            kind: SegmentKind::Face { label, confidence },
            frames,
        }
    }

    /// A run of frames with no face.
    pub fn empty(frames: u32) -> Self {
        Self {
            kind: SegmentKind::Empty,
            frames,
        }
    }
}

impl FromStr for Segment {
    type Err = SourceError;

    /// Parses `label:confidence:frames` or `none:frames`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SourceError::Scenario {
            segment: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.trim().split(':').collect();

        match parts.as_slice() {
            [kind, frames] if kind.eq_ignore_ascii_case("none") => {
                let frames = frames
                    .parse()
                    .map_err(|_| invalid("frame count is not an integer"))?;
                Ok(Segment::empty(frames))
            }
            [label, confidence, frames] => {
                let label: Label = label.parse().map_err(|_| invalid("unknown label"))?;
                let confidence: f64 = confidence
                    .parse()
                    .map_err(|_| invalid("confidence is not a number"))?;
                let frames = frames
                    .parse()
                    .map_err(|_| invalid("frame count is not an integer"))?;
                Ok(Segment::face(label, confidence, frames))
            }
            _ => Err(invalid("expected label:confidence:frames or none:frames")),
        }
    }
}

/// Parses a comma-separated list of segments.
pub fn parse_scenario(scenario: &str) -> Result<Vec<Segment>, SourceError> {
    scenario
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Replays a fixed list of segments, frame by frame.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    segments: Vec<Segment>,
    segment_index: usize,
    frame_in_segment: u32,
    repeat: bool,
    frames_emitted: u64,
    region: Region,
}

impl ScriptedSource {
    /// Plays `segments` once, in order.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            segment_index: 0,
            frame_in_segment: 0,
            repeat: false,
            frames_emitted: 0,
            region: Region {
                x1: 100,
                y1: 180,
                x2: 260,
                y2: 400,
            },
        }
    }

    /// Parses a scenario string such as `real:0.9:300,none:60`.
    pub fn from_scenario(scenario: &str) -> Result<Self, SourceError> {
        Ok(Self::new(parse_scenario(scenario)?))
    }

    /// Loops the scenario forever instead of exhausting.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Number of frames produced so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Total frames in one pass of the scenario.
    pub fn total_frames(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.frames)).sum()
    }

    fn next_segment(&mut self) -> Option<Segment> {
        loop {
            if self.segment_index >= self.segments.len() {
                if !self.repeat || self.total_frames() == 0 {
                    return None;
                }
                self.segment_index = 0;
            }

            let segment = self.segments[self.segment_index];
            if self.frame_in_segment < segment.frames {
                self.frame_in_segment += 1;
                return Some(segment);
            }

            self.segment_index += 1;
            self.frame_in_segment = 0;
        }
    }
}

impl DetectionSource for ScriptedSource {
    fn next_detections(&mut self) -> Result<Vec<Detection>, SourceError> {
        let segment = self.next_segment().ok_or(SourceError::Exhausted)?;
        self.frames_emitted += 1;

        Ok(match segment.kind {
            SegmentKind::Face { label, confidence } => {
                vec![Detection::new(label, confidence).with_region(self.region)]
            }
            SegmentKind::Empty => Vec::new(),
        })
    }
}
