//! Classifier output and detection sources.
//!
//! This module turns whatever the classifier reports for a frame into at
//! most one [`DetectionSample`] per tick. The classifier itself, and the
//! camera feeding it, are external; they are reached only through the
//! [`DetectionSource`] trait.

mod sample;
mod source;

pub use sample::{
    quantize_confidence, select_best, Detection, DetectionSample, InvalidSample, Label, Region,
};
pub use source::{parse_scenario, DetectionSource, ScriptedSource, Segment, SegmentKind, SourceError};
