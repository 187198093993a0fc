//! Classifier detections and the per-tick sample derived from them.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Class label assigned by the liveness classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// A live face.
    Real,
    /// A presentation attack (photo, screen, mask).
    Fake,
}

impl Label {
    /// Maps a classifier class index to a label.
    ///
    /// The model is trained with classes `["fake", "real"]`.
    pub fn from_class_index(index: usize) -> Result<Self, InvalidSample> {
        match index {
            0 => Ok(Label::Fake),
            1 => Ok(Label::Real),
            other => Err(InvalidSample::UnknownClass(other)),
        }
    }

    /// Lowercase class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Fake => "fake",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = InvalidSample;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(Label::Real),
            "fake" => Ok(Label::Fake),
            _ => Err(InvalidSample::UnknownLabel(s.to_string())),
        }
    }
}

/// Reasons a detection is rejected before reaching the state machine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidSample {
    /// Confidence is not finite or lies outside `(0, 1]`.
    #[error("confidence {0} outside (0, 1]")]
    ConfidenceOutOfRange(f64),
    /// Label text is neither `real` nor `fake`.
    #[error("unrecognized label: {0:?}")]
    UnknownLabel(String),
    /// Class index the model does not produce.
    #[error("unrecognized class index: {0}")]
    UnknownClass(usize),
}

/// Pixel bounding box of a detection, corner to corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge.
    pub x1: i32,
    /// Top edge.
    pub y1: i32,
    /// Right edge.
    pub x2: i32,
    /// Bottom edge.
    pub y2: i32,
}

impl Region {
    /// Horizontal extent in pixels.
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Vertical extent in pixels.
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// One box produced by the classifier for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Predicted class.
    pub label: Label,
    /// Raw classifier confidence.
    pub confidence: f64,
    /// Face box, when the source reports one.
    pub region: Option<Region>,
}

impl Detection {
    /// Creates a detection without a bounding box.
    pub fn new(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            region: None,
        }
    }

    /// Attaches a bounding box.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Confidence rounded up to two decimals, as reported by the
    /// classifier wrapper.
    pub fn quantized_confidence(&self) -> f64 {
        quantize_confidence(self.confidence)
    }
}

/// Rounds a confidence up to the next hundredth.
///
/// A tiny epsilon absorbs float noise so that e.g. `0.07` stays `0.07`
/// instead of climbing to `0.08`.
pub fn quantize_confidence(confidence: f64) -> f64 {
    ((confidence * 100.0) - 1e-9).ceil() / 100.0
}

/// The best qualifying detection of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSample {
    /// Predicted class.
    pub label: Label,
    /// Confidence, expected in `(0, 1]`.
    pub confidence: f64,
    /// When the frame was observed.
    pub observed_at: Timestamp,
}

impl DetectionSample {
    /// Creates a sample; call [`DetectionSample::validate`] before trusting it.
    pub fn new(label: Label, confidence: f64, observed_at: Timestamp) -> Self {
        Self {
            label,
            confidence,
            observed_at,
        }
    }

    /// Checks that the confidence lies in `(0, 1]`.
    pub fn validate(&self) -> Result<(), InvalidSample> {
        if self.confidence.is_finite() && self.confidence > 0.0 && self.confidence <= 1.0 {
            Ok(())
        } else {
            Err(InvalidSample::ConfidenceOutOfRange(self.confidence))
        }
    }

    /// True if the sample clears the confidence threshold (strictly).
    #[inline]
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// Picks the highest-confidence detection above `threshold`.
///
/// Confidences are quantized first; detections with invalid confidence
/// are skipped. Returns `None` when nothing qualifies.
pub fn select_best(
    detections: &[Detection],
    threshold: f64,
    now: Timestamp,
) -> Option<DetectionSample> {
    detections
        .iter()
        .map(|d| DetectionSample::new(d.label, d.quantized_confidence(), now))
        .filter(|s| s.validate().is_ok() && s.qualifies(threshold))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
