//! Detection capability interface
//!
//! Every capability (text, rectangles, pose, barcodes) is served by an
//! implementation of [`Detector`]. The gateway owns one implementation per
//! capability and never looks behind the trait, so native backends, recorded
//! fixtures and test doubles are interchangeable.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::models::{JointName, NormalizedPoint, NormalizedRect, Symbology};

/// One of the four detection routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Text,
    Rectangles,
    Pose,
    Barcodes,
}

impl Capability {
    /// All capabilities in dispatch order
    pub const ALL: [Capability; 4] = [
        Capability::Text,
        Capability::Rectangles,
        Capability::Pose,
        Capability::Barcodes,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Text => "text",
            Capability::Rectangles => "rectangles",
            Capability::Pose => "pose",
            Capability::Barcodes => "barcodes",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a single capability call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    /// The image is missing or cannot be decoded
    #[error("image data could not be decoded")]
    NoImageData,
    /// The backend reported an error
    #[error("{message}")]
    Failed { message: String },
    /// No backend is available for this capability
    #[error("{capability} detection is not available on this platform")]
    Unsupported { capability: Capability },
}

impl DetectionError {
    pub fn failed(message: impl Into<String>) -> Self {
        DetectionError::Failed {
            message: message.into(),
        }
    }
}

/// Text recognition speed/accuracy trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionLevel {
    Fast,
    #[default]
    Accurate,
}

/// Parameters of a text recognition request
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub recognition_level: RecognitionLevel,
    /// Apply the language model to correct recognized words
    pub uses_language_correction: bool,
}

impl Default for TextRequest {
    fn default() -> Self {
        Self {
            recognition_level: RecognitionLevel::Accurate,
            uses_language_correction: true,
        }
    }
}

/// Parameters of a rectangle detection request
#[derive(Debug, Clone, PartialEq)]
pub struct RectangleRequest {
    /// Smallest accepted width / height ratio
    pub minimum_aspect_ratio: f32,
    /// Largest accepted width / height ratio
    pub maximum_aspect_ratio: f32,
    /// Minimum size relative to the smaller image dimension
    pub minimum_size: f32,
    /// Maximum number of rectangles reported
    pub maximum_observations: usize,
}

impl Default for RectangleRequest {
    fn default() -> Self {
        Self {
            minimum_aspect_ratio: 0.3,
            maximum_aspect_ratio: 3.0,
            minimum_size: 0.1,
            maximum_observations: 10,
        }
    }
}

impl RectangleRequest {
    /// Whether a candidate of the given pixel size passes the size and
    /// aspect-ratio limits
    pub fn accepts(&self, width: f32, height: f32, image_width: u32, image_height: u32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let aspect = width / height;
        if aspect < self.minimum_aspect_ratio || aspect > self.maximum_aspect_ratio {
            return false;
        }
        let smallest_dimension = image_width.min(image_height) as f32;
        width.min(height) >= self.minimum_size * smallest_dimension
    }
}

/// Parameters of a body pose request
#[derive(Debug, Clone, PartialEq)]
pub struct PoseRequest {
    /// Joints to report, in order
    pub joints: Vec<JointName>,
}

impl Default for PoseRequest {
    fn default() -> Self {
        Self {
            joints: JointName::QUERIED.to_vec(),
        }
    }
}

/// Parameters of a barcode request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarcodeRequest {
    /// Restrict to these symbologies; `None` keeps everything decoded
    pub symbologies: Option<Vec<Symbology>>,
}

impl BarcodeRequest {
    pub fn allows(&self, symbology: &Symbology) -> bool {
        match &self.symbologies {
            Some(allowed) => allowed.contains(symbology),
            None => true,
        }
    }
}

/// One recognition hypothesis for a text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCandidate {
    pub text: String,
    pub confidence: f32,
}

/// Raw text region reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    /// Hypotheses, best first
    pub candidates: Vec<TextCandidate>,
    pub bounding_box: NormalizedRect,
}

impl TextObservation {
    /// Best hypothesis, if any
    pub fn top_candidate(&self) -> Option<&TextCandidate> {
        self.candidates.first()
    }
}

/// Raw quadrilateral reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleObservation {
    /// top-left, top-right, bottom-right, bottom-left
    pub corners: [NormalizedPoint; 4],
    pub confidence: f32,
}

/// Raw joint reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedJoint {
    pub name: JointName,
    pub location: NormalizedPoint,
    pub confidence: f32,
}

/// Raw body reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    pub joints: Vec<RecognizedJoint>,
}

/// Raw barcode reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeObservation {
    /// Decoded payload; `None` when the symbol was located but not decoded
    pub payload: Option<String>,
    pub symbology: Symbology,
    pub bounding_box: NormalizedRect,
}

/// A detection capability implementation.
///
/// `detect` runs on a blocking worker thread and may take as long as it
/// needs; there is no cancellation.
pub trait Detector: Send + Sync {
    type Request;
    type Observation;

    /// Backend identifier used in logs
    fn name(&self) -> &'static str;

    /// Run the capability on a decoded image
    fn detect(
        &self,
        image: &DynamicImage,
        request: &Self::Request,
    ) -> Result<Vec<Self::Observation>, DetectionError>;
}

pub type TextDetector = dyn Detector<Request = TextRequest, Observation = TextObservation>;
pub type RectangleDetector =
    dyn Detector<Request = RectangleRequest, Observation = RectangleObservation>;
pub type PoseDetector = dyn Detector<Request = PoseRequest, Observation = PoseObservation>;
pub type BarcodeDetector = dyn Detector<Request = BarcodeRequest, Observation = BarcodeObservation>;

/// One implementation per capability
#[derive(Clone)]
pub struct Detectors {
    pub text: Arc<TextDetector>,
    pub rectangles: Arc<RectangleDetector>,
    pub pose: Arc<PoseDetector>,
    pub barcodes: Arc<BarcodeDetector>,
}

impl Detectors {
    /// Backend names keyed by capability, for diagnostics
    pub fn names(&self) -> [(Capability, &'static str); 4] {
        [
            (Capability::Text, self.text.name()),
            (Capability::Rectangles, self.rectangles.name()),
            (Capability::Pose, self.pose.name()),
            (Capability::Barcodes, self.barcodes.name()),
        ]
    }
}

impl fmt::Debug for Detectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detectors")
            .field("text", &self.text.name())
            .field("rectangles", &self.rectangles.name())
            .field("pose", &self.pose.name())
            .field("barcodes", &self.barcodes.name())
            .finish()
    }
}
