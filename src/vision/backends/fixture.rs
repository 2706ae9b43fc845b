//! Recorded-observation backends
//!
//! [`StaticDetector`] answers every request with the same observations (or
//! the same error). A [`FixtureSet`] loads one per capability from a JSON
//! recording so the whole pipeline can be replayed without native backends.

use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Deserialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::vision::detector::{
    BarcodeObservation, BarcodeRequest, DetectionError, Detector, Detectors, PoseObservation,
    PoseRequest, RectangleObservation, RectangleRequest, TextObservation, TextRequest,
};

/// Detector returning a fixed outcome
pub struct StaticDetector<R, O> {
    name: &'static str,
    outcome: Result<Vec<O>, DetectionError>,
    _request: PhantomData<fn(&R)>,
}

impl<R, O> StaticDetector<R, O> {
    /// Always return these observations
    pub fn new(observations: Vec<O>) -> Self {
        Self {
            name: "static",
            outcome: Ok(observations),
            _request: PhantomData,
        }
    }

    /// Always fail with this message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            name: "static",
            outcome: Err(DetectionError::failed(message)),
            _request: PhantomData,
        }
    }

    fn from_recording(observations: Vec<O>, error: Option<String>) -> Self {
        let detector = match error {
            Some(message) => Self::failing(message),
            None => Self::new(observations),
        };
        detector.named("fixture")
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<R, O> Detector for StaticDetector<R, O>
where
    O: Clone + Send + Sync,
{
    type Request = R;
    type Observation = O;

    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&self, _image: &DynamicImage, _request: &R) -> Result<Vec<O>, DetectionError> {
        self.outcome.clone()
    }
}

/// Per-capability failure messages in a recording
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureErrors {
    pub text: Option<String>,
    pub rectangles: Option<String>,
    pub pose: Option<String>,
    pub barcodes: Option<String>,
}

/// Recorded observations for all four capabilities
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureSet {
    pub text: Vec<TextObservation>,
    pub rectangles: Vec<RectangleObservation>,
    pub pose: Vec<PoseObservation>,
    pub barcodes: Vec<BarcodeObservation>,
    pub errors: FixtureErrors,
}

impl FixtureSet {
    /// Parse a recording from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a recording from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {:?}", path))?;
        let fixtures = Self::from_json(&content)
            .with_context(|| format!("Failed to parse fixture file: {:?}", path))?;
        info!(
            "Loaded fixtures from {:?}: {} text, {} rectangles, {} bodies, {} barcodes",
            path,
            fixtures.text.len(),
            fixtures.rectangles.len(),
            fixtures.pose.len(),
            fixtures.barcodes.len()
        );
        Ok(fixtures)
    }

    /// Turn the recording into one detector per capability
    pub fn into_detectors(self) -> Detectors {
        let errors = self.errors;
        Detectors {
            text: Arc::new(StaticDetector::<TextRequest, _>::from_recording(
                self.text,
                errors.text,
            )),
            rectangles: Arc::new(StaticDetector::<RectangleRequest, _>::from_recording(
                self.rectangles,
                errors.rectangles,
            )),
            pose: Arc::new(StaticDetector::<PoseRequest, _>::from_recording(
                self.pose,
                errors.pose,
            )),
            barcodes: Arc::new(StaticDetector::<BarcodeRequest, _>::from_recording(
                self.barcodes,
                errors.barcodes,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::models::{JointName, Symbology};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORDING: &str = r#"{
        "text": [
            { "candidates": [{ "text": "EXIT", "confidence": 0.93 }],
              "bounding_box": { "x": 0.1, "y": 0.1, "width": 0.3, "height": 0.1 } }
        ],
        "pose": [
            { "joints": [
                { "name": "nose", "location": { "x": 0.5, "y": 0.2 }, "confidence": 0.9 },
                { "name": "left_wrist", "location": { "x": 0.3, "y": 0.6 }, "confidence": 0.7 }
            ] }
        ],
        "barcodes": [
            { "payload": "4006381333931", "symbology": "ean13",
              "bounding_box": { "x": 0.6, "y": 0.6, "width": 0.2, "height": 0.1 } }
        ],
        "errors": { "rectangles": "camera too blurry" }
    }"#;

    fn blank() -> DynamicImage {
        DynamicImage::new_rgba8(2, 2)
    }

    #[test]
    fn test_parse_recording() {
        let fixtures = FixtureSet::from_json(RECORDING).unwrap();
        assert_eq!(fixtures.text.len(), 1);
        assert!(fixtures.rectangles.is_empty());
        assert_eq!(fixtures.pose[0].joints[1].name, JointName::LeftWrist);
        assert_eq!(fixtures.barcodes[0].symbology, Symbology::Ean13);
        assert_eq!(fixtures.errors.rectangles.as_deref(), Some("camera too blurry"));
    }

    #[test]
    fn test_recording_becomes_detectors() {
        let detectors = FixtureSet::from_json(RECORDING).unwrap().into_detectors();
        let text = detectors
            .text
            .detect(&blank(), &TextRequest::default())
            .unwrap();
        assert_eq!(text[0].candidates[0].text, "EXIT");

        let err = detectors
            .rectangles
            .detect(&blank(), &RectangleRequest::default())
            .unwrap_err();
        assert_eq!(err, DetectionError::failed("camera too blurry"));
        assert_eq!(detectors.pose.name(), "fixture");
    }

    #[test]
    fn test_empty_recording_is_valid() {
        let fixtures = FixtureSet::from_json("{}").unwrap();
        assert!(fixtures.text.is_empty());
        assert!(fixtures.errors.pose.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", RECORDING).unwrap();
        let fixtures = FixtureSet::load(file.path()).unwrap();
        assert_eq!(fixtures.barcodes[0].payload.as_deref(), Some("4006381333931"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        assert!(FixtureSet::load(file.path()).is_err());
    }
}
