//! Summary statistics shown next to each result list

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::vision::{
    DetectedBarcode, DetectedRectangle, DetectedText, JointName, PoseResult, VisionSnapshot,
};

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Text recognition statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub line_count: usize,
    pub character_count: usize,
    pub average_confidence: f32,
    pub processing_time: Option<Duration>,
}

impl TextSummary {
    pub fn from_results(texts: &[DetectedText]) -> Self {
        Self {
            line_count: texts.len(),
            character_count: texts.iter().map(|t| t.text.chars().count()).sum(),
            average_confidence: mean(texts.iter().map(|t| t.confidence)),
            processing_time: texts.first().map(|t| t.processing_time),
        }
    }
}

/// Rectangle detection statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectangleSummary {
    pub count: usize,
    pub average_confidence: f32,
    /// Largest rectangle as a fraction of the image area
    pub largest_area: f32,
}

impl RectangleSummary {
    pub fn from_results(rectangles: &[DetectedRectangle]) -> Self {
        Self {
            count: rectangles.len(),
            average_confidence: mean(rectangles.iter().map(|r| r.confidence)),
            largest_area: rectangles
                .iter()
                .map(|r| r.bounding_box.area())
                .fold(0.0, f32::max),
        }
    }
}

/// Pose estimation statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseSummary {
    pub body_detected: bool,
    pub joint_count: usize,
    pub average_confidence: f32,
    /// Queried joints the backend did not locate
    pub missing_joints: Vec<JointName>,
    pub processing_time: Option<Duration>,
}

impl PoseSummary {
    pub fn from_result(pose: Option<&PoseResult>) -> Self {
        match pose {
            Some(pose) => Self {
                body_detected: true,
                joint_count: pose.joints.len(),
                average_confidence: mean(pose.joints.iter().map(|j| j.confidence)),
                missing_joints: JointName::QUERIED
                    .iter()
                    .filter(|name| pose.joint(**name).is_none())
                    .copied()
                    .collect(),
                processing_time: Some(pose.processing_time),
            },
            None => Self {
                body_detected: false,
                joint_count: 0,
                average_confidence: 0.0,
                missing_joints: Vec::new(),
                processing_time: None,
            },
        }
    }
}

/// Barcode detection statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarcodeSummary {
    pub count: usize,
    /// Number of codes per symbology label
    pub by_symbology: BTreeMap<String, usize>,
}

impl BarcodeSummary {
    pub fn from_results(barcodes: &[DetectedBarcode]) -> Self {
        let mut by_symbology = BTreeMap::new();
        for barcode in barcodes {
            *by_symbology
                .entry(barcode.symbology.label().to_string())
                .or_insert(0) += 1;
        }
        Self {
            count: barcodes.len(),
            by_symbology,
        }
    }
}

/// Statistics for all four capabilities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionSummary {
    pub text: TextSummary,
    pub rectangles: RectangleSummary,
    pub pose: PoseSummary,
    pub barcodes: BarcodeSummary,
}

impl VisionSummary {
    pub fn from_snapshot(snapshot: &VisionSnapshot) -> Self {
        Self {
            text: TextSummary::from_results(&snapshot.texts),
            rectangles: RectangleSummary::from_results(&snapshot.rectangles),
            pose: PoseSummary::from_result(snapshot.pose.as_ref()),
            barcodes: BarcodeSummary::from_results(&snapshot.barcodes),
        }
    }
}
