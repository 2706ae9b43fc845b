//! Result models
//!
//! Plain data records produced by the four detection capabilities. All
//! geometry is normalized to the source image: origin at the top-left corner,
//! extents in `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    /// Create a point, clamping both coordinates into `[0, 1]`
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Convert to pixel coordinates for an image of the given size
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (i32, i32) {
        (
            (self.x * image_width as f32).round() as i32,
            (self.y * image_height as f32).round() as i32,
        )
    }
}

/// Rectangle in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    /// Create a rectangle clamped to the unit square.
    ///
    /// Negative extents collapse to zero and the rectangle is cropped so
    /// that `x + width` and `y + height` never exceed 1.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        let x = clamp_unit(x);
        let y = clamp_unit(y);
        let width = clamp_unit(width).min(1.0 - x);
        let height = clamp_unit(height).min(1.0 - y);
        Self { x, y, width, height }
    }

    /// Build from a pixel rectangle of an image with the given dimensions
    pub fn from_pixels(
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self::default();
        }
        let iw = image_width as f32;
        let ih = image_height as f32;
        Self::new(
            left as f32 / iw,
            top as f32 / ih,
            width as f32 / iw,
            height as f32 / ih,
        )
    }

    /// Smallest rectangle enclosing a set of pixel points
    pub fn enclosing_pixels(points: &[(i32, i32)], image_width: u32, image_height: u32) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let min_x = points.iter().map(|p| p.0).min().unwrap_or(0);
        let min_y = points.iter().map(|p| p.1).min().unwrap_or(0);
        let max_x = points.iter().map(|p| p.0).max().unwrap_or(0);
        let max_y = points.iter().map(|p| p.1).max().unwrap_or(0);
        Self::from_pixels(min_x, min_y, max_x - min_x, max_y - min_y, image_width, image_height)
    }

    /// Re-clamp a rectangle that may have come from an untrusted backend
    pub fn clamped(&self) -> Self {
        Self::new(self.x, self.y, self.width, self.height)
    }

    /// Convert to a pixel rectangle `(left, top, width, height)`
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (i32, i32, u32, u32) {
        let iw = image_width as f32;
        let ih = image_height as f32;
        (
            (self.x * iw).round() as i32,
            (self.y * ih).round() as i32,
            (self.width * iw).round() as u32,
            (self.height * ih).round() as u32,
        )
    }

    /// Area as a fraction of the whole image
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether every coordinate lies in the unit square
    pub fn is_normalized(&self) -> bool {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        in_unit(self.x) && in_unit(self.y) && in_unit(self.width) && in_unit(self.height)
    }
}

/// Clamp a value into `[0, 1]`, mapping NaN to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A line of recognized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedText {
    /// Recognized string
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Where the text sits in the image
    pub bounding_box: NormalizedRect,
    /// Duration of the recognition call that produced this line
    pub processing_time: Duration,
}

/// A detected quadrilateral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRectangle {
    /// Axis-aligned bounds of the quadrilateral
    pub bounding_box: NormalizedRect,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Corners in order: top-left, top-right, bottom-right, bottom-left
    pub corners: [NormalizedPoint; 4],
}

/// Anatomical landmarks reported by the pose capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    /// Joints queried on every pose request, in reporting order
    pub const QUERIED: [JointName; 17] = [
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            JointName::Nose => "Nose",
            JointName::LeftEye => "Left Eye",
            JointName::RightEye => "Right Eye",
            JointName::LeftEar => "Left Ear",
            JointName::RightEar => "Right Ear",
            JointName::Neck => "Neck",
            JointName::LeftShoulder => "Left Shoulder",
            JointName::RightShoulder => "Right Shoulder",
            JointName::LeftElbow => "Left Elbow",
            JointName::RightElbow => "Right Elbow",
            JointName::LeftWrist => "Left Wrist",
            JointName::RightWrist => "Right Wrist",
            JointName::Root => "Root",
            JointName::LeftHip => "Left Hip",
            JointName::RightHip => "Right Hip",
            JointName::LeftKnee => "Left Knee",
            JointName::RightKnee => "Right Knee",
            JointName::LeftAnkle => "Left Ankle",
            JointName::RightAnkle => "Right Ankle",
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single located joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseJoint {
    pub name: JointName,
    pub location: NormalizedPoint,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// Joints of the most prominent body in the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseResult {
    /// Located joints in [`JointName::QUERIED`] order
    pub joints: Vec<PoseJoint>,
    /// Time from request construction to result delivery
    pub processing_time: Duration,
}

impl PoseResult {
    /// Look up a joint by name
    pub fn joint(&self, name: JointName) -> Option<&PoseJoint> {
        self.joints.iter().find(|j| j.name == name)
    }
}

/// Barcode encoding standard
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Qr,
    Aztec,
    DataMatrix,
    Pdf417,
    Ean8,
    Ean13,
    UpcE,
    Code39,
    Code93,
    Code128,
    Itf14,
    Other(String),
}

impl Symbology {
    /// Human readable label
    pub fn label(&self) -> &str {
        match self {
            Symbology::Qr => "QR",
            Symbology::Aztec => "Aztec",
            Symbology::DataMatrix => "Data Matrix",
            Symbology::Pdf417 => "PDF417",
            Symbology::Ean8 => "EAN-8",
            Symbology::Ean13 => "EAN-13",
            Symbology::UpcE => "UPC-E",
            Symbology::Code39 => "Code 39",
            Symbology::Code93 => "Code 93",
            Symbology::Code128 => "Code 128",
            Symbology::Itf14 => "ITF-14",
            Symbology::Other(label) => label,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedBarcode {
    /// Decoded payload, never empty
    pub payload: String,
    pub symbology: Symbology,
    pub bounding_box: NormalizedRect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_clamps_into_unit_square() {
        let rect = NormalizedRect::new(-0.2, 0.5, 1.5, -0.1);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.5);
        assert_eq!(rect.width, 1.0);
        assert_eq!(rect.height, 0.0);
        assert!(rect.is_normalized());
    }

    #[test]
    fn test_rect_cropped_at_far_edge() {
        let rect = NormalizedRect::new(0.8, 0.9, 0.5, 0.5);
        assert!((rect.width - 0.2).abs() < 1e-6);
        assert!((rect.height - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rect_nan_becomes_zero() {
        let rect = NormalizedRect::new(f32::NAN, 0.1, 0.2, f32::NAN);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.height, 0.0);
    }

    #[test]
    fn test_rect_from_pixels() {
        let rect = NormalizedRect::from_pixels(100, 200, 300, 100, 1000, 1000);
        assert!((rect.x - 0.1).abs() < 0.001);
        assert!((rect.y - 0.2).abs() < 0.001);
        assert!((rect.width - 0.3).abs() < 0.001);
        assert!((rect.height - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_rect_from_pixels_zero_sized_image() {
        let rect = NormalizedRect::from_pixels(10, 10, 10, 10, 0, 100);
        assert_eq!(rect, NormalizedRect::default());
    }

    #[test]
    fn test_rect_enclosing_points() {
        let rect = NormalizedRect::enclosing_pixels(&[(10, 40), (50, 20), (30, 60)], 100, 100);
        assert!((rect.x - 0.1).abs() < 0.001);
        assert!((rect.y - 0.2).abs() < 0.001);
        assert!((rect.width - 0.4).abs() < 0.001);
        assert!((rect.height - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_rect_to_pixels() {
        let rect = NormalizedRect::new(0.1, 0.2, 0.2, 0.2);
        assert_eq!(rect.to_pixels(1000, 500), (100, 100, 200, 100));
    }

    #[test]
    fn test_queried_joints_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for joint in JointName::QUERIED {
            assert!(seen.insert(joint), "duplicate joint {}", joint);
        }
        assert_eq!(seen.len(), 17);
        assert!(!seen.contains(&JointName::Neck));
        assert!(!seen.contains(&JointName::Root));
    }

    #[test]
    fn test_symbology_labels() {
        assert_eq!(Symbology::Qr.label(), "QR");
        assert_eq!(Symbology::Ean13.to_string(), "EAN-13");
        assert_eq!(Symbology::Other("MicroQR".to_string()).label(), "MicroQR");
    }
}
