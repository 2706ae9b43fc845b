//! Detector implementations
//!
//! - Tesseract for text (requires a system installation)
//! - Contour analysis for rectangles
//! - rqrr for QR codes
//! - Recorded fixtures for any capability
//!
//! Body pose has no native backend; it reports the capability as unsupported
//! unless a fixture provides observations.

pub mod contours;
pub mod fixture;
pub mod qr;
pub mod tesseract;
pub mod unsupported;

#[cfg(test)]
pub(crate) mod testing;

pub use contours::ContourRectangleDetector;
pub use fixture::{FixtureSet, StaticDetector};
pub use qr::QrBarcodeDetector;
pub use tesseract::TesseractTextDetector;
pub use unsupported::UnsupportedDetector;

use std::sync::Arc;

use super::detector::{Capability, Detectors, PoseObservation, PoseRequest};

/// Native detectors for this platform
pub fn native_detectors(text_language: &str) -> Detectors {
    Detectors {
        text: Arc::new(TesseractTextDetector::new(text_language)),
        rectangles: Arc::new(ContourRectangleDetector::new()),
        pose: Arc::new(UnsupportedDetector::<PoseRequest, PoseObservation>::new(
            Capability::Pose,
        )),
        barcodes: Arc::new(QrBarcodeDetector::new()),
    }
}
