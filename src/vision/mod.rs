//! Vision Layer
//!
//! Runs four detection capabilities on a selected photo:
//! - Text recognition
//! - Rectangle detection
//! - Body pose estimation
//! - Barcode detection
//!
//! Detection itself is delegated to [`Detector`] implementations; this layer
//! builds the requests, normalizes the observations and tracks the
//! processing state of each cycle.

pub mod backends;
pub mod detector;
pub mod gateway;
pub mod models;
pub mod state;

pub use detector::{Capability, DetectionError, Detector, Detectors};
pub use gateway::{
    detect_barcodes, detect_rectangles, estimate_pose, recognize_text, GatewayError,
    VisionGateway,
};
pub use models::{
    DetectedBarcode, DetectedRectangle, DetectedText, JointName, NormalizedPoint, NormalizedRect,
    PoseJoint, PoseResult, Symbology,
};
pub use state::{CapabilityStatus, CapabilityStatuses, CycleId, ProcessingState, VisionSnapshot};
