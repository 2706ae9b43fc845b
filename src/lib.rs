//! VisionLab - photo capture and on-device vision showcase
//!
//! Acquires a photo from the camera or photo library and runs four vision
//! capabilities on it: text recognition, rectangle detection, body pose
//! estimation and barcode detection.

pub mod acquisition;
pub mod annotate;
pub mod config;
pub mod session;
pub mod storage;
pub mod summary;
pub mod vision;
