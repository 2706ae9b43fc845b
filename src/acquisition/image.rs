//! Image handed from acquisition to the vision gateway

use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

use super::MediaSource;
use crate::vision::DetectionError;

/// A photo selected from the camera or the library
#[derive(Debug, Clone)]
pub struct SelectedImage {
    /// Encoded image bytes (PNG, JPEG, ...)
    data: Arc<[u8]>,
    /// Where the image came from
    pub source: MediaSource,
    /// Optional label, usually the file name
    pub label: Option<String>,
    /// When the image was acquired
    pub acquired_at: Instant,
}

impl SelectedImage {
    /// Wrap encoded image bytes
    pub fn new(data: impl Into<Arc<[u8]>>, source: MediaSource) -> Self {
        Self {
            data: data.into(),
            source,
            label: None,
            acquired_at: Instant::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Encoded bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode the image, failing with [`DetectionError::NoImageData`] when the
    /// bytes are empty, undecodable or describe a zero-sized image
    pub fn decode(&self) -> Result<DynamicImage, DetectionError> {
        if self.data.is_empty() {
            return Err(DetectionError::NoImageData);
        }
        let image =
            image::load_from_memory(&self.data).map_err(|_| DetectionError::NoImageData)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectionError::NoImageData);
        }
        Ok(image)
    }
}
