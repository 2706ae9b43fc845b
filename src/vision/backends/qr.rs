//! QR code detection using rqrr

use image::DynamicImage;
use rqrr::PreparedImage;
use tracing::debug;

use crate::vision::detector::{BarcodeObservation, BarcodeRequest, DetectionError, Detector};
use crate::vision::models::{NormalizedRect, Symbology};

/// QR-only barcode detector
#[derive(Debug)]
pub struct QrBarcodeDetector {
    /// Downsample images whose longer side exceeds this (0 = never)
    max_dimension: u32,
}

impl QrBarcodeDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: 2048,
        }
    }
}

impl Default for QrBarcodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for QrBarcodeDetector {
    type Request = BarcodeRequest;
    type Observation = BarcodeObservation;

    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn detect(
        &self,
        image: &DynamicImage,
        request: &BarcodeRequest,
    ) -> Result<Vec<BarcodeObservation>, DetectionError> {
        if !request.allows(&Symbology::Qr) {
            return Ok(vec![]);
        }

        let (orig_w, orig_h) = (image.width(), image.height());
        let downsample = if self.max_dimension > 0 && orig_w.max(orig_h) > self.max_dimension {
            orig_w.max(orig_h) as f32 / self.max_dimension as f32
        } else {
            1.0
        };

        let gray = if downsample > 1.0 {
            image
                .resize(
                    (orig_w as f32 / downsample) as u32,
                    (orig_h as f32 / downsample) as u32,
                    image::imageops::FilterType::Nearest,
                )
                .to_luma8()
        } else {
            image.to_luma8()
        };
        let (gray_w, gray_h) = gray.dimensions();

        let mut prepared = PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        debug!("rqrr located {} candidate grids", grids.len());

        Ok(grids
            .into_iter()
            .map(|grid| {
                let corners: Vec<(i32, i32)> = grid.bounds.iter().map(|p| (p.x, p.y)).collect();
                let payload = match grid.decode() {
                    Ok((_, content)) => Some(content),
                    Err(e) => {
                        debug!("QR grid located but not decoded: {:?}", e);
                        None
                    }
                };
                BarcodeObservation {
                    payload,
                    symbology: Symbology::Qr,
                    bounding_box: NormalizedRect::enclosing_pixels(&corners, gray_w, gray_h),
                }
            })
            .collect())
    }
}
