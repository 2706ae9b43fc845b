//! Placeholder for capabilities without a native backend

use image::DynamicImage;
use std::marker::PhantomData;

use crate::vision::detector::{Capability, DetectionError, Detector};

/// Detector that always reports [`DetectionError::Unsupported`]
pub struct UnsupportedDetector<R, O> {
    capability: Capability,
    _types: PhantomData<fn(&R) -> O>,
}

impl<R, O> UnsupportedDetector<R, O> {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            _types: PhantomData,
        }
    }
}

impl<R, O> Detector for UnsupportedDetector<R, O> {
    type Request = R;
    type Observation = O;

    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn detect(&self, _image: &DynamicImage, _request: &R) -> Result<Vec<O>, DetectionError> {
        Err(DetectionError::Unsupported {
            capability: self.capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::detector::{PoseObservation, PoseRequest};

    #[test]
    fn test_always_unsupported() {
        let detector = UnsupportedDetector::<PoseRequest, PoseObservation>::new(Capability::Pose);
        let err = detector
            .detect(&DynamicImage::new_rgb8(1, 1), &PoseRequest::default())
            .unwrap_err();
        assert_eq!(
            err,
            DetectionError::Unsupported {
                capability: Capability::Pose
            }
        );
    }
}
