//! Vision gateway
//!
//! Dispatches one request per capability for every processed image. The four
//! capabilities run independently on the blocking worker pool; each result is
//! normalized and handed to the state aggregator, which is the only place the
//! shared state is mutated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::detector::{
    BarcodeDetector, BarcodeRequest, Capability, DetectionError, Detectors, PoseDetector,
    PoseRequest, RectangleDetector, RectangleRequest, TextDetector, TextRequest,
};
use super::models::{
    clamp_unit, DetectedBarcode, DetectedRectangle, DetectedText, JointName, NormalizedPoint,
    NormalizedRect, PoseJoint, PoseResult,
};
use super::state::{CapabilityOutput, Command, CycleId, StateAggregator, VisionSnapshot};
use crate::acquisition::SelectedImage;

/// Gateway failures unrelated to a single capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("vision state aggregator is no longer running")]
    Closed,
}

/// Entry point for running the four capabilities on an image
pub struct VisionGateway {
    detectors: Detectors,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<VisionSnapshot>,
    next_cycle: AtomicU64,
}

impl VisionGateway {
    /// Create a gateway and spawn its state aggregator on the current runtime
    pub fn spawn(detectors: Detectors) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(VisionSnapshot::default());
        tokio::spawn(StateAggregator::new(publisher).run(command_rx));

        for (capability, backend) in detectors.names() {
            debug!("Vision backend for {}: {}", capability, backend);
        }

        Self {
            detectors,
            commands,
            snapshots,
            next_cycle: AtomicU64::new(0),
        }
    }

    /// Start a new cycle and dispatch all four capabilities.
    ///
    /// Resolves once the cycle is registered; detections keep running in the
    /// background and report through [`VisionGateway::subscribe`].
    pub async fn process(&self, image: &SelectedImage) -> Result<CycleId, GatewayError> {
        let cycle = self.next_cycle.fetch_add(1, Ordering::Relaxed) + 1;

        let (ack, registered) = oneshot::channel();
        self.commands
            .send(Command::Begin { cycle, ack })
            .map_err(|_| GatewayError::Closed)?;
        registered.await.map_err(|_| GatewayError::Closed)?;

        let text = self.detectors.text.clone();
        self.dispatch(cycle, Capability::Text, image, move |img| {
            recognize_text(text.as_ref(), img).map(CapabilityOutput::Text)
        });

        let rectangles = self.detectors.rectangles.clone();
        self.dispatch(cycle, Capability::Rectangles, image, move |img| {
            detect_rectangles(rectangles.as_ref(), img).map(CapabilityOutput::Rectangles)
        });

        let pose = self.detectors.pose.clone();
        self.dispatch(cycle, Capability::Pose, image, move |img| {
            estimate_pose(pose.as_ref(), img).map(CapabilityOutput::Pose)
        });

        let barcodes = self.detectors.barcodes.clone();
        self.dispatch(cycle, Capability::Barcodes, image, move |img| {
            detect_barcodes(barcodes.as_ref(), img).map(CapabilityOutput::Barcodes)
        });

        Ok(cycle)
    }

    /// Clear all results and return to idle.
    ///
    /// Results still in flight from earlier cycles are discarded when they
    /// arrive.
    pub async fn reset_results(&self) -> Result<(), GatewayError> {
        let (ack, applied) = oneshot::channel();
        self.commands
            .send(Command::Reset { ack })
            .map_err(|_| GatewayError::Closed)?;
        applied.await.map_err(|_| GatewayError::Closed)
    }

    /// Latest published state
    pub fn snapshot(&self) -> VisionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Observe every published state
    pub fn subscribe(&self) -> watch::Receiver<VisionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until the current cycle has no capability left in flight
    pub async fn wait_until_settled(&self) -> Result<VisionSnapshot, GatewayError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.state.is_processing())
            .await
            .map_err(|_| GatewayError::Closed)?;
        Ok(snapshot.clone())
    }

    fn dispatch<F>(&self, cycle: CycleId, capability: Capability, image: &SelectedImage, run: F)
    where
        F: FnOnce(&SelectedImage) -> Result<CapabilityOutput, DetectionError> + Send + 'static,
    {
        let commands = self.commands.clone();
        let image = image.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = run(&image);
            if let Err(e) = &outcome {
                warn!("{} detection failed in cycle {}: {}", capability, cycle, e);
            }
            if commands
                .send(Command::Complete {
                    cycle,
                    capability,
                    outcome,
                })
                .is_err()
            {
                debug!("Dropping {} result, aggregator has stopped", capability);
            }
        });
    }
}

/// Recognize text lines, best candidate per line
pub fn recognize_text(
    detector: &TextDetector,
    image: &SelectedImage,
) -> Result<Vec<DetectedText>, DetectionError> {
    let decoded = image.decode()?;
    let started = Instant::now();
    let request = TextRequest::default();
    let observations = detector.detect(&decoded, &request)?;
    let processing_time = started.elapsed();

    let texts: Vec<DetectedText> = observations
        .into_iter()
        .filter_map(|observation| {
            let best = observation.top_candidate()?;
            Some(DetectedText {
                text: best.text.clone(),
                confidence: clamp_unit(best.confidence),
                bounding_box: observation.bounding_box.clamped(),
                processing_time,
            })
        })
        .collect();

    debug!(
        "Text recognition ({}) found {} lines in {:?}",
        detector.name(),
        texts.len(),
        processing_time
    );
    Ok(texts)
}

/// Detect rectangles, most confident first, capped at the request maximum
pub fn detect_rectangles(
    detector: &RectangleDetector,
    image: &SelectedImage,
) -> Result<Vec<DetectedRectangle>, DetectionError> {
    let decoded = image.decode()?;
    let request = RectangleRequest::default();
    let observations = detector.detect(&decoded, &request)?;

    let mut rectangles: Vec<DetectedRectangle> = observations
        .into_iter()
        .map(|observation| {
            let corners = observation.corners.map(|c| NormalizedPoint::new(c.x, c.y));
            DetectedRectangle {
                bounding_box: bounds_of(&corners),
                confidence: clamp_unit(observation.confidence),
                corners,
            }
        })
        .collect();
    rectangles.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    rectangles.truncate(request.maximum_observations);

    debug!(
        "Rectangle detection ({}) found {} rectangles",
        detector.name(),
        rectangles.len()
    );
    Ok(rectangles)
}

/// Estimate the pose of the most prominent body.
///
/// Only joints from the request are reported, in request order; joints the
/// backend did not locate are left out.
pub fn estimate_pose(
    detector: &PoseDetector,
    image: &SelectedImage,
) -> Result<Option<PoseResult>, DetectionError> {
    let decoded = image.decode()?;
    let started = Instant::now();
    let request = PoseRequest::default();
    let observations = detector.detect(&decoded, &request)?;
    let processing_time = started.elapsed();

    let Some(body) = observations.into_iter().next() else {
        debug!("Pose estimation ({}) found no body", detector.name());
        return Ok(None);
    };

    let joints: Vec<PoseJoint> = request
        .joints
        .iter()
        .take(JointName::QUERIED.len())
        .filter_map(|name| {
            body.joints.iter().find(|j| j.name == *name).map(|j| PoseJoint {
                name: *name,
                location: NormalizedPoint::new(j.location.x, j.location.y),
                confidence: clamp_unit(j.confidence),
            })
        })
        .collect();

    debug!(
        "Pose estimation ({}) located {} joints in {:?}",
        detector.name(),
        joints.len(),
        processing_time
    );
    Ok(Some(PoseResult {
        joints,
        processing_time,
    }))
}

/// Detect barcodes, keeping only symbols with a decoded payload
pub fn detect_barcodes(
    detector: &BarcodeDetector,
    image: &SelectedImage,
) -> Result<Vec<DetectedBarcode>, DetectionError> {
    let decoded = image.decode()?;
    let request = BarcodeRequest::default();
    let observations = detector.detect(&decoded, &request)?;

    let barcodes: Vec<DetectedBarcode> = observations
        .into_iter()
        .filter(|observation| request.allows(&observation.symbology))
        .filter_map(|observation| {
            let payload = observation.payload.filter(|p| !p.is_empty())?;
            Some(DetectedBarcode {
                payload,
                symbology: observation.symbology,
                bounding_box: observation.bounding_box.clamped(),
            })
        })
        .collect();

    debug!(
        "Barcode detection ({}) decoded {} symbols",
        detector.name(),
        barcodes.len()
    );
    Ok(barcodes)
}

fn bounds_of(corners: &[NormalizedPoint; 4]) -> NormalizedRect {
    let min_x = corners.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let min_y = corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max);
    let max_y = corners.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max);
    NormalizedRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
