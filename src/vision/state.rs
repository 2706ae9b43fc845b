//! Processing state aggregation
//!
//! A single task owns the detection results and the processing state. The
//! gateway and the detection workers talk to it through [`Command`]
//! messages, and observers see immutable [`VisionSnapshot`]s through a
//! `watch` channel.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use super::detector::{Capability, DetectionError};
use super::models::{DetectedBarcode, DetectedRectangle, DetectedText, PoseResult};

/// Identifier of one process → display cycle
pub type CycleId = u64;

/// Coarse state of the current cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing,
    Completed,
    Error(String),
}

impl ProcessingState {
    pub fn is_processing(&self) -> bool {
        matches!(self, ProcessingState::Processing)
    }
}

/// Outcome of one capability within the current cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum CapabilityStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

/// Per-capability status table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CapabilityStatuses {
    pub text: CapabilityStatus,
    pub rectangles: CapabilityStatus,
    pub pose: CapabilityStatus,
    pub barcodes: CapabilityStatus,
}

impl CapabilityStatuses {
    pub fn get(&self, capability: Capability) -> &CapabilityStatus {
        match capability {
            Capability::Text => &self.text,
            Capability::Rectangles => &self.rectangles,
            Capability::Pose => &self.pose,
            Capability::Barcodes => &self.barcodes,
        }
    }

    fn set(&mut self, capability: Capability, status: CapabilityStatus) {
        let slot = match capability {
            Capability::Text => &mut self.text,
            Capability::Rectangles => &mut self.rectangles,
            Capability::Pose => &mut self.pose,
            Capability::Barcodes => &mut self.barcodes,
        };
        *slot = status;
    }

    fn set_all(&mut self, status: CapabilityStatus) {
        for capability in Capability::ALL {
            self.set(capability, status.clone());
        }
    }

    /// Overall state derived from the four outcomes.
    ///
    /// `Completed` needs all four to succeed; `Error` is reported once every
    /// capability has finished and at least one failed.
    fn aggregate(&self) -> ProcessingState {
        let all = Capability::ALL.map(|c| (c, self.get(c)));

        if all.iter().all(|(_, s)| **s == CapabilityStatus::Idle) {
            return ProcessingState::Idle;
        }
        if all
            .iter()
            .any(|(_, s)| matches!(s, CapabilityStatus::Pending | CapabilityStatus::Idle))
        {
            return ProcessingState::Processing;
        }

        let failures: Vec<String> = all
            .iter()
            .filter_map(|(c, s)| match s {
                CapabilityStatus::Failed(message) => Some(format!("{}: {}", c, message)),
                _ => None,
            })
            .collect();

        if failures.is_empty() {
            ProcessingState::Completed
        } else {
            ProcessingState::Error(failures.join("; "))
        }
    }
}

/// Read-only view of the detection results and state
#[derive(Debug, Clone, Default, Serialize)]
pub struct VisionSnapshot {
    pub state: ProcessingState,
    pub statuses: CapabilityStatuses,
    /// Cycle the results belong to; `None` after a reset
    pub cycle: Option<CycleId>,
    pub texts: Vec<DetectedText>,
    pub rectangles: Vec<DetectedRectangle>,
    pub pose: Option<PoseResult>,
    pub barcodes: Vec<DetectedBarcode>,
}

impl VisionSnapshot {
    /// True when no results are held and the state is idle
    pub fn is_cleared(&self) -> bool {
        self.state == ProcessingState::Idle
            && self.texts.is_empty()
            && self.rectangles.is_empty()
            && self.pose.is_none()
            && self.barcodes.is_empty()
    }
}

/// Typed result of one capability
#[derive(Debug, Clone)]
pub enum CapabilityOutput {
    Text(Vec<DetectedText>),
    Rectangles(Vec<DetectedRectangle>),
    Pose(Option<PoseResult>),
    Barcodes(Vec<DetectedBarcode>),
}

impl CapabilityOutput {
    /// Empty result for a capability, stored when it fails
    pub fn empty(capability: Capability) -> Self {
        match capability {
            Capability::Text => CapabilityOutput::Text(Vec::new()),
            Capability::Rectangles => CapabilityOutput::Rectangles(Vec::new()),
            Capability::Pose => CapabilityOutput::Pose(None),
            Capability::Barcodes => CapabilityOutput::Barcodes(Vec::new()),
        }
    }
}

/// Messages accepted by the aggregator
#[derive(Debug)]
pub(crate) enum Command {
    /// Start a new cycle
    Begin {
        cycle: CycleId,
        ack: oneshot::Sender<()>,
    },
    /// A capability finished
    Complete {
        cycle: CycleId,
        capability: Capability,
        outcome: Result<CapabilityOutput, DetectionError>,
    },
    /// Clear results and go idle
    Reset { ack: oneshot::Sender<()> },
}

/// Sole owner and writer of the vision state
pub(crate) struct StateAggregator {
    snapshot: VisionSnapshot,
    active_cycle: Option<CycleId>,
    /// Highest cycle ever begun; never lowered by a reset
    latest_cycle: CycleId,
    publisher: watch::Sender<VisionSnapshot>,
}

impl StateAggregator {
    pub(crate) fn new(publisher: watch::Sender<VisionSnapshot>) -> Self {
        Self {
            snapshot: VisionSnapshot::default(),
            active_cycle: None,
            latest_cycle: 0,
            publisher,
        }
    }

    /// Drain commands until every sender is gone
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        debug!("Vision state aggregator stopped");
    }

    pub(crate) fn apply(&mut self, command: Command) {
        match command {
            Command::Begin { cycle, ack } => {
                if cycle <= self.latest_cycle {
                    debug!(
                        "Ignoring begin of cycle {}, cycle {} already started",
                        cycle, self.latest_cycle
                    );
                    let _ = ack.send(());
                    return;
                }
                info!("Starting vision cycle {}", cycle);
                self.latest_cycle = cycle;
                self.active_cycle = Some(cycle);
                self.snapshot.cycle = Some(cycle);
                self.snapshot.statuses.set_all(CapabilityStatus::Pending);
                self.publish();
                let _ = ack.send(());
            }
            Command::Complete {
                cycle,
                capability,
                outcome,
            } => {
                if self.active_cycle != Some(cycle) {
                    debug!(
                        "Discarding {} result from stale cycle {} (active: {:?})",
                        capability, cycle, self.active_cycle
                    );
                    return;
                }

                let (output, status) = match outcome {
                    Ok(output) => (output, CapabilityStatus::Succeeded),
                    Err(e) => (
                        CapabilityOutput::empty(capability),
                        CapabilityStatus::Failed(e.to_string()),
                    ),
                };
                self.store(output);
                self.snapshot.statuses.set(capability, status);
                self.publish();
            }
            Command::Reset { ack } => {
                debug!("Resetting vision results");
                self.active_cycle = None;
                self.snapshot = VisionSnapshot::default();
                self.publish();
                let _ = ack.send(());
            }
        }
    }

    fn store(&mut self, output: CapabilityOutput) {
        match output {
            CapabilityOutput::Text(texts) => self.snapshot.texts = texts,
            CapabilityOutput::Rectangles(rectangles) => self.snapshot.rectangles = rectangles,
            CapabilityOutput::Pose(pose) => self.snapshot.pose = pose,
            CapabilityOutput::Barcodes(barcodes) => self.snapshot.barcodes = barcodes,
        }
    }

    fn publish(&mut self) {
        self.snapshot.state = self.snapshot.statuses.aggregate();
        self.publisher.send_replace(self.snapshot.clone());
    }

    #[cfg(test)]
    fn snapshot(&self) -> &VisionSnapshot {
        &self.snapshot
    }
}
