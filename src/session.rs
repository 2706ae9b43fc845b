//! Vision Session
//!
//! Ties media acquisition and the vision gateway together for the
//! presentation layer. Everything the presentation layer reads is exposed
//! as snapshots; it never mutates detection results directly.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::acquisition::{
    AcquisitionError, MediaAcquisition, MediaProvider, MediaSource, SelectedImage,
};
use crate::config::AppConfig;
use crate::vision::{CycleId, Detectors, GatewayError, VisionGateway, VisionSnapshot};

/// User-facing alert raised by a failed acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    fn from_acquisition(error: &AcquisitionError) -> Self {
        let title = match error {
            AcquisitionError::PermissionDenied { .. } => "Permission Required".to_string(),
            AcquisitionError::Unavailable { .. } => "Source Unavailable".to_string(),
            AcquisitionError::Io(_) => "Could Not Load Image".to_string(),
        };
        Self {
            title,
            message: format!("{}. {}", error, error.remediation()),
        }
    }
}

/// Session failures
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("no image has been selected")]
    NoImageSelected,
}

/// Orchestrates acquisition and processing for one user
pub struct VisionSession {
    acquisition: MediaAcquisition,
    gateway: VisionGateway,
    alert: RwLock<Option<Alert>>,
    config: RwLock<AppConfig>,
}

impl VisionSession {
    /// Create a session; must be called inside a tokio runtime
    pub fn new(config: AppConfig, provider: Arc<dyn MediaProvider>, detectors: Detectors) -> Self {
        Self {
            acquisition: MediaAcquisition::new(provider),
            gateway: VisionGateway::spawn(detectors),
            alert: RwLock::new(None),
            config: RwLock::new(config),
        }
    }

    /// Acquire a photo and process it.
    ///
    /// Previous results are cleared before the new image is dispatched.
    /// Returns `Ok(None)` when the picker was cancelled; acquisition
    /// failures also raise an [`Alert`].
    pub async fn select_image(&self, source: MediaSource) -> Result<Option<CycleId>, SessionError> {
        let image = match self.acquisition.request_image(source).await {
            Ok(Some(image)) => image,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Image acquisition from {} failed: {}", source, e);
                *self.alert.write() = Some(Alert::from_acquisition(&e));
                return Err(e.into());
            }
        };

        self.run(&image).await.map(Some)
    }

    /// Process the current image again
    pub async fn process_current(&self) -> Result<CycleId, SessionError> {
        let image = self
            .acquisition
            .current_image()
            .ok_or(SessionError::NoImageSelected)?;
        self.run(&image).await
    }

    async fn run(&self, image: &SelectedImage) -> Result<CycleId, SessionError> {
        self.gateway.reset_results().await?;
        let cycle = self.gateway.process(image).await?;
        info!(
            "Processing {} (cycle {})",
            image.label.as_deref().unwrap_or("image"),
            cycle
        );
        Ok(cycle)
    }

    /// Clear all results and return to idle
    pub async fn reset_results(&self) -> Result<(), SessionError> {
        self.gateway.reset_results().await?;
        Ok(())
    }

    /// Latest published state
    pub fn snapshot(&self) -> VisionSnapshot {
        self.gateway.snapshot()
    }

    /// Observe every published state
    pub fn subscribe(&self) -> watch::Receiver<VisionSnapshot> {
        self.gateway.subscribe()
    }

    /// Wait for the current cycle to finish
    pub async fn wait_until_settled(&self) -> Result<VisionSnapshot, SessionError> {
        Ok(self.gateway.wait_until_settled().await?)
    }

    /// The image the current results belong to
    pub fn current_image(&self) -> Option<SelectedImage> {
        self.acquisition.current_image()
    }

    /// Pending alert, if any
    pub fn alert(&self) -> Option<Alert> {
        self.alert.read().clone()
    }

    pub fn dismiss_alert(&self) {
        *self.alert.write() = None;
    }

    pub fn has_completed_onboarding(&self) -> bool {
        self.config.read().general.has_completed_onboarding
    }

    /// Mark onboarding as done; returns true if the flag changed
    pub fn complete_onboarding(&self) -> bool {
        let mut config = self.config.write();
        if config.general.has_completed_onboarding {
            return false;
        }
        config.general.has_completed_onboarding = true;
        info!("Onboarding completed");
        true
    }

    /// Current configuration, including the onboarding flag
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }
}
