//! Media Acquisition Layer
//!
//! Obtains a photo from the camera or the photo library. Each source is gated
//! by its own permission; an undetermined permission is prompted for once,
//! a denied one is reported to the user and never retried automatically.

pub mod filesystem;
pub mod image;

pub use filesystem::FileSystemProvider;
pub use self::image::SelectedImage;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a photo comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Camera,
    Library,
}

impl MediaSource {
    /// Permission required to use this source
    pub fn permission(&self) -> PermissionKind {
        match self {
            MediaSource::Camera => PermissionKind::Camera,
            MediaSource::Library => PermissionKind::PhotoLibrary,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaSource::Camera => "Camera",
            MediaSource::Library => "Photo library",
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Independently granted permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera,
    PhotoLibrary,
}

impl PermissionKind {
    pub fn name(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "Camera",
            PermissionKind::PhotoLibrary => "Photo library",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authorization state of one permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

/// Result of presenting a picker
#[derive(Debug, Clone)]
pub enum PickerOutcome {
    Selected(SelectedImage),
    Cancelled,
}

/// Acquisition failures shown to the user
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("{kind} access was denied")]
    PermissionDenied { kind: PermissionKind },
    #[error("{media} is not available on this device")]
    Unavailable { media: MediaSource },
    #[error("failed to load image: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// Static remediation hint for the alert
    pub fn remediation(&self) -> &'static str {
        match self {
            AcquisitionError::PermissionDenied {
                kind: PermissionKind::Camera,
            } => "Camera access is required to take photos. Enable it in Settings to continue.",
            AcquisitionError::PermissionDenied {
                kind: PermissionKind::PhotoLibrary,
            } => "Photo library access is required to select images. Enable it in Settings to continue.",
            AcquisitionError::Unavailable { .. } => {
                "Choose a photo from the library instead."
            }
            AcquisitionError::Io(_) => "Try selecting a different image.",
        }
    }
}

/// Platform camera / photo library collaborator
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Current authorization without prompting
    fn authorization_status(&self, kind: PermissionKind) -> PermissionStatus;

    /// Show the platform permission prompt
    async fn request_permission(&self, kind: PermissionKind) -> PermissionStatus;

    /// Whether the device has this source at all
    fn is_source_available(&self, source: MediaSource) -> bool;

    /// Present the picker for a source
    async fn present_picker(&self, source: MediaSource) -> Result<PickerOutcome, AcquisitionError>;
}

/// Permission-checked access to the camera and photo library
pub struct MediaAcquisition {
    provider: Arc<dyn MediaProvider>,
    /// Permissions already prompted for
    prompted: Mutex<HashSet<PermissionKind>>,
    /// Most recently selected image
    current: RwLock<Option<SelectedImage>>,
}

impl MediaAcquisition {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            prompted: Mutex::new(HashSet::new()),
            current: RwLock::new(None),
        }
    }

    /// Make sure a permission is granted, prompting at most once
    pub async fn ensure_permission(&self, kind: PermissionKind) -> Result<(), AcquisitionError> {
        match self.provider.authorization_status(kind) {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Denied => Err(AcquisitionError::PermissionDenied { kind }),
            PermissionStatus::Undetermined => {
                let first_prompt = self.prompted.lock().insert(kind);
                if !first_prompt {
                    warn!("{} permission still undetermined after prompt", kind);
                    return Err(AcquisitionError::PermissionDenied { kind });
                }

                info!("Requesting {} permission", kind);
                match self.provider.request_permission(kind).await {
                    PermissionStatus::Granted => {
                        info!("{} permission granted", kind);
                        Ok(())
                    }
                    status => {
                        warn!("{} permission not granted: {:?}", kind, status);
                        Err(AcquisitionError::PermissionDenied { kind })
                    }
                }
            }
        }
    }

    /// Obtain an image from a source.
    ///
    /// Returns `Ok(None)` when the user cancels the picker. A selected image
    /// replaces the current one but does not touch processing results.
    pub async fn request_image(
        &self,
        source: MediaSource,
    ) -> Result<Option<SelectedImage>, AcquisitionError> {
        if !self.provider.is_source_available(source) {
            warn!("{} source is unavailable", source);
            return Err(AcquisitionError::Unavailable { media: source });
        }

        self.ensure_permission(source.permission()).await?;

        match self.provider.present_picker(source).await? {
            PickerOutcome::Selected(image) => {
                info!(
                    "Selected image from {}: {}",
                    source,
                    image.label.as_deref().unwrap_or("unnamed")
                );
                *self.current.write() = Some(image.clone());
                Ok(Some(image))
            }
            PickerOutcome::Cancelled => {
                info!("{} picker cancelled", source);
                Ok(None)
            }
        }
    }

    /// The currently selected image, if any
    pub fn current_image(&self) -> Option<SelectedImage> {
        self.current.read().clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted provider recording how it was called
    pub struct ScriptedProvider {
        pub statuses: Mutex<HashMap<PermissionKind, PermissionStatus>>,
        pub prompt_answer: PermissionStatus,
        pub prompts: Mutex<Vec<PermissionKind>>,
        pub pickers: Mutex<Vec<MediaSource>>,
        pub camera_available: bool,
        pub outcome: Mutex<Option<PickerOutcome>>,
    }

    impl ScriptedProvider {
        pub fn new(prompt_answer: PermissionStatus) -> Self {
            Self {
                statuses: Mutex::new(HashMap::new()),
                prompt_answer,
                prompts: Mutex::new(Vec::new()),
                pickers: Mutex::new(Vec::new()),
                camera_available: true,
                outcome: Mutex::new(None),
            }
        }

        pub fn with_status(self, kind: PermissionKind, status: PermissionStatus) -> Self {
            self.statuses.lock().insert(kind, status);
            self
        }

        pub fn selecting(self, image: SelectedImage) -> Self {
            *self.outcome.lock() = Some(PickerOutcome::Selected(image));
            self
        }
    }

    #[async_trait]
    impl MediaProvider for ScriptedProvider {
        fn authorization_status(&self, kind: PermissionKind) -> PermissionStatus {
            self.statuses.lock().get(&kind).copied().unwrap_or_default()
        }

        async fn request_permission(&self, kind: PermissionKind) -> PermissionStatus {
            self.prompts.lock().push(kind);
            self.statuses.lock().insert(kind, self.prompt_answer);
            self.prompt_answer
        }

        fn is_source_available(&self, source: MediaSource) -> bool {
            source == MediaSource::Library || self.camera_available
        }

        async fn present_picker(
            &self,
            source: MediaSource,
        ) -> Result<PickerOutcome, AcquisitionError> {
            self.pickers.lock().push(source);
            Ok(self
                .outcome
                .lock()
                .clone()
                .unwrap_or(PickerOutcome::Cancelled))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedProvider;
    use super::*;

    fn image() -> SelectedImage {
        SelectedImage::new(vec![1u8, 2, 3], MediaSource::Library).with_label("photo.png")
    }

    #[tokio::test]
    async fn test_granted_permission_opens_picker() {
        let provider = Arc::new(
            ScriptedProvider::new(PermissionStatus::Denied)
                .with_status(PermissionKind::PhotoLibrary, PermissionStatus::Granted)
                .selecting(image()),
        );
        let acquisition = MediaAcquisition::new(provider.clone());

        let selected = acquisition.request_image(MediaSource::Library).await.unwrap();
        assert_eq!(selected.unwrap().label.as_deref(), Some("photo.png"));
        assert!(provider.prompts.lock().is_empty());
        assert!(acquisition.current_image().is_some());
    }

    #[tokio::test]
    async fn test_undetermined_prompts_once_then_proceeds() {
        let provider = Arc::new(ScriptedProvider::new(PermissionStatus::Granted).selecting(image()));
        let acquisition = MediaAcquisition::new(provider.clone());

        acquisition.request_image(MediaSource::Camera).await.unwrap();
        acquisition.request_image(MediaSource::Camera).await.unwrap();

        assert_eq!(*provider.prompts.lock(), vec![PermissionKind::Camera]);
        assert_eq!(provider.pickers.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_denied_never_opens_picker() {
        let provider = Arc::new(ScriptedProvider::new(PermissionStatus::Denied).selecting(image()));
        let acquisition = MediaAcquisition::new(provider.clone());

        let err = acquisition
            .request_image(MediaSource::Library)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::PermissionDenied {
                kind: PermissionKind::PhotoLibrary
            }
        ));
        assert!(provider.pickers.lock().is_empty());
        assert!(acquisition.current_image().is_none());
    }

    #[tokio::test]
    async fn test_undetermined_after_prompt_is_not_prompted_again() {
        let provider = Arc::new(ScriptedProvider::new(PermissionStatus::Undetermined));
        let acquisition = MediaAcquisition::new(provider.clone());

        assert!(acquisition.request_image(MediaSource::Camera).await.is_err());
        assert!(acquisition.request_image(MediaSource::Camera).await.is_err());
        assert_eq!(provider.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_permissions_are_independent() {
        let provider = Arc::new(
            ScriptedProvider::new(PermissionStatus::Granted)
                .with_status(PermissionKind::Camera, PermissionStatus::Denied)
                .selecting(image()),
        );
        let acquisition = MediaAcquisition::new(provider.clone());

        assert!(acquisition.request_image(MediaSource::Camera).await.is_err());
        assert!(acquisition.request_image(MediaSource::Library).await.is_ok());
        assert_eq!(*provider.prompts.lock(), vec![PermissionKind::PhotoLibrary]);
    }

    #[tokio::test]
    async fn test_missing_camera_is_unavailable() {
        let mut provider = ScriptedProvider::new(PermissionStatus::Granted);
        provider.camera_available = false;
        let provider = Arc::new(provider);
        let acquisition = MediaAcquisition::new(provider.clone());

        let err = acquisition
            .request_image(MediaSource::Camera)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::Unavailable {
                media: MediaSource::Camera
            }
        ));
        assert!(provider.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_picker_keeps_previous_image() {
        let provider = Arc::new(ScriptedProvider::new(PermissionStatus::Granted).selecting(image()));
        let acquisition = MediaAcquisition::new(provider.clone());
        acquisition.request_image(MediaSource::Library).await.unwrap();

        *provider.outcome.lock() = Some(PickerOutcome::Cancelled);
        let outcome = acquisition.request_image(MediaSource::Library).await.unwrap();
        assert!(outcome.is_none());
        assert!(acquisition.current_image().is_some());
    }

    #[test]
    fn test_remediation_messages() {
        let err = AcquisitionError::PermissionDenied {
            kind: PermissionKind::Camera,
        };
        assert_eq!(err.to_string(), "Camera access was denied");
        assert!(err.remediation().contains("Settings"));
    }
}
