//! Filesystem-backed media provider
//!
//! Stands in for the camera and photo library on desktop: the library picker
//! loads a configured file and the "camera" loads a configured capture file.
//! Permission prompts are answered from configuration.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{
    AcquisitionError, MediaProvider, MediaSource, PermissionKind, PermissionStatus, PickerOutcome,
    SelectedImage,
};
use crate::config::AcquisitionConfig;

/// Media provider reading images from disk
pub struct FileSystemProvider {
    library_path: Option<PathBuf>,
    capture_path: Option<PathBuf>,
    grant_when_prompted: bool,
    statuses: RwLock<HashMap<PermissionKind, PermissionStatus>>,
}

impl FileSystemProvider {
    /// Create a provider from acquisition settings
    pub fn new(config: &AcquisitionConfig) -> Self {
        let mut statuses = HashMap::new();
        statuses.insert(PermissionKind::Camera, config.camera_permission);
        statuses.insert(PermissionKind::PhotoLibrary, config.library_permission);

        Self {
            library_path: config.library_path.clone(),
            capture_path: config.capture_path.clone(),
            grant_when_prompted: config.grant_when_prompted,
            statuses: RwLock::new(statuses),
        }
    }

    fn path_for(&self, source: MediaSource) -> Option<&PathBuf> {
        match source {
            MediaSource::Camera => self.capture_path.as_ref(),
            MediaSource::Library => self.library_path.as_ref(),
        }
    }
}

#[async_trait]
impl MediaProvider for FileSystemProvider {
    fn authorization_status(&self, kind: PermissionKind) -> PermissionStatus {
        self.statuses.read().get(&kind).copied().unwrap_or_default()
    }

    async fn request_permission(&self, kind: PermissionKind) -> PermissionStatus {
        let status = if self.grant_when_prompted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        info!("{} permission prompt answered: {:?}", kind, status);
        self.statuses.write().insert(kind, status);
        status
    }

    fn is_source_available(&self, source: MediaSource) -> bool {
        match source {
            MediaSource::Camera => self.capture_path.is_some(),
            MediaSource::Library => true,
        }
    }

    async fn present_picker(&self, source: MediaSource) -> Result<PickerOutcome, AcquisitionError> {
        let Some(path) = self.path_for(source) else {
            debug!("No file configured for {}, treating as cancelled", source);
            return Ok(PickerOutcome::Cancelled);
        };

        let data = tokio::fs::read(path).await?;
        let mut image = SelectedImage::new(data, source);
        if let Some(name) = path.file_name() {
            image = image.with_label(name.to_string_lossy());
        }
        Ok(PickerOutcome::Selected(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with_library(path: PathBuf) -> AcquisitionConfig {
        AcquisitionConfig {
            library_path: Some(path),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_library_picker_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"image bytes").unwrap();

        let provider = FileSystemProvider::new(&config_with_library(file.path().to_path_buf()));
        let outcome = provider.present_picker(MediaSource::Library).await.unwrap();

        let PickerOutcome::Selected(image) = outcome else {
            panic!("expected a selected image");
        };
        assert_eq!(image.data(), b"image bytes");
        assert_eq!(image.source, MediaSource::Library);
        assert!(image.label.is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let provider =
            FileSystemProvider::new(&config_with_library(PathBuf::from("/nonexistent/photo.png")));
        let result = provider.present_picker(MediaSource::Library).await;
        assert!(matches!(result, Err(AcquisitionError::Io(_))));
    }

    #[tokio::test]
    async fn test_no_configured_file_cancels() {
        let provider = FileSystemProvider::new(&AcquisitionConfig::default());
        let outcome = provider.present_picker(MediaSource::Library).await.unwrap();
        assert!(matches!(outcome, PickerOutcome::Cancelled));
    }

    #[test]
    fn test_camera_requires_capture_file() {
        let provider = FileSystemProvider::new(&AcquisitionConfig::default());
        assert!(!provider.is_source_available(MediaSource::Camera));
        assert!(provider.is_source_available(MediaSource::Library));
    }

    #[tokio::test]
    async fn test_prompt_updates_status() {
        let config = AcquisitionConfig {
            grant_when_prompted: false,
            ..Default::default()
        };
        let provider = FileSystemProvider::new(&config);
        assert_eq!(
            provider.authorization_status(PermissionKind::Camera),
            PermissionStatus::Undetermined
        );

        provider.request_permission(PermissionKind::Camera).await;
        assert_eq!(
            provider.authorization_status(PermissionKind::Camera),
            PermissionStatus::Denied
        );
        assert_eq!(
            provider.authorization_status(PermissionKind::PhotoLibrary),
            PermissionStatus::Undetermined
        );
    }
}
