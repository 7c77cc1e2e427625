use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during capture, permission and processing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera not initialized")]
    CameraNotInitialized,

    #[error("failed to bind camera: {0}")]
    CameraBind(String),

    #[error("camera binding timed out after {}ms", .0.as_millis())]
    CameraBindTimeout(Duration),

    #[error("camera binding superseded by a newer request")]
    BindSuperseded,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image processing failed: {0}")]
    ImageProcessing(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("permission permanently denied")]
    PermissionPermanentlyDenied,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("no images could be read from the selection")]
    NoImagesSelected,

    #[error("no async runtime available")]
    RuntimeUnavailable,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Errors the caller can recover from without leaving the app.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CameraNotInitialized | Self::PermissionDenied | Self::BindSuperseded
        )
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
