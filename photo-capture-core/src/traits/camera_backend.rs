use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::camera_models::{CameraFacing, CaptureModeHint, FlashMode};
use crate::models::error::CaptureError;

/// Live-preview sink the platform renders frames into.
///
/// The core never looks inside; it only attaches the sink once a binding
/// is live and detaches it when the binding goes away.
pub trait PreviewSink: Send + Sync {
    fn attach(&self, facing: CameraFacing);

    fn detach(&self);
}

/// Everything a backend needs to bind a camera.
#[derive(Clone)]
pub struct BindRequest {
    pub facing: CameraFacing,
    pub capture_mode: CaptureModeHint,
    pub flash_mode: FlashMode,
    pub preview: Option<Arc<dyn PreviewSink>>,
}

impl std::fmt::Debug for BindRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindRequest")
            .field("facing", &self.facing)
            .field("capture_mode", &self.capture_mode)
            .field("flash_mode", &self.flash_mode)
            .field("preview", &self.preview.is_some())
            .finish()
    }
}

/// Interface for platform camera hardware.
///
/// Implemented by:
/// - `V4lCameraBackend` (Linux)
/// - test fakes
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Whether any camera with the given facing exists.
    fn is_available(&self, facing: CameraFacing) -> bool;

    /// Bind the camera described by `request`.
    ///
    /// May suspend for as long as the driver needs; the session bounds it
    /// with its own timeout.
    async fn bind(&self, request: BindRequest) -> Result<Arc<dyn CameraBinding>, CaptureError>;
}

/// A live hardware binding.
#[async_trait]
pub trait CameraBinding: Send + Sync {
    /// Apply a flash mode to the live binding.
    fn set_flash_mode(&self, mode: FlashMode);

    /// Expose one frame and write it to `output`.
    ///
    /// Once called the shutter is committed; the future is not cancelled.
    async fn take_picture(&self, output: &Path) -> Result<(), CaptureError>;

    /// Release the hardware. Must be idempotent.
    fn unbind(&self);
}
