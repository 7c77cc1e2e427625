//! # photo-capture-core
//!
//! Platform-agnostic photo capture core library.
//!
//! Provides the camera session state machine, runtime permission negotiation,
//! and post-processing of captured and picked images (orientation, mirroring,
//! compression, cropping, EXIF extraction). Platform backends (Linux V4L2) implement `CameraBackend`,
//! `CameraBinding` and `PermissionPlatform` and plug into `CameraSession` and
//! `PermissionNegotiator`.
//!
//! ## Architecture
//!
//! ```text
//! photo-capture-core (this crate)
//! ├── traits/       ← CameraBackend, CameraBinding, PermissionPlatform, GallerySelector, PickerLogger
//! ├── models/       ← CaptureError, SessionState, PermissionState, CaptureResult, ExifData, configs
//! ├── processing/   ← OrientationCorrector, ImagePostProcessor, compression, GalleryProcessor, ImageCropper, EXIF
//! ├── session/      ← CameraSession, PermissionNegotiator
//! └── storage/      ← FileStore
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::camera_models::{CameraFacing, CaptureModeHint, CapturePreference, FlashMode};
pub use models::capture_result::{CaptureResult, GallerySource};
pub use models::config::{CompressionConfig, CompressionLevel, MimeType, PermissionConfig, SessionConfig};
pub use models::error::CaptureError;
pub use models::exif_data::ExifData;
pub use models::state::{PermissionState, SessionState};
pub use processing::crop::{CropRect, CropShape, ImageCropper};
pub use processing::exif_reader::{read_exif_bytes, read_exif_file};
pub use processing::gallery::GalleryProcessor;
pub use processing::image_processor::ImagePostProcessor;
pub use processing::orientation::OrientationCorrector;
pub use session::camera_session::CameraSession;
pub use session::permission::PermissionNegotiator;
pub use storage::file_store::FileStore;
pub use traits::camera_backend::{BindRequest, CameraBackend, CameraBinding, PreviewSink};
pub use traits::gallery_selector::GallerySelector;
pub use traits::logger::{LogFacadeLogger, NoopLogger, PickerLogger};
pub use traits::permission_platform::{PermissionPlatform, PermissionPrompts, SilentPrompts};
pub use traits::session_delegate::CameraSessionDelegate;
