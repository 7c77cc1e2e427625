//! # photo-capture-linux
//!
//! Linux Video4Linux2 backend for photo-capture-kit.
//!
//! Provides:
//! - `V4lCameraBackend` - still capture from a `/dev/video*` node streaming MJPEG
//! - `DeviceEnumerator` - video capture node discovery and facing assignment
//! - `permissions` - device node access check
//!
//! ## Platform Requirements
//! - A UVC (or other V4L2) camera that can produce MJPEG frames
//! - Read/write access to the device node, usually via the `video` group
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use photo_capture_core::{CameraSession, CapturePreference, SessionConfig};
//! use photo_capture_linux::V4lCameraBackend;
//!
//! let backend = Arc::new(V4lCameraBackend::new());
//! let session = CameraSession::new(backend, SessionConfig::default());
//! session.start(None, CapturePreference::Quality).await?;
//! let photo = session.capture_async().await?;
//! ```

#[cfg(target_os = "linux")]
pub mod device_enumerator;
#[cfg(target_os = "linux")]
pub mod permissions;
#[cfg(target_os = "linux")]
pub mod v4l_camera;

#[cfg(target_os = "linux")]
pub use device_enumerator::{DeviceEnumerator, VideoDevice};
#[cfg(target_os = "linux")]
pub use permissions::DeviceNodePermission;
#[cfg(target_os = "linux")]
pub use v4l_camera::{V4lBinding, V4lCameraBackend};
