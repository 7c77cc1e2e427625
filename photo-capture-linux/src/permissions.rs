//! Camera device node permission check.
//!
//! Linux has no consent dialog for cameras. Access is plain file permission
//! on the device node, normally granted through membership in the `video`
//! group, so "requesting" only re-checks and there is no settings page to
//! open.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use photo_capture_core::models::camera_models::CameraFacing;
use photo_capture_core::traits::permission_platform::PermissionPlatform;

use crate::device_enumerator::DeviceEnumerator;

/// Whether the calling process can open `path` for reading and writing.
pub fn check_device_access(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}

/// `PermissionPlatform` over the back camera's device node.
pub struct DeviceNodePermission {
    enumerator: DeviceEnumerator,
}

impl DeviceNodePermission {
    pub fn new(enumerator: DeviceEnumerator) -> Self {
        Self { enumerator }
    }

    fn node(&self) -> Option<PathBuf> {
        self.enumerator
            .device_for(CameraFacing::Back)
            .ok()
            .map(|device| device.path)
    }
}

impl Default for DeviceNodePermission {
    fn default() -> Self {
        Self::new(DeviceEnumerator::new())
    }
}

#[async_trait]
impl PermissionPlatform for DeviceNodePermission {
    fn is_granted(&self) -> bool {
        self.node().is_some_and(|path| check_device_access(&path))
    }

    async fn request(&self) -> bool {
        let granted = self.is_granted();
        if !granted {
            log::warn!(
                target: "photo_capture",
                "no read/write access to a camera node under {}",
                self.enumerator.root().display()
            );
        }
        granted
    }

    fn should_show_rationale(&self) -> bool {
        true
    }

    fn open_settings(&self) {
        log::info!(
            target: "photo_capture",
            "camera access is granted by adding the user to the `video` group"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_file_is_accessible() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(check_device_access(file.path()));
    }

    #[test]
    fn missing_node_is_not_accessible() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!check_device_access(&dir.path().join("video0")));
    }

    #[tokio::test]
    async fn permission_follows_first_node() {
        let dir = tempfile::tempdir().unwrap();
        let permission = DeviceNodePermission::new(DeviceEnumerator::with_root(dir.path()));
        assert!(!permission.is_granted());
        assert!(!permission.request().await);

        std::fs::write(dir.path().join("video0"), b"").unwrap();
        assert!(permission.is_granted());
        assert!(permission.request().await);
    }
}
