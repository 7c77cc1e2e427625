//! Video capture node discovery.
//!
//! Lists `/dev/video*` nodes in index order. Laptops and USB webcams expose
//! no facing information, so the first node is treated as the back camera
//! and the second as the front one.

use std::fs;
use std::path::{Path, PathBuf};

use photo_capture_core::models::camera_models::CameraFacing;
use photo_capture_core::models::error::CaptureError;

const DEFAULT_DEVICE_DIR: &str = "/dev";

/// A video capture node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub index: usize,
    pub path: PathBuf,
}

/// Scans a device directory for `video<N>` nodes.
#[derive(Debug, Clone)]
pub struct DeviceEnumerator {
    root: PathBuf,
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_DEVICE_DIR)
    }

    /// Scan `root` instead of `/dev`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List video nodes sorted by index.
    pub fn list_devices(&self) -> Result<Vec<VideoDevice>, CaptureError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            CaptureError::Unknown(format!("failed to read {}: {}", self.root.display(), e))
        })?;

        let mut devices: Vec<VideoDevice> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let index = parse_index(&entry.file_name().to_string_lossy())?;
                Some(VideoDevice {
                    index,
                    path: entry.path(),
                })
            })
            .collect();
        devices.sort_by_key(|d| d.index);
        Ok(devices)
    }

    /// Node used for `facing`.
    pub fn device_for(&self, facing: CameraFacing) -> Result<VideoDevice, CaptureError> {
        let position = match facing {
            CameraFacing::Back => 0,
            CameraFacing::Front => 1,
        };
        self.list_devices()?
            .into_iter()
            .nth(position)
            .ok_or(CaptureError::DeviceNotAvailable)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// `video3` → 3. Metadata and vbi nodes are ignored.
fn parse_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("video")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
