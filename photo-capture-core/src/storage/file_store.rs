use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;

/// Allocates uniquely named capture targets inside one directory.
///
/// Names follow `JPEG_<yyyyMMdd_HHmmss>_<random>.jpg`. The target is
/// created empty with `create_new`, so two allocations can never collide.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Allocate a fresh, empty output file.
    pub fn new_output_target(&self) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| CaptureError::Storage(format!("failed to create directory: {}", e)))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = self
            .directory
            .join(format!("JPEG_{}_{}.jpg", timestamp, &suffix[..12]));

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| CaptureError::Storage(format!("failed to create file: {}", e)))?;

        Ok(path)
    }

    /// `file://` URI for an absolute form of `path`.
    pub fn to_uri_string(&self, path: &Path) -> String {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        format!("file://{}", absolute.display())
    }
}

/// Sibling of `path` named `<prefix>_<file name>`.
pub fn derived_path(path: &Path, prefix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.jpg".into());
    path.with_file_name(format!("{}_{}", prefix, name))
}

/// File size in bytes, if the file can be inspected.
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}

/// File name component as an owned string.
pub fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
