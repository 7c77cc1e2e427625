use serde::{Deserialize, Serialize};

use super::exif_data::ExifData;

/// Normalized result of a capture or gallery selection.
///
/// Produced once per successful capture; the core keeps no reference to it
/// after handing it to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub file_name: Option<String>,
    /// Size in bytes.
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    /// Present only when EXIF extraction was requested and the file had any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// A raw item handed back by a gallery picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySource {
    pub uri: String,
    pub bytes: Vec<u8>,
    pub name: Option<String>,
    pub size: Option<u64>,
}

impl GallerySource {
    pub fn new(uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uri: uri.into(),
            bytes,
            name: None,
            size: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}
