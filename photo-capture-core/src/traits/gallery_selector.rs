use async_trait::async_trait;

use crate::models::capture_result::GallerySource;
use crate::models::error::CaptureError;

/// Platform gallery picker.
///
/// An empty vector means the user dismissed the picker.
#[async_trait]
pub trait GallerySelector: Send + Sync {
    async fn select(&self, allow_multiple: bool) -> Result<Vec<GallerySource>, CaptureError>;
}
