use std::path::Path;
use std::sync::Arc;

use image::ImageReader;

use crate::models::camera_models::CameraFacing;
use crate::models::capture_result::CaptureResult;
use crate::models::config::{CompressionConfig, MimeType};
use crate::models::error::CaptureError;
use crate::processing::compression::{resize_for, write_jpeg};
use crate::processing::exif_reader::read_exif_file;
use crate::processing::orientation::OrientationCorrector;
use crate::storage::file_store::{derived_path, file_name, file_size, FileStore};
use crate::traits::logger::PickerLogger;

const COMPRESSED_PREFIX: &str = "compressed";

/// Turns a raw captured file into a `CaptureResult`.
///
/// Pipeline:
/// ```text
/// [raw file] → bounds decode → [OrientationCorrector] → (compress) → [CaptureResult]
/// ```
pub struct ImagePostProcessor {
    file_store: Arc<FileStore>,
    corrector: OrientationCorrector,
    compression: Option<CompressionConfig>,
    include_exif: bool,
    logger: Arc<dyn PickerLogger>,
}

impl ImagePostProcessor {
    pub fn new(file_store: Arc<FileStore>, logger: Arc<dyn PickerLogger>) -> Self {
        Self {
            file_store,
            corrector: OrientationCorrector::new(Arc::clone(&logger)),
            compression: None,
            include_exif: false,
            logger,
        }
    }

    /// Enable re-encoding. Rejects an invalid policy up front.
    pub fn with_compression(mut self, config: CompressionConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ImageProcessing)?;
        self.compression = Some(config);
        Ok(self)
    }

    /// Attach the raw file's EXIF to every result.
    pub fn with_exif(mut self, include: bool) -> Self {
        self.include_exif = include;
        self
    }

    pub fn file_store(&self) -> &Arc<FileStore> {
        &self.file_store
    }

    /// Run the full pipeline on `raw`.
    pub fn process(&self, raw: &Path, facing: CameraFacing) -> Result<CaptureResult, CaptureError> {
        // Header-only read; fails fast on corrupt captures.
        let (raw_width, raw_height) = read_dimensions(raw)
            .map_err(|e| CaptureError::Decode(format!("{}: {}", raw.display(), e)))?;
        self.logger.log_debug(&format!(
            "decoded capture bounds {}x{} ({:?} camera)",
            raw_width, raw_height, facing
        ));

        // Re-encoded copies drop metadata, so read it from the raw file.
        let exif = if self.include_exif { read_exif_file(raw) } else { None };

        let corrected = self.corrector.correct(raw, facing);
        let mime = detect_mime(&corrected);

        let (final_path, width, height, mime) = match &self.compression {
            Some(config) if config.should_compress(mime.map(MimeType::as_str)) => {
                let image = ImageReader::open(&corrected)?
                    .with_guessed_format()?
                    .decode()
                    .map_err(|e| CaptureError::Decode(e.to_string()))?;
                let resized = resize_for(image, config);

                let output = derived_path(&corrected, COMPRESSED_PREFIX).with_extension("jpg");
                write_jpeg(&resized, &output, config.jpeg_quality())?;
                self.logger.log_debug(&format!(
                    "compressed to {}x{} at quality {}",
                    resized.width(),
                    resized.height(),
                    config.jpeg_quality()
                ));
                (output, resized.width(), resized.height(), Some(MimeType::Jpeg))
            }
            _ => {
                let (w, h) = read_dimensions(&corrected)
                    .map_err(|e| CaptureError::Decode(e.to_string()))?;
                (corrected, w, h, mime)
            }
        };

        Ok(CaptureResult {
            uri: self.file_store.to_uri_string(&final_path),
            width,
            height,
            file_name: file_name(&final_path),
            file_size: file_size(&final_path),
            mime_type: mime.map(|m| m.as_str().to_string()),
            exif,
        })
    }
}

/// Pixel bounds from the header, format sniffed from content.
fn read_dimensions(path: &Path) -> image::ImageResult<(u32, u32)> {
    ImageReader::open(path)?.with_guessed_format()?.into_dimensions()
}

/// Sniff the content format of `path`, ignoring its extension.
fn detect_mime(path: &Path) -> Option<MimeType> {
    ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .format()
        .and_then(MimeType::from_image_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::CompressionLevel;
    use crate::processing::exif_reader::fixtures;
    use crate::traits::logger::NoopLogger;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    fn processor(dir: &Path) -> ImagePostProcessor {
        ImagePostProcessor::new(Arc::new(FileStore::new(dir)), Arc::new(NoopLogger))
    }

    fn write_test_jpeg(path: &Path, width: u32, height: u32) {
        let image = RgbImage::from_pixel(width, height, Rgb([120, 180, 40]));
        DynamicImage::ImageRgb8(image).save(path).unwrap();
    }

    #[test]
    fn back_capture_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_raw.jpg");
        write_test_jpeg(&raw, 320, 240);

        let result = processor(dir.path()).process(&raw, CameraFacing::Back).unwrap();
        assert_eq!((result.width, result.height), (320, 240));
        assert!(result.uri.starts_with("file://"));
        assert!(result.uri.ends_with("JPEG_raw.jpg"));
        assert_eq!(result.file_name.as_deref(), Some("JPEG_raw.jpg"));
        assert_eq!(result.mime_type.as_deref(), Some("image/jpeg"));
        assert!(result.file_size.unwrap() > 0);
    }

    #[test]
    fn front_capture_reports_corrected_file() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_front.jpg");
        write_test_jpeg(&raw, 200, 100);

        let result = processor(dir.path()).process(&raw, CameraFacing::Front).unwrap();
        assert_eq!(result.file_name.as_deref(), Some("corrected_JPEG_front.jpg"));
        assert_eq!((result.width, result.height), (200, 100));
    }

    #[test]
    fn corrupt_capture_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_bad.jpg");
        std::fs::write(&raw, b"garbage").unwrap();

        let err = processor(dir.path()).process(&raw, CameraFacing::Back).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[test]
    fn empty_capture_target_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let raw = store.new_output_target().unwrap();

        let err = processor(dir.path()).process(&raw, CameraFacing::Back).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[test]
    fn compression_resizes_and_reencodes() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_big.jpg");
        write_test_jpeg(&raw, 3000, 1500);

        let processor = processor(dir.path())
            .with_compression(CompressionConfig::with_level(CompressionLevel::High))
            .unwrap();
        let result = processor.process(&raw, CameraFacing::Back).unwrap();

        assert_eq!((result.width, result.height), (1280, 640));
        assert_eq!(result.file_name.as_deref(), Some("compressed_JPEG_big.jpg"));
        let written = image::open(dir.path().join("compressed_JPEG_big.jpg")).unwrap();
        assert_eq!(written.dimensions(), (1280, 640));
    }

    #[test]
    fn formats_outside_allow_list_are_not_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("shot.png");
        RgbImage::from_pixel(3000, 100, Rgb([0, 0, 0])).save(&raw).unwrap();

        let config = CompressionConfig {
            supported_formats: vec![MimeType::Jpeg],
            ..CompressionConfig::with_level(CompressionLevel::High)
        };
        let processor = processor(dir.path()).with_compression(config).unwrap();
        let result = processor.process(&raw, CameraFacing::Back).unwrap();

        assert_eq!((result.width, result.height), (3000, 100));
        assert_eq!(result.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn exif_is_attached_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_tagged.jpg");
        std::fs::write(&raw, fixtures::tagged_jpeg(64, 32)).unwrap();

        let plain = processor(dir.path()).process(&raw, CameraFacing::Back).unwrap();
        assert_eq!(plain.exif, None);

        // Front captures are re-encoded; metadata still comes from the raw file.
        let result = processor(dir.path())
            .with_exif(true)
            .process(&raw, CameraFacing::Front)
            .unwrap();
        assert_eq!(result.file_name.as_deref(), Some("corrected_JPEG_tagged.jpg"));
        let exif = result.exif.unwrap();
        assert_eq!(exif.camera_make.as_deref(), Some("Acme"));
        assert!(exif.has_location());
    }

    #[test]
    fn missing_exif_is_none_even_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("JPEG_plain.jpg");
        write_test_jpeg(&raw, 16, 16);

        let result = processor(dir.path()).with_exif(true).process(&raw, CameraFacing::Back).unwrap();
        assert_eq!(result.exif, None);
    }

    #[test]
    fn invalid_compression_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompressionConfig {
            custom_quality: Some(2.0),
            ..CompressionConfig::with_level(CompressionLevel::Low)
        };
        assert!(processor(dir.path()).with_compression(config).is_err());
    }
}
