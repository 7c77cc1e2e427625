//! Gallery selections: decode what the picker returned, compress if asked,
//! and keep whatever succeeded.

use std::io::Cursor;
use std::sync::Arc;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::models::capture_result::{CaptureResult, GallerySource};
use crate::models::config::{CompressionConfig, MimeType};
use crate::models::error::CaptureError;
use crate::processing::compression::{resize_for, write_jpeg};
use crate::processing::exif_reader::read_exif_bytes;
use crate::storage::file_store::{file_name, file_size, FileStore};
use crate::traits::gallery_selector::GallerySelector;
use crate::traits::logger::PickerLogger;

#[derive(Clone)]
pub struct GalleryProcessor {
    file_store: Arc<FileStore>,
    compression: Option<CompressionConfig>,
    include_exif: bool,
    logger: Arc<dyn PickerLogger>,
}

impl GalleryProcessor {
    pub fn new(file_store: Arc<FileStore>, logger: Arc<dyn PickerLogger>) -> Self {
        Self {
            file_store,
            compression: None,
            include_exif: false,
            logger,
        }
    }

    pub fn with_compression(mut self, config: CompressionConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ImageProcessing)?;
        self.compression = Some(config);
        Ok(self)
    }

    /// Attach each source's EXIF to its result.
    pub fn with_exif(mut self, include: bool) -> Self {
        self.include_exif = include;
        self
    }

    /// Run `selector` and process what it returns.
    ///
    /// A dismissed picker yields an empty vector, not an error.
    pub async fn pick(
        &self,
        selector: &dyn GallerySelector,
        allow_multiple: bool,
    ) -> Result<Vec<CaptureResult>, CaptureError> {
        let mut sources = selector.select(allow_multiple).await?;
        if !allow_multiple {
            sources.truncate(1);
        }

        let processor = self.clone();
        tokio::task::spawn_blocking(move || processor.process_batch(sources))
            .await
            .map_err(|e| CaptureError::Unknown(format!("gallery task failed: {}", e)))?
    }

    /// Process every source, keeping successes.
    ///
    /// Fails only if a non-empty batch produced no result at all.
    pub fn process_batch(&self, sources: Vec<GallerySource>) -> Result<Vec<CaptureResult>, CaptureError> {
        if sources.is_empty() {
            self.logger.log_debug("gallery selection dismissed");
            return Ok(Vec::new());
        }

        let total = sources.len();
        let mut results = Vec::with_capacity(total);
        let mut last_error = None;

        for source in &sources {
            match self.process_source(source) {
                Ok(result) => results.push(result),
                Err(e) => {
                    self.logger
                        .log_error(&format!("skipping gallery item {}", source.uri), Some(&e));
                    last_error = Some(e);
                }
            }
        }

        if results.is_empty() {
            return Err(last_error.unwrap_or(CaptureError::NoImagesSelected));
        }

        if results.len() < total {
            self.logger.log(&format!(
                "gallery selection: {} of {} items processed",
                results.len(),
                total
            ));
        }
        Ok(results)
    }

    /// Process a single gallery item.
    pub fn process_source(&self, source: &GallerySource) -> Result<CaptureResult, CaptureError> {
        let reader = ImageReader::new(Cursor::new(source.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
        let mime = reader.format().and_then(MimeType::from_image_format);

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| CaptureError::Decode(format!("{}: {}", source.uri, e)))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let (w, h) = decoder.dimensions();
        let (width, height) = if swaps_dimensions(orientation) { (h, w) } else { (w, h) };
        let exif = if self.include_exif { read_exif_bytes(&source.bytes) } else { None };

        match &self.compression {
            Some(config) if config.should_compress(mime.map(MimeType::as_str)) => {
                let mut image = DynamicImage::from_decoder(decoder)
                    .map_err(|e| CaptureError::Decode(format!("{}: {}", source.uri, e)))?;
                image.apply_orientation(orientation);
                let resized = resize_for(image, config);

                let output = self.file_store.new_output_target()?;
                write_jpeg(&resized, &output, config.jpeg_quality())?;

                Ok(CaptureResult {
                    uri: self.file_store.to_uri_string(&output),
                    width: resized.width(),
                    height: resized.height(),
                    file_name: file_name(&output),
                    file_size: file_size(&output),
                    mime_type: Some(MimeType::Jpeg.as_str().to_string()),
                    exif,
                })
            }
            _ => Ok(CaptureResult {
                uri: source.uri.clone(),
                width,
                height,
                file_name: source.name.clone(),
                file_size: source.size.or(Some(source.bytes.len() as u64)),
                mime_type: mime.map(|m| m.as_str().to_string()),
                exif,
            }),
        }
    }
}

/// Orientations that include a quarter turn.
fn swaps_dimensions(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}
