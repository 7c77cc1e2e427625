//! Rectangular and circular cropping of a finished capture.
//!
//! Output is PNG so a circular crop keeps its transparent corners.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::models::capture_result::CaptureResult;
use crate::models::config::MimeType;
use crate::models::error::CaptureError;
use crate::storage::file_store::{derived_path, file_name, file_size, FileStore};
use crate::traits::logger::PickerLogger;

const CROPPED_PREFIX: &str = "cropped";

/// Crop area in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Map a selection drawn over a preview back to image pixels.
    ///
    /// The preview shows the whole `image` fitted inside `canvas` and
    /// centred (letterboxed). `selection` is `(left, top, right, bottom)` in
    /// canvas coordinates. Returns `None` for an empty mapping.
    pub fn from_canvas(
        selection: (f32, f32, f32, f32),
        canvas: (f32, f32),
        image: (u32, u32),
    ) -> Option<Self> {
        let (canvas_w, canvas_h) = canvas;
        let (image_w, image_h) = (image.0 as f32, image.1 as f32);
        if canvas_w <= 0.0 || canvas_h <= 0.0 || image_w <= 0.0 || image_h <= 0.0 {
            return None;
        }

        let (shown_w, shown_h, offset_x, offset_y) = if image_w / image_h > canvas_w / canvas_h {
            let shown_h = canvas_w * image_h / image_w;
            (canvas_w, shown_h, 0.0, (canvas_h - shown_h) / 2.0)
        } else {
            let shown_w = canvas_h * image_w / image_h;
            (shown_w, canvas_h, (canvas_w - shown_w) / 2.0, 0.0)
        };

        let (left, top, right, bottom) = selection;
        let scale_x = image_w / shown_w;
        let scale_y = image_h / shown_h;

        let x = ((left - offset_x) * scale_x).max(0.0) as u32;
        let y = ((top - offset_y) * scale_y).max(0.0) as u32;
        let width = ((right - left) * scale_x).max(0.0) as u32;
        let height = ((bottom - top) * scale_y).max(0.0) as u32;

        CropRect::new(x, y, width, height).clamped_to(image.0, image.1)
    }

    /// Intersection with a `width`×`height` image; `None` if empty.
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        (w > 0 && h > 0).then_some(CropRect::new(self.x, self.y, w, h))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropShape {
    #[default]
    Rectangle,
    /// Ellipse inscribed in the rectangle; outside pixels become transparent.
    Circle,
}

/// Cut `rect` out of `image`. `None` when `rect` misses the image.
pub fn crop_image(image: &DynamicImage, rect: CropRect, shape: CropShape) -> Option<DynamicImage> {
    let rect = rect.clamped_to(image.width(), image.height())?;
    let cropped = image.crop_imm(rect.x, rect.y, rect.width, rect.height);

    match shape {
        CropShape::Rectangle => Some(cropped),
        CropShape::Circle => {
            let mut rgba = cropped.to_rgba8();
            let (rx, ry) = (rect.width as f32 / 2.0, rect.height as f32 / 2.0);
            for (x, y, pixel) in rgba.enumerate_pixels_mut() {
                let dx = (x as f32 + 0.5 - rx) / rx;
                let dy = (y as f32 + 0.5 - ry) / ry;
                if dx * dx + dy * dy > 1.0 {
                    pixel.0[3] = 0;
                }
            }
            Some(DynamicImage::ImageRgba8(rgba))
        }
    }
}

/// Crops finished captures into `cropped_<name>.png` next to the source.
pub struct ImageCropper {
    file_store: Arc<FileStore>,
    logger: Arc<dyn PickerLogger>,
}

impl ImageCropper {
    pub fn new(file_store: Arc<FileStore>, logger: Arc<dyn PickerLogger>) -> Self {
        Self { file_store, logger }
    }

    pub fn crop(&self, source: &Path, rect: CropRect, shape: CropShape) -> Result<CaptureResult, CaptureError> {
        let image = ImageReader::open(source)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| CaptureError::Decode(format!("{}: {}", source.display(), e)))?;

        let cropped = crop_image(&image, rect, shape).ok_or_else(|| {
            CaptureError::ImageProcessing(format!(
                "crop {:?} is outside the {}x{} image",
                rect,
                image.width(),
                image.height()
            ))
        })?;

        let output = derived_path(source, CROPPED_PREFIX).with_extension("png");
        cropped
            .save_with_format(&output, ImageFormat::Png)
            .map_err(|e| CaptureError::Storage(format!("failed to write crop: {}", e)))?;
        self.logger.log_debug(&format!(
            "cropped {:?} ({:?}) to {}",
            rect,
            shape,
            output.display()
        ));

        Ok(CaptureResult {
            uri: self.file_store.to_uri_string(&output),
            width: cropped.width(),
            height: cropped.height(),
            file_name: file_name(&output),
            file_size: file_size(&output),
            mime_type: Some(MimeType::Png.as_str().to_string()),
            exif: None,
        })
    }
}
