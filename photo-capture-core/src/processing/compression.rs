use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::models::config::CompressionConfig;
use crate::models::error::CaptureError;

/// Target dimensions for `width`×`height` under `config`.
///
/// Explicit max width/height win; otherwise the compression level caps the
/// longest edge. Never upscales and never returns a zero dimension.
pub fn optimal_dimensions(width: u32, height: u32, config: &CompressionConfig) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let (w, h) = match (config.max_width, config.max_height) {
        (None, None) => {
            let cap = config.level.max_dimension();
            if width.max(height) > cap {
                fit_within(width, height, cap, cap)
            } else {
                (width, height)
            }
        }
        (Some(max_w), Some(max_h)) => {
            if !config.maintain_aspect_ratio {
                (width.min(max_w), height.min(max_h))
            } else if width > max_w || height > max_h {
                fit_within(width, height, max_w, max_h)
            } else {
                (width, height)
            }
        }
        (Some(max_w), None) if width > max_w => (max_w, scale(height, max_w, width)),
        (None, Some(max_h)) if height > max_h => (scale(width, max_h, height), max_h),
        _ => (width, height),
    };

    (w.max(1), h.max(1))
}

/// Largest size with the same aspect ratio that fits in `max_w`×`max_h`.
fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    // Compare max_w/width against max_h/height without floating point.
    if max_w as u64 * height as u64 <= max_h as u64 * width as u64 {
        (max_w, scale(height, max_w, width))
    } else {
        (scale(width, max_h, height), max_h)
    }
}

/// `value * numerator / denominator`, truncated.
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    (value as u64 * numerator as u64 / denominator as u64) as u32
}

/// Resize `image` to the dimensions `config` allows.
pub fn resize_for(image: DynamicImage, config: &CompressionConfig) -> DynamicImage {
    let (w, h) = optimal_dimensions(image.width(), image.height(), config);
    if (w, h) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(w, h, FilterType::Triangle)
    }
}

/// Encode `image` as JPEG at `quality` (1–100) into `path`.
pub fn write_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), CaptureError> {
    let file = File::create(path)
        .map_err(|e| CaptureError::Storage(format!("failed to create file: {}", e)))?;
    let mut writer = BufWriter::new(file);

    let rgb = image.to_rgb8();
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| CaptureError::ImageProcessing(format!("jpeg encoding failed: {}", e)))?;

    writer
        .flush()
        .map_err(|e| CaptureError::Storage(format!("write failed: {}", e)))?;
    Ok(())
}
