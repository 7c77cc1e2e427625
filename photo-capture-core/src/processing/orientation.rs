//! Best-effort orientation correction for captured frames.
//!
//! Rotation comes from the embedded EXIF orientation; front-camera frames are
//! additionally mirrored. Any failure leaves the original file in place and
//! returns it unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::models::camera_models::CameraFacing;
use crate::models::error::CaptureError;
use crate::processing::compression::write_jpeg;
use crate::storage::file_store::derived_path;
use crate::traits::logger::PickerLogger;

const CORRECTED_PREFIX: &str = "corrected";
const CORRECTED_JPEG_QUALITY: u8 = 95;

pub struct OrientationCorrector {
    logger: Arc<dyn PickerLogger>,
}

impl OrientationCorrector {
    pub fn new(logger: Arc<dyn PickerLogger>) -> Self {
        Self { logger }
    }

    /// Return a file whose pixels display upright.
    ///
    /// Never fails: on any read, decode or write error the input path is
    /// returned verbatim.
    pub fn correct(&self, file: &Path, facing: CameraFacing) -> PathBuf {
        match self.try_correct(file, facing) {
            Ok(Some(corrected)) => corrected,
            Ok(None) => file.to_path_buf(),
            Err(e) => {
                self.logger
                    .log_error("orientation correction skipped", Some(&e));
                file.to_path_buf()
            }
        }
    }

    fn try_correct(&self, file: &Path, facing: CameraFacing) -> Result<Option<PathBuf>, CaptureError> {
        let mut decoder = ImageReader::open(file)?
            .with_guessed_format()?
            .into_decoder()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        // Missing or unreadable metadata means no rotation.
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

        if orientation == Orientation::NoTransforms && !facing.is_mirrored() {
            return Ok(None);
        }

        self.logger.log_debug(&format!(
            "correcting orientation {:?} for {:?} camera",
            orientation, facing
        ));

        let image = DynamicImage::from_decoder(decoder)
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
        let upright = orient_image(image, orientation, facing);

        let output = derived_path(file, CORRECTED_PREFIX).with_extension("jpg");
        write_jpeg(&upright, &output, CORRECTED_JPEG_QUALITY)?;
        Ok(Some(output))
    }
}

/// Apply `orientation`, then mirror horizontally for front-facing frames.
pub fn orient_image(mut image: DynamicImage, orientation: Orientation, facing: CameraFacing) -> DynamicImage {
    image.apply_orientation(orientation);
    if facing.is_mirrored() {
        image.fliph()
    } else {
        image
    }
}
