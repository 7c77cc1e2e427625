use serde::{Deserialize, Serialize};

/// EXIF metadata read from a captured or picked image.
///
/// Every field is optional; absent tags stay `None`. Dates are rendered as
/// `yyyy-MM-ddTHH:mm:ss` when they parse, verbatim otherwise. Enumerated
/// tags (flash, metering, ...) carry a human-readable description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifData {
    // GPS
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Metres, negative below sea level.
    pub altitude: Option<f64>,

    // Date and time
    pub date_taken: Option<String>,
    pub digitized_time: Option<String>,
    pub original_time: Option<String>,

    // Camera
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub software: Option<String>,
    pub owner: Option<String>,

    // Exposure and image properties
    pub orientation: Option<String>,
    pub color_space: Option<String>,
    pub white_balance: Option<String>,
    pub flash: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<u32>,
    pub exposure_bias: Option<String>,
    pub metering_mode: Option<String>,
    pub scene_capture_type: Option<String>,

    // Technical
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub x_resolution: Option<String>,
    pub y_resolution: Option<String>,
    pub resolution_unit: Option<String>,
    pub compression: Option<String>,
}

impl ExifData {
    /// True when no tag was recognised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}
