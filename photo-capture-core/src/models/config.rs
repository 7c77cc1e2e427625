use std::path::PathBuf;
use std::time::Duration;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Named compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressionLevel {
    Low,
    Medium,
    High,
}

impl CompressionLevel {
    /// Encoder quality fraction (0.0–1.0).
    pub fn quality(self) -> f64 {
        match self {
            Self::Low => 0.95,
            Self::Medium => 0.75,
            Self::High => 0.50,
        }
    }

    /// Longest-edge cap used when no explicit max width/height is set.
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Low => 2560,
            Self::Medium => 1920,
            Self::High => 1280,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::Medium
    }
}

/// Image MIME types the picker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/bmp")]
    Bmp,
    #[serde(rename = "image/heic")]
    Heic,
    #[serde(rename = "image/heif")]
    Heif,
}

impl MimeType {
    pub const ALL: [MimeType; 7] = [
        Self::Jpeg,
        Self::Png,
        Self::Gif,
        Self::Webp,
        Self::Bmp,
        Self::Heic,
        Self::Heif,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    pub fn from_str_ignore_case(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(value))
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::WebP => Some(Self::Webp),
            ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }
}

/// Compression policy applied after orientation correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    pub enabled: bool,

    pub level: CompressionLevel,

    /// Maximum output width in pixels (None = no limit).
    pub max_width: Option<u32>,

    /// Maximum output height in pixels (None = no limit).
    pub max_height: Option<u32>,

    /// Overrides `level` when set (0.0–1.0).
    pub custom_quality: Option<f64>,

    pub maintain_aspect_ratio: bool,

    /// Source formats eligible for re-encoding.
    pub supported_formats: Vec<MimeType>,
}

impl CompressionConfig {
    pub fn with_level(level: CompressionLevel) -> Self {
        Self {
            enabled: true,
            level,
            ..Default::default()
        }
    }

    /// Effective quality: `custom_quality` wins over the named level.
    pub fn quality(&self) -> f64 {
        self.custom_quality.unwrap_or_else(|| self.level.quality())
    }

    /// Quality on the 1–100 scale JPEG encoders expect.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality() * 100.0).round().clamp(1.0, 100.0) as u8
    }

    pub fn supports_format(&self, mime_type: &str) -> bool {
        self.supported_formats
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(mime_type))
    }

    pub fn should_compress(&self, mime_type: Option<&str>) -> bool {
        self.enabled && mime_type.is_some_and(|m| self.supports_format(m))
    }

    pub fn validate(&self) -> Result<(), String> {
        let quality = self.quality();
        if !(0.0..=1.0).contains(&quality) {
            return Err(format!("quality must be between 0.0 and 1.0, got {}", quality));
        }
        if self.max_width == Some(0) {
            return Err("max width must be positive".into());
        }
        if self.max_height == Some(0) {
            return Err("max height must be positive".into());
        }
        Ok(())
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: CompressionLevel::Medium,
            max_width: None,
            max_height: None,
            custom_quality: None,
            maintain_aspect_ratio: true,
            supported_formats: MimeType::ALL.to_vec(),
        }
    }
}

/// Configuration for a camera session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Upper bound on a hardware bind (default: 5 s).
    pub bind_timeout: Duration,

    /// Directory where capture targets are allocated.
    pub output_directory: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_timeout: Duration::from_secs(5),
            output_directory: std::env::temp_dir().join("photo-capture"),
        }
    }
}

/// Configuration for runtime permission negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionConfig {
    /// Denials after which the permission counts as permanently denied.
    pub denial_threshold: u32,

    /// Also treat the platform's "rationale can no longer be shown" signal
    /// as permanent denial, even below the threshold.
    pub trust_platform_rationale: bool,
}

impl PermissionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.denial_threshold == 0 {
            return Err("denial threshold must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            denial_threshold: 2,
            trust_platform_rationale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn custom_quality_overrides_level() {
        let mut config = CompressionConfig::with_level(CompressionLevel::High);
        assert_relative_eq!(config.quality(), 0.50);

        config.custom_quality = Some(0.33);
        assert_relative_eq!(config.quality(), 0.33);
        assert_eq!(config.jpeg_quality(), 33);
    }

    #[test]
    fn named_levels_have_fixed_quality() {
        assert_relative_eq!(CompressionLevel::Low.quality(), 0.95);
        assert_relative_eq!(CompressionLevel::Medium.quality(), 0.75);
        assert_relative_eq!(CompressionLevel::High.quality(), 0.50);
    }

    #[test]
    fn format_allow_list_is_case_insensitive() {
        let config = CompressionConfig {
            enabled: true,
            supported_formats: vec![MimeType::Jpeg],
            ..Default::default()
        };
        assert!(config.should_compress(Some("IMAGE/JPEG")));
        assert!(!config.should_compress(Some("image/png")));
        assert!(!config.should_compress(None));
    }

    #[test]
    fn disabled_config_never_compresses() {
        let config = CompressionConfig::default();
        assert!(!config.should_compress(Some("image/jpeg")));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_quality = CompressionConfig {
            custom_quality: Some(1.5),
            ..Default::default()
        };
        assert!(bad_quality.validate().is_err());

        let zero_width = CompressionConfig {
            max_width: Some(0),
            ..Default::default()
        };
        assert!(zero_width.validate().is_err());

        assert!(CompressionConfig::default().validate().is_ok());
        assert!(PermissionConfig { denial_threshold: 0, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn mime_type_lookup() {
        assert_eq!(MimeType::from_str_ignore_case("image/PNG"), Some(MimeType::Png));
        assert_eq!(MimeType::from_str_ignore_case("application/pdf"), None);
        assert_eq!(MimeType::from_image_format(ImageFormat::WebP), Some(MimeType::Webp));
        assert_eq!(MimeType::from_image_format(ImageFormat::Tiff), None);
    }
}
