//! EXIF metadata extraction.
//!
//! Reads the TIFF/EXIF block of JPEG, TIFF, PNG, WebP and HEIF containers.
//! A file without EXIF, or with a damaged block, yields `None`.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

use exif::{Exif, Field, In, Rational, Reader, Tag, Value};

use crate::models::exif_data::ExifData;

/// EXIF of the file at `path`.
pub fn read_exif_file(path: &Path) -> Option<ExifData> {
    let file = File::open(path).ok()?;
    read_exif(&mut BufReader::new(file))
}

/// EXIF of an in-memory image.
pub fn read_exif_bytes(bytes: &[u8]) -> Option<ExifData> {
    read_exif(&mut Cursor::new(bytes))
}

fn read_exif<R: BufRead + Seek>(reader: &mut R) -> Option<ExifData> {
    let exif = Reader::new().read_from_container(reader).ok()?;
    let data = parse(&exif);
    (!data.is_empty()).then_some(data)
}

fn parse(exif: &Exif) -> ExifData {
    let field = |tag: Tag| exif.get_field(tag, In::PRIMARY);
    let text = |tag: Tag| field(tag).and_then(ascii);
    let uint = |tag: Tag| field(tag).and_then(|f| f.value.get_uint(0));
    let ratio = |tag: Tag| field(tag).and_then(rational);

    ExifData {
        latitude: coordinate(field(Tag::GPSLatitude), text(Tag::GPSLatitudeRef), "S"),
        longitude: coordinate(field(Tag::GPSLongitude), text(Tag::GPSLongitudeRef), "W"),
        altitude: ratio(Tag::GPSAltitude).map(|metres| {
            if uint(Tag::GPSAltitudeRef) == Some(1) {
                -metres
            } else {
                metres
            }
        }),

        date_taken: text(Tag::DateTimeOriginal)
            .or_else(|| text(Tag::DateTime))
            .map(|d| format_date(&d)),
        digitized_time: text(Tag::DateTimeDigitized).map(|d| format_date(&d)),
        original_time: text(Tag::DateTimeOriginal).map(|d| format_date(&d)),

        camera_make: text(Tag::Make),
        camera_model: text(Tag::Model),
        software: text(Tag::Software),
        owner: text(Tag::Artist).or_else(|| text(Tag::Copyright)),

        orientation: uint(Tag::Orientation).map(orientation_name),
        color_space: uint(Tag::ColorSpace).and_then(color_space_name),
        white_balance: uint(Tag::WhiteBalance).and_then(|v| match v {
            0 => Some("Auto".to_string()),
            1 => Some("Manual".to_string()),
            _ => None,
        }),
        flash: uint(Tag::Flash).map(flash_description),
        focal_length: ratio(Tag::FocalLength).map(|mm| format!("{:.1} mm", mm)),
        aperture: ratio(Tag::FNumber).map(|f| format!("f/{:.1}", f)),
        shutter_speed: field(Tag::ExposureTime).and_then(exposure_time),
        iso: uint(Tag::PhotographicSensitivity),
        exposure_bias: field(Tag::ExposureBiasValue)
            .and_then(signed_rational)
            .map(|ev| format!("{:+.1} EV", ev)),
        metering_mode: uint(Tag::MeteringMode).and_then(metering_mode_name),
        scene_capture_type: uint(Tag::SceneCaptureType).and_then(|v| {
            let name = match v {
                0 => "Standard",
                1 => "Landscape",
                2 => "Portrait",
                3 => "Night Scene",
                _ => return None,
            };
            Some(name.to_string())
        }),

        image_width: uint(Tag::PixelXDimension).or_else(|| uint(Tag::ImageWidth)),
        image_height: uint(Tag::PixelYDimension).or_else(|| uint(Tag::ImageLength)),
        x_resolution: ratio(Tag::XResolution).map(|r| format!("{}", r)),
        y_resolution: ratio(Tag::YResolution).map(|r| format!("{}", r)),
        resolution_unit: uint(Tag::ResolutionUnit).and_then(|v| {
            let name = match v {
                1 => "None",
                2 => "Inch",
                3 => "Centimeter",
                _ => return None,
            };
            Some(name.to_string())
        }),
        compression: uint(Tag::Compression).and_then(|v| match v {
            1 => Some("Uncompressed".to_string()),
            6 => Some("JPEG".to_string()),
            _ => None,
        }),
    }
}

fn ascii(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref parts) => {
            let first = parts.first()?;
            let text = String::from_utf8_lossy(first)
                .trim_end_matches('\0')
                .trim()
                .to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

fn rational(field: &Field) -> Option<f64> {
    match field.value {
        Value::Rational(ref values) => values.first().and_then(ratio_value),
        _ => None,
    }
}

fn signed_rational(field: &Field) -> Option<f64> {
    match field.value {
        Value::SRational(ref values) => values
            .first()
            .filter(|r| r.denom != 0)
            .map(|r| r.num as f64 / r.denom as f64),
        _ => rational(field),
    }
}

fn ratio_value(r: &Rational) -> Option<f64> {
    (r.denom != 0).then(|| r.num as f64 / r.denom as f64)
}

/// Degrees/minutes/seconds to signed decimal degrees.
fn coordinate(dms: Option<&Field>, reference: Option<String>, negative_ref: &str) -> Option<f64> {
    let Value::Rational(ref parts) = dms?.value else {
        return None;
    };
    let mut degrees = 0.0;
    for (part, divisor) in parts.iter().zip([1.0, 60.0, 3600.0]) {
        degrees += ratio_value(part)? / divisor;
    }
    if reference.as_deref() == Some(negative_ref) {
        degrees = -degrees;
    }
    Some(degrees)
}

fn exposure_time(field: &Field) -> Option<String> {
    let Value::Rational(ref values) = field.value else {
        return None;
    };
    let r = values.first()?;
    let seconds = ratio_value(r)?;
    if seconds < 1.0 && seconds > 0.0 {
        Some(format!("1/{} s", (1.0 / seconds).round()))
    } else {
        Some(format!("{} s", seconds))
    }
}

/// `2024:05:01 13:45:10` → `2024-05-01T13:45:10`.
fn format_date(raw: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S")
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn orientation_name(value: u32) -> String {
    let name = match value {
        1 => "Normal",
        2 => "Flip Horizontal",
        3 => "Rotate 180°",
        4 => "Flip Vertical",
        5 => "Transpose",
        6 => "Rotate 90° CW",
        7 => "Transverse",
        8 => "Rotate 90° CCW",
        0 => "Undefined",
        _ => "Unknown",
    };
    format!("{} [{}]", name, value)
}

fn color_space_name(value: u32) -> Option<String> {
    match value {
        1 => Some("sRGB".to_string()),
        0xFFFF => Some("Uncalibrated".to_string()),
        _ => None,
    }
}

fn metering_mode_name(value: u32) -> Option<String> {
    let name = match value {
        0 => "Unknown",
        1 => "Average",
        2 => "Center Weighted Average",
        3 => "Spot",
        4 => "Multi Spot",
        5 => "Pattern",
        6 => "Partial",
        255 => "Other",
        _ => return None,
    };
    Some(name.to_string())
}

/// Decode the Flash bit field (fired, mode, return light, red-eye).
fn flash_description(value: u32) -> String {
    if value & 0x20 != 0 {
        return "No Flash Function".to_string();
    }

    let fired = value & 0x01 != 0;
    let mut parts = vec![if fired { "Flash Fired" } else { "Flash Did Not Fire" }];
    match (value >> 3) & 0x03 {
        1 | 2 => parts.push("Compulsory Flash Mode"),
        3 => parts.push("Auto Mode"),
        _ => {}
    }
    match (value >> 1) & 0x03 {
        2 => parts.push("Return Light Not Detected"),
        3 => parts.push("Return Light Detected"),
        _ => {}
    }
    if value & 0x40 != 0 {
        parts.push("Red-Eye Reduction Mode");
    }
    if parts.len() == 1 && !fired {
        return "No Flash".to_string();
    }
    parts.join(", ")
}

/// Test images carrying a small EXIF block.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use exif::experimental::Writer;
    use exif::{Field, In, Rational, Tag, Value};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    fn ascii(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    fn rationals(tag: Tag, values: &[(u32, u32)]) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Rational(
                values
                    .iter()
                    .map(|&(num, denom)| Rational { num, denom })
                    .collect(),
            ),
        }
    }

    fn short(tag: Tag, value: u16) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![value]),
        }
    }

    /// TIFF-structured EXIF: Acme X100, flash fired in auto mode,
    /// 2024:05:01 13:45:10, 48°30'0" S, 12 m.
    pub fn exif_block() -> Vec<u8> {
        let fields = [
            ascii(Tag::Make, "Acme"),
            ascii(Tag::Model, "X100"),
            ascii(Tag::DateTimeOriginal, "2024:05:01 13:45:10"),
            short(Tag::Flash, 0x19),
            rationals(Tag::FNumber, &[(28, 10)]),
            rationals(Tag::GPSLatitude, &[(48, 1), (30, 1), (0, 1)]),
            ascii(Tag::GPSLatitudeRef, "S"),
            rationals(Tag::GPSLongitude, &[(2, 1), (15, 1), (0, 1)]),
            ascii(Tag::GPSLongitudeRef, "E"),
            rationals(Tag::GPSAltitude, &[(12, 1)]),
        ];

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut out = Cursor::new(Vec::new());
        writer.write(&mut out, false).unwrap();
        out.into_inner()
    }

    /// Plain JPEG with `exif_block` spliced in as an APP1 segment.
    pub fn tagged_jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut plain = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 140, 200])))
            .write_to(&mut plain, ImageFormat::Jpeg)
            .unwrap();
        let plain = plain.into_inner();

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&exif_block());
        let segment_len = u16::try_from(payload.len() + 2).unwrap();

        let mut jpeg = plain[..2].to_vec(); // SOI
        jpeg.extend_from_slice(&[0xFF, 0xE1]);
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(&payload);
        jpeg.extend_from_slice(&plain[2..]);
        jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reads_camera_date_and_gps() {
        let data = read_exif_bytes(&fixtures::tagged_jpeg(16, 8)).unwrap();

        assert_eq!(data.camera_make.as_deref(), Some("Acme"));
        assert_eq!(data.camera_model.as_deref(), Some("X100"));
        assert_eq!(data.date_taken.as_deref(), Some("2024-05-01T13:45:10"));
        assert_eq!(data.original_time, data.date_taken);
        assert_eq!(data.flash.as_deref(), Some("Flash Fired, Auto Mode"));
        assert_eq!(data.aperture.as_deref(), Some("f/2.8"));

        assert!(data.has_location());
        assert_relative_eq!(data.latitude.unwrap(), -48.5);
        assert_relative_eq!(data.longitude.unwrap(), 2.25);
        assert_relative_eq!(data.altitude.unwrap(), 12.0);
    }

    #[test]
    fn untagged_image_has_no_exif() {
        let mut plain = Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(4, 4)
            .write_to(&mut plain, image::ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(read_exif_bytes(plain.get_ref()), None);
        assert_eq!(read_exif_bytes(b"not an image"), None);
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.jpg");
        std::fs::write(&path, fixtures::tagged_jpeg(8, 8)).unwrap();

        let data = read_exif_file(&path).unwrap();
        assert_eq!(data.camera_model.as_deref(), Some("X100"));
        assert_eq!(read_exif_file(&dir.path().join("missing.jpg")), None);
    }

    #[test]
    fn unparseable_dates_pass_through() {
        assert_eq!(format_date("2024:05:01 13:45:10"), "2024-05-01T13:45:10");
        assert_eq!(format_date("sometime in May"), "sometime in May");
    }

    #[test]
    fn flash_bits_are_described() {
        assert_eq!(flash_description(0x00), "No Flash");
        assert_eq!(flash_description(0x01), "Flash Fired");
        assert_eq!(flash_description(0x10), "Flash Did Not Fire, Compulsory Flash Mode");
        assert_eq!(flash_description(0x20), "No Flash Function");
        assert_eq!(
            flash_description(0x5F),
            "Flash Fired, Auto Mode, Return Light Detected, Red-Eye Reduction Mode"
        );
    }

    #[test]
    fn orientation_names_carry_value() {
        assert_eq!(orientation_name(6), "Rotate 90° CW [6]");
        assert_eq!(orientation_name(42), "Unknown [42]");
    }
}
