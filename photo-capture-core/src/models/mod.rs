pub mod camera_models;
pub mod capture_result;
pub mod config;
pub mod error;
pub mod exif_data;
pub mod state;
