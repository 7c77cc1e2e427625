pub mod compression;
pub mod crop;
pub mod exif_reader;
pub mod gallery;
pub mod image_processor;
pub mod orientation;
