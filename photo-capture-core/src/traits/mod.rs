pub mod camera_backend;
pub mod gallery_selector;
pub mod logger;
pub mod permission_platform;
pub mod session_delegate;
