pub mod camera_session;
pub mod permission;
