//! V4L2 still capture.
//!
//! Opens the node in MJPEG so a single dequeued buffer is already a JPEG
//! file. A few frames are discarded after stream-on while auto exposure
//! settles.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use photo_capture_core::models::camera_models::{CameraFacing, CaptureModeHint, FlashMode};
use photo_capture_core::models::error::CaptureError;
use photo_capture_core::traits::camera_backend::{BindRequest, CameraBackend, CameraBinding};

use crate::device_enumerator::DeviceEnumerator;

const MJPEG: &[u8; 4] = b"MJPG";
const STREAM_BUFFERS: u32 = 4;

#[derive(Debug, thiserror::Error)]
enum V4lError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("format negotiation failed: {0}")]
    Format(io::Error),

    #[error("{} cannot stream MJPEG (driver offered {offered})", path.display())]
    NoMjpeg { path: PathBuf, offered: String },

    #[error("stream error: {0}")]
    Stream(io::Error),

    #[error("failed to write frame: {0}")]
    Write(io::Error),

    #[error("camera was released")]
    Released,
}

impl From<V4lError> for CaptureError {
    fn from(e: V4lError) -> Self {
        match e {
            V4lError::Open { .. } | V4lError::Format(_) | V4lError::NoMjpeg { .. } => {
                CaptureError::CameraBind(e.to_string())
            }
            V4lError::Write(e) => CaptureError::Storage(e.to_string()),
            V4lError::Released => CaptureError::CameraNotInitialized,
            V4lError::Stream(_) => CaptureError::Unknown(e.to_string()),
        }
    }
}

/// `CameraBackend` over Video4Linux2 capture nodes.
pub struct V4lCameraBackend {
    enumerator: DeviceEnumerator,
    resolution: (u32, u32),
}

impl Default for V4lCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl V4lCameraBackend {
    /// Backend over `/dev` asking for 1920x1080.
    pub fn new() -> Self {
        Self::with_enumerator(DeviceEnumerator::new())
    }

    pub fn with_enumerator(enumerator: DeviceEnumerator) -> Self {
        Self {
            enumerator,
            resolution: (1920, 1080),
        }
    }

    /// Requested frame size. The driver may pick the nearest it supports.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }
}

#[async_trait]
impl CameraBackend for V4lCameraBackend {
    fn is_available(&self, facing: CameraFacing) -> bool {
        self.enumerator.device_for(facing).is_ok()
    }

    async fn bind(&self, request: BindRequest) -> Result<Arc<dyn CameraBinding>, CaptureError> {
        let node = self.enumerator.device_for(request.facing)?;
        let (width, height) = self.resolution;
        let warmup = warmup_frames(request.capture_mode);

        let device = tokio::task::spawn_blocking(move || open_mjpeg(&node.path, width, height))
            .await
            .map_err(|e| CaptureError::CameraBind(format!("bind task failed: {}", e)))??;

        Ok(Arc::new(V4lBinding::new(Some(device), request.flash_mode, warmup)))
    }
}

/// Frames dropped before the kept one.
fn warmup_frames(mode: CaptureModeHint) -> usize {
    match mode {
        CaptureModeHint::ZeroShutterLag => 0,
        CaptureModeHint::MinimizeLatency => 2,
        CaptureModeHint::MaximizeQuality => 5,
    }
}

fn open_mjpeg(path: &Path, width: u32, height: u32) -> Result<Device, V4lError> {
    let device = Device::with_path(path).map_err(|source| V4lError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut format = device.format().map_err(V4lError::Format)?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(MJPEG);
    let actual = device.set_format(&format).map_err(V4lError::Format)?;

    if actual.fourcc != FourCC::new(MJPEG) {
        return Err(V4lError::NoMjpeg {
            path: path.to_path_buf(),
            offered: actual.fourcc.to_string(),
        });
    }
    if (actual.width, actual.height) != (width, height) {
        log::warn!(
            target: "photo_capture",
            "{}: requested {}x{}, driver chose {}x{}",
            path.display(),
            width,
            height,
            actual.width,
            actual.height
        );
    }
    log::info!(
        target: "photo_capture",
        "opened {} at {}x{} MJPEG",
        path.display(),
        actual.width,
        actual.height
    );
    Ok(device)
}

/// A V4L2 node opened for MJPEG still capture.
///
/// A capture holds the device lock for the whole grab, so `unbind` never
/// waits for it: it raises `released` and the capture closes the device
/// once its frame is written.
pub struct V4lBinding {
    device: Arc<Mutex<Option<Device>>>,
    released: Arc<AtomicBool>,
    flash_mode: Mutex<FlashMode>,
    warmup: usize,
}

impl V4lBinding {
    fn new(device: Option<Device>, flash_mode: FlashMode, warmup: usize) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            released: Arc::new(AtomicBool::new(false)),
            flash_mode: Mutex::new(flash_mode),
            warmup,
        }
    }

    /// Last requested flash mode. Webcams have no flash; it is only recorded.
    pub fn flash_mode(&self) -> FlashMode {
        *self.flash_mode.lock()
    }
}

#[async_trait]
impl CameraBinding for V4lBinding {
    fn set_flash_mode(&self, mode: FlashMode) {
        *self.flash_mode.lock() = mode;
        log::debug!(target: "photo_capture", "flash {:?} requested on a flashless device", mode);
    }

    async fn take_picture(&self, output: &Path) -> Result<(), CaptureError> {
        let device = Arc::clone(&self.device);
        let released = Arc::clone(&self.released);
        let output = output.to_path_buf();
        let warmup = self.warmup;

        tokio::task::spawn_blocking(move || {
            let mut guard = device.lock();
            if released.load(Ordering::Acquire) {
                close(guard.take());
                return Err(V4lError::Released);
            }
            let grabbed = match guard.as_ref() {
                Some(device) => grab_frame(device, warmup, &output),
                None => Err(V4lError::Released),
            };
            // Released mid-grab; the close was left to us.
            if released.load(Ordering::Acquire) {
                close(guard.take());
            }
            grabbed
        })
        .await
        .map_err(|e| CaptureError::Unknown(format!("capture task failed: {}", e)))?
        .map_err(CaptureError::from)
    }

    fn unbind(&self) {
        self.released.store(true, Ordering::Release);
        match self.device.try_lock() {
            Some(mut guard) => close(guard.take()),
            None => log::debug!(target: "photo_capture", "capture in progress, deferring device close"),
        }
    }
}

fn close(device: Option<Device>) {
    if let Some(device) = device {
        drop(device);
        log::debug!(target: "photo_capture", "V4L2 device closed");
    }
}

fn grab_frame(device: &Device, warmup: usize, output: &Path) -> Result<(), V4lError> {
    let mut stream =
        Stream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS).map_err(V4lError::Stream)?;

    for _ in 0..warmup {
        stream.next().map_err(V4lError::Stream)?;
    }
    let (buffer, meta) = stream.next().map_err(V4lError::Stream)?;
    let used = (meta.bytesused as usize).min(buffer.len());
    let frame = if used == 0 { buffer } else { &buffer[..used] };

    std::fs::write(output, frame).map_err(V4lError::Write)
}
