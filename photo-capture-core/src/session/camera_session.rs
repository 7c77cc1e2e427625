use std::cell::Cell;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::models::camera_models::{CameraFacing, CapturePreference, FlashMode};
use crate::models::capture_result::CaptureResult;
use crate::models::config::SessionConfig;
use crate::models::error::CaptureError;
use crate::models::state::SessionState;
use crate::processing::image_processor::ImagePostProcessor;
use crate::storage::file_store::FileStore;
use crate::traits::camera_backend::{BindRequest, CameraBackend, CameraBinding, PreviewSink};
use crate::traits::logger::{LogFacadeLogger, PickerLogger};
use crate::traits::session_delegate::CameraSessionDelegate;

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionInner {
    state: SessionState,
    facing: CameraFacing,
    flash_mode: FlashMode,
    binding: Option<Arc<dyn CameraBinding>>,
    /// Surface and preference of the last `start`, reused by `restart`.
    surface: Option<Arc<dyn PreviewSink>>,
    preference: Option<CapturePreference>,
    attached_preview: Option<Arc<dyn PreviewSink>>,
    /// Bumped by every binding mutation; a bind that finishes under an
    /// older generation is stale.
    generation: u64,
    pending_bind: Option<CancellationToken>,
    in_flight_captures: usize,
    /// Bumped by every state transition.
    state_seq: u64,
}

/// A state transition waiting to be delivered to the delegate.
struct Notice {
    state: SessionState,
    seq: u64,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: SessionState::Unbound,
            facing: CameraFacing::default(),
            flash_mode: FlashMode::default(),
            binding: None,
            surface: None,
            preference: None,
            attached_preview: None,
            generation: 0,
            pending_bind: None,
            in_flight_captures: 0,
            state_seq: 0,
        }
    }

    fn transition(&mut self, state: SessionState) -> Notice {
        self.state = state.clone();
        self.state_seq += 1;
        Notice {
            state,
            seq: self.state_seq,
        }
    }

    /// `Capturing` while shots are outstanding, `Bound` otherwise.
    fn settled_state(&self) -> SessionState {
        match self.in_flight_captures {
            0 => SessionState::Bound,
            n => SessionState::Capturing { in_flight: n },
        }
    }

    /// Bumps the generation and cancels any bind still in flight.
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        if let Some(pending) = self.pending_bind.take() {
            pending.cancel();
        }
        self.generation
    }
}

/// State shared with spawned capture tasks.
struct Shared {
    inner: Mutex<SessionInner>,
    delegate: Mutex<Option<Arc<dyn CameraSessionDelegate>>>,
    /// Sequence number of the last delivered notice. Held across delivery
    /// so the delegate never observes transitions out of order; reentrant
    /// because the delegate may call back into the session.
    delivered: ReentrantMutex<Cell<u64>>,
    logger: Arc<dyn PickerLogger>,
}

impl Shared {
    fn new(logger: Arc<dyn PickerLogger>) -> Self {
        Self {
            inner: Mutex::new(SessionInner::new()),
            delegate: Mutex::new(None),
            delivered: ReentrantMutex::new(Cell::new(0)),
            logger,
        }
    }

    /// Deliver `notice` unless a later transition already reached the delegate.
    fn notify(&self, notice: Notice) {
        let delivered = self.delivered.lock();
        if notice.seq <= delivered.get() {
            self.logger
                .log_debug(&format!("dropping stale state notice {:?}", notice.state));
            return;
        }
        delivered.set(notice.seq);

        let delegate = self.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_state_changed(&notice.state);
        }
    }

    fn capture_finished(&self) {
        let notice = {
            let mut inner = self.inner.lock();
            inner.in_flight_captures = inner.in_flight_captures.saturating_sub(1);
            if inner.state.is_capturing() {
                let settled = inner.settled_state();
                Some(inner.transition(settled))
            } else {
                None
            }
        };
        if let Some(notice) = notice {
            self.notify(notice);
        }
    }
}

/// Callbacks of one capture.
///
/// Exactly one of them fires: through `finish`, or from `Drop` with an
/// error if the capture task is torn down before producing an outcome.
struct CaptureReport<R, E>
where
    R: FnOnce(CaptureResult),
    E: FnOnce(CaptureError),
{
    shared: Arc<Shared>,
    callbacks: Option<(R, E)>,
}

impl<R, E> CaptureReport<R, E>
where
    R: FnOnce(CaptureResult),
    E: FnOnce(CaptureError),
{
    fn new(shared: Arc<Shared>, on_result: R, on_error: E) -> Self {
        Self {
            shared,
            callbacks: Some((on_result, on_error)),
        }
    }

    fn finish(mut self, outcome: Result<CaptureResult, CaptureError>) {
        let Some((on_result, on_error)) = self.callbacks.take() else {
            return;
        };
        self.shared.capture_finished();
        match outcome {
            Ok(result) => {
                self.shared.logger.log(&format!("captured {}", result.uri));
                on_result(result);
            }
            Err(e) => {
                self.shared.logger.log_error("capture failed", Some(&e));
                on_error(e);
            }
        }
    }
}

impl<R, E> Drop for CaptureReport<R, E>
where
    R: FnOnce(CaptureResult),
    E: FnOnce(CaptureError),
{
    fn drop(&mut self) {
        if let Some((_, on_error)) = self.callbacks.take() {
            self.shared.capture_finished();
            let e = CaptureError::Unknown("capture task ended without a result".into());
            self.shared.logger.log_error("capture abandoned", Some(&e));
            on_error(e);
        }
    }
}

/// Owns the camera binding and drives start/stop/switch/flash/capture.
///
/// ```text
/// start ──→ [unbind old] → [CameraBackend::bind ⟂ cancel ⟂ timeout] → bound
/// capture → [FileStore target] → [CameraBinding::take_picture] → [ImagePostProcessor] → callback
/// ```
///
/// Binding mutations (`start`, `restart`, `stop`) are serialized through a
/// generation counter: a newer one cancels an older in-flight bind, and a
/// bind that completes after being superseded is released, never applied.
pub struct CameraSession {
    backend: Arc<dyn CameraBackend>,
    processor: Arc<ImagePostProcessor>,
    config: SessionConfig,
    shared: Arc<Shared>,
    runtime: Option<Handle>,
}

impl CameraSession {
    /// Session with a `FileStore` in `config.output_directory`, no
    /// compression, and logging through the `log` facade.
    pub fn new(backend: Arc<dyn CameraBackend>, config: SessionConfig) -> Self {
        let logger: Arc<dyn PickerLogger> = Arc::new(LogFacadeLogger);
        let file_store = Arc::new(FileStore::new(config.output_directory.clone()));
        let processor = Arc::new(ImagePostProcessor::new(file_store, Arc::clone(&logger)));
        Self::with_processor(backend, processor, config, logger)
    }

    pub fn with_processor(
        backend: Arc<dyn CameraBackend>,
        processor: Arc<ImagePostProcessor>,
        config: SessionConfig,
        logger: Arc<dyn PickerLogger>,
    ) -> Self {
        Self {
            backend,
            processor,
            config,
            shared: Arc::new(Shared::new(logger)),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Runtime used for capture tasks when `capture` is called from outside one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CameraSessionDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state.clone()
    }

    pub fn facing(&self) -> CameraFacing {
        self.shared.inner.lock().facing
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.shared.inner.lock().flash_mode
    }

    pub fn is_bound(&self) -> bool {
        self.shared.inner.lock().binding.is_some()
    }

    pub fn has_camera(&self, facing: CameraFacing) -> bool {
        self.backend.is_available(facing)
    }

    /// Bind the camera for the current facing.
    ///
    /// Tears down any previous binding first. Resolves once the backend has
    /// bound, failed, timed out, or this call has been superseded by a newer
    /// `start`/`restart`/`stop` (`CaptureError::BindSuperseded`).
    pub async fn start(
        &self,
        surface: Option<Arc<dyn PreviewSink>>,
        preference: CapturePreference,
    ) -> Result<(), CaptureError> {
        let token = CancellationToken::new();

        let (generation, request, previous, detached, notice) = {
            let mut inner = self.shared.inner.lock();
            let generation = inner.supersede();
            inner.pending_bind = Some(token.clone());
            inner.surface = surface.clone();
            inner.preference = Some(preference);
            let notice = inner.transition(SessionState::Binding);

            let request = BindRequest {
                facing: inner.facing,
                capture_mode: preference.capture_mode(),
                flash_mode: inner.flash_mode,
                preview: surface,
            };
            (
                generation,
                request,
                inner.binding.take(),
                inner.attached_preview.take(),
                notice,
            )
        };
        self.shared.notify(notice);

        if let Some(preview) = detached {
            preview.detach();
        }
        if let Some(binding) = previous {
            binding.unbind();
        }

        self.shared.logger.log_debug(&format!(
            "binding {:?} camera ({:?}, flash {:?})",
            request.facing, request.capture_mode, request.flash_mode
        ));

        let timeout = self.config.bind_timeout;
        let outcome = tokio::select! {
            _ = token.cancelled() => Err(CaptureError::BindSuperseded),
            result = tokio::time::timeout(timeout, self.backend.bind(request)) => match result {
                Ok(bound) => bound,
                Err(_) => Err(CaptureError::CameraBindTimeout(timeout)),
            },
        };

        self.finish_bind(generation, outcome)
    }

    /// Rebind with the surface and preference of the last `start`.
    ///
    /// This is how a `switch_camera` takes effect.
    pub async fn restart(&self) -> Result<(), CaptureError> {
        let (surface, preference) = {
            let inner = self.shared.inner.lock();
            (inner.surface.clone(), inner.preference)
        };
        let preference = preference.ok_or(CaptureError::CameraNotInitialized)?;
        self.start(surface, preference).await
    }

    fn finish_bind(
        &self,
        generation: u64,
        outcome: Result<Arc<dyn CameraBinding>, CaptureError>,
    ) -> Result<(), CaptureError> {
        // Flash may have changed while the bind was in flight. The binding
        // is only installed once it carries the remembered mode; it is
        // applied outside the lock and re-checked.
        let mut applied_flash = None;
        let mut inner = loop {
            let inner = self.shared.inner.lock();
            if inner.generation != generation {
                drop(inner);
                if let Ok(stale) = outcome {
                    stale.unbind();
                }
                self.shared
                    .logger
                    .log_debug("discarding bind superseded by a newer request");
                return Err(CaptureError::BindSuperseded);
            }
            match &outcome {
                Ok(binding) if applied_flash != Some(inner.flash_mode) => {
                    let mode = inner.flash_mode;
                    drop(inner);
                    binding.set_flash_mode(mode);
                    applied_flash = Some(mode);
                }
                _ => break inner,
            }
        };
        inner.pending_bind = None;

        match outcome {
            Ok(binding) => {
                inner.binding = Some(binding);
                inner.attached_preview = inner.surface.clone();
                let settled = inner.settled_state();
                let notice = inner.transition(settled);
                let facing = inner.facing;
                let preview = inner.attached_preview.clone();
                drop(inner);

                if let Some(preview) = preview {
                    preview.attach(facing);
                }
                self.shared.logger.log(&format!("{:?} camera bound", facing));
                self.shared.notify(notice);
                Ok(())
            }
            Err(e) => {
                let notice = inner.transition(SessionState::Error(e.clone()));
                drop(inner);

                self.shared.logger.log_error("camera bind failed", Some(&e));
                self.shared.notify(notice);
                Err(e)
            }
        }
    }

    /// Release the binding. Safe from any state, including before `start`.
    pub fn stop(&self) {
        let (binding, preview, notice) = {
            let mut inner = self.shared.inner.lock();
            inner.supersede();
            let binding = inner.binding.take();
            let preview = inner.attached_preview.take();
            let notice = match inner.state {
                SessionState::Unbound | SessionState::Stopped => None,
                _ => Some(inner.transition(SessionState::Stopped)),
            };
            (binding, preview, notice)
        };

        if let Some(preview) = preview {
            preview.detach();
        }
        if let Some(binding) = binding {
            binding.unbind();
            self.shared.logger.log("camera released");
        }
        if let Some(notice) = notice {
            self.shared.notify(notice);
        }
    }

    /// Flip between back and front.
    ///
    /// Only the remembered facing changes; call `restart` (or `start`) to
    /// rebind the hardware.
    pub fn switch_camera(&self) -> CameraFacing {
        let mut inner = self.shared.inner.lock();
        inner.facing = inner.facing.toggled();
        self.shared
            .logger
            .log_debug(&format!("facing switched to {:?}", inner.facing));
        inner.facing
    }

    /// Remember `mode` and apply it to the live binding, if any.
    pub fn set_flash_mode(&self, mode: FlashMode) {
        let binding = {
            let mut inner = self.shared.inner.lock();
            inner.flash_mode = mode;
            inner.binding.clone()
        };
        if let Some(binding) = binding {
            binding.set_flash_mode(mode);
        }
    }

    /// Advance to the next flash mode and return it.
    pub fn cycle_flash_mode(&self) -> FlashMode {
        let next = self.flash_mode().next();
        self.set_flash_mode(next);
        next
    }

    /// Take a photo.
    ///
    /// Without a binding, `on_error(CameraNotInitialized)` runs before this
    /// returns and no hardware call is made. Otherwise the shutter and
    /// post-processing run on the async runtime and exactly one of the two
    /// callbacks fires once they finish, even if the backend panics or the
    /// runtime drops the task.
    pub fn capture<R, E>(&self, on_result: R, on_error: E)
    where
        R: FnOnce(CaptureResult) + Send + 'static,
        E: FnOnce(CaptureError) + Send + 'static,
    {
        let live = {
            let inner = self.shared.inner.lock();
            let facing = inner.facing;
            inner.binding.clone().map(|binding| (binding, facing))
        };
        let Some((binding, facing)) = live else {
            self.shared
                .logger
                .log_error("capture requested without a camera", None);
            on_error(CaptureError::CameraNotInitialized);
            return;
        };

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            on_error(CaptureError::RuntimeUnavailable);
            return;
        };

        let output = match self.processor.file_store().new_output_target() {
            Ok(path) => path,
            Err(e) => {
                self.shared
                    .logger
                    .log_error("could not allocate capture target", Some(&e));
                on_error(e);
                return;
            }
        };

        let notice = {
            let mut inner = self.shared.inner.lock();
            inner.in_flight_captures += 1;
            let capturing = SessionState::Capturing {
                in_flight: inner.in_flight_captures,
            };
            inner.transition(capturing)
        };
        self.shared.notify(notice);

        let processor = Arc::clone(&self.processor);
        let report = CaptureReport::new(Arc::clone(&self.shared), on_result, on_error);

        runtime.spawn(async move {
            // The shutter gets its own task so a panicking backend surfaces
            // as a JoinError instead of unwinding through the report.
            let target = output.clone();
            let shutter = tokio::spawn(async move { binding.take_picture(&target).await });
            let shot = match shutter.await {
                Ok(shot) => shot,
                Err(e) => Err(CaptureError::Unknown(format!("shutter task failed: {}", e))),
            };

            let outcome = match shot {
                Ok(()) => {
                    match tokio::task::spawn_blocking(move || processor.process(&output, facing)).await {
                        Ok(processed) => processed,
                        Err(e) => Err(CaptureError::ImageProcessing(format!(
                            "post-processing task failed: {}",
                            e
                        ))),
                    }
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&output);
                    Err(e)
                }
            };
            report.finish(outcome);
        });
    }

    /// `capture` as a future.
    pub async fn capture_async(&self) -> Result<CaptureResult, CaptureError> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let tx_err = Arc::clone(&tx);

        self.capture(
            move |result| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Ok(result));
                }
            },
            move |error| {
                if let Some(tx) = tx_err.lock().take() {
                    let _ = tx.send(Err(error));
                }
            },
        );

        rx.await
            .map_err(|_| CaptureError::Unknown("capture task dropped".into()))?
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}
