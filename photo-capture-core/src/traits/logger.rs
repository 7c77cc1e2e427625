use crate::models::error::CaptureError;

const LOG_TARGET: &str = "photo_capture";

/// Logging capability handed to every component.
pub trait PickerLogger: Send + Sync {
    fn log(&self, message: &str);

    fn log_error(&self, message: &str, cause: Option<&CaptureError>);

    fn log_debug(&self, message: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeLogger;

impl PickerLogger for LogFacadeLogger {
    fn log(&self, message: &str) {
        log::info!(target: LOG_TARGET, "{}", message);
    }

    fn log_error(&self, message: &str, cause: Option<&CaptureError>) {
        match cause {
            Some(e) => log::error!(target: LOG_TARGET, "{}: {}", message, e),
            None => log::error!(target: LOG_TARGET, "{}", message),
        }
    }

    fn log_debug(&self, message: &str) {
        log::debug!(target: LOG_TARGET, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl PickerLogger for NoopLogger {
    fn log(&self, _message: &str) {}

    fn log_error(&self, _message: &str, _cause: Option<&CaptureError>) {}

    fn log_debug(&self, _message: &str) {}
}
