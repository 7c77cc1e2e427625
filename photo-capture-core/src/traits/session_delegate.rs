use crate::models::state::SessionState;

/// Event delegate for camera session notifications.
///
/// Called from whichever task drove the transition; implementations should
/// marshal to the UI thread if needed.
pub trait CameraSessionDelegate: Send + Sync {
    fn on_state_changed(&self, state: &SessionState);
}
