use super::error::CaptureError;

/// Camera session state machine.
///
/// State transitions:
/// ```text
/// unbound ─┐
///          ├→ binding → bound ↔ capturing
/// stopped ─┘     ↓        ↓
///              error    stopped
/// ```
/// A newer `start` moves any state back to `binding`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unbound,
    Binding,
    Bound,
    Capturing { in_flight: usize },
    Stopped,
    Error(CaptureError),
}

impl SessionState {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound | Self::Capturing { .. })
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Runtime permission negotiation state.
///
/// ```text
/// unknown → requesting → granted
///               ↓  ↑
///          denied_soft → denied_permanent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionState {
    Unknown,
    Requesting,
    Granted,
    DeniedSoft,
    DeniedPermanent,
}

impl PermissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Granted | Self::DeniedPermanent)
    }
}
