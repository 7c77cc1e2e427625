use serde::{Deserialize, Serialize};

/// Capture preference chosen once per session start.
///
/// Immutable for the lifetime of a binding; changing it requires a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CapturePreference {
    Fast,
    Balanced,
    Quality,
}

impl CapturePreference {
    pub const ALL: [CapturePreference; 3] = [Self::Fast, Self::Balanced, Self::Quality];

    /// Hardware capture-mode hint handed to the backend at bind time.
    pub fn capture_mode(self) -> CaptureModeHint {
        match self {
            Self::Fast => CaptureModeHint::ZeroShutterLag,
            Self::Balanced => CaptureModeHint::MinimizeLatency,
            Self::Quality => CaptureModeHint::MaximizeQuality,
        }
    }
}

impl Default for CapturePreference {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Backend-facing capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureModeHint {
    ZeroShutterLag,
    MinimizeLatency,
    MaximizeQuality,
}

/// Flash mode, in the order it cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlashMode {
    Auto,
    On,
    Off,
}

impl FlashMode {
    pub const ALL: [FlashMode; 3] = [Self::Auto, Self::On, Self::Off];

    /// The next mode in declaration order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::Auto => Self::On,
            Self::On => Self::Off,
            Self::Off => Self::Auto,
        }
    }
}

impl Default for FlashMode {
    fn default() -> Self {
        Self::Auto
    }
}

/// Which physical camera is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CameraFacing {
    Back,
    Front,
}

impl CameraFacing {
    pub fn toggled(self) -> Self {
        match self {
            Self::Back => Self::Front,
            Self::Front => Self::Back,
        }
    }

    /// Front sensors are mounted mirrored.
    pub fn is_mirrored(self) -> bool {
        matches!(self, Self::Front)
    }
}

impl Default for CameraFacing {
    fn default() -> Self {
        Self::Back
    }
}
