use async_trait::async_trait;

/// Platform hook for a single runtime permission.
#[async_trait]
pub trait PermissionPlatform: Send + Sync {
    /// Whether the permission is currently granted.
    fn is_granted(&self) -> bool;

    /// Show the platform prompt and resolve to the user's answer.
    async fn request(&self) -> bool;

    /// Whether the platform would still show a rationale. Queried at denial time.
    fn should_show_rationale(&self) -> bool;

    /// Send the user to the system settings page for this app.
    fn open_settings(&self) {}
}

/// In-app prompts shown between platform requests.
///
/// These are UI collaborators; the negotiator only needs the user's answer.
#[async_trait]
pub trait PermissionPrompts: Send + Sync {
    /// Explain why the permission is needed. Resolves to `true` if the user
    /// wants to be asked again.
    async fn show_rationale(&self) -> bool;

    /// Offer to open system settings. Resolves to `true` if accepted.
    async fn show_settings(&self) -> bool;
}

/// Prompts that never ask: no retry, no settings.
pub struct SilentPrompts;

#[async_trait]
impl PermissionPrompts for SilentPrompts {
    async fn show_rationale(&self) -> bool {
        false
    }

    async fn show_settings(&self) -> bool {
        false
    }
}
