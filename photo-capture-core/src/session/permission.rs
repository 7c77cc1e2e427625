use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::PermissionConfig;
use crate::models::error::CaptureError;
use crate::models::state::PermissionState;
use crate::traits::logger::PickerLogger;
use crate::traits::permission_platform::{PermissionPlatform, PermissionPrompts};

struct NegotiatorInner {
    state: PermissionState,
    /// Denials seen by this negotiator. Not persisted.
    denials: u32,
    permanently_denied_reported: bool,
}

/// Drives the ask / retry / permanently-denied protocol for one runtime
/// permission.
///
/// ```text
/// granted? ─yes→ Granted
///    │no
///    ▼
/// Requesting ─granted→ Granted
///    │denied (count += 1)
///    ├─ count < threshold → DeniedSoft ─retry→ Requesting
///    │                                 └─decline→ on_denied
///    └─ count ≥ threshold → DeniedPermanent → on_permanently_denied (once) → settings
/// ```
///
/// Permanence is decided by the denial counter. The platform's rationale
/// signal only counts when `PermissionConfig::trust_platform_rationale` is set.
pub struct PermissionNegotiator {
    platform: Arc<dyn PermissionPlatform>,
    prompts: Arc<dyn PermissionPrompts>,
    config: PermissionConfig,
    logger: Arc<dyn PickerLogger>,
    inner: Mutex<NegotiatorInner>,
}

impl PermissionNegotiator {
    pub fn new(
        platform: Arc<dyn PermissionPlatform>,
        prompts: Arc<dyn PermissionPrompts>,
        config: PermissionConfig,
        logger: Arc<dyn PickerLogger>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::Unknown)?;
        Ok(Self {
            platform,
            prompts,
            config,
            logger,
            inner: Mutex::new(NegotiatorInner {
                state: PermissionState::Unknown,
                denials: 0,
                permanently_denied_reported: false,
            }),
        })
    }

    pub fn state(&self) -> PermissionState {
        self.inner.lock().state
    }

    pub fn denial_count(&self) -> u32 {
        self.inner.lock().denials
    }

    fn set_state(&self, state: PermissionState) {
        self.inner.lock().state = state;
    }

    /// Run the protocol until it settles and return where it settled.
    ///
    /// Exactly one callback fires per call, except that `on_permanently_denied`
    /// fires at most once per negotiator. Later calls that end permanently
    /// denied report through `on_denied(PermissionPermanentlyDenied)`.
    pub async fn request_permission<G, D, P>(
        &self,
        on_granted: G,
        on_denied: D,
        on_permanently_denied: P,
    ) -> PermissionState
    where
        G: FnOnce() + Send,
        D: FnOnce(CaptureError) + Send,
        P: FnOnce() + Send,
    {
        if self.platform.is_granted() {
            self.set_state(PermissionState::Granted);
            on_granted();
            return PermissionState::Granted;
        }

        if self.state() == PermissionState::DeniedPermanent {
            self.logger.log_debug("permission still permanently denied");
            self.offer_settings().await;
            on_denied(CaptureError::PermissionPermanentlyDenied);
            return PermissionState::DeniedPermanent;
        }

        loop {
            self.set_state(PermissionState::Requesting);
            let granted = self.platform.request().await || self.platform.is_granted();

            if granted {
                self.set_state(PermissionState::Granted);
                self.logger.log("permission granted");
                on_granted();
                return PermissionState::Granted;
            }

            let (denials, permanent) = {
                let mut inner = self.inner.lock();
                inner.denials += 1;
                let permanent = inner.denials >= self.config.denial_threshold
                    || (self.config.trust_platform_rationale
                        && !self.platform.should_show_rationale());
                inner.state = if permanent {
                    PermissionState::DeniedPermanent
                } else {
                    PermissionState::DeniedSoft
                };
                (inner.denials, permanent)
            };

            if permanent {
                self.logger.log_error(
                    &format!("permission permanently denied after {} denials", denials),
                    Some(&CaptureError::PermissionPermanentlyDenied),
                );
                let first_report = {
                    let mut inner = self.inner.lock();
                    !std::mem::replace(&mut inner.permanently_denied_reported, true)
                };
                if first_report {
                    on_permanently_denied();
                } else {
                    on_denied(CaptureError::PermissionPermanentlyDenied);
                }
                self.offer_settings().await;
                return PermissionState::DeniedPermanent;
            }

            self.logger
                .log_debug(&format!("permission denied ({} so far), showing rationale", denials));
            if !self.prompts.show_rationale().await {
                on_denied(CaptureError::PermissionDenied);
                return PermissionState::DeniedSoft;
            }
        }
    }

    async fn offer_settings(&self) {
        if self.prompts.show_settings().await {
            self.logger.log("opening system settings");
            self.platform.open_settings();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::logger::NoopLogger;
    use crate::traits::permission_platform::SilentPrompts;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakePlatform {
        granted: AtomicBool,
        answers: Mutex<VecDeque<bool>>,
        requests: AtomicUsize,
        rationale_exhausted: bool,
        settings_opened: AtomicUsize,
    }

    impl FakePlatform {
        fn answering(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PermissionPlatform for FakePlatform {
        fn is_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        async fn request(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let answer = self.answers.lock().pop_front().unwrap_or(false);
            self.granted.store(answer, Ordering::SeqCst);
            answer
        }

        fn should_show_rationale(&self) -> bool {
            !self.rationale_exhausted
        }

        fn open_settings(&self) {
            self.settings_opened.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedPrompts {
        retry: bool,
        settings: bool,
        rationales: AtomicUsize,
    }

    impl ScriptedPrompts {
        fn new(retry: bool, settings: bool) -> Self {
            Self {
                retry,
                settings,
                rationales: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PermissionPrompts for ScriptedPrompts {
        async fn show_rationale(&self) -> bool {
            self.rationales.fetch_add(1, Ordering::SeqCst);
            self.retry
        }

        async fn show_settings(&self) -> bool {
            self.settings
        }
    }

    #[derive(Default)]
    struct Outcomes {
        granted: AtomicUsize,
        denied: Mutex<Vec<CaptureError>>,
        permanent: AtomicUsize,
    }

    impl Outcomes {
        async fn request(&self, negotiator: &PermissionNegotiator) -> PermissionState {
            negotiator
                .request_permission(
                    || {
                        self.granted.fetch_add(1, Ordering::SeqCst);
                    },
                    |e| self.denied.lock().push(e),
                    || {
                        self.permanent.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .await
        }
    }

    fn negotiator(
        platform: Arc<FakePlatform>,
        prompts: Arc<dyn PermissionPrompts>,
        config: PermissionConfig,
    ) -> PermissionNegotiator {
        PermissionNegotiator::new(platform, prompts, config, Arc::new(NoopLogger)).unwrap()
    }

    #[tokio::test]
    async fn already_granted_skips_prompt() {
        let platform = Arc::new(FakePlatform::default());
        platform.granted.store(true, Ordering::SeqCst);
        let negotiator = negotiator(
            platform.clone(),
            Arc::new(SilentPrompts),
            PermissionConfig::default(),
        );
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::Granted);
        assert_eq!(outcomes.granted.load(Ordering::SeqCst), 1);
        assert_eq!(platform.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn granted_on_retry_after_one_denial() {
        let platform = Arc::new(FakePlatform::answering(&[false, true]));
        let prompts = Arc::new(ScriptedPrompts::new(true, false));
        let negotiator = negotiator(platform.clone(), prompts.clone(), PermissionConfig::default());
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::Granted);
        assert_eq!(negotiator.denial_count(), 1);
        assert_eq!(prompts.rationales.load(Ordering::SeqCst), 1);
        assert_eq!(platform.requests.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes.granted.load(Ordering::SeqCst), 1);
        assert!(outcomes.denied.lock().is_empty());
    }

    #[tokio::test]
    async fn second_denial_is_permanent_and_reported_once() {
        let platform = Arc::new(FakePlatform::answering(&[false, false]));
        let prompts = Arc::new(ScriptedPrompts::new(true, true));
        let negotiator = negotiator(platform.clone(), prompts, PermissionConfig::default());
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedPermanent);
        assert_eq!(negotiator.denial_count(), 2);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 1);
        assert_eq!(platform.settings_opened.load(Ordering::SeqCst), 1);

        // Coming back from settings without granting.
        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedPermanent);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 1);
        assert_eq!(
            *outcomes.denied.lock(),
            vec![CaptureError::PermissionPermanentlyDenied]
        );
        assert_eq!(platform.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn grant_from_settings_is_picked_up() {
        let platform = Arc::new(FakePlatform::answering(&[false, false]));
        let negotiator = negotiator(
            platform.clone(),
            Arc::new(ScriptedPrompts::new(true, true)),
            PermissionConfig::default(),
        );
        let outcomes = Outcomes::default();
        outcomes.request(&negotiator).await;

        platform.granted.store(true, Ordering::SeqCst);
        assert_eq!(outcomes.request(&negotiator).await, PermissionState::Granted);
        assert_eq!(negotiator.state(), PermissionState::Granted);
        assert_eq!(outcomes.granted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declined_rationale_stays_soft() {
        let platform = Arc::new(FakePlatform::answering(&[false]));
        let prompts = Arc::new(ScriptedPrompts::new(false, true));
        let negotiator = negotiator(platform.clone(), prompts, PermissionConfig::default());
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedSoft);
        assert_eq!(*outcomes.denied.lock(), vec![CaptureError::PermissionDenied]);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 0);
        assert_eq!(platform.settings_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denial_across_two_requests_becomes_permanent_once() {
        let platform = Arc::new(FakePlatform::answering(&[false, false]));
        let prompts = Arc::new(ScriptedPrompts::new(false, false));
        let negotiator = negotiator(platform.clone(), prompts.clone(), PermissionConfig::default());
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedSoft);
        assert_eq!(negotiator.denial_count(), 1);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 0);

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedPermanent);
        assert_eq!(negotiator.denial_count(), 2);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 1);
        assert_eq!(*outcomes.denied.lock(), vec![CaptureError::PermissionDenied]);

        // Later requests stay permanent without re-prompting or re-reporting.
        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedPermanent);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 1);
        assert_eq!(platform.requests.load(Ordering::SeqCst), 2);
        assert_eq!(prompts.rationales.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.granted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn counter_ignores_platform_rationale_by_default() {
        let platform = Arc::new(FakePlatform {
            rationale_exhausted: true,
            ..FakePlatform::answering(&[false])
        });
        let negotiator = negotiator(
            platform,
            Arc::new(ScriptedPrompts::new(false, false)),
            PermissionConfig::default(),
        );
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedSoft);
    }

    #[tokio::test]
    async fn trusted_platform_rationale_makes_first_denial_permanent() {
        let platform = Arc::new(FakePlatform {
            rationale_exhausted: true,
            ..FakePlatform::answering(&[false])
        });
        let config = PermissionConfig {
            trust_platform_rationale: true,
            ..Default::default()
        };
        let negotiator = negotiator(platform, Arc::new(SilentPrompts), config);
        let outcomes = Outcomes::default();

        assert_eq!(outcomes.request(&negotiator).await, PermissionState::DeniedPermanent);
        assert_eq!(negotiator.denial_count(), 1);
        assert_eq!(outcomes.permanent.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let config = PermissionConfig {
            denial_threshold: 0,
            ..Default::default()
        };
        let result = PermissionNegotiator::new(
            Arc::new(FakePlatform::default()),
            Arc::new(SilentPrompts),
            config,
            Arc::new(NoopLogger),
        );
        assert!(result.is_err());
    }
}
