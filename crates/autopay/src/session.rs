//! One end-to-end run: login, detect, pay, notify, logout, quit.
//!
//! [`SessionController::run`] is the single place where faults are caught.
//! Whatever happens, the browser is quit before `run` returns and at most one
//! notification is sent.

use crate::auth::{Authenticator, Credentials};
use crate::config::PortalConfig;
use crate::detector::{BillDetector, BillDueState};
use crate::driver::PortalDriver;
use crate::evidence::EvidenceTrail;
use crate::money::MoneyAmount;
use crate::notify::{NotificationMessage, Notifier};
use crate::payment::{PaymentFlow, PaymentOutcome, PaymentState};
use crate::result::{FailureKind, PayResult};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Body sent when the confirmation label disagrees with the dashboard
pub const MISMATCH_MESSAGE: &str = "The amount in the pay button didn't match the expected amount";

/// Body sent when a bill was paid
#[must_use]
pub fn paid_message(portal_name: &str, amount: MoneyAmount) -> String {
    format!("{} bill ({amount}) was paid successfully.", capitalize(portal_name))
}

/// Body sent when the run faulted
#[must_use]
pub fn failure_message(portal_name: &str) -> String {
    format!("There was a problem paying the {portal_name} bill automatically.")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum RunStatus {
    /// Balance was zero or a credit
    NothingDue,
    /// The bill was paid
    Paid,
    /// Confirmation amount disagreed; nothing was paid
    AmountMismatch,
    /// The run faulted
    Failed(FailureKind),
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Final status
    pub status: RunStatus,
    /// Dashboard reading, if detection got that far
    pub bill: Option<BillDueState>,
    /// Whether a notification was delivered
    pub notified: bool,
    /// Screenshots taken
    pub evidence_captured: usize,
    /// States the payment flow went through (empty if it never ran)
    pub payment_states: Vec<PaymentState>,
}

/// Mutable bookkeeping for one run
#[derive(Debug, Default)]
struct RunProgress {
    trail: EvidenceTrail,
    bill: Option<BillDueState>,
    notified: bool,
    payment_states: Vec<PaymentState>,
}

/// Orchestrates a whole run against one browser session
#[derive(Debug)]
pub struct SessionController<A, N> {
    config: PortalConfig,
    authenticator: A,
    notifier: N,
    to_address: String,
}

impl<A: Authenticator, N: Notifier> SessionController<A, N> {
    /// Create a controller
    #[must_use]
    pub fn new(
        config: PortalConfig,
        authenticator: A,
        notifier: N,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            config,
            authenticator,
            notifier,
            to_address: to_address.into(),
        }
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Notifier in use
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run once and quit the browser.
    ///
    /// Never fails: faults are logged, reported through the notifier and
    /// reflected in the returned summary.
    pub async fn run<D: PortalDriver>(&self, driver: &mut D, credentials: &Credentials) -> RunSummary {
        let span = tracing::info_span!("run", portal = %self.config.portal.name);
        self.run_scoped(driver, credentials).instrument(span).await
    }

    async fn run_scoped<D: PortalDriver>(
        &self,
        driver: &mut D,
        credentials: &Credentials,
    ) -> RunSummary {
        let mut progress = RunProgress::default();

        let status = match self.attempt(driver, credentials, &mut progress).await {
            Ok(status) => status,
            Err(e) => {
                let message = failure_message(&self.config.portal.name);
                tracing::error!(kind = %e.kind(), error = %e, "{message}");
                progress.notified = self.notify(message, &progress.trail).await;
                RunStatus::Failed(e.kind())
            }
        };

        if let Err(e) = driver.quit().await {
            tracing::warn!(error = %e, "failed to quit browser");
        }

        RunSummary {
            status,
            bill: progress.bill,
            notified: progress.notified,
            evidence_captured: progress.trail.len(),
            payment_states: progress.payment_states,
        }
    }

    async fn attempt<D: PortalDriver>(
        &self,
        driver: &mut D,
        credentials: &Credentials,
        progress: &mut RunProgress,
    ) -> PayResult<RunStatus> {
        let waiter = self.config.waiter();
        let name = &self.config.portal.name;

        self.authenticator.login(&mut *driver, credentials).await?;

        let bill = BillDetector::new(&self.config.selectors, waiter)
            .detect(&*driver, &mut progress.trail)
            .await?;
        progress.bill = Some(bill);

        let BillDueState::Due(amount) = bill else {
            tracing::info!("No {name} bill was due.");
            self.authenticator.logout(&mut *driver).await?;
            return Ok(RunStatus::NothingDue);
        };
        tracing::info!("{} bill due: {amount}", capitalize(name));

        let mut flow = PaymentFlow::new(&self.config.selectors, waiter);
        let outcome = flow.execute(driver, amount, &mut progress.trail).await;
        progress.payment_states = flow.history().to_vec();

        let (status, message) = match outcome {
            PaymentOutcome::Paid(paid) => {
                let message = paid_message(name, paid);
                tracing::info!("{message}");
                (RunStatus::Paid, message)
            }
            PaymentOutcome::AmountMismatch { expected, observed } => {
                tracing::error!(%expected, %observed, "{MISMATCH_MESSAGE}");
                (RunStatus::AmountMismatch, MISMATCH_MESSAGE.to_string())
            }
            PaymentOutcome::Failed(e) => return Err(e),
        };
        progress.notified = self.notify(message, &progress.trail).await;

        // The outcome message is already out; a logout fault must not add a second one
        if let Err(e) = self.authenticator.logout(&mut *driver).await {
            tracing::error!(error = %e, "logout failed after {status:?}");
        }
        Ok(status)
    }

    async fn notify(&self, body: String, trail: &EvidenceTrail) -> bool {
        let subject = format!("{} bill payment", capitalize(&self.config.portal.name));
        let message =
            NotificationMessage::new(&self.to_address, subject, body).with_evidence(trail);
        match self.notifier.send(&message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to send notification");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{scripted_portal, MockDriver};
    use crate::result::PayError;
    use crate::wait::WaitOptions;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct StubAuthenticator {
        fail_login: bool,
        fail_logout: bool,
    }

    #[async_trait]
    impl Authenticator for StubAuthenticator {
        async fn login(&self, _: &mut dyn PortalDriver, _: &Credentials) -> PayResult<()> {
            if self.fail_login {
                return Err(PayError::authentication("bad password"));
            }
            Ok(())
        }

        async fn logout(&self, _: &mut dyn PortalDriver) -> PayResult<()> {
            if self.fail_logout {
                return Err(PayError::authentication("session expired"));
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<NotificationMessage>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<NotificationMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &NotificationMessage) -> PayResult<()> {
            if self.fail {
                return Err(PayError::notification("relay down"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn config() -> PortalConfig {
        PortalConfig::default().with_wait(WaitOptions::new().with_timeout(30).with_poll_interval(5))
    }

    fn controller(
        auth: StubAuthenticator,
        notifier: RecordingNotifier,
    ) -> SessionController<StubAuthenticator, RecordingNotifier> {
        SessionController::new(config(), auth, notifier, "me@example.com")
    }

    fn credentials() -> Credentials {
        Credentials::new("alice", "hunter2")
    }

    mod message_tests {
        use super::*;

        #[test]
        fn test_paid_message() {
            assert_eq!(
                paid_message("utility", MoneyAmount::from_cents(4532)),
                "Utility bill ($45.32) was paid successfully."
            );
        }

        #[test]
        fn test_failure_message() {
            assert_eq!(
                failure_message("utility"),
                "There was a problem paying the utility bill automatically."
            );
        }

        #[test]
        fn test_capitalize_edge_cases() {
            assert_eq!(capitalize(""), "");
            assert_eq!(capitalize("MUD"), "MUD");
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_paid_run() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay $45.32");
            let controller = controller(StubAuthenticator::default(), RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Paid);
            assert_eq!(summary.evidence_captured, 6);
            assert!(summary.notified);
            let sent = controller.notifier().sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].body, "Utility bill ($45.32) was paid successfully.");
            assert_eq!(sent[0].to, "me@example.com");
            assert_eq!(sent[0].attachments.len(), 6);
            assert_eq!(driver.click_count(&selectors.payment_confirmation), 1);
            assert!(driver.was_called("quit"));
        }

        #[tokio::test]
        async fn test_mismatch_run() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay $50.00");
            let controller = controller(StubAuthenticator::default(), RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::AmountMismatch);
            assert_eq!(summary.evidence_captured, 4);
            assert!(summary.payment_states.contains(&PaymentState::Mismatched));
            let sent = controller.notifier().sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].body, MISMATCH_MESSAGE);
            assert_eq!(driver.click_count(&selectors.payment_confirmation), 0);
        }

        #[tokio::test]
        async fn test_nothing_due_is_silent() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$0.00", "Pay $0.00");
            let controller = controller(StubAuthenticator::default(), RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::NothingDue);
            assert_eq!(summary.bill, Some(BillDueState::NotDue));
            assert!(!summary.notified);
            assert!(summary.payment_states.is_empty());
            assert!(controller.notifier().sent().is_empty());
            assert_eq!(driver.click_count(&selectors.pay_my_bill), 0);
            assert!(driver.was_called("quit"));
        }

        #[tokio::test]
        async fn test_login_failure_sends_generic_message() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay $45.32");
            let auth = StubAuthenticator {
                fail_login: true,
                ..StubAuthenticator::default()
            };
            let controller = controller(auth, RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Failed(FailureKind::Authentication));
            assert_eq!(summary.bill, None);
            let sent = controller.notifier().sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(
                sent[0].body,
                "There was a problem paying the utility bill automatically."
            );
            assert!(sent[0].attachments.is_empty());
            assert!(driver.was_called("quit"));
        }

        #[tokio::test]
        async fn test_payment_fault_keeps_evidence_so_far() {
            let selectors = config().selectors;
            // the label never parses, so the run faults after four captures
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay later");
            let controller = controller(StubAuthenticator::default(), RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Failed(FailureKind::Parse));
            let sent = controller.notifier().sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].attachments.len(), 4);
            assert!(sent[0].body.starts_with("There was a problem"));
        }

        #[tokio::test]
        async fn test_detection_timeout_is_reported() {
            let mut driver = MockDriver::new();
            let controller = controller(StubAuthenticator::default(), RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Failed(FailureKind::ElementTimeout));
            assert!(summary.notified);
        }

        #[tokio::test]
        async fn test_notifier_failure_still_quits() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay $45.32");
            let notifier = RecordingNotifier {
                fail: true,
                ..RecordingNotifier::default()
            };
            let controller = controller(StubAuthenticator::default(), notifier);

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Paid);
            assert!(!summary.notified);
            assert!(driver.was_called("quit"));
        }

        #[tokio::test]
        async fn test_logout_failure_after_payment_sends_one_message() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$45.32", "Pay $45.32");
            let auth = StubAuthenticator {
                fail_logout: true,
                ..StubAuthenticator::default()
            };
            let controller = controller(auth, RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Paid);
            assert_eq!(controller.notifier().sent().len(), 1);
        }

        #[tokio::test]
        async fn test_logout_failure_when_nothing_due_is_a_fault() {
            let selectors = config().selectors;
            let mut driver = scripted_portal(&selectors, "$0.00", "Pay $0.00");
            let auth = StubAuthenticator {
                fail_logout: true,
                ..StubAuthenticator::default()
            };
            let controller = controller(auth, RecordingNotifier::default());

            let summary = controller.run(&mut driver, &credentials()).await;

            assert_eq!(summary.status, RunStatus::Failed(FailureKind::Authentication));
            assert_eq!(summary.bill, Some(BillDueState::NotDue));
            assert_eq!(controller.notifier().sent().len(), 1);
        }

        #[test]
        fn test_summary_serializes() {
            let summary = RunSummary {
                status: RunStatus::Failed(FailureKind::Parse),
                bill: None,
                notified: true,
                evidence_captured: 0,
                payment_states: vec![],
            };
            let json = serde_json::to_value(&summary).unwrap();
            assert_eq!(json["status"]["status"], "failed");
            assert_eq!(json["status"]["failure"], "Parse");
        }
    }
}
