//! End-to-end runs against the scripted portal
//!
//! Wires the stock form authenticator and outbox notifier to `MockDriver`
//! and checks what lands in the outbox.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use autopay::{
    scripted_portal, Checkpoint, Credentials, ElementHandle, FormAuthenticator, MockDriver,
    MockEffect, OutboxDocument, OutboxNotifier, PaymentState, PortalConfig, RunStatus,
    SessionController, WaitOptions, MISMATCH_MESSAGE,
};
use std::path::Path;
use tempfile::TempDir;

const LOGIN_URL: &str = "https://portal.example/login";

fn config() -> PortalConfig {
    PortalConfig::default()
        .with_login_url(LOGIN_URL)
        .with_wait(WaitOptions::new().with_timeout(50).with_poll_interval(5))
}

/// Scripted portal with the login form and sign-out control on the main window
fn portal(config: &PortalConfig, due: &str, label: &str) -> MockDriver {
    let login = &config.portal.login;
    let mut driver = scripted_portal(&config.selectors, due, label);
    driver.add_element(ElementHandle::new(&login.username_field));
    driver.add_element(ElementHandle::new(&login.password_field));
    driver.add_element(ElementHandle::new(&login.submit));
    driver.add_element(ElementHandle::new(&login.logout));
    driver
}

fn controller(
    config: PortalConfig,
    outbox: &Path,
) -> SessionController<FormAuthenticator, OutboxNotifier> {
    let authenticator = FormAuthenticator::new(config.portal.login.clone(), config.waiter());
    let notifier = OutboxNotifier::new(outbox, "bot@example.com");
    SessionController::new(config, authenticator, notifier, "me@example.com")
}

fn outbox_documents(dir: &Path) -> Vec<OutboxDocument> {
    if !dir.exists() {
        return Vec::new();
    }
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let bytes = std::fs::read(entry.unwrap().path()).unwrap();
            serde_json::from_slice(&bytes).unwrap()
        })
        .collect()
}

fn credentials() -> Credentials {
    Credentials::new("alice", "hunter2")
}

#[tokio::test]
async fn test_due_bill_is_paid_and_reported() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let mut driver = portal(&config, "$45.32", "Pay $45.32");
    let selectors = config.selectors.clone();
    let logout = config.portal.login.logout.clone();

    let summary = controller(config, dir.path())
        .run(&mut driver, &credentials())
        .await;

    assert_eq!(summary.status, RunStatus::Paid);
    assert_eq!(summary.evidence_captured, 6);
    assert_eq!(summary.payment_states.last(), Some(&PaymentState::Closed));
    assert_eq!(driver.click_count(&selectors.payment_confirmation), 1);
    assert_eq!(driver.click_count(&logout), 1);
    assert!(driver.was_called(&format!("navigate:{LOGIN_URL}")));
    assert!(driver.history().iter().all(|c| !c.contains("hunter2")));
    assert_eq!(driver.history().last().map(String::as_str), Some("quit"));

    let documents = outbox_documents(dir.path());
    assert_eq!(documents.len(), 1);
    let message = &documents[0].message;
    assert_eq!(message.to, "me@example.com");
    assert_eq!(message.body, "Utility bill ($45.32) was paid successfully.");
    let names: Vec<_> = message.attachments.iter().map(|a| a.file_name.clone()).collect();
    let expected: Vec<_> = Checkpoint::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:02}-{c}.png", i + 1))
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_mismatched_label_is_never_paid() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let mut driver = portal(&config, "$45.32", "Pay $50.00");
    let confirmation = config.selectors.payment_confirmation.clone();

    let summary = controller(config, dir.path())
        .run(&mut driver, &credentials())
        .await;

    assert_eq!(summary.status, RunStatus::AmountMismatch);
    assert_eq!(summary.evidence_captured, 4);
    assert_eq!(driver.click_count(&confirmation), 0);

    let documents = outbox_documents(dir.path());
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].message.body, MISMATCH_MESSAGE);
    assert_eq!(documents[0].message.attachments.len(), 4);
}

#[tokio::test]
async fn test_credit_balance_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let mut driver = portal(&config, "$-12.50", "Pay $0.00");
    let pay_my_bill = config.selectors.pay_my_bill.clone();

    let summary = controller(config, dir.path())
        .run(&mut driver, &credentials())
        .await;

    assert_eq!(summary.status, RunStatus::NothingDue);
    assert_eq!(driver.click_count(&pay_my_bill), 0);
    assert!(outbox_documents(dir.path()).is_empty());
    assert!(driver.was_called("quit"));
}

#[tokio::test]
async fn test_popup_timeout_restores_main_window() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let mut driver = portal(&config, "$45.32", "Pay $45.32");
    // the confirmation never appears after "Continue"
    driver.on_click(
        &config.selectors.continue_button,
        MockEffect::Remove(config.selectors.payment_confirmation.to_css()),
    );

    let summary = controller(config, dir.path())
        .run(&mut driver, &credentials())
        .await;

    assert_eq!(
        summary.status,
        RunStatus::Failed(autopay::FailureKind::ElementTimeout)
    );
    assert!(driver.was_called("close:window-1"));
    // quit clears the mock's windows, so check focus via the recorded switches
    let last_switch = driver
        .history()
        .iter()
        .rev()
        .find(|c| c.starts_with("switch:"))
        .cloned();
    assert_eq!(
        last_switch,
        Some(format!("switch:{}", MockDriver::MAIN_WINDOW))
    );

    let documents = outbox_documents(dir.path());
    assert_eq!(documents.len(), 1);
    assert_eq!(
        documents[0].message.body,
        "There was a problem paying the utility bill automatically."
    );
    assert_eq!(documents[0].message.attachments.len(), 3);
}

#[tokio::test]
async fn test_rejected_login_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = config();
    // no login form on the page at all
    let mut driver = scripted_portal(&config.selectors, "$45.32", "Pay $45.32");

    let summary = controller(config, dir.path())
        .run(&mut driver, &credentials())
        .await;

    assert_eq!(
        summary.status,
        RunStatus::Failed(autopay::FailureKind::Authentication)
    );
    assert_eq!(summary.evidence_captured, 0);
    assert_eq!(outbox_documents(dir.path()).len(), 1);
}
