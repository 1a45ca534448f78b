//! Express-pay state machine.
//!
//! The flow opens the payment popup from the dashboard, walks it through
//! express pay and "Continue", and only clicks the money-moving confirmation
//! when the amount on its label equals the amount read from the dashboard.
//! The popup is closed and focus returned to the main window on every exit
//! path, including faults.

use crate::driver::PortalDriver;
use crate::evidence::{Checkpoint, EvidenceTrail, ScreenshotRecorder};
use crate::locator::PortalSelectors;
use crate::money::MoneyAmount;
use crate::result::{FailureKind, PayError, PayResult};
use crate::wait::Waiter;
use crate::window::WindowSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Instrument;

/// Where the flow is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Nothing done yet
    Idle,
    /// Popup focused
    PopupOpened,
    /// Express pay chosen
    ExpressPayClicked,
    /// "Continue" clicked
    ContinueClicked,
    /// Confirmation label read, amount being compared
    AmountVerifying,
    /// Confirmation clicked
    Confirmed,
    /// Label did not match; confirmation left alone
    Mismatched,
    /// Popup released and main window focused again
    Closed,
}

impl PaymentState {
    /// Stable name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PopupOpened => "popup_opened",
            Self::ExpressPayClicked => "express_pay_clicked",
            Self::ContinueClicked => "continue_clicked",
            Self::AmountVerifying => "amount_verifying",
            Self::Confirmed => "confirmed",
            Self::Mismatched => "mismatched",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one payment attempt
#[derive(Debug)]
pub enum PaymentOutcome {
    /// Confirmation clicked and the receipt page reached
    Paid(MoneyAmount),
    /// Confirmation label disagreed with the dashboard
    AmountMismatch {
        /// Amount read from the dashboard
        expected: MoneyAmount,
        /// Amount on the confirmation label
        observed: MoneyAmount,
    },
    /// The attempt faulted
    Failed(PayError),
}

impl PaymentOutcome {
    /// True for [`PaymentOutcome::Paid`]
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid(_))
    }

    /// Failure category, if the attempt faulted
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Drives the popup from dashboard click to receipt
#[derive(Debug, Clone)]
pub struct PaymentFlow<'a> {
    selectors: &'a PortalSelectors,
    waiter: Waiter,
    recorder: ScreenshotRecorder,
    state: PaymentState,
    history: Vec<PaymentState>,
}

impl<'a> PaymentFlow<'a> {
    /// Create an idle flow
    #[must_use]
    pub fn new(selectors: &'a PortalSelectors, waiter: Waiter) -> Self {
        Self {
            selectors,
            waiter,
            recorder: ScreenshotRecorder::new(),
            state: PaymentState::Idle,
            history: vec![PaymentState::Idle],
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PaymentState {
        self.state
    }

    /// Every state entered, starting with `Idle`
    #[must_use]
    pub fn history(&self) -> &[PaymentState] {
        &self.history
    }

    fn transition(&mut self, next: PaymentState) {
        tracing::debug!(from = %self.state, to = %next, "payment state");
        self.state = next;
        self.history.push(next);
    }

    /// Pay `expected`, appending screenshots to `trail`.
    ///
    /// Never returns an error: faults come back as [`PaymentOutcome::Failed`].
    pub async fn execute<D>(
        &mut self,
        driver: &mut D,
        expected: MoneyAmount,
        trail: &mut EvidenceTrail,
    ) -> PaymentOutcome
    where
        D: PortalDriver + ?Sized,
    {
        let span = tracing::info_span!("payment_flow", %expected);
        self.execute_scoped(driver, expected, trail)
            .instrument(span)
            .await
    }

    async fn execute_scoped<D>(
        &mut self,
        driver: &mut D,
        expected: MoneyAmount,
        trail: &mut EvidenceTrail,
    ) -> PaymentOutcome
    where
        D: PortalDriver + ?Sized,
    {
        let main = match driver.current_window().await {
            Ok(handle) => handle,
            Err(e) => return Self::failed(e),
        };
        let mut windows = WindowSet::new(main);

        let result = match self.open_popup(driver, &mut windows).await {
            Ok(()) => self.drive_popup(driver, &windows, expected, trail).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.close_popup(driver, &mut windows).await {
            tracing::warn!(error = %e, "failed to close payment popup");
        }

        match result {
            Ok(outcome) => outcome,
            Err(e) => Self::failed(e),
        }
    }

    fn failed(error: PayError) -> PaymentOutcome {
        tracing::warn!(kind = %error.kind(), error = %error, "payment flow aborted");
        PaymentOutcome::Failed(error)
    }

    /// Click "pay my bill" and adopt the single window it opens.
    async fn open_popup<D>(&self, driver: &mut D, windows: &mut WindowSet) -> PayResult<()>
    where
        D: PortalDriver + ?Sized,
    {
        driver.click(&self.selectors.pay_my_bill).await?;
        let opened = self.waiter.until_new_window(&*driver, windows).await?;
        let popup = windows.adopt_popup(&opened.value)?;
        tracing::debug!(%popup, "popup window opened");
        Ok(())
    }

    async fn drive_popup<D>(
        &mut self,
        driver: &mut D,
        windows: &WindowSet,
        expected: MoneyAmount,
        trail: &mut EvidenceTrail,
    ) -> PayResult<PaymentOutcome>
    where
        D: PortalDriver + ?Sized,
    {
        let selectors = self.selectors;
        let popup = windows
            .popup()
            .ok_or_else(|| PayError::unknown("popup is not tracked"))?;

        driver.switch_to_window(popup).await?;
        self.transition(PaymentState::PopupOpened);
        self.recorder
            .capture(&*driver, Checkpoint::PopupOpened, trail)
            .await;

        self.waiter
            .until_clickable(&*driver, &selectors.express_pay)
            .await?;
        driver.click(&selectors.express_pay).await?;
        self.transition(PaymentState::ExpressPayClicked);

        self.waiter
            .until_clickable(&*driver, &selectors.continue_button)
            .await?;
        self.recorder
            .capture(&*driver, Checkpoint::ContinueReady, trail)
            .await;
        driver.click(&selectors.continue_button).await?;
        self.transition(PaymentState::ContinueClicked);

        self.waiter
            .until_clickable(&*driver, &selectors.payment_confirmation)
            .await?;
        self.recorder
            .capture(&*driver, Checkpoint::ConfirmationReady, trail)
            .await;
        let label = driver.text(&selectors.payment_confirmation).await?;
        let observed = MoneyAmount::parse_pay_label(&label)?;
        self.transition(PaymentState::AmountVerifying);

        if observed != expected {
            self.transition(PaymentState::Mismatched);
            tracing::warn!(%expected, %observed, "confirmation amount differs from amount due");
            return Ok(PaymentOutcome::AmountMismatch { expected, observed });
        }

        driver.click(&selectors.payment_confirmation).await?;
        self.transition(PaymentState::Confirmed);
        tracing::info!(amount = %expected, "Clicked the pay button");
        self.recorder
            .capture(&*driver, Checkpoint::PaymentSubmitted, trail)
            .await;

        self.waiter
            .until_clickable(&*driver, &selectors.close_session)
            .await?;
        self.recorder
            .capture(&*driver, Checkpoint::Receipt, trail)
            .await;

        Ok(PaymentOutcome::Paid(expected))
    }

    /// Close the popup if one was adopted, then refocus the main window.
    ///
    /// Refocusing is attempted even when closing fails.
    async fn close_popup<D>(&mut self, driver: &mut D, windows: &mut WindowSet) -> PayResult<()>
    where
        D: PortalDriver + ?Sized,
    {
        let mut closed = Ok(());
        if let Some(popup) = windows.release_popup() {
            closed = match driver.switch_to_window(&popup).await {
                Ok(()) => driver.close_window().await,
                Err(e) => Err(e),
            };
        }
        let refocused = driver.switch_to_window(windows.main()).await;
        self.transition(PaymentState::Closed);
        closed.and(refocused)
    }
}
