//! Reads the dashboard to decide whether a bill is due.

use crate::driver::PortalDriver;
use crate::evidence::{Checkpoint, EvidenceTrail, ScreenshotRecorder};
use crate::locator::PortalSelectors;
use crate::money::MoneyAmount;
use crate::result::PayResult;
use crate::wait::Waiter;
use serde::{Deserialize, Serialize};

/// Whether the account currently owes money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "amount", rename_all = "snake_case")]
pub enum BillDueState {
    /// Zero or credit balance
    NotDue,
    /// Positive amount owed
    Due(MoneyAmount),
}

impl BillDueState {
    /// Classify a parsed balance; only strictly positive amounts are due
    #[must_use]
    pub fn from_balance(amount: MoneyAmount) -> Self {
        if amount.is_positive() {
            Self::Due(amount)
        } else {
            Self::NotDue
        }
    }

    /// Amount owed, if any
    #[must_use]
    pub const fn amount(&self) -> Option<MoneyAmount> {
        match self {
            Self::NotDue => None,
            Self::Due(amount) => Some(*amount),
        }
    }
}

/// Dashboard reader
#[derive(Debug, Clone)]
pub struct BillDetector<'a> {
    selectors: &'a PortalSelectors,
    waiter: Waiter,
    recorder: ScreenshotRecorder,
}

impl<'a> BillDetector<'a> {
    /// Create a detector for the given portal layout
    #[must_use]
    pub const fn new(selectors: &'a PortalSelectors, waiter: Waiter) -> Self {
        Self {
            selectors,
            waiter,
            recorder: ScreenshotRecorder::new(),
        }
    }

    /// Wait for the due-amount tile, capture the dashboard, and read the balance
    pub async fn detect<D>(&self, driver: &D, trail: &mut EvidenceTrail) -> PayResult<BillDueState>
    where
        D: PortalDriver + ?Sized,
    {
        let ready = self
            .waiter
            .until_any_visible(driver, &self.selectors.due_amount_variants)
            .await?;
        tracing::debug!(variant = ready.value, elapsed = ?ready.elapsed, "dashboard ready");

        self.recorder
            .capture(driver, Checkpoint::Dashboard, trail)
            .await;

        let text = driver.text(&self.selectors.due_amount).await?;
        let balance = MoneyAmount::parse_display(&text)?;
        let state = BillDueState::from_balance(balance);

        match state {
            BillDueState::Due(amount) => tracing::info!(%amount, "bill due"),
            BillDueState::NotDue => tracing::info!(%balance, "no balance due"),
        }
        Ok(state)
    }
}
