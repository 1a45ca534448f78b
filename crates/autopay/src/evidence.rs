//! Screenshot evidence collected while a run progresses.

use crate::driver::{PortalDriver, Screenshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named point in the run where a screenshot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// Dashboard with the due-amount tile rendered
    Dashboard,
    /// Popup focused, before any click inside it
    PopupOpened,
    /// "Continue" is clickable
    ContinueReady,
    /// Confirmation control shows the amount about to be paid
    ConfirmationReady,
    /// Confirmation was clicked
    PaymentSubmitted,
    /// Close-session control is shown
    Receipt,
}

impl Checkpoint {
    /// All checkpoints in capture order
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::PopupOpened,
        Self::ContinueReady,
        Self::ConfirmationReady,
        Self::PaymentSubmitted,
        Self::Receipt,
    ];

    /// Stable name used in logs and attachment file names
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::PopupOpened => "popup_opened",
            Self::ContinueReady => "continue_ready",
            Self::ConfirmationReady => "confirmation_ready",
            Self::PaymentSubmitted => "payment_submitted",
            Self::Receipt => "receipt",
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured screenshot
#[derive(Debug, Clone)]
pub struct EvidenceItem {
    /// Where in the run it was taken
    pub checkpoint: Checkpoint,
    /// PNG image
    pub screenshot: Screenshot,
    /// Capture time
    pub captured_at: DateTime<Utc>,
}

impl EvidenceItem {
    /// Attachment file name, e.g. `03-continue_ready.png`
    #[must_use]
    pub fn file_name(&self, position: usize) -> String {
        format!("{:02}-{}.png", position + 1, self.checkpoint)
    }
}

/// Append-only, ordered screenshots for one run
#[derive(Debug, Clone, Default)]
pub struct EvidenceTrail {
    items: Vec<EvidenceItem>,
}

impl EvidenceTrail {
    /// Empty trail
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item
    pub fn push(&mut self, item: EvidenceItem) {
        self.items.push(item);
    }

    /// Items in capture order
    #[must_use]
    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checkpoints captured so far, in order
    #[must_use]
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.items.iter().map(|item| item.checkpoint).collect()
    }
}

impl<'a> IntoIterator for &'a EvidenceTrail {
    type Item = &'a EvidenceItem;
    type IntoIter = std::slice::Iter<'a, EvidenceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Takes checkpoint screenshots without ever failing the run
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenshotRecorder;

impl ScreenshotRecorder {
    /// Create a recorder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Screenshot the focused window into `trail`.
    ///
    /// Returns whether an item was appended. Unsupported sessions record
    /// nothing; capture errors are logged and swallowed.
    pub async fn capture<D>(
        &self,
        driver: &D,
        checkpoint: Checkpoint,
        trail: &mut EvidenceTrail,
    ) -> bool
    where
        D: PortalDriver + ?Sized,
    {
        if !driver.supports_screenshots() {
            tracing::debug!(%checkpoint, "screenshots unsupported, skipping");
            return false;
        }
        match driver.screenshot().await {
            Ok(screenshot) => {
                tracing::debug!(%checkpoint, bytes = screenshot.size_bytes(), "captured screenshot");
                trail.push(EvidenceItem {
                    checkpoint,
                    screenshot,
                    captured_at: Utc::now(),
                });
                true
            }
            Err(e) => {
                tracing::warn!(%checkpoint, error = %e, "screenshot failed");
                false
            }
        }
    }
}
