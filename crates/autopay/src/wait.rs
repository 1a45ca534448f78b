//! Bounded waits against the live session.
//!
//! Every wait polls the driver until its condition holds or the timeout
//! elapses, then fails with [`PayError::ElementTimeout`]. The condition is
//! always checked at least once, so a zero timeout still succeeds when the
//! page is already in the expected state.

use crate::driver::PortalDriver;
use crate::locator::Selector;
use crate::result::{PayError, PayResult};
use crate::window::{WindowHandle, WindowSet};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for every wait point (120 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 120_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value the condition produced
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls a [`PortalDriver`] until a condition holds
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll `check` until it yields a value.
    ///
    /// Driver errors abort the wait immediately; only "not yet" (`Ok(None)`)
    /// is retried.
    pub async fn poll<T, F, Fut>(
        &self,
        waited_for: impl Into<String>,
        mut check: F,
    ) -> PayResult<WaitResult<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PayResult<Option<T>>>,
    {
        let waited_for = waited_for.into();
        let start = Instant::now();
        let timeout = self.options.timeout();

        loop {
            if let Some(value) = check().await? {
                return Ok(WaitResult {
                    value,
                    elapsed: start.elapsed(),
                    waited_for,
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(waited_for = %waited_for, ?elapsed, "wait timed out");
                return Err(PayError::timeout(waited_for, self.options.timeout_ms));
            }
            tokio::time::sleep(self.options.poll_interval().min(timeout - elapsed)).await;
        }
    }

    /// Wait until `selector` is visible
    pub async fn until_visible<D>(&self, driver: &D, selector: &Selector) -> PayResult<WaitResult<()>>
    where
        D: PortalDriver + ?Sized,
    {
        self.poll(format!("{selector} to be visible"), || async move {
            let element = driver.query_selector(selector).await?;
            Ok(element.filter(|e| e.is_visible()).map(|_| ()))
        })
        .await
    }

    /// Wait until any of `selectors` is visible; yields the index that matched
    pub async fn until_any_visible<D>(
        &self,
        driver: &D,
        selectors: &[Selector],
    ) -> PayResult<WaitResult<usize>>
    where
        D: PortalDriver + ?Sized,
    {
        if selectors.is_empty() {
            return Err(PayError::config("no selectors to wait for"));
        }
        let description = selectors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");

        self.poll(format!("{description} to be visible"), || async move {
            for (index, selector) in selectors.iter().enumerate() {
                if let Some(element) = driver.query_selector(selector).await? {
                    if element.is_visible() {
                        return Ok(Some(index));
                    }
                }
            }
            Ok(None)
        })
        .await
    }

    /// Wait until `selector` is visible and enabled
    pub async fn until_clickable<D>(
        &self,
        driver: &D,
        selector: &Selector,
    ) -> PayResult<WaitResult<()>>
    where
        D: PortalDriver + ?Sized,
    {
        self.poll(format!("{selector} to be clickable"), || async move {
            let element = driver.query_selector(selector).await?;
            Ok(element.filter(|e| e.is_clickable()).map(|_| ()))
        })
        .await
    }

    /// Wait until a window not tracked by `windows` is open; yields all open handles
    pub async fn until_new_window<D>(
        &self,
        driver: &D,
        windows: &WindowSet,
    ) -> PayResult<WaitResult<Vec<WindowHandle>>>
    where
        D: PortalDriver + ?Sized,
    {
        self.poll("a popup window to open", || async move {
            let open = driver.window_handles().await?;
            let appeared = !windows.untracked(&open).is_empty();
            Ok(appeared.then_some(open))
        })
        .await
    }
}

// =============================================================================
// TESTS
// =============================================================================
