//! Autopay: express-pay automation for a utility-billing portal
//!
//! Logs into the portal, reads the amount due from the dashboard and, when
//! something is owed, walks the portal's express-pay popup to settle it. The
//! final "pay" control is only clicked when the amount on its label equals
//! the amount read from the dashboard. Screenshots are taken at each step and
//! sent with the outcome notification.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────┐
//! │ SessionController │──►│ BillDetector │──►│ PaymentFlow │──►│ Notifier │
//! └─────────┬─────────┘   └──────┬───────┘   └──────┬──────┘   └──────────┘
//!           │                    ▼                  ▼
//!           │             ┌──────────────────────────────┐
//!           └────────────►│ PortalDriver (CDP / mock)    │
//!                         └──────────────────────────────┘
//! ```

#![warn(missing_docs)]

mod auth;
mod browser;
mod config;
mod detector;
mod driver;
mod evidence;
mod locator;
mod money;
mod notify;
mod payment;
mod result;
mod session;

/// Bounded polling waits
pub mod wait;
/// Main/popup window bookkeeping
pub mod window;

pub use auth::{Authenticator, Credentials, FormAuthenticator, LoginConfig};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use browser::BrowserConfig;
pub use config::{MailConfig, PortalConfig, PortalSection, DEFAULT_PORTAL_NAME, DEFAULT_SMTP_HOST};
pub use detector::{BillDetector, BillDueState};
pub use driver::{scripted_portal, ElementHandle, MockDriver, MockEffect, PortalDriver, Screenshot};
pub use evidence::{Checkpoint, EvidenceItem, EvidenceTrail, ScreenshotRecorder};
pub use locator::{PortalSelectors, Selector};
pub use money::MoneyAmount;
pub use notify::{
    Attachment, LogNotifier, MailAccount, NotificationMessage, Notifier, OutboxDocument,
    OutboxNotifier, SmtpNotifier,
};
pub use payment::{PaymentFlow, PaymentOutcome, PaymentState};
pub use result::{FailureKind, PayError, PayResult};
pub use session::{
    failure_message, paid_message, RunStatus, RunSummary, SessionController, MISMATCH_MESSAGE,
};
pub use wait::{WaitOptions, WaitResult, Waiter};
pub use window::{WindowHandle, WindowSet};

/// Everything a caller usually needs
pub mod prelude {
    pub use super::auth::*;
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::detector::*;
    pub use super::driver::*;
    pub use super::evidence::*;
    pub use super::locator::*;
    pub use super::money::*;
    pub use super::notify::*;
    pub use super::payment::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::wait::*;
    pub use super::window::*;
}
