//! Selectors for the portal UI contract.
//!
//! Every element the payment flow touches is named here. The defaults match
//! the live portal exactly; a YAML config may override any of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "a[title=Continue]")
    Css(String),
    /// Exact element id
    Id(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// CSS form accepted by `querySelector`
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Css(s) => s.clone(),
            Self::Id(id) => format!("[id={id:?}]"),
        }
    }

    /// JavaScript expression resolving to the first match (or null)
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("document.querySelector({:?})", self.to_css())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Element that reads the due amount on the dashboard
pub const DUE_AMOUNT_TILE: &str = "#__xmlview1--payMyBillTile-number";
/// Small-tile rendering of the due amount
pub const DUE_AMOUNT_TILE_SMALL: &str = "#__xmlview1--payMyBillTile-number.sapMStdTileNumS";
/// Medium-tile rendering of the due amount
pub const DUE_AMOUNT_TILE_MEDIUM: &str = "#__xmlview1--payMyBillTile-number.sapMStdTileNumM";
/// Dashboard tile that opens the payment popup
pub const PAY_MY_BILL_TILE_ID: &str = "__xmlview1--payMyBillTile";
/// Express-pay anchor inside the popup
pub const EXPRESS_PAY_ANCHOR: &str = "a[id^=account-expressPay]";
/// Continue anchor after choosing express pay
pub const CONTINUE_ANCHOR: &str = "a[title=Continue]";
/// Final, money-moving confirmation anchor
pub const PAYMENT_CONFIRMATION_ANCHOR: &str = "a[data-id=btn-payment-confirmation]";
/// Close-session control shown after the payment went through
pub const CLOSE_SESSION_ID: &str = "logoutCloseWindowBtn";

/// Selectors for every portal element the core depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    /// Size variants of the due-amount tile; any one visible means the dashboard is ready
    pub due_amount_variants: Vec<Selector>,
    /// Element whose text holds the due amount
    pub due_amount: Selector,
    /// Dashboard tile that opens the popup
    pub pay_my_bill: Selector,
    /// Express-pay control inside the popup
    pub express_pay: Selector,
    /// Continue control
    pub continue_button: Selector,
    /// Payment confirmation control (label carries the amount)
    pub payment_confirmation: Selector,
    /// Close-session control shown once payment completes
    pub close_session: Selector,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            due_amount_variants: vec![
                Selector::css(DUE_AMOUNT_TILE_SMALL),
                Selector::css(DUE_AMOUNT_TILE_MEDIUM),
            ],
            due_amount: Selector::css(DUE_AMOUNT_TILE),
            pay_my_bill: Selector::id(PAY_MY_BILL_TILE_ID),
            express_pay: Selector::css(EXPRESS_PAY_ANCHOR),
            continue_button: Selector::css(CONTINUE_ANCHOR),
            payment_confirmation: Selector::css(PAYMENT_CONFIRMATION_ANCHOR),
            close_session: Selector::id(CLOSE_SESSION_ID),
        }
    }
}
