//! Exact currency amounts read from portal text.
//!
//! Only plain decimal shapes (`45.32`, `-3.1`, `.50`) are accepted; the
//! digits are then handed to [`Decimal::from_str_exact`], so values beyond
//! its range are errors rather than rounded. Comparison is exact: the payment
//! gate depends on it.

use crate::result::{PayError, PayResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency symbol stripped from portal text
pub const CURRENCY_SYMBOL: char = '$';

/// Literal word the confirmation button puts in front of its amount
pub const PAY_LABEL_WORD: &str = "Pay";

/// Fractional digits kept by [`MoneyAmount`]
pub const CENT_DIGITS: u32 = 2;

/// A currency value with cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    /// Zero dollars
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Build from a whole number of cents
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CENT_DIGITS))
    }

    /// Underlying decimal value
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// True when strictly greater than zero
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Parse dashboard tile text such as `" $45.32 "` or `"-$12.50"`.
    ///
    /// Surrounding whitespace and one currency symbol are removed; the sign
    /// may sit on either side of the symbol.
    pub fn parse_display(text: &str) -> PayResult<Self> {
        parse_amount(text, text)
    }

    /// Parse the confirmation button label such as `"Pay $45.32"`.
    ///
    /// Every occurrence of the word `Pay` is removed before the label is
    /// handled like tile text.
    pub fn parse_pay_label(text: &str) -> PayResult<Self> {
        parse_amount(text, &text.replace(PAY_LABEL_WORD, ""))
    }
}

/// Split off a leading sign and one currency symbol, then parse the rest.
fn parse_amount(original: &str, text: &str) -> PayResult<MoneyAmount> {
    let trimmed = text.trim();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (Some("-"), trimmed[1..].trim_start()),
        Some(b'+') => (Some(""), trimmed[1..].trim_start()),
        _ => (None, trimmed),
    };
    let Some(unsigned) = rest.strip_prefix(CURRENCY_SYMBOL) else {
        return parse_plain(original, trimmed);
    };
    let unsigned = unsigned.trim();
    match sign {
        Some(_) if unsigned.starts_with(['-', '+']) => {
            Err(PayError::parse(original, "sign given twice"))
        }
        Some(sign) => parse_plain(original, &format!("{sign}{unsigned}")),
        None => parse_plain(original, unsigned),
    }
}

/// Parse `[+-]digits[.digits]`, rejecting exponents, grouping and sub-cent precision.
fn parse_plain(original: &str, text: &str) -> PayResult<MoneyAmount> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(PayError::parse(original, "not a decimal amount"));
    }

    let canonical = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction },
    );
    let mut value = Decimal::from_str_exact(&canonical)
        .map_err(|e| PayError::parse(original, format!("amount out of range: {e}")))?;
    if value.scale() > CENT_DIGITS {
        return Err(PayError::parse(
            original,
            format!("more than {CENT_DIGITS} fractional digits"),
        ));
    }
    value.rescale(CENT_DIGITS);
    Ok(MoneyAmount(value))
}

impl FromStr for MoneyAmount {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_display(s)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(CENT_DIGITS);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-{CURRENCY_SYMBOL}{:.2}", rounded.abs())
        } else {
            write!(f, "{CURRENCY_SYMBOL}{:.2}", rounded.abs())
        }
    }
}
