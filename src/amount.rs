//! Exact fixed-point conversion between human-readable OCT amounts and
//! the token's smallest on-chain unit.
//!
//! All arithmetic is integer-only; floating point would silently lose
//! precision at 18 decimals.

use crate::errors::{ArcadeResult, ClassifiedError};

/// Native decimal count of the OCT token.
pub const OCT_DECIMALS: u32 = 18;

/// Default display precision for formatted amounts.
pub const DISPLAY_DECIMALS: u32 = 4;

/// Parse a decimal amount string into the smallest unit.
///
/// `"1.5"` parses to `1500000000000000000`. Rejects malformed input,
/// more than [`OCT_DECIMALS`] fractional digits, and overflow.
pub fn parse_oct_amount(amount: &str) -> ArcadeResult<u128> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ClassifiedError::validation("Amount is required"));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ClassifiedError::validation("Invalid amount: '.'"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClassifiedError::validation(format!(
            "Invalid amount: '{}'",
            amount
        )));
    }
    if fraction.len() as u32 > OCT_DECIMALS {
        return Err(ClassifiedError::validation(format!(
            "Invalid amount: more than {} decimal places",
            OCT_DECIMALS
        )));
    }

    let whole_part: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| ClassifiedError::validation(format!("Invalid amount: '{}'", amount)))?
    };

    let mut fraction_part: u128 = if fraction.is_empty() {
        0
    } else {
        fraction
            .parse()
            .map_err(|_| ClassifiedError::validation(format!("Invalid amount: '{}'", amount)))?
    };
    // Scale the fraction up to the full decimal width.
    for _ in 0..(OCT_DECIMALS - fraction.len() as u32) {
        fraction_part = fraction_part
            .checked_mul(10)
            .ok_or_else(|| ClassifiedError::validation("Invalid amount: overflow"))?;
    }

    let scale = 10u128.pow(OCT_DECIMALS);
    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_part))
        .ok_or_else(|| ClassifiedError::validation("Invalid amount: overflow"))
}

/// Format a smallest-unit amount as a decimal string with exactly
/// `display_decimals` fractional digits (truncated, not rounded).
pub fn format_oct_amount(smallest_unit: u128, display_decimals: u32) -> String {
    let scale = 10u128.pow(OCT_DECIMALS);
    let whole = smallest_unit / scale;
    let fraction = smallest_unit % scale;

    if display_decimals == 0 {
        return whole.to_string();
    }

    // Full-width fraction, zero-padded, then truncated to the display width.
    let full = format!("{:0width$}", fraction, width = OCT_DECIMALS as usize);
    let shown = &full[..(display_decimals as usize).min(full.len())];
    format!("{}.{}", whole, shown)
}

/// Parse a smallest-unit amount carried as a decimal string.
pub fn parse_smallest_unit(value: &str) -> ArcadeResult<u128> {
    value
        .trim()
        .parse()
        .map_err(|_| ClassifiedError::validation(format!("Invalid smallest-unit amount: '{}'", value)))
}
