//! Utility functions for formatting and common operations
//!
//! Centralizes the French-style display of amounts and the flexible date
//! syntax accepted on the command line.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::PatrimoineError;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Append " €"
    Euro,
    /// No currency symbol (table cells, CSV)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value using French conventions:
/// - Thousands separator: ` ` (space)
/// - Decimal separator: `,` (comma)
///
/// # Examples
/// ```
/// use patrimoine::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::Euro),
///     "1 234,56 €"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1 234,00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*c);
    }

    let sign = if is_negative { "-" } else { "" };
    let suffix = match symbol {
        CurrencySymbol::Euro => " €",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{},{}{}", sign, grouped, decimal_part, suffix);

    let visible = result.chars().count();
    if width > visible {
        format!("{}{}", " ".repeat(width - visible), result)
    } else {
        result
    }
}

/// Format as euros: "1 234,56 €"
///
/// # Examples
/// ```
/// use patrimoine::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(899.74)), "899,74 €");
/// assert_eq!(format_currency(dec!(-500)), "-500,00 €");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Euro)
}

/// Format a depreciation rate: "12,5 %"
pub fn format_rate(rate: Decimal) -> String {
    format!("{} %", rate.normalize()).replace('.', ",")
}

/// Parse flexible date formats: YYYY-MM-DD, YYYY-MM (last day of the
/// month) or YYYY (December 31)
pub fn parse_flexible_date(s: &str) -> Result<NaiveDate, PatrimoineError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(first) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        let next_month = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        };
        if let Some(last_day) = next_month.and_then(|nm| nm.pred_opt()) {
            return Ok(last_day);
        }
    }

    if let Ok(year) = s.parse::<i32>() {
        if (1900..=2100).contains(&year) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 12, 31) {
                return Ok(date);
            }
        }
    }

    Err(PatrimoineError::Validation(format!(
        "invalid date '{}'. Use YYYY-MM-DD, YYYY-MM, or YYYY",
        s
    )))
}

/// Parse a typed amount. A comma is read as the decimal separator
/// ("12,5") but never as a thousands separator: "1,000" is rejected.
///
/// ```
/// use patrimoine::utils::parse_amount;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(parse_amount("1500.50").unwrap(), dec!(1500.50));
/// assert_eq!(parse_amount("12,5").unwrap(), dec!(12.5));
/// assert!(parse_amount("1,000").is_err());
/// ```
pub fn parse_amount(raw: &str) -> Result<Decimal, PatrimoineError> {
    let s = raw.trim();

    if let Ok(value) = Decimal::from_str(s) {
        return Ok(value);
    }
    if let Ok(value) = Decimal::from_scientific(s) {
        return Ok(value);
    }

    if let Some((whole, cents)) = s.split_once(',') {
        let decimal_comma = !whole.contains('.')
            && !cents.is_empty()
            && cents.len() <= 2
            && cents.chars().all(|c| c.is_ascii_digit());
        if decimal_comma {
            if let Ok(value) = Decimal::from_str(&format!("{}.{}", whole, cents)) {
                return Ok(value);
            }
        }
    }

    Err(PatrimoineError::Validation(format!(
        "invalid amount '{}'. Use digits with '.' or ',' as decimal separator and no thousands separator",
        s
    )))
}
