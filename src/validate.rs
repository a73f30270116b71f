use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{LedgerError, Result};
use crate::models::MAX_AMOUNT;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern is valid"));

/// Parse a user-typed money amount such as `1,234.50` or `$75`.
/// Transaction amounts must be strictly positive.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let amount = parse_money(input)?;
    if amount.is_zero() {
        return Err(LedgerError::validation("Amount must be greater than zero"));
    }
    Ok(amount)
}

/// Like [`parse_amount`] but a zero budget limit is allowed.
pub fn parse_limit(input: &str) -> Result<Decimal> {
    parse_money(input)
}

fn parse_money(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    if trimmed.starts_with('(') {
        return Err(LedgerError::validation(format!(
            "Amount cannot be negative: '{input}'"
        )));
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Err(LedgerError::validation("Please enter an amount"));
    }
    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| LedgerError::validation(format!("Invalid amount: '{input}'")))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::validation(format!(
            "Amount cannot be negative: '{input}'"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::validation(format!(
            "Amount cannot exceed {MAX_AMOUNT}: '{input}'"
        )));
    }
    if amount.scale() > 2 {
        return Err(LedgerError::validation(format!(
            "Amount has more than two decimal places: '{input}'"
        )));
    }
    Ok(amount)
}

/// Accepts ISO dates first, then the day-first and month-first slash forms.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| LedgerError::validation(format!("Invalid date '{input}', use YYYY-MM-DD")))
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(LedgerError::validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(LedgerError::validation(
            "Username may contain only letters, numbers, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod validate_tests;
