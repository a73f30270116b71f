use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Ledger money as shown in listings and summaries: `-$1,234.50`.
pub fn format_amount(val: Decimal) -> String {
    let cents = format!(
        "{:.2}",
        val.abs()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if val.is_sign_negative() && !val.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// Month-over-month change as shown on summary cards: `↑ +12.5%`.
pub fn format_change(pct: Decimal) -> String {
    let pct = one_place(pct);
    if pct > Decimal::ZERO {
        format!("↑ +{pct:.1}%")
    } else if pct < Decimal::ZERO {
        format!("↓ {pct:.1}%")
    } else {
        "→ 0.0%".to_string()
    }
}

/// Percentage with one decimal place, e.g. for budget usage.
pub fn format_pct(pct: Decimal) -> String {
    format!("{:.1}%", one_place(pct))
}

fn one_place(pct: Decimal) -> Decimal {
    pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed-width text bar for a 0–100 progress value.
pub fn progress_bar(pct: Decimal, width: usize) -> String {
    let pct = pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let filled = (pct * Decimal::from(width) / Decimal::ONE_HUNDRED)
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Clip a table cell to `max` characters, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some(_) => {
            let keep = s
                .char_indices()
                .nth(max - 1)
                .map_or(s.len(), |(byte, _)| byte);
            format!("{}…", &s[..keep])
        }
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
