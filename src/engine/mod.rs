//! Derived figures computed from ledger queries.
//!
//! Every function here is stateless: it takes a store handle and explicit
//! inputs, issues fresh queries, and returns plain decimals. Nothing is
//! cached between calls and nothing is invented when the ledger is empty.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use crate::db::LedgerReader;
use crate::error::{LedgerError, Result};
use crate::models::{DateRange, Month, Transaction, TransactionFilter, TransactionType};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySummary {
    pub month: Month,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// Income minus expense; negative when the month ran a deficit.
    pub net_balance: Decimal,
}

pub fn monthly_summary<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    month: Month,
) -> Result<MonthlySummary> {
    let total_income = store.sum_amount(user_id, TransactionType::Income, month)?;
    let total_expense = store.sum_amount(user_id, TransactionType::Expense, month)?;
    Ok(MonthlySummary {
        month,
        total_income,
        total_expense,
        net_balance: difference(total_income, total_expense, "a net balance")?,
    })
}

/// Percent movement from `old_value` to `new_value`, rounded to 2 places.
///
/// A zero base reports `0` when nothing changed and `100` otherwise. A
/// negative base divides by its magnitude, so the sign of the result always
/// follows the direction of the move.
pub fn percentage_change(old_value: Decimal, new_value: Decimal) -> Decimal {
    if old_value.is_zero() {
        return if new_value.is_zero() {
            Decimal::ZERO
        } else {
            HUNDRED
        };
    }
    match new_value.checked_sub(old_value) {
        Some(delta) => percent_of(delta, old_value.abs()),
        None if new_value > old_value => Decimal::MAX,
        None => Decimal::MIN,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetStatus {
    pub month: Month,
    /// `None` when no budget was set for the month, which is not the same
    /// as a budget of zero.
    pub limit: Option<Decimal>,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Uncapped spent-to-limit ratio. `None` unless the limit is positive.
    pub usage_pct: Option<Decimal>,
    pub overspent_by: Decimal,
}

impl BudgetStatus {
    pub fn is_set(&self) -> bool {
        self.limit.is_some()
    }

    pub fn is_overspent(&self) -> bool {
        self.overspent_by > Decimal::ZERO
    }

    /// Usage clamped to `0..=100` for progress bars.
    pub fn progress_pct(&self) -> Decimal {
        self.usage_pct
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, HUNDRED)
    }
}

pub fn budget_status<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    month: Month,
) -> Result<BudgetStatus> {
    let limit = store
        .get_budget(user_id, month)?
        .map(|budget| budget.limit_amount);
    let spent = store.sum_amount(user_id, TransactionType::Expense, month)?;
    status_from(month, limit, spent)
}

fn status_from(month: Month, limit: Option<Decimal>, spent: Decimal) -> Result<BudgetStatus> {
    let effective = limit.unwrap_or(Decimal::ZERO);
    let usage_pct = limit
        .filter(|l| *l > Decimal::ZERO)
        .map(|l| percent_of(spent, l));
    let remaining = difference(effective, spent, "a remaining budget")?;
    let overspent_by = if limit.is_some() {
        (-remaining).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    Ok(BudgetStatus {
        month,
        limit,
        spent,
        remaining,
        usage_pct,
        overspent_by,
    })
}

fn difference(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal> {
    a.checked_sub(b).ok_or(LedgerError::Overflow(what))
}

/// Category name → total for one transaction type, largest first.
/// Categories without a positive total are left out.
pub fn category_breakdown<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    kind: TransactionType,
    period: DateRange,
) -> Result<Vec<(String, Decimal)>> {
    let mut rows: Vec<(String, Decimal)> = store
        .amounts_by_category(user_id, kind, period)?
        .into_iter()
        .filter(|(_, total)| *total > Decimal::ZERO)
        .map(|(category, total)| (category.name, total))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(rows)
}

/// Totals for the trailing `n_months` calendar months ending with the
/// current month, oldest first.
pub fn monthly_series<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    kind: TransactionType,
    n_months: u32,
) -> Result<Vec<(Month, Decimal)>> {
    monthly_series_ending(store, user_id, kind, Month::current(), n_months)
}

pub fn monthly_series_ending<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    kind: TransactionType,
    end: Month,
    n_months: u32,
) -> Result<Vec<(Month, Decimal)>> {
    (0..n_months)
        .rev()
        .map(|back| {
            let month = end.minus(back);
            Ok((month, store.sum_amount(user_id, kind, month)?))
        })
        .collect()
}

/// One month of the income-vs-expense chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPoint {
    pub month: Month,
    pub income: Decimal,
    pub expense: Decimal,
}

pub fn income_expense_series<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    end: Month,
    n_months: u32,
) -> Result<Vec<MonthPoint>> {
    (0..n_months)
        .rev()
        .map(|back| {
            let summary = monthly_summary(store, user_id, end.minus(back))?;
            Ok(MonthPoint {
                month: summary.month,
                income: summary.total_income,
                expense: summary.total_expense,
            })
        })
        .collect()
}

/// A month's figures next to the previous month's, with the change in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthComparison {
    pub current: MonthlySummary,
    pub previous: MonthlySummary,
    pub income_change: Decimal,
    pub expense_change: Decimal,
    pub balance_change: Decimal,
}

pub fn month_over_month<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    month: Month,
) -> Result<MonthComparison> {
    let current = monthly_summary(store, user_id, month)?;
    let previous = monthly_summary(store, user_id, month.prev())?;
    Ok(MonthComparison {
        current,
        previous,
        income_change: percentage_change(previous.total_income, current.total_income),
        expense_change: percentage_change(previous.total_expense, current.total_expense),
        balance_change: percentage_change(previous.net_balance, current.net_balance),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryActivity {
    pub name: String,
    pub income: Decimal,
    pub expense: Decimal,
}

impl CategoryActivity {
    pub fn total(&self) -> Decimal {
        self.income.saturating_add(self.expense)
    }
}

/// Income and expense side by side for every category that saw activity,
/// ordered by combined total, largest first.
pub fn category_comparison<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    period: DateRange,
) -> Result<Vec<CategoryActivity>> {
    let mut by_name: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for (category, total) in store.amounts_by_category(user_id, TransactionType::Income, period)? {
        let entry = by_name.entry(category.name).or_default();
        entry.0 = entry.0.checked_add(total).ok_or(LedgerError::Overflow("a category total"))?;
    }
    for (category, total) in store.amounts_by_category(user_id, TransactionType::Expense, period)? {
        let entry = by_name.entry(category.name).or_default();
        entry.1 = entry.1.checked_add(total).ok_or(LedgerError::Overflow("a category total"))?;
    }

    let mut rows: Vec<CategoryActivity> = by_name
        .into_iter()
        .map(|(name, (income, expense))| CategoryActivity {
            name,
            income,
            expense,
        })
        .filter(|row| row.income > Decimal::ZERO || row.expense > Decimal::ZERO)
        .collect();
    rows.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.name.cmp(&b.name)));
    Ok(rows)
}

pub fn recent_transactions<S: LedgerReader + ?Sized>(
    store: &S,
    user_id: i64,
    limit: u32,
) -> Result<Vec<Transaction>> {
    store.list_transactions(user_id, &TransactionFilter::recent(limit))
}

/// Share of `part` in `whole` as a percentage; zero when `whole` is zero.
pub fn share_pct(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    percent_of(part, whole)
}

/// `part / whole * 100` rounded half away from zero to 2 places.
/// `whole` must be non-zero; out-of-range results saturate.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    let ratio = part
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(whole))
        .or_else(|| part.checked_div(whole).and_then(|r| r.checked_mul(HUNDRED)))
        .unwrap_or(if part.is_sign_negative() == whole.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        });
    ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests;
