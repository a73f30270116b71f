#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::auth;
use crate::db::Database;
use crate::error::LedgerError;
use crate::models::{Budget, Category};

fn month(s: &str) -> Month {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ── Test doubles ──────────────────────────────────────────────

/// Answers every query with fixed figures, whatever the month.
struct FixedLedger {
    income: Decimal,
    expense: Decimal,
    budget: Option<Decimal>,
}

impl LedgerReader for FixedLedger {
    fn sum_amount(&self, _: i64, kind: TransactionType, _: Month) -> Result<Decimal> {
        Ok(match kind {
            TransactionType::Income => self.income,
            TransactionType::Expense => self.expense,
        })
    }

    fn sum_amount_in_range(&self, user_id: i64, kind: TransactionType, _: DateRange) -> Result<Decimal> {
        self.sum_amount(user_id, kind, month("2000-01"))
    }

    fn amounts_by_category(
        &self,
        _: i64,
        _: TransactionType,
        _: DateRange,
    ) -> Result<Vec<(Category, Decimal)>> {
        Ok(Vec::new())
    }

    fn get_budget(&self, user_id: i64, month: Month) -> Result<Option<Budget>> {
        Ok(self.budget.map(|limit| Budget::new(user_id, month, limit)))
    }

    fn list_transactions(&self, _: i64, _: &TransactionFilter) -> Result<Vec<Transaction>> {
        Ok(Vec::new())
    }
}

/// Fails every query the way a lost connection would.
struct BrokenLedger;

impl LedgerReader for BrokenLedger {
    fn sum_amount(&self, _: i64, _: TransactionType, _: Month) -> Result<Decimal> {
        Err(LedgerError::Storage(rusqlite::Error::InvalidQuery))
    }

    fn sum_amount_in_range(&self, _: i64, _: TransactionType, _: DateRange) -> Result<Decimal> {
        Err(LedgerError::Storage(rusqlite::Error::InvalidQuery))
    }

    fn amounts_by_category(
        &self,
        _: i64,
        _: TransactionType,
        _: DateRange,
    ) -> Result<Vec<(Category, Decimal)>> {
        Err(LedgerError::Storage(rusqlite::Error::InvalidQuery))
    }

    fn get_budget(&self, _: i64, _: Month) -> Result<Option<Budget>> {
        Err(LedgerError::Storage(rusqlite::Error::InvalidQuery))
    }

    fn list_transactions(&self, _: i64, _: &TransactionFilter) -> Result<Vec<Transaction>> {
        Err(LedgerError::Storage(rusqlite::Error::InvalidQuery))
    }
}

// ── Real-ledger fixtures ──────────────────────────────────────

fn setup_user(db: &Database) -> i64 {
    db.create_user("tester", &auth::hash_password("secret1")).unwrap()
}

fn category_id(db: &Database, name: &str) -> i64 {
    db.find_category_by_name(name).unwrap().unwrap().id.unwrap()
}

fn add(db: &Database, user_id: i64, kind: TransactionType, cat: &str, amount: Decimal, on: &str) {
    let txn = Transaction::new(
        user_id,
        category_id(db, cat),
        kind,
        amount,
        date(on),
        String::new(),
    );
    db.insert_transaction(&txn).unwrap();
}

fn setup_ledger(db: &Database) -> i64 {
    let uid = setup_user(db);
    add(db, uid, TransactionType::Income, "Salary", dec!(4000.00), "2024-01-01");
    add(db, uid, TransactionType::Income, "Freelance", dec!(350.25), "2024-01-18");
    add(db, uid, TransactionType::Expense, "Food", dec!(120.10), "2024-01-05");
    add(db, uid, TransactionType::Expense, "Food", dec!(79.90), "2024-01-22");
    add(db, uid, TransactionType::Expense, "Bills", dec!(900.00), "2024-01-31");
    add(db, uid, TransactionType::Expense, "Shopping", dec!(45.00), "2023-12-30");
    add(db, uid, TransactionType::Income, "Salary", dec!(4000.00), "2023-12-01");
    uid
}

// ── monthly_summary ───────────────────────────────────────────

#[test]
fn test_monthly_summary_exact_sums() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let s = monthly_summary(&db, uid, month("2024-01")).unwrap();
    assert_eq!(s.total_income, dec!(4350.25));
    assert_eq!(s.total_expense, dec!(1100.00));
    assert_eq!(s.net_balance, dec!(3250.25));
}

#[test]
fn test_monthly_summary_empty_month_is_zero() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let s = monthly_summary(&db, uid, month("2099-05")).unwrap();
    assert_eq!(s.total_income, Decimal::ZERO);
    assert_eq!(s.total_expense, Decimal::ZERO);
    assert_eq!(s.net_balance, Decimal::ZERO);
}

#[test]
fn test_monthly_summary_negative_balance() {
    let ledger = FixedLedger {
        income: dec!(100),
        expense: dec!(250.50),
        budget: None,
    };
    let s = monthly_summary(&ledger, 1, month("2024-01")).unwrap();
    assert_eq!(s.net_balance, dec!(-150.50));
}

#[test]
fn test_monthly_summary_ignores_other_users() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);
    let other = db.create_user("other", &auth::hash_password("secret2")).unwrap();
    add(&db, other, TransactionType::Income, "Salary", dec!(999), "2024-01-10");

    let s = monthly_summary(&db, uid, month("2024-01")).unwrap();
    assert_eq!(s.total_income, dec!(4350.25));
    let o = monthly_summary(&db, other, month("2024-01")).unwrap();
    assert_eq!(o.total_income, dec!(999));
}

// ── percentage_change ─────────────────────────────────────────

#[test]
fn test_percentage_change_zero_base() {
    assert_eq!(percentage_change(dec!(0), dec!(0)), dec!(0));
    assert_eq!(percentage_change(dec!(0), dec!(50)), dec!(100));
    assert_eq!(percentage_change(dec!(0), dec!(-50)), dec!(100));
}

#[test]
fn test_percentage_change_ratios() {
    assert_eq!(percentage_change(dec!(100), dec!(150)), dec!(50));
    assert_eq!(percentage_change(dec!(100), dec!(50)), dec!(-50));
    assert_eq!(percentage_change(dec!(100), dec!(100)), dec!(0));
    assert_eq!(percentage_change(dec!(3), dec!(4)), dec!(33.33));
    assert_eq!(percentage_change(dec!(3), dec!(5)), dec!(66.67));
}

#[test]
fn test_percentage_change_negative_base_follows_direction() {
    // deficit shrank: an improvement
    assert_eq!(percentage_change(dec!(-100), dec!(-50)), dec!(50));
    // deficit grew
    assert_eq!(percentage_change(dec!(-100), dec!(-150)), dec!(-50));
    assert_eq!(percentage_change(dec!(-200), dec!(100)), dec!(150));
}

// ── budget_status ─────────────────────────────────────────────

#[test]
fn test_budget_status_overspent() {
    let ledger = FixedLedger {
        income: dec!(0),
        expense: dec!(3500),
        budget: Some(dec!(3000)),
    };
    let s = budget_status(&ledger, 1, month("2024-01")).unwrap();
    assert_eq!(s.limit, Some(dec!(3000)));
    assert_eq!(s.spent, dec!(3500));
    assert_eq!(s.remaining, dec!(-500));
    assert_eq!(s.overspent_by, dec!(500));
    assert_eq!(s.usage_pct, Some(dec!(116.67)));
    assert!(s.is_overspent());
    assert_eq!(s.progress_pct(), dec!(100));
}

#[test]
fn test_budget_status_under_budget() {
    let ledger = FixedLedger {
        income: dec!(0),
        expense: dec!(750),
        budget: Some(dec!(3000)),
    };
    let s = budget_status(&ledger, 1, month("2024-01")).unwrap();
    assert_eq!(s.remaining, dec!(2250));
    assert_eq!(s.overspent_by, dec!(0));
    assert_eq!(s.usage_pct, Some(dec!(25)));
    assert_eq!(s.progress_pct(), dec!(25));
    assert!(!s.is_overspent());
}

#[test]
fn test_budget_status_no_budget_set() {
    let ledger = FixedLedger {
        income: dec!(0),
        expense: dec!(120),
        budget: None,
    };
    let s = budget_status(&ledger, 1, month("2024-01")).unwrap();
    assert!(!s.is_set());
    assert_eq!(s.limit, None);
    assert_eq!(s.usage_pct, None);
    assert_eq!(s.remaining, dec!(-120));
    assert_eq!(s.overspent_by, dec!(0));
    assert_eq!(s.progress_pct(), dec!(0));
}

#[test]
fn test_budget_status_zero_budget_differs_from_none() {
    let ledger = FixedLedger {
        income: dec!(0),
        expense: dec!(120),
        budget: Some(dec!(0)),
    };
    let s = budget_status(&ledger, 1, month("2024-01")).unwrap();
    assert!(s.is_set());
    assert_eq!(s.limit, Some(dec!(0)));
    assert_eq!(s.usage_pct, None);
    assert_eq!(s.overspent_by, dec!(120));
}

#[test]
fn test_budget_status_against_database() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let before = budget_status(&db, uid, month("2024-01")).unwrap();
    assert!(!before.is_set());

    db.upsert_budget(uid, month("2024-01"), dec!(1000)).unwrap();
    let after = budget_status(&db, uid, month("2024-01")).unwrap();
    assert_eq!(after.limit, Some(dec!(1000)));
    assert_eq!(after.spent, dec!(1100.00));
    assert_eq!(after.remaining, dec!(-100.00));
    assert_eq!(after.overspent_by, dec!(100.00));
    assert_eq!(after.usage_pct, Some(dec!(110)));
}

// ── category_breakdown ────────────────────────────────────────

#[test]
fn test_category_breakdown_sorted_descending() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let rows = category_breakdown(
        &db,
        uid,
        TransactionType::Expense,
        DateRange::month(month("2024-01")),
    )
    .unwrap();
    assert_eq!(
        rows,
        vec![
            ("Bills".to_string(), dec!(900.00)),
            ("Food".to_string(), dec!(200.00)),
        ]
    );
}

#[test]
fn test_category_breakdown_omits_inactive_categories() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let rows = category_breakdown(&db, uid, TransactionType::Expense, DateRange::all()).unwrap();
    let names: Vec<&str> = rows.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Bills", "Food", "Shopping"]);
    assert!(rows.iter().all(|(_, amt)| *amt > Decimal::ZERO));
}

#[test]
fn test_category_breakdown_empty_period() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let rows = category_breakdown(
        &db,
        uid,
        TransactionType::Income,
        DateRange::month(month("2030-01")),
    )
    .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_category_breakdown_ties_break_by_name() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_user(&db);
    add(&db, uid, TransactionType::Expense, "Shopping", dec!(10), "2024-01-01");
    add(&db, uid, TransactionType::Expense, "Bills", dec!(10), "2024-01-02");

    let rows = category_breakdown(&db, uid, TransactionType::Expense, DateRange::all()).unwrap();
    assert_eq!(rows[0].0, "Bills");
    assert_eq!(rows[1].0, "Shopping");
}

// ── series ────────────────────────────────────────────────────

#[test]
fn test_monthly_series_oldest_first_with_gaps() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let series =
        monthly_series_ending(&db, uid, TransactionType::Income, month("2024-02"), 4).unwrap();
    let labels: Vec<String> = series.iter().map(|(m, _)| m.to_string()).collect();
    assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    let values: Vec<Decimal> = series.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, vec![dec!(0), dec!(4000.00), dec!(4350.25), dec!(0)]);
}

#[test]
fn test_monthly_series_zero_months() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_user(&db);
    let series = monthly_series(&db, uid, TransactionType::Expense, 0).unwrap();
    assert!(series.is_empty());
}

#[test]
fn test_monthly_series_ends_at_current_month() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_user(&db);
    let series = monthly_series(&db, uid, TransactionType::Expense, 6).unwrap();
    assert_eq!(series.len(), 6);
    assert_eq!(series.last().unwrap().0, Month::current());
    assert_eq!(series.first().unwrap().0, Month::current().minus(5));
    assert!(series.iter().all(|(_, v)| v.is_zero()));
}

#[test]
fn test_income_expense_series_pairs() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let points = income_expense_series(&db, uid, month("2024-01"), 2).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].month, month("2023-12"));
    assert_eq!(points[0].income, dec!(4000.00));
    assert_eq!(points[0].expense, dec!(45.00));
    assert_eq!(points[1].income, dec!(4350.25));
    assert_eq!(points[1].expense, dec!(1100.00));
}

// ── month_over_month ──────────────────────────────────────────

#[test]
fn test_month_over_month() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let cmp = month_over_month(&db, uid, month("2024-01")).unwrap();
    assert_eq!(cmp.previous.month, month("2023-12"));
    assert_eq!(cmp.previous.net_balance, dec!(3955.00));
    // 4000 -> 4350.25
    assert_eq!(cmp.income_change, dec!(8.76));
    // 45 -> 1100
    assert_eq!(cmp.expense_change, dec!(2344.44));
    // 3955 -> 3250.25
    assert_eq!(cmp.balance_change, dec!(-17.82));
}

#[test]
fn test_month_over_month_from_empty_previous() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_user(&db);
    add(&db, uid, TransactionType::Income, "Salary", dec!(10), "2024-05-02");

    let cmp = month_over_month(&db, uid, month("2024-05")).unwrap();
    assert_eq!(cmp.income_change, dec!(100));
    assert_eq!(cmp.expense_change, dec!(0));
}

// ── category_comparison ───────────────────────────────────────

#[test]
fn test_category_comparison() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);
    add(&db, uid, TransactionType::Income, "Food", dec!(20), "2024-01-09");

    let rows = category_comparison(&db, uid, DateRange::month(month("2024-01"))).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Salary", "Bills", "Freelance", "Food"]);

    let food = rows.iter().find(|r| r.name == "Food").unwrap();
    assert_eq!(food.income, dec!(20));
    assert_eq!(food.expense, dec!(200.00));
    assert_eq!(food.total(), dec!(220.00));
}

// ── recent_transactions ───────────────────────────────────────

#[test]
fn test_recent_transactions_newest_first() {
    let db = Database::open_in_memory().unwrap();
    let uid = setup_ledger(&db);

    let recent = recent_transactions(&db, uid, 3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].date, date("2024-01-31"));
    assert_eq!(recent[1].date, date("2024-01-22"));
    assert_eq!(recent[2].date, date("2024-01-18"));
}

// ── failure propagation ───────────────────────────────────────

#[test]
fn test_storage_errors_propagate() {
    let m = month("2024-01");
    assert!(matches!(
        monthly_summary(&BrokenLedger, 1, m),
        Err(LedgerError::Storage(_))
    ));
    assert!(matches!(
        budget_status(&BrokenLedger, 1, m),
        Err(LedgerError::Storage(_))
    ));
    assert!(matches!(
        category_breakdown(&BrokenLedger, 1, TransactionType::Expense, DateRange::all()),
        Err(LedgerError::Storage(_))
    ));
    assert!(matches!(
        monthly_series_ending(&BrokenLedger, 1, TransactionType::Income, m, 3),
        Err(LedgerError::Storage(_))
    ));
    assert!(matches!(
        recent_transactions(&BrokenLedger, 1, 5),
        Err(LedgerError::Storage(_))
    ));
    assert!(!LedgerError::Storage(rusqlite::Error::InvalidQuery).is_recoverable());
}

// ── end to end ────────────────────────────────────────────────

#[test]
fn test_end_to_end_alice() {
    let db = Database::open_in_memory().unwrap();
    let registered = auth::register(&db, "alice", "password1").unwrap();
    let uid = auth::login(&db, "alice", "password1").unwrap();
    assert_eq!(uid, registered);

    let this_month = Month::current();
    let day = this_month.first_day();
    let salary = category_id(&db, "Salary");
    let food = category_id(&db, "Food");
    db.insert_transaction(&Transaction::new(
        uid,
        salary,
        TransactionType::Income,
        dec!(5000),
        day,
        "Paycheck".into(),
    ))
    .unwrap();
    db.insert_transaction(&Transaction::new(
        uid,
        food,
        TransactionType::Expense,
        dec!(1200),
        day,
        "Groceries".into(),
    ))
    .unwrap();

    let summary = monthly_summary(&db, uid, this_month).unwrap();
    assert_eq!(summary.total_income, dec!(5000));
    assert_eq!(summary.total_expense, dec!(1200));
    assert_eq!(summary.net_balance, dec!(3800));

    db.upsert_budget(uid, this_month, dec!(1000)).unwrap();
    let status = budget_status(&db, uid, this_month).unwrap();
    assert_eq!(status.limit, Some(dec!(1000)));
    assert_eq!(status.spent, dec!(1200));
    assert_eq!(status.remaining, dec!(-200));
    assert_eq!(status.overspent_by, dec!(200));
}

// ── share_pct ─────────────────────────────────────────────────

#[test]
fn test_share_pct() {
    assert_eq!(share_pct(dec!(25), dec!(200)), dec!(12.5));
    assert_eq!(share_pct(dec!(1), dec!(3)), dec!(33.33));
    assert_eq!(share_pct(dec!(10), Decimal::ZERO), Decimal::ZERO);
}

// ── out-of-range figures ──────────────────────────────────────

#[test]
fn test_summary_and_budget_report_overflow_instead_of_panicking() {
    let ledger = FixedLedger {
        income: Decimal::MAX,
        expense: -Decimal::MAX,
        budget: Some(Decimal::MAX),
    };
    let m = month("2024-01");
    assert!(matches!(
        monthly_summary(&ledger, 1, m),
        Err(LedgerError::Overflow(_))
    ));
    assert!(matches!(
        budget_status(&ledger, 1, m),
        Err(LedgerError::Overflow(_))
    ));
    assert!(!LedgerError::Overflow("a net balance").is_recoverable());
}

#[test]
fn test_percentage_change_saturates_at_extremes() {
    assert_eq!(percentage_change(-Decimal::MAX, Decimal::MAX), Decimal::MAX);
    assert_eq!(percentage_change(Decimal::MAX, -Decimal::MAX), Decimal::MIN);
}
