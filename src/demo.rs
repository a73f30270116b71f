//! Sample ledger for trying the tool out. Only ever runs on request; the
//! aggregation code never falls back to this data.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::auth::hash_password;
use crate::db::{Database, LedgerReader};
use crate::error::Result;
use crate::models::{Month, Transaction, TransactionType};

pub const DEMO_USERNAME: &str = "demo_user";
pub const DEMO_PASSWORD: &str = "demo123";

pub const DEMO_BUDGET: i64 = 3000;
const SPREAD_DAYS: i64 = 90;

/// (category, type, amount in cents, description)
const SAMPLE: &[(&str, TransactionType, i64, &str)] = &[
    ("Salary", TransactionType::Income, 500_000, "Monthly salary"),
    ("Freelance", TransactionType::Income, 120_000, "Web development project"),
    ("Investment", TransactionType::Income, 30_000, "Dividend payment"),
    ("Food", TransactionType::Expense, 45_000, "Grocery shopping"),
    ("Transportation", TransactionType::Expense, 20_000, "Gas and public transport"),
    ("Entertainment", TransactionType::Expense, 15_000, "Movie tickets and dinner"),
    ("Healthcare", TransactionType::Expense, 30_000, "Doctor visit"),
    ("Shopping", TransactionType::Expense, 25_000, "Clothing and electronics"),
    ("Bills", TransactionType::Expense, 120_000, "Rent and utilities"),
    ("Food", TransactionType::Expense, 18_000, "Restaurant meals"),
    ("Transportation", TransactionType::Expense, 8_000, "Uber rides"),
    ("Entertainment", TransactionType::Expense, 7_500, "Streaming subscriptions"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSeed {
    pub user_id: i64,
    pub created_user: bool,
    pub inserted: usize,
    pub budget_set: bool,
}

/// Create the demo account with three months of sample activity ending at
/// `today`, plus a budget for the current month. Safe to run repeatedly:
/// existing demo data is left as it is.
pub fn seed_demo(db: &Database, today: NaiveDate) -> Result<DemoSeed> {
    let (user_id, created_user) = match db.find_user_by_username(DEMO_USERNAME)? {
        Some(user) => (user.id, false),
        None => (
            db.create_user(DEMO_USERNAME, &hash_password(DEMO_PASSWORD))?,
            true,
        ),
    };

    let mut inserted = 0;
    if db.transaction_count(user_id)? == 0 {
        let start = today - Duration::days(SPREAD_DAYS);
        for (i, &(category, kind, cents, description)) in SAMPLE.iter().enumerate() {
            let Some(category) = db.find_category_by_name(category)? else {
                continue;
            };
            let Some(category_id) = category.id else {
                continue;
            };
            let offset = (i as i64 * 37 + 11) % (SPREAD_DAYS + 1);
            let txn = Transaction::new(
                user_id,
                category_id,
                kind,
                Decimal::new(cents, 2),
                start + Duration::days(offset),
                description.to_string(),
            );
            db.insert_transaction(&txn)?;
            inserted += 1;
        }
    }

    let month = Month::of(today);
    let budget_set = if db.get_budget(user_id, month)?.is_none() {
        db.upsert_budget(user_id, month, Decimal::from(DEMO_BUDGET))?;
        true
    } else {
        false
    };

    info!(user_id, inserted, budget_set, "seeded demo data");
    Ok(DemoSeed {
        user_id,
        created_user,
        inserted,
        budget_set,
    })
}
