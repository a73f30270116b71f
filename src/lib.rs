//! fintrack keeps a single user's income and expense ledger with monthly
//! budgets, and derives the figures a dashboard shows from it: monthly
//! totals, budget usage, month-over-month change, category breakdowns and
//! trailing monthly series.

pub mod auth;
pub mod config;
pub mod db;
pub mod demo;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod models;
pub mod validate;

pub use error::{LedgerError, Result};
