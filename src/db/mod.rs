mod schema;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::models::*;

pub use schema::DEFAULT_CATEGORIES;

/// Read-side queries the aggregation engine runs against a ledger.
///
/// `Database` is the real implementation; anything else that can answer these
/// (a fixture, a failing stub) can stand in for it.
pub trait LedgerReader {
    /// Sum of amounts for one user, type and month. Zero when nothing matches.
    fn sum_amount(&self, user_id: i64, kind: TransactionType, month: Month) -> Result<Decimal>;

    /// Sum of amounts for one user and type within inclusive date bounds.
    fn sum_amount_in_range(
        &self,
        user_id: i64,
        kind: TransactionType,
        range: DateRange,
    ) -> Result<Decimal>;

    /// Per-category totals, alphabetical by category name. Categories whose
    /// total is zero are left out.
    fn amounts_by_category(
        &self,
        user_id: i64,
        kind: TransactionType,
        range: DateRange,
    ) -> Result<Vec<(Category, Decimal)>>;

    fn get_budget(&self, user_id: i64, month: Month) -> Result<Option<Budget>>;

    /// Newest first: date descending, then id descending.
    fn list_transactions(&self, user_id: i64, filter: &TransactionFilter)
        -> Result<Vec<Transaction>>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening ledger database");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        db.seed_default_categories()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        db.seed_default_categories()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            debug!(version = schema::CURRENT_VERSION, "creating fresh schema");
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                debug!(from_version, "applying migration");
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    fn seed_default_categories(&mut self) -> Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for name in schema::DEFAULT_CATEGORIES {
            tx.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                params![name],
            )?;
        }
        tx.commit()?;
        debug!(count = schema::DEFAULT_CATEGORIES.len(), "seeded default categories");
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        let result = self.conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, password_hash],
        );
        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!(user_id = id, username, "registered user");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(LedgerError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<i64>> {
        let result = self.conn.query_row(
            "SELECT id FROM users WHERE username = ?1 AND password_hash = ?2",
            params![username, password_hash],
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_user("WHERE username = ?1", params![username])
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.query_user("WHERE id = ?1", params![id])
    }

    fn query_user(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Option<User>> {
        let sql = format!("SELECT id, username, password_hash FROM users {clause}");
        let result = self.conn.query_row(&sql, args, |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        });
        match result {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Categories ────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let result = self.conn.query_row(
            "SELECT id, name FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                })
            },
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let categories = self.list_categories()?;
        Ok(Category::find_by_name(&categories, name.trim()).cloned())
    }

    // ── Transactions ──────────────────────────────────────────

    pub fn insert_transaction(&self, txn: &Transaction) -> Result<i64> {
        if txn.amount <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "Amount must be greater than zero, got {}",
                txn.amount
            )));
        }
        if txn.amount > MAX_AMOUNT {
            return Err(LedgerError::validation(format!(
                "Amount cannot exceed {MAX_AMOUNT}, got {}",
                txn.amount
            )));
        }
        if self.get_user(txn.user_id)?.is_none() {
            return Err(LedgerError::not_found("user", txn.user_id));
        }
        if self.get_category_by_id(txn.category_id)?.is_none() {
            return Err(LedgerError::not_found("category", txn.category_id));
        }

        self.conn.execute(
            "INSERT INTO transactions (user_id, category_id, type, amount, date, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                txn.user_id,
                txn.category_id,
                txn.kind.as_str(),
                txn.amount.to_string(),
                txn.date.to_string(),
                txn.description,
                txn.created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            transaction_id = id,
            user_id = txn.user_id,
            kind = txn.kind.as_str(),
            amount = %txn.amount,
            date = %txn.date,
            "recorded transaction"
        );
        Ok(id)
    }

    pub fn transaction_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Sum the `amount` column of every row the WHERE clause selects.
    /// Amounts are TEXT so the fold happens in `Decimal`, not SQLite REAL.
    fn sum_where(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Decimal> {
        let sql = format!("SELECT amount FROM transactions WHERE {clause}");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(args)?;
        let mut total = Decimal::ZERO;
        while let Some(row) = rows.next()? {
            total = total
                .checked_add(decimal_at(row, 0)?)
                .ok_or(LedgerError::Overflow("a ledger total"))?;
        }
        Ok(total)
    }

    // ── Budgets ───────────────────────────────────────────────

    pub fn upsert_budget(&self, user_id: i64, month: Month, limit_amount: Decimal) -> Result<i64> {
        if limit_amount < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "Budget limit cannot be negative, got {limit_amount}"
            )));
        }
        if limit_amount > MAX_AMOUNT {
            return Err(LedgerError::validation(format!(
                "Budget limit cannot exceed {MAX_AMOUNT}, got {limit_amount}"
            )));
        }
        let month_str = month.to_string();
        self.conn.execute(
            "INSERT INTO budgets (user_id, month, limit_amount)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, month) DO UPDATE SET limit_amount = excluded.limit_amount",
            params![user_id, month_str, limit_amount.to_string()],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM budgets WHERE user_id = ?1 AND month = ?2",
            params![user_id, month_str],
            |row| row.get(0),
        )?;
        info!(budget_id = id, user_id, month = %month, limit = %limit_amount, "set budget");
        Ok(id)
    }
}

impl LedgerReader for Database {
    fn sum_amount(&self, user_id: i64, kind: TransactionType, month: Month) -> Result<Decimal> {
        self.sum_where(
            "user_id = ?1 AND type = ?2 AND date LIKE ?3",
            params![user_id, kind.as_str(), format!("{month}-%")],
        )
    }

    fn sum_amount_in_range(
        &self,
        user_id: i64,
        kind: TransactionType,
        range: DateRange,
    ) -> Result<Decimal> {
        let (clause, values) = range_clause("date", range, 3);
        let kind = kind.as_str();
        let mut args: Vec<&dyn rusqlite::ToSql> = vec![&user_id, &kind];
        args.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
        self.sum_where(&format!("user_id = ?1 AND type = ?2{clause}"), &args)
    }

    fn amounts_by_category(
        &self,
        user_id: i64,
        kind: TransactionType,
        range: DateRange,
    ) -> Result<Vec<(Category, Decimal)>> {
        let (clause, values) = range_clause("t.date", range, 3);
        let sql = format!(
            "SELECT c.id, c.name, t.amount
             FROM transactions t
             JOIN categories c ON t.category_id = c.id
             WHERE t.user_id = ?1 AND t.type = ?2{clause}"
        );
        let kind = kind.as_str();
        let mut args: Vec<&dyn rusqlite::ToSql> = vec![&user_id, &kind];
        args.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(args.as_slice())?;
        let mut totals: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let amount = decimal_at(row, 2)?;
            let entry = totals.entry(name).or_insert((id, Decimal::ZERO));
            entry.1 = entry
                .1
                .checked_add(amount)
                .ok_or(LedgerError::Overflow("a category total"))?;
        }

        Ok(totals
            .into_iter()
            .filter(|(_, (_, total))| !total.is_zero())
            .map(|(name, (id, total))| (Category { id: Some(id), name }, total))
            .collect())
    }

    fn get_budget(&self, user_id: i64, month: Month) -> Result<Option<Budget>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, limit_amount FROM budgets WHERE user_id = ?1 AND month = ?2",
            params![user_id, month.to_string()],
            |row| {
                Ok(Budget {
                    id: Some(row.get(0)?),
                    user_id: row.get(1)?,
                    month,
                    limit_amount: decimal_at(row, 2)?,
                })
            },
        );
        match result {
            Ok(b) => Ok(Some(b)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let mut sql = String::from(
            "SELECT t.id, t.user_id, t.category_id, t.type, t.amount, t.date, t.description, t.created_at
             FROM transactions t WHERE t.user_id = ?1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id)];

        if let Some(from) = filter.range.from {
            sql.push_str(&format!(" AND t.date >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(from.to_string()));
        }
        if let Some(to) = filter.range.to {
            sql.push_str(&format!(" AND t.date <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(to.to_string()));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(&format!(" AND t.type = ?{}", param_values.len() + 1));
            param_values.push(Box::new(kind.as_str()));
        }
        if let Some(cid) = filter.category_id {
            sql.push_str(&format!(" AND t.category_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(cid));
        }

        sql.push_str(" ORDER BY t.date DESC, t.id DESC");

        if let Some(l) = filter.limit {
            sql.push_str(&format!(" LIMIT {l}"));
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), |row| {
            Ok(Transaction {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                category_id: row.get(2)?,
                kind: kind_at(row, 3)?,
                amount: decimal_at(row, 4)?,
                date: date_at(row, 5)?,
                description: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

/// Build ` AND col >= ?n AND col <= ?m` for whichever bounds are present,
/// numbering placeholders from `first_param`.
fn range_clause(column: &str, range: DateRange, first_param: usize) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut values = Vec::new();
    if let Some(from) = range.from {
        clause.push_str(&format!(" AND {column} >= ?{}", first_param + values.len()));
        values.push(from.to_string());
    }
    if let Some(to) = range.to {
        clause.push_str(&format!(" AND {column} <= ?{}", first_param + values.len()));
        values.push(to.to_string());
    }
    (clause, values)
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn kind_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionType> {
    let text: String = row.get(idx)?;
    TransactionType::parse(&text)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, "type".into(), Type::Text))
}
