use thiserror::Error;

/// Errors raised by the ledger store and everything layered on top of it.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Caller-supplied input was rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A total or difference left the range a `Decimal` can hold.
    #[error("Amount out of range while computing {0}")]
    Overflow(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Whether the caller can fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Overflow(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
