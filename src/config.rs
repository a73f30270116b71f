use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DB_ENV: &str = "FINTRACK_DB";
pub const LOG_ENV: &str = "FINTRACK_LOG";
pub const USER_ENV: &str = "FINTRACK_USER";
pub const PASSWORD_ENV: &str = "FINTRACK_PASSWORD";

const DEFAULT_LOG_FILTER: &str = "fintrack=warn";

/// Runtime settings, all taken from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup` so callers can supply their own
    /// source instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup(DB_ENV).filter(|v| !v.trim().is_empty()) {
            Some(path) => {
                let path = PathBuf::from(path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create data directory: {}", parent.display())
                    })?;
                }
                path
            }
            None => default_db_path()?,
        };
        let log_filter = lookup(LOG_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self {
            db_path,
            log_filter,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "fintrack", "FinTrack")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("fintrack.db"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_db_override_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("ledger.db");
        let target_str = target.to_string_lossy().to_string();

        let config = Config::from_lookup(|key| match key {
            DB_ENV => Some(target_str.clone()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.db_path, target);
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_log_filter_override() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db").to_string_lossy().to_string();

        let config = Config::from_lookup(|key| match key {
            DB_ENV => Some(db.clone()),
            LOG_ENV => Some("fintrack=debug".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.log_filter, "fintrack=debug");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.db").to_string_lossy().to_string();

        let config = Config::from_lookup(|key| match key {
            DB_ENV => Some(db.clone()),
            LOG_ENV => Some("  ".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }
}
