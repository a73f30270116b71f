mod run;

use anyhow::{Context, Result};

use fintrack::config::Config;
use fintrack::db::Database;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?;
    fintrack::logging::init_tracing(&config.log_filter);

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;

    run::as_cli(&args, &db)
}
