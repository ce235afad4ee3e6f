//! SQLite-backed store (§6: `data.db` under `DataDir`).
//!
//! A single file holds both the `media` and `nzb` tables; sqlx serializes
//! writers internally so no external locking is required.

pub mod pool;

use momenarr_core::{MomenarrError, Result};
use pool::PoolConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

pub type DatabasePool = SqlitePool;

/// Open `data.db`, creating the file and its parent directory if absent.
pub async fn create_pool(db_path: &str) -> Result<DatabasePool> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))
        .map_err(|e| MomenarrError::Configuration {
            field: "store.data_dir".to_string(),
            message: format!("invalid database path {db_path}: {e}"),
        })?
        .create_if_missing(true);

    let pool = pool::create_pool(options, PoolConfig::default()).await?;
    Ok(pool)
}

/// Run embedded schema migrations.
pub async fn migrate(pool: &DatabasePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| MomenarrError::Configuration {
            field: "database".to_string(),
            message: format!("migration failed: {e}"),
        })?;
    Ok(())
}

pub async fn test_connection(pool: &DatabasePool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
