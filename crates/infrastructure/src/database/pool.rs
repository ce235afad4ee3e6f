use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // SQLite serializes writers internally; a handful of reader
            // connections is plenty for a single-process controller.
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Open the SQLite pool backing `data.db`, given connect options (so the
/// caller controls `create_if_missing` and other file-level behavior).
pub async fn create_pool(
    options: SqliteConnectOptions,
    config: PoolConfig,
) -> Result<SqlitePool, sqlx::Error> {
    info!(max_connections = config.max_connections, "opening SQLite pool");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .connect_with(options)
        .await?;

    debug!("SQLite pool opened");
    Ok(pool)
}

#[derive(Debug)]
pub struct PoolMonitor {
    pool: SqlitePool,
}

impl PoolMonitor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn metrics(&self) -> PoolMetrics {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        PoolMetrics {
            total_connections: size,
            idle_connections: idle,
            active_connections: size.saturating_sub(idle),
        }
    }

    pub async fn start_monitoring(self, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let metrics = self.metrics();
                if metrics.total_connections > 0 && metrics.active_connections == metrics.total_connections {
                    warn!("SQLite pool fully checked out, queries may start queuing");
                }
                debug!(?metrics, "database pool metrics");
            }
        });
    }
}

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub active_connections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults_are_conservative() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
    }
}
