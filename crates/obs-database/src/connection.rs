//! Database connection management

use obs_core::{ServiceError, ServiceResult};
use obs_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub type DbConnection = DatabaseConnection;

/// Connection pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Connect to the database and run pending migrations
pub async fn establish_connection(
    database_url: &str,
    pool: PoolSettings,
) -> ServiceResult<Arc<DbConnection>> {
    let mut opt = ConnectOptions::new(database_url);
    if is_in_memory_sqlite(database_url) {
        // Every pooled connection would otherwise open its own empty database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(pool.max_connections)
            .min_connections(pool.min_connections);
    }
    opt.connect_timeout(pool.connect_timeout)
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    Migrator::up(&db, None)
        .await
        .map_err(|e| ServiceError::Migration(e.to_string()))?;

    debug!("Database ready, migrations applied");
    Ok(Arc::new(db))
}

fn is_in_memory_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite") && database_url.contains(":memory:")
}
