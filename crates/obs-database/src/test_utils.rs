//! Test utilities for database integration tests
//!
//! Provides an isolated, migrated in-memory SQLite database per test so
//! that crates can exercise real queries without external services.

use crate::{establish_connection, DbConnection, PoolSettings};
use std::sync::Arc;

/// Test database with the full schema applied
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
    pub database_url: String,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let database_url = "sqlite::memory:".to_string();
        let db = establish_connection(&database_url, PoolSettings::default()).await?;
        Ok(Self { db, database_url })
    }

    /// Get a reference to the database connection
    pub fn connection(&self) -> &DbConnection {
        self.db.as_ref()
    }

    /// Get an Arc to the database connection
    pub fn connection_arc(&self) -> Arc<DbConnection> {
        self.db.clone()
    }
}
