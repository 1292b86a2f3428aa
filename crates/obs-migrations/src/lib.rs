//! Database migrations for the obs ingestion gateway

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
