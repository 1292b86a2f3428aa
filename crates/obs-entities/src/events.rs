//! Events entity: one row per ingested event, keyed by the event id

use obs_core::Level;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub level: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    /// Frames as sent by the producer, serialized JSON text
    #[sea_orm(column_type = "Text", nullable)]
    pub stacktrace: Option<String>,
    pub platform: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`, lexically sortable
    pub timestamp: String,
    pub server_name: Option<String>,
    pub environment: Option<String>,
    /// Extra key/value context, serialized JSON text
    #[sea_orm(column_type = "Text", nullable)]
    pub extra: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// ============= HELPER METHODS =============

impl Model {
    /// Stored level, falling back to `error` for rows written outside the gateway
    pub fn level(&self) -> Level {
        self.level.parse().unwrap_or_default()
    }

    /// Decode the stacktrace column back into JSON
    pub fn stacktrace_json(&self) -> Option<serde_json::Value> {
        decode(self.stacktrace.as_deref())
    }

    /// Decode the extra column back into JSON
    pub fn extra_json(&self) -> Option<serde_json::Value> {
        decode(self.extra.as_deref())
    }
}

fn decode(column: Option<&str>) -> Option<serde_json::Value> {
    column.and_then(|text| serde_json::from_str(text).ok())
}
