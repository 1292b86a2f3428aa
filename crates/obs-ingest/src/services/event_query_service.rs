use obs_entities::events;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;

use super::types::{EventGroup, GroupRow, IngestError};

/// Default number of groups returned by the grouped listing
pub const DEFAULT_GROUP_LIMIT: u64 = 100;
/// Upper bound accepted for the grouped listing
pub const MAX_GROUP_LIMIT: u64 = 1000;

/// Read side over stored events
pub struct EventQueryService {
    db: Arc<DatabaseConnection>,
}

impl EventQueryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Events grouped by message, most recently seen first
    pub async fn list_groups(&self, limit: u64) -> Result<Vec<EventGroup>, IngestError> {
        let limit = limit.clamp(1, MAX_GROUP_LIMIT);

        let rows = events::Entity::find()
            .select_only()
            .column(events::Column::Message)
            .column_as(Expr::col(events::Column::Timestamp).max(), "last_seen")
            .column_as(Expr::col(events::Column::Id).count(), "count")
            .group_by(events::Column::Message)
            .order_by_desc(Expr::col(events::Column::Timestamp).max())
            .order_by_asc(events::Column::Message)
            .limit(limit)
            .into_model::<GroupRow>()
            .all(self.db.as_ref())
            .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let latest = events::Entity::find()
                .filter(events::Column::Message.eq(row.message.as_str()))
                .order_by_desc(events::Column::Timestamp)
                .order_by_desc(events::Column::Id)
                .one(self.db.as_ref())
                .await?;

            // The group query and this lookup are not atomic; skip groups
            // whose events disappeared in between.
            let Some(latest) = latest else {
                continue;
            };

            groups.push(EventGroup {
                level: latest.level(),
                platform: latest.platform,
                latest_event_id: latest.id,
                message: row.message,
                last_seen: row.last_seen,
                count: row.count,
            });
        }

        Ok(groups)
    }

    pub async fn get_event(&self, event_id: &str) -> Result<events::Model, IngestError> {
        events::Entity::find_by_id(event_id.to_string())
            .one(self.db.as_ref())
            .await?
            .ok_or(IngestError::EventNotFound)
    }
}
