use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("events"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("level"))
                            .string()
                            .not_null()
                            .default("error"),
                    )
                    .col(ColumnDef::new(Alias::new("message")).text().not_null())
                    .col(ColumnDef::new(Alias::new("stacktrace")).text().null())
                    .col(ColumnDef::new(Alias::new("platform")).string().null())
                    // Fixed-format text so that ordering by the column is chronological
                    .col(ColumnDef::new(Alias::new("timestamp")).string().not_null())
                    .col(ColumnDef::new(Alias::new("server_name")).string().null())
                    .col(ColumnDef::new(Alias::new("environment")).string().null())
                    .col(ColumnDef::new(Alias::new("extra")).text().null())
                    .to_owned(),
            )
            .await?;

        // Dashboard listing: most recent first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_timestamp")
                    .table(Alias::new("events"))
                    .col(Alias::new("timestamp"))
                    .to_owned(),
            )
            .await?;

        // Grouping by message
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_message")
                    .table(Alias::new("events"))
                    .col(Alias::new("message"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_events_message")
                    .table(Alias::new("events"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_events_timestamp")
                    .table(Alias::new("events"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Alias::new("events")).to_owned())
            .await?;

        Ok(())
    }
}
