use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Snapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Snapshot::Code)
                            .string_len(4)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Snapshot::Data).text().not_null())
                    .col(
                        ColumnDef::new(Snapshot::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Expiry sweeps scan by age
        manager
            .create_index(
                Index::create()
                    .name("idx_snapshot_created_at")
                    .table(Snapshot::Table)
                    .col(Snapshot::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Snapshot::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Snapshot {
    Table,
    Code,
    Data,
    CreatedAt,
}
