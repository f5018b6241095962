use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StepUpCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StepUpCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StepUpCodes::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(StepUpCodes::Code).string().not_null())
                    .col(
                        ColumnDef::new(StepUpCodes::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StepUpCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StepUpCodes::ConsumedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(StepUpCodes::Table)
                    .col(StepUpCodes::SubjectId)
                    .name("idx_step_up_codes_subject_id")
                    .to_owned(),
            )
            .await?;

        // At most one unconsumed code per subject.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_step_up_codes_outstanding \
                 ON step_up_codes (subject_id) WHERE consumed_at IS NULL",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StepUpCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StepUpCodes {
    Table,
    Id,
    SubjectId,
    Code,
    IssuedAt,
    ExpiresAt,
    ConsumedAt,
}
