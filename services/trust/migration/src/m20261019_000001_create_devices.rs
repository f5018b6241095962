use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Devices::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Devices::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(fingerprint_col(Devices::Browser))
                    .col(fingerprint_col(Devices::BrowserVersion))
                    .col(fingerprint_col(Devices::Platform))
                    .col(fingerprint_col(Devices::PlatformVersion))
                    .col(fingerprint_col(Devices::Device))
                    .col(fingerprint_col(Devices::DeviceType))
                    .col(
                        ColumnDef::new(Devices::Mobile)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Devices::Robot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(fingerprint_col(Devices::Ip))
                    .col(ColumnDef::new(Devices::Source).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Devices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Devices::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Devices::HijackedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Devices::Table)
                    .col(Devices::UserId)
                    .name("idx_devices_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await
    }
}

fn fingerprint_col(col: Devices) -> ColumnDef {
    ColumnDef::new(col).string().not_null().default("").to_owned()
}

#[derive(Iden)]
enum Devices {
    Table,
    Id,
    Uuid,
    UserId,
    Status,
    Browser,
    BrowserVersion,
    Platform,
    PlatformVersion,
    Device,
    DeviceType,
    Mobile,
    Robot,
    Ip,
    Source,
    CreatedAt,
    UpdatedAt,
    VerifiedAt,
    HijackedAt,
}
