use sea_orm::entity::prelude::*;

/// One authenticated login on a device.
///
/// `device_uuid` is a plain column, not a foreign key: session rows outlive a
/// forgotten device for audit.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub device_uuid: Uuid,
    pub user_id: Uuid,
    /// `active` | `locked` | `blocked` | `finished`
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
