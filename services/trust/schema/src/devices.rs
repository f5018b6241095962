use sea_orm::entity::prelude::*;

/// A recognized client installation bound to one user.
///
/// `id` is the row key; `uuid` is the external device id carried by the device cookie.
/// Fingerprint columns are written once at registration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub user_id: Uuid,
    /// `active` | `verified` | `hijacked`
    pub status: String,
    pub browser: String,
    pub browser_version: String,
    pub platform: String,
    pub platform_version: String,
    pub device: String,
    pub device_type: String,
    pub mobile: bool,
    pub robot: bool,
    pub ip: String,
    pub source: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub hijacked_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
