pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_devices;
mod m20261019_000002_create_sessions;
mod m20261019_000003_create_step_up_codes;
mod m20261019_000004_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_devices::Migration),
            Box::new(m20261019_000002_create_sessions::Migration),
            Box::new(m20261019_000003_create_step_up_codes::Migration),
            Box::new(m20261019_000004_create_outbox_events::Migration),
        ]
    }
}
