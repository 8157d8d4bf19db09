pub use sea_orm_migration::prelude::*;

mod m20250914_101500_create_queue_tables;
mod m20251004_083000_fix_retry_column_name;
mod m20251019_174500_add_job_external_id;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250914_101500_create_queue_tables::Migration),
            Box::new(m20251004_083000_fix_retry_column_name::Migration),
            Box::new(m20251019_174500_add_job_external_id::Migration),
        ]
    }
}

pub struct Migrator;
