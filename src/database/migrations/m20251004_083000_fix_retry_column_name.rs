use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Early releases persisted the retry cap under a misspelled `max_retires`
/// column. External interfaces expose the corrected name, so databases
/// carrying the legacy column are renamed in place.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.has_column("jobs", "max_retires").await? {
            manager
                .get_connection()
                .execute_unprepared("ALTER TABLE jobs RENAME COLUMN max_retires TO max_retries")
                .await?;
        }
        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Fresh schemas never had the misspelling; nothing to restore.
        Ok(())
    }
}
