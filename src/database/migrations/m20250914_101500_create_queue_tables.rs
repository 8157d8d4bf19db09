use sea_orm_migration::{
    prelude::*,
    schema::{big_integer, big_integer_null, integer, pk_auto, string, string_null, timestamp, timestamp_null},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // `if_not_exists` keeps this runnable against database files created
        // by releases that predate the migration table.
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(pk_auto(Jobs::Id))
                    .col(string(Jobs::Command))
                    .col(string(Jobs::State).default("pending"))
                    .col(integer(Jobs::Attempts).default(0))
                    .col(integer(Jobs::MaxRetries).default(3))
                    .col(
                        timestamp(Jobs::CreatedAt)
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        timestamp(Jobs::UpdatedAt)
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await?;

        // Supports the claim scan: top-1 pending ordered by creation time.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-jobs-state-created_at")
                    .table(Jobs::Table)
                    .col(Jobs::State)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Config::Table)
                    .if_not_exists()
                    .col(string(Config::Key).primary_key())
                    .col(string(Config::Value))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Workers::Table)
                    .if_not_exists()
                    .col(string(Workers::WorkerId).primary_key())
                    .col(big_integer(Workers::Pid))
                    .col(
                        timestamp(Workers::StartedAt)
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(timestamp_null(Workers::LastHeartbeat))
                    .col(string(Workers::Status))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(pk_auto(Events::Id))
                    .col(big_integer_null(Events::JobId))
                    .col(string(Events::Event))
                    .col(string_null(Events::Detail))
                    .col(
                        timestamp(Events::CreatedAt)
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-events-job_id")
                    .table(Events::Table)
                    .col(Events::JobId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Workers::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Config::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    Command,
    State,
    Attempts,
    MaxRetries,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Config {
    Table,
    Key,
    Value,
}

#[derive(DeriveIden)]
enum Workers {
    Table,
    WorkerId,
    Pid,
    StartedAt,
    LastHeartbeat,
    Status,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    JobId,
    Event,
    Detail,
    CreatedAt,
}
