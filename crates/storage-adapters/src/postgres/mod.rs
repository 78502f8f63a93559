//! # PostgreSQL adapters
//!
//! Runtime-checked `sqlx` queries, so building does not need a live database.
//! Schema lives in `migrations/` and is embedded via [`MIGRATOR`].

mod audit;
mod content;
mod invites;
mod users;
mod votes;

pub use audit::{PgActivityLog, PgNotificationRepository};
pub use content::{PgCommentRepository, PgPostRepository};
pub use invites::PgInviteCodeRepository;
pub use users::{PgUserRepository, PgUserSettingsRepository};
pub use votes::{PgVoteLedger, VoteTable};

use domains::DomainError;
use sqlx::postgres::{PgPool, PgPoolOptions};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    tracing::info!(max_connections, "connected to postgres");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

/// Maps driver errors; unique violations become `Conflict`.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    let unique = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().to_string());
    match unique {
        Some(message) => DomainError::Conflict(message),
        None => DomainError::Storage(err.into()),
    }
}

#[cfg(test)]
mod tests;
