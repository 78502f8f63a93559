//! # Seed
//!
//! Bootstraps an empty database: applies migrations, creates the admin
//! account named in `seed.*` if it is missing, and issues one invite code.

use std::sync::Arc;

use anyhow::Context;
use domains::ports::UserRepository;
use domains::{NewUser, Role};
use secrecy::ExposeSecret;
use services::InviteService;
use storage_adapters::postgres::{self, PgInviteCodeRepository, PgUserRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configs::Settings::load().context("loading settings")?;
    configs::telemetry::init_tracing(&settings.logging)?;
    if let Some(path) = &settings.env_file {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    let pool = postgres::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    if settings.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let admin = match users.find_by_username(&settings.seed.admin_username).await? {
        Some(existing) => {
            tracing::info!(username = %existing.username, "admin already present");
            existing
        }
        None => {
            let created = users
                .create(NewUser {
                    username: settings.seed.admin_username.clone(),
                    email: settings.seed.admin_email.clone(),
                    role: Role::Admin,
                    is_email_verified: true,
                })
                .await?;
            tracing::info!(id = %created.id, username = %created.username, "admin created");
            created
        }
    };
    if admin.role != Role::Admin {
        anyhow::bail!(
            "user {} exists but has role {}",
            admin.username,
            admin.role.as_str()
        );
    }

    let invites = InviteService::new(
        Arc::new(PgInviteCodeRepository::new(pool)),
        users,
        settings.invites.expiry_hours,
    );
    let invite = invites.create(admin.id, None).await?;
    tracing::info!(code = %invite.code, expiry_hours = settings.invites.expiry_hours, "invite issued");

    Ok(())
}
