use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::{UserRepository, UserSettingsRepository};
use domains::{DomainError, NewUser, Result, Role, User, UserId, UserPatch, UserSettings};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_err;

const USER_COLUMNS: &str = "id, username, email, avatar_url, bio, role, reputation, \
    is_email_verified, is_banned, banned_at, banned_by, ban_reason, created_at, last_login_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    avatar_url: Option<String>,
    bio: Option<String>,
    role: String,
    reputation: i64,
    is_email_verified: bool,
    is_banned: bool,
    banned_at: Option<DateTime<Utc>>,
    banned_by: Option<Uuid>,
    ban_reason: Option<String>,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            avatar_url: row.avatar_url,
            bio: row.bio,
            role: row.role.parse::<Role>()?,
            reputation: u32::try_from(row.reputation.max(0)).unwrap_or(u32::MAX),
            is_email_verified: row.is_email_verified,
            is_banned: row.is_banned,
            banned_at: row.banned_at,
            banned_by: row.banned_by,
            ban_reason: row.ban_reason,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select_where(&self, clause: &str) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users {clause} ORDER BY created_at");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        into_users(rows)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(username) = lower($1)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_role(&self, role: Role) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        into_users(rows)
    }

    async fn find_banned(&self) -> Result<Vec<User>> {
        self.select_where("WHERE is_banned").await
    }

    async fn list(&self) -> Result<Vec<User>> {
        self.select_where("").await
    }

    async fn create(&self, new: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, role, is_email_verified) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(new.role.as_str())
            .bind(new.is_email_verified)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let current: User = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(id))?
            .try_into()?;
        let next = current.patched(&patch);

        let sql = format!(
            "UPDATE users SET reputation = $2, is_banned = $3, banned_at = $4, banned_by = $5, \
             ban_reason = $6, last_login_at = $7 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let saved: User = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(i64::from(next.reputation))
            .bind(next.is_banned)
            .bind(next.banned_at)
            .bind(next.banned_by)
            .bind(&next.ban_reason)
            .bind(next.last_login_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?
            .try_into()?;

        tx.commit().await.map_err(db_err)?;
        Ok(saved)
    }

    async fn adjust_reputation(&self, id: UserId, delta: i32) -> Result<User> {
        let sql = format!(
            "UPDATE users SET reputation = LEAST(GREATEST(reputation + $2, 0), {max}) \
             WHERE id = $1 RETURNING {USER_COLUMNS}",
            max = u32::MAX,
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(i64::from(delta))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(id))?
            .try_into()
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    user_id: Uuid,
    private_profile: bool,
    restrict_to_moderators: bool,
    show_stats: bool,
    show_join_date: bool,
    show_email: bool,
    show_last_seen: bool,
}

impl From<SettingsRow> for UserSettings {
    fn from(row: SettingsRow) -> Self {
        UserSettings {
            user_id: row.user_id,
            private_profile: row.private_profile,
            restrict_to_moderators: row.restrict_to_moderators,
            show_stats: row.show_stats,
            show_join_date: row.show_join_date,
            show_email: row.show_email,
            show_last_seen: row.show_last_seen,
        }
    }
}

pub struct PgUserSettingsRepository {
    pool: PgPool,
}

impl PgUserSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserSettingsRepository for PgUserSettingsRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<UserSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT user_id, private_profile, restrict_to_moderators, show_stats, \
             show_join_date, show_email, show_last_seen FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(UserSettings::from))
    }

    async fn upsert(&self, settings: UserSettings) -> Result<UserSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "INSERT INTO user_settings (user_id, private_profile, restrict_to_moderators, \
                show_stats, show_join_date, show_email, show_last_seen) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
                private_profile = EXCLUDED.private_profile, \
                restrict_to_moderators = EXCLUDED.restrict_to_moderators, \
                show_stats = EXCLUDED.show_stats, \
                show_join_date = EXCLUDED.show_join_date, \
                show_email = EXCLUDED.show_email, \
                show_last_seen = EXCLUDED.show_last_seen \
             RETURNING user_id, private_profile, restrict_to_moderators, show_stats, \
                show_join_date, show_email, show_last_seen",
        )
        .bind(settings.user_id)
        .bind(settings.private_profile)
        .bind(settings.restrict_to_moderators)
        .bind(settings.show_stats)
        .bind(settings.show_join_date)
        .bind(settings.show_email)
        .bind(settings.show_last_seen)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }
}
