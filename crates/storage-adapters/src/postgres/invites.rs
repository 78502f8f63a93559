use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::invite::mark_used;
use domains::ports::{InviteCodeRepository, InviteQuery};
use domains::{DomainError, InviteCode, Result, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_err;

const INVITE_COLUMNS: &str = "code, created_by, used_by, used_at, created_at";

#[derive(sqlx::FromRow)]
struct InviteRow {
    code: String,
    created_by: Uuid,
    used_by: Option<Uuid>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<InviteRow> for InviteCode {
    fn from(row: InviteRow) -> Self {
        InviteCode {
            code: row.code,
            created_by: row.created_by,
            used_by: row.used_by,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

pub struct PgInviteCodeRepository {
    pool: PgPool,
}

impl PgInviteCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteCodeRepository for PgInviteCodeRepository {
    async fn create(&self, invite: InviteCode) -> Result<InviteCode> {
        let sql = format!(
            "INSERT INTO invite_codes ({INVITE_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {INVITE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(&invite.code)
            .bind(invite.created_by)
            .bind(invite.used_by)
            .bind(invite.used_at)
            .bind(invite.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match db_err(err) {
                DomainError::Conflict(_) => DomainError::CodeExists(invite.code.clone()),
                other => other,
            })?;
        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<InviteCode>> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invite_codes WHERE code = $1");
        let row = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(InviteCode::from))
    }

    async fn find_many(&self, query: InviteQuery) -> Result<Vec<InviteCode>> {
        let sql = format!(
            "SELECT {INVITE_COLUMNS} FROM invite_codes \
             WHERE ($1::uuid IS NULL OR created_by = $1) \
               AND ($2::boolean IS NULL OR (used_by IS NOT NULL OR used_at IS NOT NULL) = $2) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(query.created_by)
            .bind(query.used)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(InviteCode::from).collect())
    }

    async fn mark_as_used(&self, code: &str, user_id: UserId, at: DateTime<Utc>) -> Result<InviteCode> {
        let sql = format!(
            "UPDATE invite_codes SET used_by = $2, used_at = $3 \
             WHERE code = $1 AND used_by IS NULL AND used_at IS NULL RETURNING {INVITE_COLUMNS}"
        );
        let claimed = sqlx::query_as::<_, InviteRow>(&sql)
            .bind(code)
            .bind(user_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if let Some(row) = claimed {
            return Ok(row.into());
        }

        // Nothing claimed: either the code is missing or someone got there first.
        let existing = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::CodeNotFound(code.to_string()))?;
        match mark_used(&existing, user_id, at) {
            Err(used) => Err(used),
            Ok(_) => Err(DomainError::Conflict(format!(
                "invite code {code} changed while being redeemed"
            ))),
        }
    }
}
