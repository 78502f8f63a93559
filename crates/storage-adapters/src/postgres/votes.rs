use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::VoteLedger;
use domains::vote::VoteTransition;
use domains::{
    DomainError, Entity, Result, UserId, Vote, VoteId, VoteStats, VoteToggle, VoteType,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::db_err;

/// How many times a toggle re-reads after losing an insert race.
const TOGGLE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTable {
    Post,
    Comment,
}

impl VoteTable {
    fn table(self) -> &'static str {
        match self {
            VoteTable::Post => "post_votes",
            VoteTable::Comment => "comment_votes",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            VoteTable::Post => "post_id",
            VoteTable::Comment => "comment_id",
        }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    user_id: Uuid,
    target_id: Uuid,
    vote_type: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = DomainError;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(Vote {
            id: row.id,
            user_id: row.user_id,
            target_id: row.target_id,
            vote_type: VoteType::try_from(i32::from(row.vote_type))?,
            created_at: row.created_at,
        })
    }
}

fn db_vote_type(vote_type: VoteType) -> i16 {
    match vote_type {
        VoteType::Up => 1,
        VoteType::Down => -1,
    }
}

/// Ledger over `post_votes` or `comment_votes`.
pub struct PgVoteLedger {
    pool: PgPool,
    table: VoteTable,
}

impl PgVoteLedger {
    pub fn new(pool: PgPool, table: VoteTable) -> Self {
        Self { pool, table }
    }

    fn returning(&self) -> String {
        format!(
            "RETURNING id, user_id, {} AS target_id, vote_type, created_at",
            self.table.target_column()
        )
    }

    async fn lock_existing(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        target_id: Uuid,
    ) -> Result<Option<Vote>> {
        let sql = format!(
            "SELECT id, user_id, {col} AS target_id, vote_type, created_at \
             FROM {table} WHERE user_id = $1 AND {col} = $2 FOR UPDATE",
            table = self.table.table(),
            col = self.table.target_column(),
        );
        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(user_id)
            .bind(target_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .map(Vote::try_from)
            .transpose()
    }
}

#[async_trait]
impl VoteLedger for PgVoteLedger {
    async fn find_existing(&self, user_id: UserId, target_id: Uuid) -> Result<Option<Vote>> {
        let sql = format!(
            "SELECT id, user_id, {col} AS target_id, vote_type, created_at \
             FROM {table} WHERE user_id = $1 AND {col} = $2",
            table = self.table.table(),
            col = self.table.target_column(),
        );
        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(user_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Vote::try_from)
            .transpose()
    }

    async fn create(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Result<Vote> {
        let sql = format!(
            "INSERT INTO {table} (id, user_id, {col}, vote_type, created_at) \
             VALUES ($1, $2, $3, $4, now()) {returning}",
            table = self.table.table(),
            col = self.table.target_column(),
            returning = self.returning(),
        );
        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(target_id)
            .bind(db_vote_type(vote_type))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    async fn update(&self, vote_id: VoteId, vote_type: VoteType) -> Result<Vote> {
        let sql = format!(
            "UPDATE {table} SET vote_type = $2 WHERE id = $1 {returning}",
            table = self.table.table(),
            returning = self.returning(),
        );
        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(vote_id)
            .bind(db_vote_type(vote_type))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found(Entity::Vote, vote_id))?
            .try_into()
    }

    async fn delete(&self, vote_id: VoteId) -> Result<Vote> {
        let sql = format!(
            "DELETE FROM {table} WHERE id = $1 {returning}",
            table = self.table.table(),
            returning = self.returning(),
        );
        sqlx::query_as::<_, VoteRow>(&sql)
            .bind(vote_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found(Entity::Vote, vote_id))?
            .try_into()
    }

    async fn toggle(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Result<VoteToggle> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for attempt in 1..=TOGGLE_ATTEMPTS {
            let previous = self.lock_existing(&mut tx, user_id, target_id).await?;
            let transition = VoteTransition::resolve(previous.as_ref().map(|v| v.vote_type), vote_type);

            let current = match (&previous, transition.resulting()) {
                (None, _) => {
                    // ON CONFLICT DO NOTHING waits for a racing insert to settle;
                    // the next iteration then sees and locks that row.
                    let sql = format!(
                        "INSERT INTO {table} (id, user_id, {col}, vote_type, created_at) \
                         VALUES ($1, $2, $3, $4, now()) \
                         ON CONFLICT (user_id, {col}) DO NOTHING {returning}",
                        table = self.table.table(),
                        col = self.table.target_column(),
                        returning = self.returning(),
                    );
                    let inserted = sqlx::query_as::<_, VoteRow>(&sql)
                        .bind(Uuid::new_v4())
                        .bind(user_id)
                        .bind(target_id)
                        .bind(db_vote_type(vote_type))
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    match inserted {
                        Some(row) => Some(Vote::try_from(row)?),
                        None => {
                            tracing::debug!(attempt, "vote insert lost a race, re-reading");
                            continue;
                        }
                    }
                }
                (Some(existing), Some(to)) => {
                    let sql = format!(
                        "UPDATE {table} SET vote_type = $2 WHERE id = $1 {returning}",
                        table = self.table.table(),
                        returning = self.returning(),
                    );
                    let row = sqlx::query_as::<_, VoteRow>(&sql)
                        .bind(existing.id)
                        .bind(db_vote_type(to))
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    Some(Vote::try_from(row)?)
                }
                (Some(existing), None) => {
                    let sql = format!("DELETE FROM {} WHERE id = $1", self.table.table());
                    sqlx::query(&sql)
                        .bind(existing.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    None
                }
            };

            tx.commit().await.map_err(db_err)?;
            return Ok(VoteToggle {
                action: transition.action(),
                previous,
                current,
            });
        }

        Err(DomainError::Conflict(format!(
            "concurrent votes by {user_id} on {target_id}"
        )))
    }

    async fn score(&self, target_id: Uuid) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(SUM(vote_type), 0)::BIGINT FROM {table} WHERE {col} = $1",
            table = self.table.table(),
            col = self.table.target_column(),
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn stats(&self, target_id: Uuid) -> Result<VoteStats> {
        let sql = format!(
            "SELECT \
                COUNT(*) FILTER (WHERE vote_type = 1)  AS upvotes, \
                COUNT(*) FILTER (WHERE vote_type = -1) AS downvotes, \
                COALESCE(SUM(vote_type), 0)::BIGINT    AS score \
             FROM {table} WHERE {col} = $1",
            table = self.table.table(),
            col = self.table.target_column(),
        );
        let (upvotes, downvotes, score): (i64, i64, i64) = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(VoteStats {
            upvotes: upvotes.max(0) as u64,
            downvotes: downvotes.max(0) as u64,
            score,
        })
    }
}
