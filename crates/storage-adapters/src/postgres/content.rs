use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::{CommentRepository, PostRepository};
use domains::{Comment, CommentId, Post, PostId, Result, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_err;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Option<Uuid>,
    title: String,
    is_deleted: bool,
    is_hidden: bool,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            is_deleted: row.is_deleted,
            is_hidden: row.is_hidden,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Option<Uuid>,
    is_deleted: bool,
    is_hidden: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            is_deleted: row.is_deleted,
            is_hidden: row.is_hidden,
            created_at: row.created_at,
        }
    }
}

async fn count_live(pool: &PgPool, table: &str, author_id: UserId) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE author_id = $1 AND NOT is_deleted");
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(db_err)?;
    Ok(count.max(0) as u64)
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, author_id, title, is_deleted, is_hidden, created_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Post::from))
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64> {
        count_live(&self.pool, "posts", author_id).await
    }
}

pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, author_id, is_deleted, is_hidden, created_at \
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Comment::from))
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64> {
        count_live(&self.pool, "comments", author_id).await
    }
}
