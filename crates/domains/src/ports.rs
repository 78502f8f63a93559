//! # Ports
//!
//! Repository contracts the services call into. Any storage adapter must
//! implement these traits to be wired into the services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    Comment, CommentId, InviteCode, NewActivityLog, NewNotification, NewUser, Post, PostId, Role,
    User, UserId, UserPatch, UserSettings, Vote, VoteId, VoteStats, VoteToggle, VoteType,
};

/// One vote per (user, target). Separate instances back post and comment votes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn find_existing(&self, user_id: UserId, target_id: Uuid) -> Result<Option<Vote>>;

    /// Fails with `Conflict` if a row for (user, target) already exists.
    async fn create(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Result<Vote>;

    async fn update(&self, vote_id: VoteId, vote_type: VoteType) -> Result<Vote>;

    async fn delete(&self, vote_id: VoteId) -> Result<Vote>;

    /// Find-then-create/update/delete as a single atomic step.
    async fn toggle(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType)
        -> Result<VoteToggle>;

    /// Sum of live vote types, recomputed from the rows.
    async fn score(&self, target_id: Uuid) -> Result<i64>;

    async fn stats(&self, target_id: Uuid) -> Result<VoteStats>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_role(&self, role: Role) -> Result<Vec<User>>;
    async fn find_banned(&self) -> Result<Vec<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User>;

    /// Applies `max(0, reputation + delta)` without a read-modify-write gap.
    async fn adjust_reputation(&self, id: UserId, delta: i32) -> Result<User>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>>;
    async fn count_by_author(&self, author_id: UserId) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>>;
    async fn count_by_author(&self, author_id: UserId) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<()>;
}

/// Stands in when a deployment has no notification store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifications;

#[async_trait]
impl NotificationRepository for NoopNotifications {
    async fn create(&self, _notification: NewNotification) -> Result<()> {
        Ok(())
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn create(&self, entry: NewActivityLog) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserSettingsRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<UserSettings>>;
    async fn upsert(&self, settings: UserSettings) -> Result<UserSettings>;
}

/// Storage-level filter; expiry is never evaluated by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteQuery {
    pub created_by: Option<UserId>,
    pub used: Option<bool>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InviteCodeRepository: Send + Sync {
    /// Fails with `CodeExists` when the code is taken.
    async fn create(&self, invite: InviteCode) -> Result<InviteCode>;
    async fn find_by_code(&self, code: &str) -> Result<Option<InviteCode>>;
    async fn find_many(&self, query: InviteQuery) -> Result<Vec<InviteCode>>;

    /// Consumes the code; a second consumer gets `CodeAlreadyUsed`.
    async fn mark_as_used(&self, code: &str, user_id: UserId, at: DateTime<Utc>)
        -> Result<InviteCode>;
}
