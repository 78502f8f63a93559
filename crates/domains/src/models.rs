//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! Records are immutable values: state changes produce new values through
//! the free functions in the sibling modules or through the repository ports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, Result};

pub type UserId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;
pub type VoteId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    /// Admins and moderators bypass profile privacy and see banned users.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(DomainError::InvalidInput(format!("unknown role {other:?}"))),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    /// Never negative; see [`crate::reputation::apply_delta`].
    pub reputation: u32,
    pub is_email_verified: bool,
    pub is_banned: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub banned_by: Option<UserId>,
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
}

/// Ban bookkeeping written when a user moves to the Banned state.
#[derive(Debug, Clone, PartialEq)]
pub struct BanRecord {
    pub banned_at: DateTime<Utc>,
    pub banned_by: UserId,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BanState {
    Active,
    Banned(BanRecord),
}

/// Partial field patch for [`crate::ports::UserRepository::update`].
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub reputation: Option<u32>,
    pub ban: Option<BanState>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Returns a copy with `patch` applied.
    pub fn patched(&self, patch: &UserPatch) -> User {
        let mut next = self.clone();
        if let Some(reputation) = patch.reputation {
            next.reputation = reputation;
        }
        match &patch.ban {
            Some(BanState::Banned(record)) => {
                next.is_banned = true;
                next.banned_at = Some(record.banned_at);
                next.banned_by = Some(record.banned_by);
                next.ban_reason = record.reason.clone();
            }
            Some(BanState::Active) => {
                next.is_banned = false;
                next.banned_at = None;
                next.banned_by = None;
                next.ban_reason = None;
            }
            None => {}
        }
        if let Some(at) = patch.last_login_at {
            next.last_login_at = Some(at);
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    /// A post can outlive its author.
    pub author_id: Option<UserId>,
    pub title: String,
    pub is_deleted: bool,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: Option<UserId>,
    pub is_deleted: bool,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_votable(&self) -> bool {
        !self.is_deleted && !self.is_hidden
    }
}

impl Comment {
    pub fn is_votable(&self) -> bool {
        !self.is_deleted && !self.is_hidden
    }
}

/// What a vote is attached to. Drives the reputation weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn value(self) -> i32 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl TryFrom<i32> for VoteType {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(VoteType::Up),
            -1 => Ok(VoteType::Down),
            other => Err(DomainError::InvalidInput(format!(
                "vote type must be 1 or -1, got {other}"
            ))),
        }
    }
}

impl From<VoteType> for i32 {
    fn from(value: VoteType) -> Self {
        value.value()
    }
}

/// One live ledger row per (user, target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub target_id: Uuid,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Created,
    Updated,
    Removed,
}

impl VoteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteAction::Created => "created",
            VoteAction::Updated => "updated",
            VoteAction::Removed => "removed",
        }
    }
}

/// Result of an atomic ledger toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteToggle {
    pub action: VoteAction,
    /// The row as it was before the toggle, if any.
    pub previous: Option<Vote>,
    /// The live row after the toggle; `None` once removed.
    pub current: Option<Vote>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStats {
    pub upvotes: u64,
    pub downvotes: u64,
    pub score: i64,
}

impl VoteStats {
    /// Derives stats from live vote types. Score is never read from a counter.
    pub fn from_votes<I: IntoIterator<Item = VoteType>>(votes: I) -> Self {
        votes.into_iter().fold(VoteStats::default(), |mut acc, vote| {
            match vote {
                VoteType::Up => acc.upvotes += 1,
                VoteType::Down => acc.downvotes += 1,
            }
            acc.score += i64::from(vote.value());
            acc
        })
    }
}

/// Per-user privacy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: UserId,
    pub private_profile: bool,
    pub restrict_to_moderators: bool,
    pub show_stats: bool,
    pub show_join_date: bool,
    pub show_email: bool,
    pub show_last_seen: bool,
}

impl UserSettings {
    /// Settings applied when a user has never saved any.
    pub fn defaults_for(user_id: UserId) -> Self {
        Self {
            user_id,
            private_profile: false,
            restrict_to_moderators: false,
            show_stats: true,
            show_join_date: true,
            show_email: false,
            show_last_seen: false,
        }
    }

    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        Self {
            user_id: self.user_id,
            private_profile: patch.private_profile.unwrap_or(self.private_profile),
            restrict_to_moderators: patch
                .restrict_to_moderators
                .unwrap_or(self.restrict_to_moderators),
            show_stats: patch.show_stats.unwrap_or(self.show_stats),
            show_join_date: patch.show_join_date.unwrap_or(self.show_join_date),
            show_email: patch.show_email.unwrap_or(self.show_email),
            show_last_seen: patch.show_last_seen.unwrap_or(self.show_last_seen),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsPatch {
    pub private_profile: Option<bool>,
    pub restrict_to_moderators: Option<bool>,
    pub show_stats: Option<bool>,
    pub show_join_date: Option<bool>,
    pub show_email: Option<bool>,
    pub show_last_seen: Option<bool>,
}

/// Single-use registration token. Expiration is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    pub code: String,
    pub created_by: UserId,
    pub used_by: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    /// Consumed once either consumer field is set; the state is terminal.
    pub fn is_used(&self) -> bool {
        self.used_by.is_some() || self.used_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PostVote,
    UserBanned,
    UserUnbanned,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::PostVote => "post_vote",
            NotificationKind::UserBanned => "user_banned",
            NotificationKind::UserUnbanned => "user_unbanned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub content: String,
    pub related: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    UserBanned,
    UserUnbanned,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::UserBanned => "user_banned",
            ActivityAction::UserUnbanned => "user_unbanned",
        }
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewActivityLog {
    pub user_id: UserId,
    pub action: ActivityAction,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Transport metadata the caller forwards for audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
