//! Shared wiring: every service over one set of in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use domains::{Comment, Post, Role, User, UserId};
use services::{
    InviteService, ModerationService, ProfileService, VoteCommentService, VotePostService,
};
use storage_adapters::memory::{
    InMemoryActivityLog, InMemoryCommentRepository, InMemoryInviteCodeRepository,
    InMemoryNotificationRepository, InMemoryPostRepository, InMemoryUserRepository,
    InMemoryUserSettingsRepository, InMemoryVoteLedger,
};
use uuid::Uuid;

pub const INVITE_EXPIRY_HOURS: i64 = 168;

pub struct Forum {
    pub users: Arc<InMemoryUserRepository>,
    pub settings: Arc<InMemoryUserSettingsRepository>,
    pub posts: Arc<InMemoryPostRepository>,
    pub comments: Arc<InMemoryCommentRepository>,
    pub notifications: Arc<InMemoryNotificationRepository>,
    pub activity: Arc<InMemoryActivityLog>,
    pub invites: Arc<InMemoryInviteCodeRepository>,
    pub post_votes: VotePostService,
    pub comment_votes: VoteCommentService,
    pub moderation: ModerationService,
    pub profiles: ProfileService,
    pub invite_codes: InviteService,
}

impl Forum {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let settings = Arc::new(InMemoryUserSettingsRepository::new());
        let posts = Arc::new(InMemoryPostRepository::new());
        let comments = Arc::new(InMemoryCommentRepository::new());
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let activity = Arc::new(InMemoryActivityLog::new());
        let invites = Arc::new(InMemoryInviteCodeRepository::new());

        let post_votes = VotePostService::new(
            Arc::new(InMemoryVoteLedger::new()),
            posts.clone(),
            users.clone(),
            notifications.clone(),
        );
        let comment_votes = VoteCommentService::new(
            Arc::new(InMemoryVoteLedger::new()),
            comments.clone(),
            users.clone(),
        );
        let moderation =
            ModerationService::new(users.clone(), activity.clone(), notifications.clone());
        let profiles = ProfileService::new(
            users.clone(),
            settings.clone(),
            posts.clone(),
            comments.clone(),
        );
        let invite_codes = InviteService::new(invites.clone(), users.clone(), INVITE_EXPIRY_HOURS);

        Self {
            users,
            settings,
            posts,
            comments,
            notifications,
            activity,
            invites,
            post_votes,
            comment_votes,
            moderation,
            profiles,
            invite_codes,
        }
    }

    pub fn member(&self, username: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@forum.test"),
            avatar_url: None,
            bio: Some(format!("{username}'s bio")),
            role,
            reputation: 0,
            is_email_verified: true,
            is_banned: false,
            banned_at: None,
            banned_by: None,
            ban_reason: None,
            created_at: Utc::now(),
            last_login_at: Some(Utc::now()),
        };
        self.users.insert(user.clone());
        user
    }

    pub fn member_with(&self, username: &str, edit: impl FnOnce(&mut User)) -> User {
        let mut user = self.member(username, Role::User);
        edit(&mut user);
        self.users.insert(user.clone());
        user
    }

    pub fn post_by(&self, author_id: Option<UserId>) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            title: "Hello forum".to_string(),
            is_deleted: false,
            is_hidden: false,
            created_at: Utc::now(),
        };
        self.posts.insert(post.clone());
        post
    }

    pub fn comment_by(&self, author_id: Option<UserId>, post_id: Uuid) -> Comment {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            is_deleted: false,
            is_hidden: false,
            created_at: Utc::now(),
        };
        self.comments.insert(comment.clone());
        comment
    }

    pub async fn reputation_of(&self, id: UserId) -> u32 {
        use domains::ports::UserRepository;
        self.users
            .find_by_id(id)
            .await
            .ok()
            .flatten()
            .map(|u| u.reputation)
            .unwrap_or_default()
    }
}
