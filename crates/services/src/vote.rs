//! # Voting
//!
//! Orchestrates the vote toggle for posts and comments: guards, atomic ledger
//! toggle, fresh score, author reputation and (posts only) the author
//! notification. Reputation and notification failures are reported as
//! warnings on the [`Outcome`], never as errors.

use std::sync::Arc;

use domains::ports::{
    CommentRepository, NotificationRepository, PostRepository, UserRepository, VoteLedger,
};
use domains::reputation::reputation_delta;
use domains::vote::vote_message;
use domains::{
    DomainError, Effect, Entity, NewNotification, NotificationKind, Outcome, Result, TargetKind,
    User, UserId, VoteAction, VoteStats, VoteToggle, VoteType,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VoteRequest {
    pub target_id: Uuid,
    pub user_id: UserId,
    /// Raw value from the caller; only 1 and -1 are accepted.
    pub vote_type: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub action: VoteAction,
    /// The vote type the caller requested.
    pub new_vote_type: VoteType,
    pub vote_score: i64,
    pub upvotes: u64,
    pub downvotes: u64,
    /// The caller's live vote after the toggle.
    pub user_vote: Option<VoteType>,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentVote {
    pub user_vote: Option<VoteType>,
    pub stats: VoteStats,
}

pub struct VotePostService {
    ledger: Arc<dyn VoteLedger>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl VotePostService {
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            ledger,
            posts,
            users,
            notifications,
        }
    }

    #[tracing::instrument(skip(self), fields(post_id = %req.target_id, user_id = %req.user_id))]
    pub async fn execute(&self, req: VoteRequest) -> Result<Outcome<VoteResponse>> {
        let vote_type = VoteType::try_from(req.vote_type)?;

        let post = self
            .posts
            .find_by_id(req.target_id)
            .await?
            .filter(|p| p.is_votable())
            .ok_or_else(|| DomainError::not_found(Entity::Post, req.target_id))?;

        let voter = ensure_can_vote(self.users.as_ref(), req.user_id).await?;

        let toggle = self.ledger.toggle(voter.id, post.id, vote_type).await?;
        let stats = self.ledger.stats(post.id).await?;
        tracing::info!(action = toggle.action.as_str(), score = stats.score, "post vote applied");

        let mut outcome = Outcome::new(build_response(&toggle, vote_type, stats));
        settle_reputation(
            self.users.as_ref(),
            TargetKind::Post,
            post.author_id,
            &toggle,
            vote_type,
            &mut outcome,
        )
        .await;

        let notify_author = post
            .author_id
            .filter(|author| *author != voter.id)
            .filter(|_| toggle.action == VoteAction::Created && vote_type == VoteType::Up);

        if let Some(author_id) = notify_author {
            let notification = NewNotification {
                user_id: author_id,
                kind: NotificationKind::PostVote,
                content: format!("{} upvoted your post \"{}\"", voter.username, post.title),
                related: serde_json::json!({
                    "post_id": post.id,
                    "voter_id": voter.id,
                }),
            };
            if let Err(e) = self.notifications.create(notification).await {
                tracing::warn!(error = %e, %author_id, "failed to notify post author");
                outcome.warn(Effect::Notification, e.to_string());
            }
        }

        Ok(outcome)
    }

    pub async fn current_vote(&self, user_id: UserId, post_id: Uuid) -> Result<CurrentVote> {
        current_vote(self.ledger.as_ref(), user_id, post_id).await
    }
}

pub struct VoteCommentService {
    ledger: Arc<dyn VoteLedger>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl VoteCommentService {
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            ledger,
            comments,
            users,
        }
    }

    #[tracing::instrument(skip(self), fields(comment_id = %req.target_id, user_id = %req.user_id))]
    pub async fn execute(&self, req: VoteRequest) -> Result<Outcome<VoteResponse>> {
        let vote_type = VoteType::try_from(req.vote_type)?;

        let comment = self
            .comments
            .find_by_id(req.target_id)
            .await?
            .filter(|c| c.is_votable())
            .ok_or_else(|| DomainError::not_found(Entity::Comment, req.target_id))?;

        let voter = ensure_can_vote(self.users.as_ref(), req.user_id).await?;

        let toggle = self.ledger.toggle(voter.id, comment.id, vote_type).await?;
        let stats = self.ledger.stats(comment.id).await?;
        tracing::info!(action = toggle.action.as_str(), score = stats.score, "comment vote applied");

        let mut outcome = Outcome::new(build_response(&toggle, vote_type, stats));
        settle_reputation(
            self.users.as_ref(),
            TargetKind::Comment,
            comment.author_id,
            &toggle,
            vote_type,
            &mut outcome,
        )
        .await;

        Ok(outcome)
    }

    pub async fn current_vote(&self, user_id: UserId, comment_id: Uuid) -> Result<CurrentVote> {
        current_vote(self.ledger.as_ref(), user_id, comment_id).await
    }
}

/// Voter must exist, have a verified email and not be banned.
async fn ensure_can_vote(users: &dyn UserRepository, user_id: UserId) -> Result<User> {
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::permissions("user not found"))?;
    if !user.is_email_verified {
        return Err(DomainError::permissions(
            "email must be verified before voting",
        ));
    }
    if user.is_banned {
        return Err(DomainError::permissions("banned users cannot vote"));
    }
    Ok(user)
}

fn build_response(toggle: &VoteToggle, requested: VoteType, stats: VoteStats) -> VoteResponse {
    VoteResponse {
        success: true,
        action: toggle.action,
        new_vote_type: requested,
        vote_score: stats.score,
        upvotes: stats.upvotes,
        downvotes: stats.downvotes,
        user_vote: toggle.current.as_ref().map(|v| v.vote_type),
        message: vote_message(toggle.action, requested),
    }
}

async fn settle_reputation(
    users: &dyn UserRepository,
    kind: TargetKind,
    author_id: Option<UserId>,
    toggle: &VoteToggle,
    requested: VoteType,
    outcome: &mut Outcome<VoteResponse>,
) {
    let Some(author_id) = author_id else {
        tracing::debug!("target has no author, reputation skipped");
        return;
    };

    let previous = toggle.previous.as_ref().map(|v| v.vote_type);
    let delta = reputation_delta(kind, toggle.action, requested, previous);

    match users.adjust_reputation(author_id, delta).await {
        Ok(author) => {
            tracing::debug!(%author_id, delta, reputation = author.reputation, "reputation updated");
        }
        Err(e) => {
            tracing::warn!(error = %e, %author_id, delta, "failed to update author reputation");
            outcome.warn(Effect::Reputation, e.to_string());
        }
    }
}

async fn current_vote(ledger: &dyn VoteLedger, user_id: UserId, target_id: Uuid) -> Result<CurrentVote> {
    let existing = ledger.find_existing(user_id, target_id).await?;
    let stats = ledger.stats(target_id).await?;
    Ok(CurrentVote {
        user_vote: existing.map(|v| v.vote_type),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::ports::{
        MockCommentRepository, MockNotificationRepository, MockPostRepository, MockUserRepository,
        MockVoteLedger, NoopNotifications,
    };
    use domains::{Comment, ErrorKind, Post, Role, Vote};
    use mockall::predicate::eq;

    fn user(id: UserId) -> User {
        User {
            id,
            username: "voter".into(),
            email: "voter@example.com".into(),
            avatar_url: None,
            bio: None,
            role: Role::User,
            reputation: 0,
            is_email_verified: true,
            is_banned: false,
            banned_at: None,
            banned_by: None,
            ban_reason: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn post(id: Uuid, author_id: Option<UserId>) -> Post {
        Post {
            id,
            author_id,
            title: "Hello".into(),
            is_deleted: false,
            is_hidden: false,
            created_at: Utc::now(),
        }
    }

    fn created(user_id: UserId, target_id: Uuid, vote_type: VoteType) -> VoteToggle {
        VoteToggle {
            action: VoteAction::Created,
            previous: None,
            current: Some(Vote {
                id: Uuid::new_v4(),
                user_id,
                target_id,
                vote_type,
                created_at: Utc::now(),
            }),
        }
    }

    fn stats(score: i64) -> VoteStats {
        VoteStats {
            upvotes: score.max(0) as u64,
            downvotes: 0,
            score,
        }
    }

    fn post_service(
        ledger: MockVoteLedger,
        posts: MockPostRepository,
        users: MockUserRepository,
        notifications: MockNotificationRepository,
    ) -> VotePostService {
        VotePostService::new(
            Arc::new(ledger),
            Arc::new(posts),
            Arc::new(users),
            Arc::new(notifications),
        )
    }

    #[tokio::test]
    async fn invalid_vote_type_touches_nothing() {
        let svc = post_service(
            MockVoteLedger::new(),
            MockPostRepository::new(),
            MockUserRepository::new(),
            MockNotificationRepository::new(),
        );
        let err = svc
            .execute(VoteRequest {
                target_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                vote_type: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn unverified_voter_is_rejected_before_ledger() {
        let post_id = Uuid::new_v4();
        let voter_id = Uuid::new_v4();

        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .with(eq(post_id))
            .returning(move |id| Ok(Some(post(id, Some(Uuid::new_v4())))));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                is_email_verified: false,
                ..user(id)
            }))
        });
        // No ledger expectations: any ledger call panics.
        let svc = post_service(MockVoteLedger::new(), posts, users, MockNotificationRepository::new());

        let err = svc
            .execute(VoteRequest {
                target_id: post_id,
                user_id: voter_id,
                vote_type: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientPermissions);
    }

    #[tokio::test]
    async fn deleted_post_is_not_found() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|id| {
            Ok(Some(Post {
                is_deleted: true,
                ..post(id, None)
            }))
        });
        let svc = post_service(
            MockVoteLedger::new(),
            posts,
            MockUserRepository::new(),
            MockNotificationRepository::new(),
        );
        let err = svc
            .execute(VoteRequest {
                target_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                vote_type: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "POST_NOT_FOUND");
    }

    #[tokio::test]
    async fn upvote_without_notification_store_is_clean() {
        let post_id = Uuid::new_v4();
        let voter_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();

        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(move |id| Ok(Some(post(id, Some(author_id)))));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        users
            .expect_adjust_reputation()
            .with(eq(author_id), eq(5))
            .times(1)
            .returning(|id, _| Ok(user(id)));
        let mut ledger = MockVoteLedger::new();
        ledger
            .expect_toggle()
            .times(1)
            .returning(|u, t, v| Ok(created(u, t, v)));
        ledger.expect_stats().returning(|_| Ok(stats(1)));

        let svc = VotePostService::new(
            Arc::new(ledger),
            Arc::new(posts),
            Arc::new(users),
            Arc::new(NoopNotifications),
        );
        let outcome = svc
            .execute(VoteRequest {
                target_id: post_id,
                user_id: voter_id,
                vote_type: 1,
            })
            .await
            .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.value.action, VoteAction::Created);
        assert_eq!(outcome.value.vote_score, 1);
    }

    #[tokio::test]
    async fn failed_side_effects_become_warnings() {
        let post_id = Uuid::new_v4();
        let voter_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();

        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(move |id| Ok(Some(post(id, Some(author_id)))));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        users
            .expect_adjust_reputation()
            .with(eq(author_id), eq(5))
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("deadlock detected").into()));
        let mut ledger = MockVoteLedger::new();
        ledger
            .expect_toggle()
            .times(1)
            .returning(|u, t, v| Ok(created(u, t, v)));
        ledger.expect_stats().returning(|_| Ok(stats(1)));
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_create()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("queue full").into()));

        let svc = post_service(ledger, posts, users, notifications);
        let outcome = svc
            .execute(VoteRequest {
                target_id: post_id,
                user_id: voter_id,
                vote_type: 1,
            })
            .await
            .unwrap();

        assert_eq!(outcome.value.action, VoteAction::Created);
        assert_eq!(outcome.value.user_vote, Some(VoteType::Up));
        assert_eq!(outcome.value.message, "Upvote added");
        let effects: Vec<Effect> = outcome.warnings.iter().map(|w| w.effect).collect();
        assert_eq!(effects, vec![Effect::Reputation, Effect::Notification]);
    }

    #[tokio::test]
    async fn comment_vote_uses_comment_weights_and_never_notifies() {
        let comment_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();

        let mut comments = MockCommentRepository::new();
        comments.expect_find_by_id().returning(move |id| {
            Ok(Some(Comment {
                id,
                post_id: Uuid::new_v4(),
                author_id: Some(author_id),
                is_deleted: false,
                is_hidden: false,
                created_at: Utc::now(),
            }))
        });
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        users
            .expect_adjust_reputation()
            .with(eq(author_id), eq(-1))
            .times(1)
            .returning(|id, _| Ok(user(id)));
        let mut ledger = MockVoteLedger::new();
        ledger
            .expect_toggle()
            .returning(|u, t, v| Ok(created(u, t, v)));
        ledger.expect_stats().returning(|_| {
            Ok(VoteStats {
                upvotes: 0,
                downvotes: 1,
                score: -1,
            })
        });

        let svc = VoteCommentService::new(Arc::new(ledger), Arc::new(comments), Arc::new(users));
        let outcome = svc
            .execute(VoteRequest {
                target_id: comment_id,
                user_id: Uuid::new_v4(),
                vote_type: -1,
            })
            .await
            .unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.value.vote_score, -1);
        assert_eq!(outcome.value.message, "Downvote added");
    }
}
