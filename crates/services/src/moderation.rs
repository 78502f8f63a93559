//! # Moderation
//!
//! Ban and unban state transitions. Guards are checked in order and the first
//! failure wins; audit entries and notifications are best effort.

use std::sync::Arc;

use chrono::Utc;
use domains::ports::{ActivityLogRepository, NotificationRepository, UserRepository};
use domains::{
    ActivityAction, BanRecord, BanState, DomainError, Effect, NewActivityLog, NewNotification,
    NotificationKind, Outcome, RequestContext, Result, Role, User, UserId, UserPatch,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    pub actor_id: UserId,
    pub target_id: UserId,
    pub reason: Option<String>,
    #[serde(skip)]
    pub context: RequestContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnbanRequest {
    pub actor_id: UserId,
    pub target_id: UserId,
    #[serde(skip)]
    pub context: RequestContext,
}

pub struct ModerationService {
    users: Arc<dyn UserRepository>,
    activity: Arc<dyn ActivityLogRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl ModerationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        activity: Arc<dyn ActivityLogRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            users,
            activity,
            notifications,
        }
    }

    /// Active -> Banned. Admins and moderators may ban anyone but admins.
    #[tracing::instrument(skip(self, req), fields(actor_id = %req.actor_id, target_id = %req.target_id))]
    pub async fn ban(&self, req: BanRequest) -> Result<Outcome<User>> {
        let actor = self.find_user(req.actor_id).await?;
        if !actor.role.is_staff() {
            return Err(DomainError::permissions(
                "only administrators and moderators can ban users",
            ));
        }
        let target = self.find_user(req.target_id).await?;
        if target.role == Role::Admin {
            return Err(DomainError::CannotBanAdmin);
        }
        if target.is_banned {
            return Err(DomainError::UserAlreadyBanned);
        }

        let reason = req
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let banned = self
            .users
            .update(
                target.id,
                UserPatch {
                    ban: Some(BanState::Banned(BanRecord {
                        banned_at: Utc::now(),
                        banned_by: actor.id,
                        reason: reason.clone(),
                    })),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(username = %banned.username, "user banned");

        let mut outcome = Outcome::new(banned);
        self.audit(
            &mut outcome,
            NewActivityLog {
                user_id: actor.id,
                action: ActivityAction::UserBanned,
                details: serde_json::json!({
                    "target_user_id": target.id,
                    "target_username": target.username,
                    "reason": reason,
                }),
                ip_address: req.context.ip_address,
                user_agent: req.context.user_agent,
            },
        )
        .await;

        match self.users.find_by_role(Role::Admin).await {
            Ok(admins) => {
                for admin in admins.into_iter().filter(|a| a.id != actor.id) {
                    let notification = NewNotification {
                        user_id: admin.id,
                        kind: NotificationKind::UserBanned,
                        content: format!("{} banned {}", actor.username, target.username),
                        related: serde_json::json!({
                            "target_user_id": target.id,
                            "banned_by": actor.id,
                            "reason": reason,
                        }),
                    };
                    self.notify(&mut outcome, notification).await;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to look up admins for ban notice");
                outcome.warn(Effect::Notification, e.to_string());
            }
        }

        Ok(outcome)
    }

    /// Banned -> Active. Admins only.
    #[tracing::instrument(skip(self, req), fields(actor_id = %req.actor_id, target_id = %req.target_id))]
    pub async fn unban(&self, req: UnbanRequest) -> Result<Outcome<User>> {
        let actor = self.find_user(req.actor_id).await?;
        if actor.role != Role::Admin {
            return Err(DomainError::permissions("only administrators can unban users"));
        }
        let target = self.find_user(req.target_id).await?;
        if !target.is_banned {
            return Err(DomainError::UserNotBanned);
        }

        let restored = self
            .users
            .update(
                target.id,
                UserPatch {
                    ban: Some(BanState::Active),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(username = %restored.username, "user unbanned");

        let mut outcome = Outcome::new(restored);
        self.audit(
            &mut outcome,
            NewActivityLog {
                user_id: actor.id,
                action: ActivityAction::UserUnbanned,
                details: serde_json::json!({
                    "target_user_id": target.id,
                    "target_username": target.username,
                    "previous_reason": target.ban_reason,
                }),
                ip_address: req.context.ip_address,
                user_agent: req.context.user_agent,
            },
        )
        .await;

        let notification = NewNotification {
            user_id: target.id,
            kind: NotificationKind::UserUnbanned,
            content: "Your account has been unbanned".to_string(),
            related: serde_json::json!({ "unbanned_by": actor.id }),
        };
        self.notify(&mut outcome, notification).await;

        Ok(outcome)
    }

    /// Banned accounts, for staff only.
    pub async fn list_banned(&self, actor_id: UserId) -> Result<Vec<User>> {
        let actor = self.find_user(actor_id).await?;
        if !actor.role.is_staff() {
            return Err(DomainError::permissions(
                "only administrators and moderators can list banned users",
            ));
        }
        self.users.find_banned().await
    }

    async fn find_user(&self, id: UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    async fn audit<T>(&self, outcome: &mut Outcome<T>, entry: NewActivityLog) {
        let action = entry.action;
        if let Err(e) = self.activity.create(entry).await {
            tracing::warn!(error = %e, action = action.as_str(), "failed to write activity log");
            outcome.warn(Effect::ActivityLog, e.to_string());
        }
    }

    async fn notify<T>(&self, outcome: &mut Outcome<T>, notification: NewNotification) {
        let recipient = notification.user_id;
        if let Err(e) = self.notifications.create(notification).await {
            tracing::warn!(error = %e, %recipient, "failed to send moderation notice");
            outcome.warn(Effect::Notification, e.to_string());
        }
    }
}
