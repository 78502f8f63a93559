//! # Profiles
//!
//! Privacy-scoped profile reads and settings updates.

use std::sync::Arc;

use domains::access::{resolve_access, shape_profile, visible_in_listing, AccessLevel, ProfileStats, ProfileView, Viewer};
use domains::ports::{CommentRepository, PostRepository, UserRepository, UserSettingsRepository};
use domains::{DomainError, Result, SettingsPatch, User, UserId, UserSettings};

pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    settings: Arc<dyn UserSettingsRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        settings: Arc<dyn UserSettingsRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            users,
            settings,
            posts,
            comments,
        }
    }

    /// Returns the profile shaped for `viewer`, or `InsufficientPermissions`
    /// when access resolves to denied.
    #[tracing::instrument(skip(self))]
    pub async fn get_profile(&self, viewer: Viewer, username: &str) -> Result<ProfileView> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::user_not_found(username))?;
        let settings = self.settings_for(user.id).await?;

        let access = resolve_access(
            viewer.id() == Some(user.id),
            viewer.is_staff(),
            viewer != Viewer::Anonymous,
            &settings,
        );
        tracing::debug!(?access, "profile access resolved");

        let stats = if access == AccessLevel::Full && settings.show_stats {
            ProfileStats {
                post_count: self.posts.count_by_author(user.id).await?,
                comment_count: self.comments.count_by_author(user.id).await?,
            }
        } else {
            ProfileStats::default()
        };

        shape_profile(&user, &settings, access, stats)
            .ok_or_else(|| DomainError::permissions("this profile is private"))
    }

    /// Stored settings, or the defaults when the user never saved any.
    pub async fn get_settings(&self, user_id: UserId) -> Result<UserSettings> {
        self.ensure_user(user_id).await?;
        self.settings_for(user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_settings(&self, user_id: UserId, patch: SettingsPatch) -> Result<UserSettings> {
        self.ensure_user(user_id).await?;
        let current = self.settings_for(user_id).await?;
        let saved = self.settings.upsert(current.patched(&patch)).await?;
        tracing::info!("privacy settings updated");
        Ok(saved)
    }

    /// Member directory; banned users are only listed for staff.
    pub async fn list_members(&self, viewer: Viewer) -> Result<Vec<User>> {
        let role = viewer.role();
        Ok(self
            .users
            .list()
            .await?
            .into_iter()
            .filter(|u| visible_in_listing(u, role))
            .collect())
    }

    async fn settings_for(&self, user_id: UserId) -> Result<UserSettings> {
        Ok(self
            .settings
            .find_by_user_id(user_id)
            .await?
            .unwrap_or_else(|| UserSettings::defaults_for(user_id)))
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }
}
