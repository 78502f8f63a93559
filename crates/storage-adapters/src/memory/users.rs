use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::ports::{UserRepository, UserSettingsRepository};
use domains::reputation::apply_delta;
use domains::{DomainError, NewUser, Result, Role, User, UserId, UserPatch, UserSettings};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<UserId, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fully built record, replacing any previous one with the same id.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .map(|u| u.clone()))
    }

    async fn find_by_role(&self, role: Role) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == role)
            .map(|u| u.clone())
            .collect())
    }

    async fn find_banned(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.is_banned)
            .map(|u| u.clone())
            .collect())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn create(&self, new: NewUser) -> Result<User> {
        if self.find_by_username(&new.username).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "username {} is taken",
                new.username
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            avatar_url: None,
            bio: None,
            role: new.role,
            reputation: 0,
            is_email_verified: new.is_email_verified,
            is_banned: false,
            banned_at: None,
            banned_by: None,
            ban_reason: None,
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::user_not_found(id))?;
        let next = user.patched(&patch);
        *user = next.clone();
        Ok(next)
    }

    async fn adjust_reputation(&self, id: UserId, delta: i32) -> Result<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::user_not_found(id))?;
        user.reputation = apply_delta(user.reputation, delta);
        Ok(user.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserSettingsRepository {
    settings: DashMap<UserId, UserSettings>,
}

impl InMemoryUserSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserSettingsRepository for InMemoryUserSettingsRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<UserSettings>> {
        Ok(self.settings.get(&user_id).map(|s| s.clone()))
    }

    async fn upsert(&self, settings: UserSettings) -> Result<UserSettings> {
        self.settings.insert(settings.user_id, settings.clone());
        Ok(settings)
    }
}
