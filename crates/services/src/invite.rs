//! # Invite codes
//!
//! Creation, validation, redemption and reporting for single-use invite codes.

use std::sync::Arc;

use chrono::Utc;
use domains::invite::{self, InviteValidation};
use domains::ports::{InviteCodeRepository, InviteQuery, UserRepository};
use domains::{DomainError, InviteCode, Result, User, UserId};
use serde::{Deserialize, Serialize};

const GENERATION_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteFilter {
    #[default]
    All,
    /// Unused and inside the window.
    Available,
    Used,
    /// Unused but past the window.
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InviteStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub expired: u64,
}

pub struct InviteService {
    invites: Arc<dyn InviteCodeRepository>,
    users: Arc<dyn UserRepository>,
    expiry_hours: i64,
}

impl InviteService {
    pub fn new(
        invites: Arc<dyn InviteCodeRepository>,
        users: Arc<dyn UserRepository>,
        expiry_hours: i64,
    ) -> Self {
        Self {
            invites,
            users,
            expiry_hours,
        }
    }

    /// Creates a generated code, or `custom_code` after normalization.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, actor_id: UserId, custom_code: Option<&str>) -> Result<InviteCode> {
        let actor = self.find_user(actor_id).await?;
        if !actor.role.is_staff() {
            return Err(DomainError::permissions(
                "only administrators and moderators can create invite codes",
            ));
        }

        if let Some(raw) = custom_code {
            let code = invite::normalize_custom_code(raw)?;
            if self.invites.find_by_code(&code).await?.is_some() {
                return Err(DomainError::CodeExists(code));
            }
            return self.invites.create(self.fresh(code, actor.id)).await;
        }

        for _ in 0..GENERATION_ATTEMPTS {
            let code = invite::generate_secure_code();
            match self.invites.create(self.fresh(code, actor.id)).await {
                Err(DomainError::CodeExists(code)) => {
                    tracing::debug!(%code, "generated invite code collided, retrying");
                }
                other => return other,
            }
        }
        Err(DomainError::Conflict(
            "could not generate a unique invite code".into(),
        ))
    }

    /// Asserts the code is usable, else fails with the reason it is not.
    pub async fn validate(&self, code: &str) -> Result<InviteValidation> {
        let invite = self.find_code(code).await?;
        invite::ensure_usable(&invite, Utc::now(), self.expiry_hours)
    }

    /// Validates and consumes the code for `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn redeem(&self, code: &str, user_id: UserId) -> Result<InviteCode> {
        let invite = self.find_code(code).await?;
        let now = Utc::now();
        invite::ensure_usable(&invite, now, self.expiry_hours)?;
        let used = self.invites.mark_as_used(&invite.code, user_id, now).await?;
        tracing::info!(code = %used.code, "invite code redeemed");
        Ok(used)
    }

    pub async fn list(&self, filter: InviteFilter, created_by: Option<UserId>) -> Result<Vec<InviteValidation>> {
        let used = match filter {
            InviteFilter::All => None,
            InviteFilter::Used => Some(true),
            InviteFilter::Available | InviteFilter::Expired => Some(false),
        };
        let now = Utc::now();
        let codes = self.invites.find_many(InviteQuery { created_by, used }).await?;

        Ok(codes
            .iter()
            .map(|c| invite::describe(c, now, self.expiry_hours))
            .filter(|status| match filter {
                InviteFilter::Available => status.is_valid,
                InviteFilter::Expired => status.is_expired,
                InviteFilter::All | InviteFilter::Used => true,
            })
            .collect())
    }

    pub async fn stats(&self) -> Result<InviteStats> {
        let now = Utc::now();
        let codes = self.invites.find_many(InviteQuery::default()).await?;

        Ok(codes.iter().fold(InviteStats::default(), |mut acc, code| {
            let status = invite::describe(code, now, self.expiry_hours);
            acc.total += 1;
            if status.is_used {
                acc.used += 1;
            } else if status.is_expired {
                acc.expired += 1;
            } else {
                acc.available += 1;
            }
            acc
        }))
    }

    fn fresh(&self, code: String, created_by: UserId) -> InviteCode {
        InviteCode {
            code,
            created_by,
            used_by: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    async fn find_code(&self, raw: &str) -> Result<InviteCode> {
        let code = raw.trim().to_uppercase();
        self.invites
            .find_by_code(&code)
            .await?
            .ok_or(DomainError::CodeNotFound(code))
    }

    async fn find_user(&self, id: UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }
}
