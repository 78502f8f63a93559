//! # DomainError
//!
//! Centralized error handling for the forum core.
//! Every failure carries a stable [`ErrorKind`] and machine code so callers
//! can map it onto a transport status without string matching.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by callers to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientPermissions,
    Conflict,
    DomainRuleViolation,
    Internal,
}

/// The kind of record a [`DomainError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Post,
    Comment,
    Vote,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::User => "User",
            Entity::Post => "Post",
            Entity::Comment => "Comment",
            Entity::Vote => "Vote",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Record absent (user, post, comment, vote).
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: Entity, id: String },

    /// Malformed request data (e.g. a vote type other than +1/-1).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Role check failed or the actor is not allowed to act (unverified, banned).
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// Uniqueness violated, e.g. a concurrent vote insert.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("administrators cannot be banned")]
    CannotBanAdmin,

    #[error("user is already banned")]
    UserAlreadyBanned,

    #[error("user is not banned")]
    UserNotBanned,

    #[error("invite code {0} not found")]
    CodeNotFound(String),

    /// Either consumer field may be missing when the consuming account is gone.
    #[error("invite code {code} was already used")]
    CodeAlreadyUsed {
        code: String,
        used_by: Option<Uuid>,
        used_at: Option<DateTime<Utc>>,
    },

    #[error("invite code {code} expired at {expired_at}")]
    CodeExpired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    #[error("invalid invite code format: {0}")]
    InvalidCodeFormat(String),

    #[error("invite code {0} already exists")]
    CodeExists(String),

    /// Infrastructure failure (database down, serialization).
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        Self::not_found(Entity::User, id)
    }

    pub fn permissions(msg: impl Into<String>) -> Self {
        Self::InsufficientPermissions(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } | DomainError::CodeNotFound(_) => ErrorKind::NotFound,
            DomainError::InvalidInput(_) | DomainError::InvalidCodeFormat(_) => {
                ErrorKind::InvalidInput
            }
            DomainError::InsufficientPermissions(_) => ErrorKind::InsufficientPermissions,
            DomainError::Conflict(_) | DomainError::CodeExists(_) => ErrorKind::Conflict,
            DomainError::CannotBanAdmin
            | DomainError::UserAlreadyBanned
            | DomainError::UserNotBanned
            | DomainError::CodeAlreadyUsed { .. }
            | DomainError::CodeExpired { .. } => ErrorKind::DomainRuleViolation,
            DomainError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { entity, .. } => match entity {
                Entity::User => "USER_NOT_FOUND",
                Entity::Post => "POST_NOT_FOUND",
                Entity::Comment => "COMMENT_NOT_FOUND",
                Entity::Vote => "VOTE_NOT_FOUND",
            },
            DomainError::InvalidInput(_) => "INVALID_INPUT",
            DomainError::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::CannotBanAdmin => "CANNOT_BAN_ADMIN",
            DomainError::UserAlreadyBanned => "USER_ALREADY_BANNED",
            DomainError::UserNotBanned => "USER_NOT_BANNED",
            DomainError::CodeNotFound(_) => "CODE_NOT_FOUND",
            DomainError::CodeAlreadyUsed { .. } => "CODE_ALREADY_USED",
            DomainError::CodeExpired { .. } => "CODE_EXPIRED",
            DomainError::InvalidCodeFormat(_) => "INVALID_CODE_FORMAT",
            DomainError::CodeExists(_) => "CODE_EXISTS",
            DomainError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

/// A specialized Result type for forum-core logic.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_errors_are_rule_violations() {
        for err in [
            DomainError::CannotBanAdmin,
            DomainError::UserAlreadyBanned,
            DomainError::UserNotBanned,
        ] {
            assert_eq!(err.kind(), ErrorKind::DomainRuleViolation);
        }
        assert_eq!(DomainError::UserNotBanned.code(), "USER_NOT_BANNED");
    }

    #[test]
    fn not_found_code_follows_entity() {
        let err = DomainError::not_found(Entity::Comment, Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "COMMENT_NOT_FOUND");
        assert!(err.to_string().starts_with("Comment not found"));
    }

    #[test]
    fn storage_errors_are_internal() {
        let err: DomainError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
