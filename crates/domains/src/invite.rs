//! # Invite codes
//!
//! Generation, normalization and the derived expiry predicate. The expiry
//! window is computed here and nowhere else.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use crate::errors::{DomainError, Result};
use crate::models::{InviteCode, UserId};

pub const DEFAULT_EXPIRY_HOURS: i64 = 168;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;
const MIN_CUSTOM_LEN: usize = 6;
const MAX_CUSTOM_LEN: usize = 20;

pub fn expires_at(created_at: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    created_at + Duration::hours(window_hours)
}

pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> bool {
    now > expires_at(created_at, window_hours)
}

/// `XXXX-XXXX-XXXX` over `[A-Z0-9]`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..GROUPS)
        .map(|_| {
            (0..GROUP_LEN)
                .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

pub fn generate_secure_code() -> String {
    generate_code(&mut rand::thread_rng())
}

/// Trims and uppercases a caller-chosen code, then checks its shape.
pub fn normalize_custom_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_uppercase();
    let len = code.chars().count();

    if !(MIN_CUSTOM_LEN..=MAX_CUSTOM_LEN).contains(&len) {
        return Err(DomainError::InvalidCodeFormat(format!(
            "code must be {MIN_CUSTOM_LEN}-{MAX_CUSTOM_LEN} characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::InvalidCodeFormat(
            "code may only contain A-Z, 0-9 and hyphens".into(),
        ));
    }
    if code.starts_with('-') || code.ends_with('-') || code.contains("--") {
        return Err(DomainError::InvalidCodeFormat(
            "code may not start or end with a hyphen or contain consecutive hyphens".into(),
        ));
    }
    Ok(code)
}

/// Returns the consumed code, or `CodeAlreadyUsed` if it is terminal already.
pub fn mark_used(invite: &InviteCode, user_id: UserId, at: DateTime<Utc>) -> Result<InviteCode> {
    if invite.is_used() {
        return Err(already_used(invite));
    }
    Ok(InviteCode {
        used_by: Some(user_id),
        used_at: Some(at),
        ..invite.clone()
    })
}

fn already_used(invite: &InviteCode) -> DomainError {
    DomainError::CodeAlreadyUsed {
        code: invite.code.clone(),
        used_by: invite.used_by,
        used_at: invite.used_at,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteValidation {
    pub code: String,
    pub is_valid: bool,
    pub is_used: bool,
    pub is_expired: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub fn describe(invite: &InviteCode, now: DateTime<Utc>, window_hours: i64) -> InviteValidation {
    let is_used = invite.is_used();
    let is_expired = is_expired(invite.created_at, now, window_hours);
    InviteValidation {
        code: invite.code.clone(),
        is_valid: !is_used && !is_expired,
        is_used,
        is_expired,
        created_by: invite.created_by,
        created_at: invite.created_at,
        expires_at: expires_at(invite.created_at, window_hours),
    }
}

/// Asserts the code is usable, else explains why not.
pub fn ensure_usable(
    invite: &InviteCode,
    now: DateTime<Utc>,
    window_hours: i64,
) -> Result<InviteValidation> {
    let status = describe(invite, now, window_hours);
    if status.is_used {
        return Err(already_used(invite));
    }
    if status.is_expired {
        return Err(DomainError::CodeExpired {
            code: invite.code.clone(),
            expired_at: status.expires_at,
        });
    }
    Ok(status)
}
