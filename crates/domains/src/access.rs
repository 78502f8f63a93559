//! # Profile access
//!
//! Decides how much of a profile a viewer may see and shapes the data to match.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Role, User, UserId, UserSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Full,
    Limited,
    Denied,
}

/// Who is looking at a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Member { id: UserId, role: Role },
}

impl Viewer {
    pub fn id(self) -> Option<UserId> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Member { id, .. } => Some(id),
        }
    }

    pub fn role(self) -> Option<Role> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Member { role, .. } => Some(role),
        }
    }

    pub fn is_staff(self) -> bool {
        self.role().is_some_and(Role::is_staff)
    }
}

/// Rules in strict priority order:
/// own profile, staff, moderators-only, private, public.
pub fn resolve_access(
    is_own_profile: bool,
    viewer_is_staff: bool,
    viewer_authenticated: bool,
    settings: &UserSettings,
) -> AccessLevel {
    if is_own_profile || viewer_is_staff {
        return AccessLevel::Full;
    }
    if settings.restrict_to_moderators {
        return AccessLevel::Denied;
    }
    if settings.private_profile {
        return if viewer_authenticated {
            AccessLevel::Limited
        } else {
            AccessLevel::Denied
        };
    }
    AccessLevel::Full
}

/// Shown instead of the join date when `show_join_date` is off.
pub const HIDDEN_JOIN_DATE: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub post_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub reputation: u32,
    pub role: Role,
    pub is_email_verified: bool,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub stats: ProfileStats,
    pub access: AccessLevel,
}

/// Builds the view for a resolved access level. `Denied` yields nothing.
pub fn shape_profile(
    user: &User,
    settings: &UserSettings,
    access: AccessLevel,
    stats: ProfileStats,
) -> Option<ProfileView> {
    let base = ProfileView {
        id: user.id,
        username: user.username.clone(),
        avatar_url: user.avatar_url.clone(),
        reputation: user.reputation,
        role: user.role,
        is_email_verified: user.is_email_verified,
        bio: None,
        created_at: user.created_at,
        last_login_at: None,
        email: None,
        stats: ProfileStats::default(),
        access,
    };

    match access {
        AccessLevel::Denied => None,
        AccessLevel::Limited => Some(base),
        AccessLevel::Full => Some(ProfileView {
            bio: user.bio.clone(),
            created_at: if settings.show_join_date {
                user.created_at
            } else {
                HIDDEN_JOIN_DATE
            },
            last_login_at: user.last_login_at.filter(|_| settings.show_last_seen),
            email: settings.show_email.then(|| user.email.clone()),
            stats: if settings.show_stats {
                stats
            } else {
                ProfileStats::default()
            },
            ..base
        }),
    }
}

/// Banned users drop out of public listings; staff still see them.
pub fn visible_in_listing(user: &User, viewer_role: Option<Role>) -> bool {
    !user.is_banned || viewer_role.is_some_and(Role::is_staff)
}
