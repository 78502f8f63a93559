//! services/src/lib.rs
//!
//! Use cases of the forum core. Each service receives its ports as
//! `Arc<dyn Trait>` so any storage adapter can be wired in.

pub mod invite;
pub mod moderation;
pub mod profile;
pub mod vote;

pub use invite::{InviteFilter, InviteService, InviteStats};
pub use moderation::{BanRequest, ModerationService, UnbanRequest};
pub use profile::ProfileService;
pub use vote::{CurrentVote, VoteCommentService, VotePostService, VoteRequest, VoteResponse};
