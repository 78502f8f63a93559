//! Process-local adapters. State lives for the lifetime of the value.

mod audit;
mod content;
mod invites;
mod users;
mod votes;

pub use audit::{InMemoryActivityLog, InMemoryNotificationRepository};
pub use content::{InMemoryCommentRepository, InMemoryPostRepository};
pub use invites::InMemoryInviteCodeRepository;
pub use users::{InMemoryUserRepository, InMemoryUserSettingsRepository};
pub use votes::InMemoryVoteLedger;
