//! # Reputation accounting
//!
//! Converts vote transitions into signed deltas for the target's author.
//! Comment votes weigh less than post votes.

use crate::models::{TargetKind, VoteAction, VoteType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteWeights {
    pub up: i32,
    pub down: i32,
}

pub const POST_WEIGHTS: VoteWeights = VoteWeights { up: 5, down: -2 };
pub const COMMENT_WEIGHTS: VoteWeights = VoteWeights { up: 2, down: -1 };

impl VoteWeights {
    pub fn weight(self, vote: VoteType) -> i32 {
        match vote {
            VoteType::Up => self.up,
            VoteType::Down => self.down,
        }
    }
}

impl TargetKind {
    pub fn weights(self) -> VoteWeights {
        match self {
            TargetKind::Post => POST_WEIGHTS,
            TargetKind::Comment => COMMENT_WEIGHTS,
        }
    }
}

/// Delta to apply to the author for one toggle.
///
/// For `Removed`, the removed vote's own weight is reverted; `old` falls back
/// to `new` when the caller does not know the prior vote.
pub fn reputation_delta(
    kind: TargetKind,
    action: VoteAction,
    new: VoteType,
    old: Option<VoteType>,
) -> i32 {
    let weights = kind.weights();
    match action {
        VoteAction::Created => weights.weight(new),
        VoteAction::Updated => weights.weight(new) - old.map_or(0, |o| weights.weight(o)),
        VoteAction::Removed => -weights.weight(old.unwrap_or(new)),
    }
}

/// `max(0, current + delta)`, saturating at `u32::MAX`.
pub fn apply_delta(current: u32, delta: i32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}
