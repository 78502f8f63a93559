//! # Vote toggle
//!
//! Per (user, target) a vote is in one of three states: no vote, upvoted,
//! downvoted. Repeating the same vote removes it, the opposite vote flips it.

use crate::models::{VoteAction, VoteType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// NoVote -> Voted(v)
    Create(VoteType),
    /// Voted(from) -> Voted(to), `from != to`
    Flip { from: VoteType, to: VoteType },
    /// Voted(v) -> NoVote
    Remove(VoteType),
}

impl VoteTransition {
    pub fn resolve(existing: Option<VoteType>, requested: VoteType) -> Self {
        match existing {
            None => VoteTransition::Create(requested),
            Some(current) if current == requested => VoteTransition::Remove(current),
            Some(current) => VoteTransition::Flip {
                from: current,
                to: requested,
            },
        }
    }

    pub fn action(self) -> VoteAction {
        match self {
            VoteTransition::Create(_) => VoteAction::Created,
            VoteTransition::Flip { .. } => VoteAction::Updated,
            VoteTransition::Remove(_) => VoteAction::Removed,
        }
    }

    /// The vote that is live after the transition.
    pub fn resulting(self) -> Option<VoteType> {
        match self {
            VoteTransition::Create(v) | VoteTransition::Flip { to: v, .. } => Some(v),
            VoteTransition::Remove(_) => None,
        }
    }

    /// The vote that was live before the transition.
    pub fn prior(self) -> Option<VoteType> {
        match self {
            VoteTransition::Create(_) => None,
            VoteTransition::Flip { from: v, .. } | VoteTransition::Remove(v) => Some(v),
        }
    }
}

/// User-facing message keyed on action × requested vote type.
pub fn vote_message(action: VoteAction, requested: VoteType) -> &'static str {
    match (action, requested) {
        (VoteAction::Created, VoteType::Up) => "Upvote added",
        (VoteAction::Created, VoteType::Down) => "Downvote added",
        (VoteAction::Updated, VoteType::Up) => "Vote changed to upvote",
        (VoteAction::Updated, VoteType::Down) => "Vote changed to downvote",
        (VoteAction::Removed, VoteType::Up) => "Upvote removed",
        (VoteAction::Removed, VoteType::Down) => "Downvote removed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoteType::*;

    #[test]
    fn first_vote_creates() {
        let t = VoteTransition::resolve(None, Up);
        assert_eq!(t, VoteTransition::Create(Up));
        assert_eq!(t.action(), VoteAction::Created);
        assert_eq!(t.resulting(), Some(Up));
        assert_eq!(t.prior(), None);
    }

    #[test]
    fn same_vote_removes() {
        for v in [Up, Down] {
            let t = VoteTransition::resolve(Some(v), v);
            assert_eq!(t.action(), VoteAction::Removed);
            assert_eq!(t.resulting(), None);
            assert_eq!(t.prior(), Some(v));
        }
    }

    #[test]
    fn opposite_vote_flips() {
        let t = VoteTransition::resolve(Some(Up), Down);
        assert_eq!(t, VoteTransition::Flip { from: Up, to: Down });
        assert_eq!(t.action(), VoteAction::Updated);
        assert_eq!(t.resulting(), Some(Down));
    }

    #[test]
    fn messages_cover_table() {
        assert_eq!(vote_message(VoteAction::Created, Up), "Upvote added");
        assert_eq!(vote_message(VoteAction::Removed, Down), "Downvote removed");
        assert_eq!(
            vote_message(VoteAction::Updated, Down),
            "Vote changed to downvote"
        );
    }
}
