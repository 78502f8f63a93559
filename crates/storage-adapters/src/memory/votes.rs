use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::ports::VoteLedger;
use domains::vote::VoteTransition;
use domains::{
    DomainError, Entity, Result, UserId, Vote, VoteId, VoteStats, VoteToggle, VoteType,
};
use uuid::Uuid;

/// Ledger keyed on (user, target); the key itself is the uniqueness constraint.
#[derive(Debug, Default)]
pub struct InMemoryVoteLedger {
    votes: DashMap<(UserId, Uuid), Vote>,
}

impl InMemoryVoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_of(&self, vote_id: VoteId) -> Option<(UserId, Uuid)> {
        self.votes
            .iter()
            .find(|entry| entry.id == vote_id)
            .map(|entry| *entry.key())
    }
}

fn new_vote(user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Vote {
    Vote {
        id: Uuid::new_v4(),
        user_id,
        target_id,
        vote_type,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl VoteLedger for InMemoryVoteLedger {
    async fn find_existing(&self, user_id: UserId, target_id: Uuid) -> Result<Option<Vote>> {
        Ok(self.votes.get(&(user_id, target_id)).map(|v| v.clone()))
    }

    async fn create(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Result<Vote> {
        match self.votes.entry((user_id, target_id)) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "user {user_id} already voted on {target_id}"
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(new_vote(user_id, target_id, vote_type)).clone()),
        }
    }

    async fn update(&self, vote_id: VoteId, vote_type: VoteType) -> Result<Vote> {
        let key = self
            .key_of(vote_id)
            .ok_or_else(|| DomainError::not_found(Entity::Vote, vote_id))?;
        let mut vote = self
            .votes
            .get_mut(&key)
            .filter(|v| v.id == vote_id)
            .ok_or_else(|| DomainError::not_found(Entity::Vote, vote_id))?;
        vote.vote_type = vote_type;
        Ok(vote.clone())
    }

    async fn delete(&self, vote_id: VoteId) -> Result<Vote> {
        self.key_of(vote_id)
            .and_then(|key| self.votes.remove_if(&key, |_, v| v.id == vote_id))
            .map(|(_, vote)| vote)
            .ok_or_else(|| DomainError::not_found(Entity::Vote, vote_id))
    }

    async fn toggle(&self, user_id: UserId, target_id: Uuid, vote_type: VoteType) -> Result<VoteToggle> {
        // The entry guard holds the shard lock for the whole decision.
        let toggle = match self.votes.entry((user_id, target_id)) {
            Entry::Vacant(slot) => {
                let transition = VoteTransition::resolve(None, vote_type);
                let vote = slot.insert(new_vote(user_id, target_id, vote_type)).clone();
                VoteToggle {
                    action: transition.action(),
                    previous: None,
                    current: Some(vote),
                }
            }
            Entry::Occupied(mut slot) => {
                let previous = slot.get().clone();
                let transition = VoteTransition::resolve(Some(previous.vote_type), vote_type);
                match transition.resulting() {
                    Some(next) => {
                        slot.get_mut().vote_type = next;
                        VoteToggle {
                            action: transition.action(),
                            previous: Some(previous),
                            current: Some(slot.get().clone()),
                        }
                    }
                    None => {
                        slot.remove();
                        VoteToggle {
                            action: transition.action(),
                            previous: Some(previous),
                            current: None,
                        }
                    }
                }
            }
        };
        Ok(toggle)
    }

    async fn score(&self, target_id: Uuid) -> Result<i64> {
        Ok(self.stats(target_id).await?.score)
    }

    async fn stats(&self, target_id: Uuid) -> Result<VoteStats> {
        Ok(VoteStats::from_votes(
            self.votes
                .iter()
                .filter(|entry| entry.key().1 == target_id)
                .map(|entry| entry.vote_type),
        ))
    }
}
