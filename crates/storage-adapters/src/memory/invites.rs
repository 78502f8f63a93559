use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::invite::mark_used;
use domains::ports::{InviteCodeRepository, InviteQuery};
use domains::{DomainError, InviteCode, Result, UserId};

#[derive(Debug, Default)]
pub struct InMemoryInviteCodeRepository {
    codes: DashMap<String, InviteCode>,
}

impl InMemoryInviteCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InviteCodeRepository for InMemoryInviteCodeRepository {
    async fn create(&self, invite: InviteCode) -> Result<InviteCode> {
        match self.codes.entry(invite.code.clone()) {
            Entry::Occupied(_) => Err(DomainError::CodeExists(invite.code)),
            Entry::Vacant(slot) => Ok(slot.insert(invite).clone()),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<InviteCode>> {
        Ok(self.codes.get(code).map(|c| c.clone()))
    }

    async fn find_many(&self, query: InviteQuery) -> Result<Vec<InviteCode>> {
        let mut codes: Vec<InviteCode> = self
            .codes
            .iter()
            .filter(|c| query.created_by.map_or(true, |by| c.created_by == by))
            .filter(|c| query.used.map_or(true, |used| c.is_used() == used))
            .map(|c| c.clone())
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn mark_as_used(&self, code: &str, user_id: UserId, at: DateTime<Utc>) -> Result<InviteCode> {
        let mut slot = self
            .codes
            .get_mut(code)
            .ok_or_else(|| DomainError::CodeNotFound(code.to_string()))?;
        let used = mark_used(&slot, user_id, at)?;
        *slot = used.clone();
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn code(value: &str) -> InviteCode {
        InviteCode {
            code: value.into(),
            created_by: Uuid::new_v4(),
            used_by: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_redemption_is_refused() {
        let repo = InMemoryInviteCodeRepository::new();
        repo.create(code("AAAA-BBBB-CCCC")).await.unwrap();
        let first = Uuid::new_v4();
        repo.mark_as_used("AAAA-BBBB-CCCC", first, Utc::now()).await.unwrap();
        let err = repo
            .mark_as_used("AAAA-BBBB-CCCC", Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CodeAlreadyUsed { used_by, .. } if used_by == Some(first)));
    }

    #[tokio::test]
    async fn orphaned_consumption_is_not_reopened() {
        let repo = InMemoryInviteCodeRepository::new();
        repo.create(InviteCode {
            used_at: Some(Utc::now()),
            ..code("ORPHAN-001")
        })
        .await
        .unwrap();

        let err = repo
            .mark_as_used("ORPHAN-001", Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CodeAlreadyUsed { used_by: None, .. }));
        let used = repo
            .find_many(InviteQuery {
                used: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(used.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let repo = InMemoryInviteCodeRepository::new();
        repo.create(code("WELCOME")).await.unwrap();
        assert!(matches!(
            repo.create(code("WELCOME")).await,
            Err(DomainError::CodeExists(_))
        ));
    }

    #[tokio::test]
    async fn find_many_filters_on_usage() {
        let repo = InMemoryInviteCodeRepository::new();
        repo.create(code("USED-0001")).await.unwrap();
        repo.create(code("OPEN-0001")).await.unwrap();
        repo.mark_as_used("USED-0001", Uuid::new_v4(), Utc::now()).await.unwrap();

        let used = repo
            .find_many(InviteQuery {
                used: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].code, "USED-0001");
        assert_eq!(repo.find_many(InviteQuery::default()).await.unwrap().len(), 2);
    }
}
