//! Adapter tests against a disposable Postgres container.
//! Run with `cargo test -p storage-adapters --features db-postgres -- --ignored`.

use std::sync::Arc;

use chrono::Utc;
use domains::ports::{InviteCodeRepository, UserRepository, VoteLedger};
use domains::{DomainError, InviteCode, NewUser, Role, UserId, UserPatch, VoteAction, VoteType};
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

use super::*;

async fn database() -> (ContainerAsync<Postgres>, PgPool) {
    let node = Postgres::default().start().await.unwrap();
    let url = format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        node.get_host().await.unwrap(),
        node.get_host_port_ipv4(5432).await.unwrap()
    );
    let pool = connect(&url, 16).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (node, pool)
}

async fn user(pool: &PgPool, name: &str) -> UserId {
    PgUserRepository::new(pool.clone())
        .create(NewUser {
            username: name.into(),
            email: format!("{name}@forum.test"),
            role: Role::User,
            is_email_verified: true,
        })
        .await
        .unwrap()
        .id
}

async fn post(pool: &PgPool, author_id: UserId) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO posts (id, author_id, title) VALUES ($1, $2, 'hello')")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn vote_rows(pool: &PgPool, post_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM post_votes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn invite(code: &str, created_by: UserId) -> InviteCode {
    InviteCode {
        code: code.into(),
        created_by,
        used_by: None,
        used_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn toggle_creates_flips_and_removes() {
    let (_node, pool) = database().await;
    let author = user(&pool, "author").await;
    let voter = user(&pool, "voter").await;
    let post_id = post(&pool, author).await;
    let ledger = PgVoteLedger::new(pool.clone(), VoteTable::Post);

    let created = ledger.toggle(voter, post_id, VoteType::Up).await.unwrap();
    assert_eq!(created.action, VoteAction::Created);
    assert!(created.previous.is_none());
    assert_eq!(ledger.score(post_id).await.unwrap(), 1);

    let flipped = ledger.toggle(voter, post_id, VoteType::Down).await.unwrap();
    assert_eq!(flipped.action, VoteAction::Updated);
    assert_eq!(flipped.previous.map(|v| v.vote_type), Some(VoteType::Up));
    let stats = ledger.stats(post_id).await.unwrap();
    assert_eq!((stats.upvotes, stats.downvotes, stats.score), (0, 1, -1));

    let removed = ledger.toggle(voter, post_id, VoteType::Down).await.unwrap();
    assert_eq!(removed.action, VoteAction::Removed);
    assert!(removed.current.is_none());
    assert_eq!(vote_rows(&pool, post_id).await, 0);
    assert!(ledger.find_existing(voter, post_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn plain_create_conflicts_on_second_row() {
    let (_node, pool) = database().await;
    let voter = user(&pool, "voter").await;
    let post_id = post(&pool, voter).await;
    let ledger = PgVoteLedger::new(pool.clone(), VoteTable::Post);

    let vote = ledger.create(voter, post_id, VoteType::Up).await.unwrap();
    assert!(matches!(
        ledger.create(voter, post_id, VoteType::Down).await,
        Err(DomainError::Conflict(_))
    ));
    assert_eq!(ledger.update(vote.id, VoteType::Down).await.unwrap().vote_type, VoteType::Down);
    ledger.delete(vote.id).await.unwrap();
    assert_eq!(vote_rows(&pool, post_id).await, 0);
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn concurrent_toggles_leave_at_most_one_row() {
    let (_node, pool) = database().await;
    let voter = user(&pool, "voter").await;
    let post_id = post(&pool, voter).await;
    let ledger = Arc::new(PgVoteLedger::new(pool.clone(), VoteTable::Post));

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.toggle(voter, post_id, VoteType::Up).await })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(DomainError::Conflict(_)) => {}
            Err(other) => panic!("unexpected toggle failure: {other}"),
        }
    }

    // Every applied toggle flips presence, so the parity decides the final state.
    let rows = vote_rows(&pool, post_id).await;
    assert!(rows <= 1);
    assert_eq!(rows, applied % 2);
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn reputation_is_clamped_in_the_database() {
    let (_node, pool) = database().await;
    let id = user(&pool, "author").await;
    let users = PgUserRepository::new(pool.clone());

    assert_eq!(users.adjust_reputation(id, -5).await.unwrap().reputation, 0);
    assert_eq!(users.adjust_reputation(id, 7).await.unwrap().reputation, 7);

    users
        .update(
            id,
            UserPatch {
                reputation: Some(u32::MAX - 1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(users.adjust_reputation(id, 10).await.unwrap().reputation, u32::MAX);

    assert!(matches!(
        users.adjust_reputation(Uuid::new_v4(), 1).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn invite_codes_are_claimed_once() {
    let (_node, pool) = database().await;
    let admin = user(&pool, "root").await;
    let first = user(&pool, "first").await;
    let second = user(&pool, "second").await;
    let invites = PgInviteCodeRepository::new(pool.clone());

    invites.create(invite("WELCOME-01", admin)).await.unwrap();
    assert!(matches!(
        invites.create(invite("WELCOME-01", admin)).await,
        Err(DomainError::CodeExists(code)) if code == "WELCOME-01"
    ));

    let used = invites.mark_as_used("WELCOME-01", first, Utc::now()).await.unwrap();
    assert_eq!(used.used_by, Some(first));

    let err = invites
        .mark_as_used("WELCOME-01", second, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CodeAlreadyUsed { used_by, .. } if used_by == Some(first)));

    assert!(matches!(
        invites.mark_as_used("MISSING-01", second, Utc::now()).await,
        Err(DomainError::CodeNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "needs a Docker daemon"]
async fn consumer_fields_stay_paired() {
    let (_node, pool) = database().await;
    let admin = user(&pool, "root").await;
    let consumer = user(&pool, "consumer").await;
    let invites = PgInviteCodeRepository::new(pool.clone());

    let half = InviteCode {
        used_by: Some(consumer),
        ..invite("HALF-0001", admin)
    };
    assert!(matches!(
        invites.create(half).await,
        Err(DomainError::Storage(_))
    ));

    invites.create(invite("PAIRED-01", admin)).await.unwrap();
    invites.mark_as_used("PAIRED-01", consumer, Utc::now()).await.unwrap();

    // The consumer cannot disappear and reopen the code.
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(consumer)
        .execute(&pool)
        .await;
    assert!(deleted.is_err());
    assert!(invites.find_by_code("PAIRED-01").await.unwrap().unwrap().is_used());
}
