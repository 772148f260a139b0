use chrono::{Duration, Utc};
use sqlx::PgPool;
use warden_db::models::session::{CreateSession, Session};
use warden_db::models::user::{UpsertUser, User};
use warden_core::session::SessionPolicy;
use warden_db::repositories::{SessionRepo, UserRepo};

async fn new_user(pool: &PgPool, email: &str) -> User {
    UserRepo::upsert_by_email(
        pool,
        &UpsertUser {
            email: email.to_string(),
            name: "Session Owner".to_string(),
        },
    )
    .await
    .unwrap()
}

fn new_session(user_id: i64) -> CreateSession {
    CreateSession {
        user_id,
        ip_address: "203.0.113.7".to_string(),
        user_agent: Some("integration-test".to_string()),
        expires_at: Utc::now() + Duration::days(7),
    }
}

async fn signin(pool: &PgPool, user_id: i64, cap: i64) -> (Session, Vec<String>) {
    let mut tx = pool.begin().await.unwrap();
    let policy = SessionPolicy {
        ttl: Duration::days(7),
        max_active_sessions: cap,
    };
    let result = SessionRepo::create_with_eviction(&mut *tx, &new_session(user_id), &policy)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    result
}

/// Pin `last_active_at` so eviction order does not depend on clock resolution.
async fn set_last_active(pool: &PgPool, id: &str, minutes_ago: i64) {
    sqlx::query("UPDATE sessions SET last_active_at = NOW() - make_interval(mins => $2) WHERE id = $1")
        .bind(id)
        .bind(minutes_ago as i32)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_generates_distinct_hex_ids(pool: PgPool) {
    let user = new_user(&pool, "ids@example.com").await;

    let a = SessionRepo::create(&pool, &new_session(user.id)).await.unwrap();
    let b = SessionRepo::create(&pool, &new_session(user.id)).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.id.len(), 64);
    assert!(!a.is_revoked);
    assert_eq!(a.ip_address, "203.0.113.7");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_signin_below_cap_evicts_nothing(pool: PgPool) {
    let user = new_user(&pool, "below@example.com").await;

    let (_, evicted) = signin(&pool, user.id, 3).await;
    assert!(evicted.is_empty());
    let (_, evicted) = signin(&pool, user.id, 3).await;
    assert!(evicted.is_empty());

    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_signin_over_cap_evicts_least_recently_active(pool: PgPool) {
    let user = new_user(&pool, "cap@example.com").await;

    let (s1, _) = signin(&pool, user.id, 2).await;
    let (s2, _) = signin(&pool, user.id, 2).await;
    set_last_active(&pool, &s1.id, 30).await;
    set_last_active(&pool, &s2.id, 10).await;

    let (s3, evicted) = signin(&pool, user.id, 2).await;

    assert_eq!(evicted, vec![s1.id.clone()]);
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 2);
    assert!(SessionRepo::find_active(&pool, &s1.id).await.unwrap().is_none());
    assert!(SessionRepo::find_active(&pool, &s2.id).await.unwrap().is_some());
    assert!(SessionRepo::find_active(&pool, &s3.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_touch_changes_eviction_target(pool: PgPool) {
    let user = new_user(&pool, "touch@example.com").await;

    let (s1, _) = signin(&pool, user.id, 2).await;
    let (s2, _) = signin(&pool, user.id, 2).await;
    set_last_active(&pool, &s1.id, 30).await;
    set_last_active(&pool, &s2.id, 10).await;

    // s1 is now the most recently used.
    SessionRepo::touch(&pool, &s1.id).await.unwrap();

    let (_, evicted) = signin(&pool, user.id, 2).await;
    assert_eq!(evicted, vec![s2.id.clone()]);
    assert!(SessionRepo::find_active(&pool, &s1.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_session_is_never_evicted(pool: PgPool) {
    let user = new_user(&pool, "cap-one@example.com").await;

    let (s1, _) = signin(&pool, user.id, 1).await;
    let (s2, evicted) = signin(&pool, user.id, 1).await;

    assert_eq!(evicted, vec![s1.id]);
    assert!(SessionRepo::find_active(&pool, &s2.id).await.unwrap().is_some());
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lowered_cap_is_restored_in_one_signin(pool: PgPool) {
    let user = new_user(&pool, "shrink@example.com").await;

    for _ in 0..4 {
        signin(&pool, user.id, 10).await;
    }
    let (_, evicted) = signin(&pool, user.id, 2).await;

    assert_eq!(evicted.len(), 3);
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoke_decrements_active_count_once(pool: PgPool) {
    let user = new_user(&pool, "revoke@example.com").await;
    let (s1, _) = signin(&pool, user.id, 5).await;
    signin(&pool, user.id, 5).await;

    assert!(SessionRepo::revoke(&pool, &s1.id).await.unwrap());
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 1);

    // Second revoke is a no-op.
    assert!(!SessionRepo::revoke(&pool, &s1.id).await.unwrap());
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 1);

    assert!(!SessionRepo::revoke(&pool, "does-not-exist").await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoke_owned_ignores_other_users(pool: PgPool) {
    let alice = new_user(&pool, "alice@example.com").await;
    let bob = new_user(&pool, "bob@example.com").await;
    let (bob_session, _) = signin(&pool, bob.id, 5).await;

    assert!(!SessionRepo::revoke_owned(&pool, alice.id, &bob_session.id).await.unwrap());
    assert!(SessionRepo::find_active(&pool, &bob_session.id).await.unwrap().is_some());

    assert!(SessionRepo::revoke_owned(&pool, bob.id, &bob_session.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_sessions_are_not_active(pool: PgPool) {
    let user = new_user(&pool, "expired@example.com").await;
    let mut input = new_session(user.id);
    input.expires_at = Utc::now() - Duration::minutes(1);
    let expired = SessionRepo::create(&pool, &input).await.unwrap();

    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), 0);
    assert!(!SessionRepo::revoke(&pool, &expired.id).await.unwrap());

    // Still visible to lookups so callers can report expiry.
    let found = SessionRepo::find_active(&pool, &expired.id).await.unwrap().unwrap();
    assert!(found.expires_at < Utc::now());
    assert!(!found.is_revoked);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_active_marks_current_and_orders_newest_first(pool: PgPool) {
    let user = new_user(&pool, "list@example.com").await;
    let (s1, _) = signin(&pool, user.id, 5).await;
    let (s2, _) = signin(&pool, user.id, 5).await;
    let (s3, _) = signin(&pool, user.id, 5).await;
    SessionRepo::revoke(&pool, &s2.id).await.unwrap();

    let listed = SessionRepo::list_active(&pool, user.id, &s1.id).await.unwrap();

    let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![s3.id.as_str(), s1.id.as_str()]);
    assert!(listed[1].is_current);
    assert!(!listed[0].is_current);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_signins_respect_cap(pool: PgPool) {
    let user = new_user(&pool, "race@example.com").await;
    let cap = 3;

    let attempts = (0..8).map(|_| {
        let pool = pool.clone();
        let user_id = user.id;
        async move { signin(&pool, user_id, cap).await }
    });
    let results = futures::future::join_all(attempts).await;

    let evicted: usize = results.iter().map(|(_, e)| e.len()).sum();
    assert_eq!(evicted, 8 - cap as usize);
    assert_eq!(SessionRepo::count_active(&pool, user.id).await.unwrap(), cap);
}
