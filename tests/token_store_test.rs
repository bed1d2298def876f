use wicket::domain_model::{TokenKind, Username};
use wicket::domain_port::TokenStore;
use wicket::infra_memory::MemoryTokenStore;

#[tokio::test]
async fn put_replaces_prior_value() {
    let store = MemoryTokenStore::new();
    let alice = Username::from("alice");

    store
        .put(&alice, TokenKind::Access, "first", 60)
        .await
        .unwrap();
    assert_eq!(
        store.get(&alice, TokenKind::Access).await.unwrap(),
        Some("first".to_string())
    );

    store
        .put(&alice, TokenKind::Access, "second", 60)
        .await
        .unwrap();
    assert_eq!(
        store.get(&alice, TokenKind::Access).await.unwrap(),
        Some("second".to_string())
    );

    // the refresh slot is independent
    assert_eq!(store.get(&alice, TokenKind::Refresh).await.unwrap(), None);
}

#[tokio::test]
async fn entries_are_scoped_per_subject() {
    let store = MemoryTokenStore::new();
    let alice = Username::from("alice");
    let bob = Username::from("bob");

    store
        .put(&alice, TokenKind::Refresh, "alice-token", 60)
        .await
        .unwrap();
    assert_eq!(store.get(&bob, TokenKind::Refresh).await.unwrap(), None);
}

#[tokio::test]
async fn revoked_tokens_are_reported() {
    let store = MemoryTokenStore::new();

    assert!(!store.is_revoked("some-token").await.unwrap());
    store.revoke("some-token", 60).await.unwrap();
    assert!(store.is_revoked("some-token").await.unwrap());
    assert!(!store.is_revoked("another-token").await.unwrap());
}

#[tokio::test]
async fn clear_subject_removes_both_slots_and_is_idempotent() {
    let store = MemoryTokenStore::new();
    let alice = Username::from("alice");

    store
        .put(&alice, TokenKind::Access, "access", 60)
        .await
        .unwrap();
    store
        .put(&alice, TokenKind::Refresh, "refresh", 60)
        .await
        .unwrap();

    store.clear_subject(&alice).await.unwrap();
    assert_eq!(store.get(&alice, TokenKind::Access).await.unwrap(), None);
    assert_eq!(store.get(&alice, TokenKind::Refresh).await.unwrap(), None);

    store.clear_subject(&alice).await.unwrap();
}

#[tokio::test]
async fn ttl_governs_visibility() {
    let store = MemoryTokenStore::new();
    let alice = Username::from("alice");

    // a zero TTL entry is already past its deadline
    store
        .put(&alice, TokenKind::Access, "stale", 0)
        .await
        .unwrap();
    assert_eq!(store.get(&alice, TokenKind::Access).await.unwrap(), None);

    store.revoke("stale-token", 0).await.unwrap();
    assert!(!store.is_revoked("stale-token").await.unwrap());
}
