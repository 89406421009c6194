mod common;

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{Duration, Utc};
use common::TestStore;
use screenwatch_shared::FamilyKey;
use screenwatch_shared::status::{self, Liveness};
use screenwatch_store::{IdentityError, Store, generate_family_key};

#[test]
fn family_keys_are_eight_uppercase_hex_chars() {
    for _ in 0..50 {
        let key = generate_family_key();
        assert_eq!(key.as_str().len(), 8);
        assert!(
            key.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }
}

#[tokio::test]
async fn register_parent_is_idempotent() {
    let t = TestStore::new();
    let k1 = t.store.register_parent("a@x.com", "pw1").await.unwrap();
    let k2 = t.store.register_parent("a@x.com", "other").await.unwrap();
    assert_eq!(k1, k2);

    // The replayed password is ignored.
    assert_eq!(t.store.login_parent("a@x.com", "pw1").await.unwrap(), k1);
    assert!(matches!(
        t.store.login_parent("a@x.com", "other").await,
        Err(IdentityError::AuthFailed)
    ));
}

#[tokio::test]
async fn distinct_parents_get_distinct_keys() {
    let t = TestStore::new();
    let k1 = t.store.register_parent("a@x.com", "pw").await.unwrap();
    let k2 = t.store.register_parent("c@x.com", "pw").await.unwrap();
    assert_ne!(k1, k2);
}

#[tokio::test]
async fn passwords_are_not_stored_in_clear() {
    let t = TestStore::new();
    t.store.register_parent("a@x.com", "pw1").await.unwrap();
    let raw = std::fs::read_to_string(&t.path).unwrap();
    assert!(!raw.contains("\"pw1\""));
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let t = TestStore::new();
    t.store.register_parent("a@x.com", "pw1").await.unwrap();
    let unknown = t.store.login_parent("nobody@x.com", "pw1").await.unwrap_err();
    let wrong = t.store.login_parent("a@x.com", "pw2").await.unwrap_err();
    assert!(matches!(unknown, IdentityError::AuthFailed));
    assert!(matches!(wrong, IdentityError::AuthFailed));
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn unknown_email_costs_as_much_as_a_wrong_password() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("screenwatch.json")).with_hash_cost(8);
    store.register_parent("a@x.com", "pw1").await.unwrap();

    let started = Instant::now();
    store.login_parent("a@x.com", "pw2").await.unwrap_err();
    let wrong = started.elapsed();

    let started = Instant::now();
    store.login_parent("nobody@x.com", "pw2").await.unwrap_err();
    let unknown = started.elapsed();

    assert!(
        unknown * 4 >= wrong,
        "unknown email rejected in {unknown:?}, wrong password in {wrong:?}"
    );
}

#[tokio::test]
async fn password_match_is_exact() {
    let t = TestStore::new();
    t.store.register_parent("a@x.com", "Secret").await.unwrap();
    assert!(t.store.login_parent("a@x.com", "secret").await.is_err());
    assert!(t.store.login_parent("a@x.com", "Secret ").await.is_err());
    assert!(t.store.login_parent("a@x.com", "Secret").await.is_ok());
}

#[tokio::test]
async fn long_passwords_compare_in_full() {
    let t = TestStore::new();
    let base = "p".repeat(100);
    t.store.register_parent("a@x.com", &format!("{base}1")).await.unwrap();
    assert!(t.store.login_parent("a@x.com", &format!("{base}2")).await.is_err());
    assert!(t.store.login_parent("a@x.com", &format!("{base}1")).await.is_ok());
}

#[tokio::test]
async fn legacy_plaintext_records_still_log_in() {
    let t = TestStore::new();
    std::fs::write(
        &t.path,
        r#"{
            "parents": {"a@x.com": {"password": "pw1", "family_key": "ABCD1234"}},
            "children": {"b@x.com": {"password": "pw2", "family_key": "ABCD1234"}},
            "usage": {},
            "heartbeat": {}
        }"#,
    )
    .unwrap();
    assert_eq!(
        t.store.login_parent("a@x.com", "pw1").await.unwrap(),
        FamilyKey::from("ABCD1234")
    );
    assert_eq!(
        t.store.login_child("b@x.com", "pw2").await.unwrap(),
        FamilyKey::from("ABCD1234")
    );
    assert!(t.store.login_child("b@x.com", "pw1").await.is_err());
}

#[tokio::test]
async fn child_registration_does_not_check_the_family_key() {
    let t = TestStore::new();
    let key = FamilyKey::from("NOPARENT");
    t.store.register_child("b@x.com", "pw2", &key).await.unwrap();
    assert_eq!(t.store.login_child("b@x.com", "pw2").await.unwrap(), key);
}

#[tokio::test]
async fn child_login_returns_the_stored_key() {
    let t = TestStore::new();
    let stored = FamilyKey::from("K1");
    t.store.register_child("b@x.com", "pw2", &stored).await.unwrap();

    let err = t
        .store
        .login_returning_child("b@x.com", "pw2", &FamilyKey::from("K2"))
        .await
        .unwrap_err();
    match err {
        IdentityError::FamilyKeyMismatch { stored: s } => assert_eq!(s, stored),
        other => panic!("unexpected error {other:?}"),
    }
    // Mismatch leaves the link untouched.
    assert_eq!(t.store.login_child("b@x.com", "pw2").await.unwrap(), stored);
    assert_eq!(
        t.store
            .login_returning_child("b@x.com", "pw2", &stored)
            .await
            .unwrap(),
        stored
    );
}

#[tokio::test]
async fn re_registering_a_child_relinks_it() {
    let t = TestStore::new();
    t.store
        .register_child("b@x.com", "pw2", &FamilyKey::from("K1"))
        .await
        .unwrap();
    t.store
        .register_child("b@x.com", "pw3", &FamilyKey::from("K2"))
        .await
        .unwrap();
    assert!(t.store.login_child("b@x.com", "pw2").await.is_err());
    assert_eq!(
        t.store.login_child("b@x.com", "pw3").await.unwrap(),
        FamilyKey::from("K2")
    );
}

#[tokio::test]
async fn record_usage_replaces_snapshot_and_heartbeat_together() {
    let t = TestStore::new();
    let before = Utc::now();
    t.store
        .record_usage("b@x.com", BTreeMap::from([("old.app".to_string(), 10)]))
        .await
        .unwrap();
    let snapshot = BTreeMap::from([("com.app.one".to_string(), 120)]);
    let written = t.store.record_usage("b@x.com", snapshot.clone()).await.unwrap();
    assert!(written.persisted);

    let doc = t.store.load();
    assert_eq!(doc.usage["b@x.com"], snapshot, "no history is kept");
    assert_eq!(doc.heartbeat["b@x.com"], written.heartbeat);
    let at = status::parse_heartbeat(&written.heartbeat).unwrap();
    assert!(at >= before - Duration::seconds(1));
    assert!(at <= Utc::now());
}

#[tokio::test]
async fn usage_for_unregistered_emails_is_accepted() {
    let t = TestStore::new();
    t.store
        .record_usage("ghost@x.com", BTreeMap::from([("app".to_string(), -3)]))
        .await
        .unwrap();
    let doc = t.store.load();
    assert_eq!(doc.usage["ghost@x.com"]["app"], -3);
    assert!(doc.children.is_empty());
}

#[tokio::test]
async fn query_is_scoped_to_the_family_key() {
    let t = TestStore::new();
    let k1 = t.store.register_parent("a@x.com", "pw1").await.unwrap();
    let k2 = t.store.register_parent("z@x.com", "pw9").await.unwrap();
    t.store.register_child("c1@x.com", "pw", &k1).await.unwrap();
    t.store.register_child("c2@x.com", "pw", &k2).await.unwrap();
    t.store.register_child("c3@x.com", "pw", &k1).await.unwrap();
    t.store
        .record_usage("c1@x.com", BTreeMap::from([("a".to_string(), 1)]))
        .await
        .unwrap();

    let result = t.store.query_usage_for_family(&k1).await.unwrap();
    assert_eq!(
        result.keys().cloned().collect::<Vec<_>>(),
        vec!["c1@x.com".to_string(), "c3@x.com".to_string()]
    );
    assert_eq!(result["c1@x.com"].usage["a"], 1);
    assert!(result["c1@x.com"].heartbeat.is_some());
    // Never reported: empty usage and no heartbeat.
    assert!(result["c3@x.com"].usage.is_empty());
    assert_eq!(result["c3@x.com"].heartbeat, None);

    let other = t.store.query_usage_for_family(&k2).await.unwrap();
    assert!(other.contains_key("c2@x.com"));
    assert!(!other.contains_key("c1@x.com"));
}

#[tokio::test]
async fn child_status_follows_the_heartbeat() {
    let t = TestStore::new();
    assert_eq!(
        t.store.child_status("b@x.com").await.unwrap(),
        Liveness::NoHeartbeat
    );
    t.store
        .update(|doc| {
            let old = status::format_heartbeat(Utc::now() - Duration::minutes(31));
            doc.heartbeat.insert("b@x.com".into(), old);
        })
        .await
        .unwrap();
    assert_eq!(t.store.child_status("b@x.com").await.unwrap(), Liveness::Stale);
    t.store
        .record_usage("b@x.com", BTreeMap::from([("a".to_string(), 1)]))
        .await
        .unwrap();
    assert_eq!(t.store.child_status("b@x.com").await.unwrap(), Liveness::Ok);
}

#[tokio::test]
async fn end_to_end_parent_sees_child_usage() {
    let t = TestStore::new();
    let k1 = t.store.register_parent("a@x.com", "pw1").await.unwrap();
    t.store.register_child("b@x.com", "pw2", &k1).await.unwrap();
    t.store
        .record_usage("b@x.com", BTreeMap::from([("com.app.one".to_string(), 120)]))
        .await
        .unwrap();

    let key = t.store.login_parent("a@x.com", "pw1").await.unwrap();
    assert_eq!(key, k1);
    let result = t.store.query_usage_for_family(&key).await.unwrap();
    assert_eq!(result.len(), 1);
    let child = &result["b@x.com"];
    assert_eq!(child.usage, BTreeMap::from([("com.app.one".to_string(), 120)]));
    assert_eq!(
        status::status_now(child.heartbeat.as_deref()),
        Liveness::Ok
    );
}
