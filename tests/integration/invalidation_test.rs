//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 写后失效集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{find_member, member_key, memory_conn, unique_name, FlakyStore, Member, MemberDb};
use rowcache::error::CacheError;
use rowcache::metrics::GLOBAL_METRICS;
use rowcache::store::CacheStore;
use rowcache::CachedConn;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_exec_invalidates_all_declared_keys() {
    let db = MemberDb::new();
    db.insert(Member::new(52, "157tete"));
    let name = unique_name("invalidation");
    let (conn, store) = memory_conn(db.clone(), &name);

    find_member(&conn, 52).await.unwrap();
    let phone_key = "member:phone:15700000052".to_string();
    conn.set_cache(&phone_key, &52i64).await.unwrap();

    conn.exec(
        |db| async move { db.update_name(52, "update-name").await },
        &[phone_key.clone(), member_key(52)],
    )
    .await
    .unwrap();

    assert_eq!(store.get(&member_key(52)).await.unwrap(), None);
    assert_eq!(store.get(&phone_key).await.unwrap(), None);
    assert_eq!(GLOBAL_METRICS.get(&name, "exec", "invalidate"), 1);

    assert_eq!(find_member(&conn, 52).await.unwrap().name, "update-name");
    assert_eq!(db.selects(), 2);
}

#[tokio::test]
async fn test_failed_write_leaves_cache_untouched() {
    let db = MemberDb::new();
    db.insert(Member::new(1, "alice"));
    let (conn, store) = memory_conn(db.clone(), &unique_name("invalidation_failed_write"));

    find_member(&conn, 1).await.unwrap();
    db.set_broken(true);
    let res = conn
        .exec(
            |db| async move { db.update_name(1, "never").await },
            &[member_key(1)],
        )
        .await;
    assert!(matches!(res, Err(CacheError::Database(_))));
    assert!(store.get(&member_key(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_invalidation_failure_is_surfaced_after_commit() {
    let db = MemberDb::new();
    db.insert(Member::new(1, "alice"));
    let store = Arc::new(FlakyStore::new());
    let conn = CachedConn::builder(db.clone(), store.clone())
        .name(unique_name("invalidation_del_fails"))
        .build()
        .unwrap();

    find_member(&conn, 1).await.unwrap();
    store.fail_del.store(true, Ordering::SeqCst);

    let res = conn
        .exec(
            |db| async move { db.update_name(1, "bob").await },
            &[member_key(1)],
        )
        .await;
    assert!(matches!(res, Err(CacheError::CacheUnavailable(_))));

    // 写已经提交，缓存仍是旧值
    assert_eq!(find_member(&conn, 1).await.unwrap().name, "alice");
    assert_eq!(
        conn.query_row_no_cache(|db| async move { db.find(1).await })
            .await
            .unwrap()
            .name,
        "bob"
    );

    // 调用者重试失效
    store.fail_del.store(false, Ordering::SeqCst);
    conn.del_cache(&[member_key(1)]).await.unwrap();
    assert_eq!(find_member(&conn, 1).await.unwrap().name, "bob");
}

#[tokio::test]
async fn test_exec_without_keys_does_not_touch_store() {
    let db = MemberDb::new();
    db.insert(Member::new(1, "alice"));
    let store = Arc::new(FlakyStore::new());
    let conn = CachedConn::builder(db, store.clone())
        .name(unique_name("invalidation_no_keys"))
        .build()
        .unwrap();

    let rows = conn
        .exec(|db| async move { db.update_name(1, "bob").await }, &[])
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(store.dels.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exec_no_cache_keeps_cached_value() {
    let db = MemberDb::new();
    db.insert(Member::new(1, "alice"));
    let (conn, store) = memory_conn(db.clone(), &unique_name("invalidation_no_cache"));

    find_member(&conn, 1).await.unwrap();
    conn.exec_no_cache(|db| async move { db.update_name(1, "bob").await })
        .await
        .unwrap();

    assert_eq!(find_member(&conn, 1).await.unwrap().name, "alice");
    conn.set_cache_with_expire(&member_key(1), &Member::new(1, "carol"), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(find_member(&conn, 1).await.unwrap().name, "carol");
    assert!(store.ttl(&member_key(1)).await.unwrap().unwrap() <= Duration::from_millis(5250));
}
