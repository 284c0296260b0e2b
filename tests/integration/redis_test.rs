//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis 存储集成测试，Redis 不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{
    is_redis_available, redis_config, setup_logging, unique_name, Member, MemberDb,
};
use rowcache::error::CacheError;
use rowcache::store::{CacheStore, RedisStore};
use rowcache::{CacheOptions, CachedConn, NOT_FOUND_PLACEHOLDER};
use std::sync::Arc;
use std::time::Duration;

async fn redis_store() -> Option<Arc<RedisStore>> {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过测试: Redis不可用");
        return None;
    }
    Some(Arc::new(
        RedisStore::connect(&redis_config())
            .await
            .expect("redis connect"),
    ))
}

#[tokio::test]
async fn test_redis_store_primitives() {
    let Some(store) = redis_store().await else {
        return;
    };
    let prefix = unique_name("redis_primitives");
    let a = format!("{}:a", prefix);
    let b = format!("{}:b", prefix);

    assert_eq!(store.get(&a).await.unwrap(), None);
    assert_eq!(store.ttl(&a).await.unwrap(), None);

    store.set(&a, b"hello", Duration::from_secs(30)).await.unwrap();
    store.set(&b, b"world", Duration::from_millis(1500)).await.unwrap();
    assert_eq!(store.get(&a).await.unwrap().as_deref(), Some(&b"hello"[..]));

    let ttl = store.ttl(&b).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_millis(1500));

    store.del(&[a.clone(), b.clone()]).await.unwrap();
    assert_eq!(store.get(&a).await.unwrap(), None);
    assert_eq!(store.get(&b).await.unwrap(), None);
    store.del(&[]).await.unwrap();
}

#[tokio::test]
async fn test_redis_read_through_and_placeholder() {
    let Some(store) = redis_store().await else {
        return;
    };
    let name = unique_name("redis_read_through");
    let key_of = |id: i64| format!("{}:member:{}", name, id);

    let db = MemberDb::new();
    db.insert(Member::new(52, "157tete"));
    let conn = CachedConn::builder(db.clone(), store.clone())
        .name(name.clone())
        .options(CacheOptions::default().with_expiry(Duration::from_secs(60)))
        .build()
        .unwrap();

    let key = key_of(52);
    let member: Member = conn
        .query_row(&key, |db| async move { db.find(52).await })
        .await
        .unwrap();
    assert_eq!(member.name, "157tete");
    let member: Member = conn
        .query_row(&key, |db| async move { db.find(52).await })
        .await
        .unwrap();
    assert_eq!(member.name, "157tete");
    assert_eq!(db.selects(), 1);
    let ttl = store.ttl(&key).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(63) && ttl >= Duration::from_secs(55));

    let missing = key_of(404);
    let res: rowcache::Result<Member> = conn
        .query_row(&missing, |db| async move { db.find(404).await })
        .await;
    assert!(matches!(res, Err(CacheError::NotFound)));
    assert_eq!(
        store.get(&missing).await.unwrap().as_deref(),
        Some(NOT_FOUND_PLACEHOLDER)
    );

    conn.exec(
        |db| async move { db.update_name(52, "update-name").await },
        &[key.clone(), missing.clone()],
    )
    .await
    .unwrap();
    assert_eq!(store.get(&key).await.unwrap(), None);
    assert_eq!(store.get(&missing).await.unwrap(), None);
}
