//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 单飞模式集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{find_member, memory_conn, memory_conn_with, setup_logging, unique_name, Member, MemberDb};
use rowcache::error::CacheError;
use rowcache::metrics::GLOBAL_METRICS;
use rowcache::CacheOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

// 模拟并发请求
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_hit_database_once() {
    setup_logging();
    let db = MemberDb::with_delay(Duration::from_millis(200));
    db.insert(Member::new(7, "hot"));
    let name = unique_name("single_flight");
    let (conn, _store) = memory_conn(db.clone(), &name);
    let conn = Arc::new(conn);

    let concurrency = 50;
    let barrier = Arc::new(Barrier::new(concurrency));
    let mut handles = vec![];
    for _ in 0..concurrency {
        let c = conn.clone();
        let b = barrier.clone();
        handles.push(tokio::spawn(async move {
            b.wait().await;
            find_member(&c, 7).await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        if let Ok(Ok(member)) = handle.await {
            if member.name == "hot" {
                success_count += 1;
            }
        }
    }

    assert_eq!(success_count, concurrency, "All requests should succeed");
    assert_eq!(db.selects(), 1, "exactly one database fallback");
    assert!(GLOBAL_METRICS.get(&name, "query_row", "shared") >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_not_found_hits_database_once() {
    let db = MemberDb::with_delay(Duration::from_millis(100));
    let (conn, _store) = memory_conn(db.clone(), &unique_name("single_flight_nf"));
    let conn = Arc::new(conn);

    let barrier = Arc::new(Barrier::new(10));
    let mut handles = vec![];
    for _ in 0..10 {
        let c = conn.clone();
        let b = barrier.clone();
        handles.push(tokio::spawn(async move {
            b.wait().await;
            find_member(&c, 404).await
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await.unwrap(), Err(CacheError::NotFound)));
    }
    assert_eq!(db.selects(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_are_not_coalesced() {
    let db = MemberDb::with_delay(Duration::from_millis(50));
    for id in 0..5 {
        db.insert(Member::new(id, "m"));
    }
    let (conn, _store) = memory_conn(db.clone(), &unique_name("single_flight_keys"));
    let conn = Arc::new(conn);

    let mut handles = vec![];
    for id in 0..5 {
        let c = conn.clone();
        handles.push(tokio::spawn(async move { find_member(&c, id).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(db.selects(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leader_timeout_is_delivered_to_followers() {
    let db = MemberDb::with_delay(Duration::from_millis(500));
    db.insert(Member::new(8, "slow"));
    let options = CacheOptions::default().with_query_timeout(Duration::from_millis(100));
    let (conn, store) = memory_conn_with(db.clone(), &unique_name("single_flight_timeout"), options);
    let conn = Arc::new(conn);

    let barrier = Arc::new(Barrier::new(5));
    let mut handles = vec![];
    for _ in 0..5 {
        let c = conn.clone();
        let b = barrier.clone();
        handles.push(tokio::spawn(async move {
            b.wait().await;
            find_member(&c, 8).await
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await.unwrap(), Err(CacheError::Timeout(_))));
    }
    assert_eq!(db.selects(), 1);
    assert!(store.is_empty(), "timed out fetch must not populate the cache");
}

#[tokio::test]
async fn test_clones_share_the_coalescer() {
    let db = MemberDb::with_delay(Duration::from_millis(100));
    db.insert(Member::new(9, "shared"));
    let (conn, _store) = memory_conn(db.clone(), &unique_name("single_flight_clone"));
    let other = conn.clone();

    let (a, b) = tokio::join!(find_member(&conn, 9), find_member(&other, 9));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(db.selects(), 1);
}
