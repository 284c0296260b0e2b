//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了单飞（single-flight）请求合并器。
//!
//! 同一个键上并发的回源请求只会执行一次，其余调用者等待并共享同一个结果。

use crate::error::{CacheError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, instrument};

type Outcome<T> = Option<Result<T>>;

/// 请求合并器
///
/// 每个 [`CachedConn`](crate::CachedConn) 持有独立的实例，互不干扰。
pub struct SingleFlight<T> {
    /// 正在执行的计算，键为缓存键
    in_flight: DashMap<String, watch::Sender<Outcome<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

enum Role<T> {
    Leader(watch::Sender<Outcome<T>>),
    Follower(watch::Receiver<Outcome<T>>),
}

/// 领导者离开时清理 in-flight 表项；未发布结果就被丢弃时，跟随者会收到 `Cancelled`
struct LeaderGuard<'a, T> {
    flight: &'a SingleFlight<T>,
    key: &'a str,
    tx: watch::Sender<Outcome<T>>,
    published: bool,
}

impl<T> LeaderGuard<'_, T> {
    fn publish(mut self, outcome: Result<T>) {
        // 先移除再发布：之后到达的调用者会成为新的领导者
        self.flight.in_flight.remove(self.key);
        self.published = true;
        self.tx.send_replace(Some(outcome));
    }
}

impl<T> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        // 未发布时表项一定属于自己
        if !self.published {
            self.flight.in_flight.remove(self.key);
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前正在执行的键数量
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// 执行或加入对 `key` 的计算
    ///
    /// # 返回值
    ///
    /// 返回计算结果，以及该结果是否来自其他调用者（跟随者为 `true`）
    #[instrument(skip(self, work), level = "debug")]
    pub async fn work<F, Fut>(&self, key: &str, work: F) -> (Result<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // entry() 持有分片锁，检查与注册是原子的
        let role = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(e) => Role::Follower(e.get().subscribe()),
            Entry::Vacant(e) => {
                let (tx, _) = watch::channel(None);
                e.insert(tx.clone());
                Role::Leader(tx)
            }
        };

        match role {
            Role::Leader(tx) => {
                let guard = LeaderGuard {
                    flight: self,
                    key,
                    tx,
                    published: false,
                };
                let outcome = work().await;
                guard.publish(outcome.clone());
                (outcome, false)
            }
            Role::Follower(mut rx) => {
                debug!("Joining in-flight computation for key: {}", key);
                let outcome = match rx.wait_for(Option::is_some).await {
                    Ok(value) => (*value).clone().unwrap_or_else(|| {
                        Err(CacheError::Cancelled(format!(
                            "in-flight computation for {} produced no result",
                            key
                        )))
                    }),
                    Err(_) => Err(CacheError::Cancelled(format!(
                        "in-flight computation for {} was dropped",
                        key
                    ))),
                };
                (outcome, true)
            }
        }
    }
}
