//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内存缓存存储，用于测试和单机部署。

use super::CacheStore;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// 进程内存缓存存储
///
/// 过期时间基于 `tokio::time::Instant`，测试中可以用暂停的时钟推进。
#[derive(Debug, Default)]
pub struct MemoryStore {
    // 值: (数据, 过期时刻)
    entries: DashMap<String, (Vec<u8>, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前未过期的条目数
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清除所有已过期条目
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expire_at)| *expire_at > now);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if entry.value().1 > now => Some(entry.value().0.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, (_, expire_at)| *expire_at <= now);
            debug!("Memory get: key={}, expired=true, removed", key);
        }
        Ok(value)
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expire_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            CacheError::CacheUnavailable(format!("ttl {:?} for {} is out of range", ttl, key))
        })?;
        self.entries
            .insert(key.to_string(), (value.to_vec(), expire_at));
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn del(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .map(|e| e.value().1)
            .filter(|expire_at| *expire_at > now)
            .map(|expire_at| expire_at - now))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
