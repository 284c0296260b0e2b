//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键值缓存存储的接口及其实现（Redis 与进程内存）。

pub mod memory;
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// 键值缓存存储
///
/// 只需要 GET、带过期时间的 SET 和 DEL；淘汰完全交给存储自身的过期机制。
/// 实现内部负责连接获取和命令超时，失败时返回 `CacheUnavailable` 或 `Timeout`。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取原始字节，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入原始字节并设置过期时间
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// 删除零个或多个键
    async fn del(&self, keys: &[String]) -> Result<()>;

    /// 剩余生存时间，键不存在或未设置过期时返回 `None`
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// 检查存储是否可达
    async fn ping(&self) -> Result<()>;
}
