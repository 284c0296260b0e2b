//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存原语层：对键值存储的读写删，包括序列化和空值占位符约定。

use crate::error::{CacheError, Result};
use crate::jitter::Jitter;
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{Serializer, SerializerEnum};
use crate::store::CacheStore;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 空值占位符。单个 `*` 不是合法的 JSON，也不会是 gzip 输出，不会与正常负载冲突
pub const NOT_FOUND_PLACEHOLDER: &[u8] = b"*";

/// 缓存原语层
#[derive(Clone)]
pub struct CacheLayer {
    name: String,
    store: Arc<dyn CacheStore>,
    serializer: SerializerEnum,
    jitter: Jitter,
    expiry: Duration,
    not_found_expiry: Duration,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("name", &self.name)
            .field("serializer", &self.serializer)
            .field("jitter", &self.jitter)
            .field("expiry", &self.expiry)
            .field("not_found_expiry", &self.not_found_expiry)
            .finish()
    }
}

impl CacheLayer {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn CacheStore>,
        serializer: SerializerEnum,
        jitter: Jitter,
        expiry: Duration,
        not_found_expiry: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            serializer,
            jitter,
            expiry,
            not_found_expiry,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn serializer(&self) -> &SerializerEnum {
        &self.serializer
    }

    /// 删除零个或多个键
    ///
    /// 没有键时不访问存储。失败不重试。
    #[instrument(skip(self), level = "debug", fields(name = %self.name))]
    pub async fn del(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.store.del(keys).await.map_err(unavailable)
    }

    /// 读取并反序列化缓存值
    ///
    /// # 返回值
    ///
    /// * 键不存在 → `NotFound`
    /// * 键为空值占位符 → `Placeholder`
    /// * 负载无法解码 → 删除该键后返回 `NotFound`，迫使调用者回源
    #[instrument(skip(self), level = "debug", fields(name = %self.name))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let data = match self.store.get(key).await.map_err(unavailable)? {
            Some(data) => data,
            None => return Err(CacheError::NotFound),
        };

        if data == NOT_FOUND_PLACEHOLDER {
            return Err(CacheError::Placeholder);
        }

        match self.serializer.deserialize(&data) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Deleting undecodable cache entry {}: {}", key, e);
                GLOBAL_METRICS.record_request(&self.name, "get", "self_heal");
                // 删除失败不影响结果，条目会在过期后自然消失
                if let Err(del_err) = self.store.del(&[key.to_string()]).await {
                    warn!("Failed to delete undecodable entry {}: {}", key, del_err);
                }
                Err(CacheError::NotFound)
            }
        }
    }

    /// 以默认过期时间写入
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_expire(key, value, self.expiry).await
    }

    /// 以指定的标称过期时间写入，实际过期时间经过抖动
    #[instrument(skip(self, value), level = "debug", fields(name = %self.name))]
    pub async fn set_with_expire<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiry: Duration,
    ) -> Result<()> {
        let data = self.serializer.serialize(value)?;
        self.set_raw(key, &data, expiry).await
    }

    /// 写入已经序列化好的负载
    pub async fn set_raw(&self, key: &str, data: &[u8], expiry: Duration) -> Result<()> {
        let ttl = self.jitter.around(expiry);
        debug!("Caching key: {} for {:?}", key, ttl);
        self.store.set(key, data, ttl).await.map_err(unavailable)
    }

    /// 写入空值占位符，使用独立的较短过期时间
    pub async fn set_placeholder(&self, key: &str) -> Result<()> {
        self.set_raw(key, NOT_FOUND_PLACEHOLDER, self.not_found_expiry)
            .await
    }
}

/// 存储层的任何失败（包括命令超时）在原语层都归为 `CacheUnavailable`
fn unavailable(e: CacheError) -> CacheError {
    match e {
        CacheError::CacheUnavailable(_) => e,
        other => CacheError::CacheUnavailable(other.to_string()),
    }
}
