//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存存储实现，支持单机和集群模式。

use super::CacheStore;
use crate::config::{RedisConfig, RedisMode};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, FromRedisValue};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Redis缓存存储
///
/// 单机模式通过 `ConnectionManager` 复用连接并自动重连；
/// 集群模式每次命令从集群客户端获取连接。
#[derive(Clone)]
pub enum RedisStore {
    Standalone {
        manager: ConnectionManager,
        command_timeout: Duration,
    },
    Cluster {
        client: redis::cluster::ClusterClient,
        command_timeout: Duration,
    },
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone { .. } => write!(f, "RedisStore::Standalone"),
            Self::Cluster { .. } => write!(f, "RedisStore::Cluster"),
        }
    }
}

impl RedisStore {
    /// 根据配置连接Redis
    ///
    /// # 参数
    ///
    /// * `config` - Redis配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisStore实例或错误
    #[instrument(skip(config), level = "info", fields(mode = ?config.mode))]
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let connect_timeout = Duration::from_millis(config.connection_timeout_ms);
        let command_timeout = Duration::from_millis(config.command_timeout_ms);
        match config.mode {
            RedisMode::Standalone => {
                let client = Client::open(config.connection_string.expose_secret())?;
                let manager = timeout(connect_timeout, client.get_connection_manager())
                    .await
                    .map_err(|_| {
                        CacheError::CacheUnavailable(format!(
                            "Connection timed out after {}ms",
                            config.connection_timeout_ms
                        ))
                    })??;
                Ok(Self::from_manager(manager, command_timeout))
            }
            RedisMode::Cluster => {
                let cluster = config.cluster.as_ref().ok_or_else(|| {
                    CacheError::Configuration("Cluster configuration is missing".to_string())
                })?;
                let mut builder = redis::cluster::ClusterClient::builder(cluster.nodes.clone());
                if let Some(password) = &config.password {
                    builder = builder.password(password.expose_secret().to_string());
                }
                let client = builder.build()?;

                timeout(connect_timeout, client.get_async_connection())
                    .await
                    .map_err(|_| {
                        CacheError::CacheUnavailable(format!(
                            "Cluster connection timed out after {}ms",
                            config.connection_timeout_ms
                        ))
                    })??;
                Ok(RedisStore::Cluster {
                    client,
                    command_timeout,
                })
            }
        }
    }

    /// 使用已有的连接管理器创建单机存储
    pub fn from_manager(manager: ConnectionManager, command_timeout: Duration) -> Self {
        RedisStore::Standalone {
            manager,
            command_timeout,
        }
    }

    fn command_timeout(&self) -> Duration {
        match self {
            RedisStore::Standalone {
                command_timeout, ..
            } => *command_timeout,
            RedisStore::Cluster {
                command_timeout, ..
            } => *command_timeout,
        }
    }

    /// 执行单条命令，带命令超时
    async fn query<T: FromRedisValue + Send>(&self, cmd: &redis::Cmd) -> Result<T> {
        let fut = async {
            match self {
                RedisStore::Standalone { manager, .. } => {
                    let mut conn = manager.clone();
                    cmd.query_async::<T>(&mut conn).await
                }
                RedisStore::Cluster { client, .. } => {
                    let mut conn = client.get_async_connection().await?;
                    cmd.query_async::<T>(&mut conn).await
                }
            }
        };
        match timeout(self.command_timeout(), fut).await {
            Ok(res) => res.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(format!(
                "Redis command timed out after {}ms",
                self.command_timeout().as_millis()
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // PX 保留抖动的毫秒精度，最小为1毫秒
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        debug!("Setting key: {} with ttl: {}ms", key, ttl_ms);
        self.query::<()>(redis::cmd("SET").arg(key).arg(value).arg("PX").arg(ttl_ms))
            .await
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn del(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        match self {
            RedisStore::Standalone { .. } => {
                self.query::<()>(redis::cmd("DEL").arg(keys)).await
            }
            // 集群模式下多键 DEL 会触发 CROSSSLOT，逐个删除
            RedisStore::Cluster { .. } => {
                for key in keys {
                    self.query::<()>(redis::cmd("DEL").arg(key)).await?;
                }
                Ok(())
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let ttl_ms: i64 = self.query(redis::cmd("PTTL").arg(key)).await?;
        if ttl_ms > 0 {
            Ok(Some(Duration::from_millis(ttl_ms as u64)))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<()> {
        let response: String = self.query(&redis::cmd("PING")).await?;
        debug!("Redis ping response: {}", response);
        Ok(())
    }
}
