//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存连接的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use crate::jitter::DEFAULT_EXPIRY_DEVIATION;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 正向缓存默认过期时间：7天
pub const DEFAULT_EXPIRY_SECS: u64 = 7 * 24 * 3600;
/// 空值占位符默认过期时间：1分钟
pub const DEFAULT_NOT_FOUND_EXPIRY_SECS: u64 = 60;

const MAX_EXPIRY_SECS: u64 = 86400 * 30;

/// 顶层配置，对应一个 TOML 文件
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    /// 后端数据库配置，CLI 的部分命令不需要
    pub database: Option<DatabaseConfig>,
}

/// 缓存行为配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// 连接名称，用于日志和指标标签
    pub name: String,
    /// 正向缓存过期时间（秒）
    pub expiry_secs: u64,
    /// 空值占位符过期时间（秒）
    pub not_found_expiry_secs: u64,
    /// 过期时间抖动幅度
    pub expiry_deviation: f64,
    /// 回源计算的整体超时（毫秒），为空表示不限制
    pub query_timeout_ms: Option<u64>,
    /// 是否压缩缓存负载
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            expiry_secs: DEFAULT_EXPIRY_SECS,
            not_found_expiry_secs: DEFAULT_NOT_FOUND_EXPIRY_SECS,
            expiry_deviation: DEFAULT_EXPIRY_DEVIATION,
            query_timeout_ms: None,
            compress: false,
        }
    }
}

/// Redis模式
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    #[default]
    Standalone,
    Cluster,
}

/// Redis缓存存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// Redis 密码（可选，使用 SecretString 保护）
    pub password: Option<SecretString>,
    /// 集群配置
    pub cluster: Option<ClusterConfig>,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://127.0.0.1:6379".to_string().into()),
            password: None,
            cluster: None,
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
        }
    }
}

/// 集群配置
#[derive(Deserialize, Clone, Debug)]
pub struct ClusterConfig {
    /// 初始节点列表
    pub nodes: Vec<String>,
}

/// 后端数据库配置
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    /// 数据库连接URL，例如 `sqlite::memory:` 或 `mysql://...`
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// 从 TOML 文件加载配置并验证
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析配置并验证
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| CacheError::Configuration(e.to_string()))?;
        config.validate().map_err(CacheError::Configuration)?;
        Ok(config)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        let cache = &self.cache;
        if cache.name.is_empty() {
            return Err("Cache name cannot be empty".to_string());
        }

        if cache.name.len() > 64 {
            return Err(format!(
                "Cache name '{}' exceeds maximum length of 64 characters",
                cache.name
            ));
        }

        if cache.expiry_secs == 0 {
            return Err("expiry_secs cannot be zero".to_string());
        }

        if cache.expiry_secs > MAX_EXPIRY_SECS {
            return Err("expiry_secs cannot exceed 30 days (2592000 seconds)".to_string());
        }

        if cache.not_found_expiry_secs == 0 {
            return Err("not_found_expiry_secs cannot be zero".to_string());
        }

        // 占位符只是防穿透的短期记忆，不能比正常数据活得更久
        if cache.not_found_expiry_secs > cache.expiry_secs {
            return Err(format!(
                "not_found_expiry_secs ({}) must be <= expiry_secs ({})",
                cache.not_found_expiry_secs, cache.expiry_secs
            ));
        }

        if !(0.0..1.0).contains(&cache.expiry_deviation) {
            return Err(format!(
                "expiry_deviation must be in [0, 1), got {}",
                cache.expiry_deviation
            ));
        }

        if let Some(timeout) = cache.query_timeout_ms {
            if !(1..=60000).contains(&timeout) {
                return Err("query_timeout_ms must be between 1 and 60000 ms".to_string());
            }
        }

        let redis = &self.redis;
        if !(100..=30000).contains(&redis.connection_timeout_ms) {
            return Err("redis connection_timeout_ms must be between 100 and 30000 ms".to_string());
        }

        if !(100..=60000).contains(&redis.command_timeout_ms) {
            return Err("redis command_timeout_ms must be between 100 and 60000 ms".to_string());
        }

        if redis.mode == RedisMode::Cluster
            && redis.cluster.as_ref().map_or(true, |c| c.nodes.is_empty())
        {
            return Err("redis cluster mode requires at least one node".to_string());
        }

        if let Some(db) = &self.database {
            if db.max_connections == 0 {
                return Err("database max_connections cannot be zero".to_string());
            }
            if db.min_connections > db.max_connections {
                return Err(format!(
                    "database min_connections ({}) must be <= max_connections ({})",
                    db.min_connections, db.max_connections
                ));
            }
        }

        Ok(())
    }
}

/// 缓存连接的运行时选项，构造后不可变
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheOptions {
    /// 正向缓存过期时间
    pub expiry: Duration,
    /// 空值占位符过期时间
    pub not_found_expiry: Duration,
    /// 过期时间抖动幅度
    pub deviation: f64,
    /// 回源计算整体超时
    pub query_timeout: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(DEFAULT_EXPIRY_SECS),
            not_found_expiry: Duration::from_secs(DEFAULT_NOT_FOUND_EXPIRY_SECS),
            deviation: DEFAULT_EXPIRY_DEVIATION,
            query_timeout: None,
        }
    }
}

impl CacheOptions {
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_not_found_expiry(mut self, expiry: Duration) -> Self {
        self.not_found_expiry = expiry;
        self
    }

    pub fn with_deviation(mut self, deviation: f64) -> Self {
        self.deviation = deviation;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.expiry.is_zero() || self.not_found_expiry.is_zero() {
            return Err(CacheError::Configuration(
                "cache expiries must be non-zero".to_string(),
            ));
        }
        let max_expiry = Duration::from_secs(MAX_EXPIRY_SECS);
        if self.expiry > max_expiry || self.not_found_expiry > max_expiry {
            return Err(CacheError::Configuration(format!(
                "cache expiries cannot exceed {}s",
                MAX_EXPIRY_SECS
            )));
        }
        if matches!(self.query_timeout, Some(t) if t.is_zero()) {
            return Err(CacheError::Configuration(
                "query timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            expiry: Duration::from_secs(config.expiry_secs),
            not_found_expiry: Duration::from_secs(config.not_found_expiry_secs),
            deviation: config.expiry_deviation,
            query_timeout: config.query_timeout_ms.map(Duration::from_millis),
        }
    }
}
