//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的错误类型和处理机制。

use std::sync::Arc;
use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 错误需要在单飞（single-flight）的所有等待者之间共享，因此实现了 `Clone`；
/// 不可克隆的数据库错误以 `Arc` 持有。
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// 行或缓存键不存在
    #[error("Record not found")]
    NotFound,

    /// 缓存中存在空值占位符，表示数据库已确认该记录不存在
    #[error("Negative cache placeholder")]
    Placeholder,

    /// 缓存存储不可用（连接失败或命令出错）
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 数据库错误，原样透传
    #[error("Database error: {0}")]
    Database(Arc<sea_orm::DbErr>),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 正在执行的回源计算被取消
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl CacheError {
    /// 是否为“不存在”类错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_timeout() {
            CacheError::Timeout(e.to_string())
        } else {
            CacheError::CacheUnavailable(e.to_string())
        }
    }
}

impl From<sea_orm::DbErr> for CacheError {
    fn from(e: sea_orm::DbErr) -> Self {
        CacheError::Database(Arc::new(e))
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;
