//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 后端数据库连接。缓存核心只把它当作不透明句柄传给调用者的闭包。

use crate::config::DatabaseConfig;
use crate::error::{CacheError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

/// 根据配置建立 sea-orm 连接池
#[instrument(skip(config), level = "info")]
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
    let mut opt = ConnectOptions::new(config.url.expose_secret().to_string());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(connect_timeout)
        .acquire_timeout(connect_timeout)
        .sqlx_logging(config.sqlx_logging);

    let connection = timeout(connect_timeout * 2, Database::connect(opt))
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "database connection timed out after {}ms",
                config.connect_timeout_ms
            ))
        })??;
    info!("Database connected: {:?}", connection.get_database_backend());
    Ok(connection)
}

/// 检查数据库是否可达
pub async fn ping(db: &DatabaseConnection) -> Result<()> {
    db.ping().await.map_err(CacheError::from)
}
