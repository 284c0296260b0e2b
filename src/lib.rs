//! rowcache - 数据库行缓存
//!
//! 位于应用和关系型数据库之间的读穿透、写后失效缓存层，底层使用键值存储（Redis）。
//! 提供空值占位符防穿透、单飞合并防击穿以及过期时间抖动防雪崩。
//!
//! ```ignore
//! let conn = CachedConn::from_config(&Config::from_file("rowcache.toml")?).await?;
//!
//! let member: Member = conn
//!     .query_row("member:52", |db| async move {
//!         Ok(member::Entity::find_by_id(52).one(&db).await?)
//!     })
//!     .await?;
//! ```

#![doc(html_root_url = "https://docs.rs/rowcache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use tokio;

pub mod cache;
pub mod cli;
pub mod config;
pub mod conn;
pub mod database;
pub mod error;
pub mod flight;
pub mod jitter;
pub mod metrics;
pub mod serialization;
pub mod store;
pub mod telemetry;

// Re-export commonly used items
pub use cache::NOT_FOUND_PLACEHOLDER;
pub use config::{CacheOptions, Config};
pub use conn::{default_not_found, CachedConn, CachedConnBuilder};
pub use error::{CacheError, Result};
pub use store::{CacheStore, MemoryStore, RedisStore};

/// rowcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
