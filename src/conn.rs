//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了带缓存的数据库连接：读穿透（read-through）与写后失效（write-invalidate）。

use crate::cache::CacheLayer;
use crate::config::{CacheOptions, Config};
use crate::database;
use crate::error::{CacheError, Result};
use crate::flight::SingleFlight;
use crate::jitter::Jitter;
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{JsonSerializer, Serializer, SerializerEnum};
use crate::store::{CacheStore, RedisStore};
use sea_orm::{DatabaseConnection, DbErr};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// 判断一个错误是否表示“记录不存在”
pub type NotFoundFn = Arc<dyn Fn(&CacheError) -> bool + Send + Sync>;

/// 默认的“不存在”判定：`NotFound` 或 sea-orm 的 `RecordNotFound`
pub fn default_not_found(e: &CacheError) -> bool {
    match e {
        CacheError::NotFound => true,
        CacheError::Database(db) => matches!(**db, DbErr::RecordNotFound(_)),
        _ => false,
    }
}

/// 带缓存的数据库连接
///
/// 构造后配置不可变，可以克隆后在任意多个任务间共享；克隆共享同一个单飞实例。
///
/// * [`query_row`](Self::query_row) 先查缓存，未命中时回源并回填，数据库确认不存在时写入空值占位符。
///   同一个键上的并发回源只会执行一次。
/// * [`exec`](Self::exec) 先执行写操作，成功后删除调用者声明的受影响键。
pub struct CachedConn<D> {
    name: String,
    db: D,
    cache: CacheLayer,
    flight: Arc<SingleFlight<Vec<u8>>>,
    options: CacheOptions,
    fallback_on_cache_error: bool,
    not_found: NotFoundFn,
}

impl<D: Clone> Clone for CachedConn<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            db: self.db.clone(),
            cache: self.cache.clone(),
            flight: self.flight.clone(),
            options: self.options,
            fallback_on_cache_error: self.fallback_on_cache_error,
            not_found: self.not_found.clone(),
        }
    }
}

impl<D> std::fmt::Debug for CachedConn<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedConn")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("fallback_on_cache_error", &self.fallback_on_cache_error)
            .field("flight", &self.flight)
            .finish()
    }
}

/// [`CachedConn`] 构建器
pub struct CachedConnBuilder<D> {
    db: D,
    store: Arc<dyn CacheStore>,
    name: String,
    options: CacheOptions,
    serializer: SerializerEnum,
    fallback_on_cache_error: bool,
    not_found: NotFoundFn,
}

impl<D> CachedConnBuilder<D> {
    /// 连接名称，用于日志和指标
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    pub fn serializer(mut self, serializer: SerializerEnum) -> Self {
        self.serializer = serializer;
        self
    }

    /// 读路径上缓存存储出错时是否回源（默认回源）。关闭后直接把缓存错误返回给调用者
    pub fn fallback_on_cache_error(mut self, enabled: bool) -> Self {
        self.fallback_on_cache_error = enabled;
        self
    }

    /// 注入后端数据库的“不存在”判定
    pub fn not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheError) -> bool + Send + Sync + 'static,
    {
        self.not_found = Arc::new(f);
        self
    }

    pub fn build(self) -> Result<CachedConn<D>> {
        self.options.validate()?;
        let jitter = Jitter::new(self.options.deviation)?;
        let cache = CacheLayer::new(
            self.name.clone(),
            self.store,
            self.serializer,
            jitter,
            self.options.expiry,
            self.options.not_found_expiry,
        );
        Ok(CachedConn {
            name: self.name,
            db: self.db,
            cache,
            flight: Arc::new(SingleFlight::new()),
            options: self.options,
            fallback_on_cache_error: self.fallback_on_cache_error,
            not_found: self.not_found,
        })
    }
}

impl CachedConn<DatabaseConnection> {
    /// 根据配置连接数据库和Redis
    #[instrument(skip(config), level = "info", fields(name = %config.cache.name))]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(CacheError::Configuration)?;
        let db_config = config.database.as_ref().ok_or_else(|| {
            CacheError::Configuration("database configuration is missing".to_string())
        })?;
        let db = database::connect(db_config).await?;
        let store = RedisStore::connect(&config.redis).await?;
        let serializer = if config.cache.compress {
            JsonSerializer::with_compression()
        } else {
            JsonSerializer::new()
        };
        info!("Cached connection {} ready", config.cache.name);
        CachedConn::builder(db, Arc::new(store))
            .name(config.cache.name.clone())
            .options(CacheOptions::from(&config.cache))
            .serializer(SerializerEnum::Json(serializer))
            .build()
    }
}

impl<D> CachedConn<D>
where
    D: Clone + Send + Sync,
{
    pub fn builder(db: D, store: Arc<dyn CacheStore>) -> CachedConnBuilder<D> {
        CachedConnBuilder {
            db,
            store,
            name: "default".to_string(),
            options: CacheOptions::default(),
            serializer: SerializerEnum::default(),
            fallback_on_cache_error: true,
            not_found: Arc::new(default_not_found),
        }
    }

    /// 使用默认选项创建
    pub fn new(db: D, store: Arc<dyn CacheStore>) -> Result<Self> {
        Self::builder(db, store).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// 底层数据库句柄
    pub fn db(&self) -> &D {
        &self.db
    }

    /// 执行写操作并删除受影响的缓存键
    ///
    /// 写操作失败时不触碰缓存。写成功但删除失败时返回删除错误：
    /// 数据已经提交，缓存会在过期或下次成功失效前保持旧值，调用者可以自行重试失效。
    /// 删除失败（包括命令超时）统一报告为 `CacheUnavailable`。
    #[instrument(skip(self, exec, keys), level = "debug", fields(name = %self.name, keys = ?keys))]
    pub async fn exec<R, F, Fut>(&self, exec: F, keys: &[String]) -> Result<R>
    where
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let result = exec(self.db.clone()).await?;

        if let Err(e) = self.cache.del(keys).await {
            warn!(
                "Write committed but invalidation of {:?} failed: {}",
                keys, e
            );
            GLOBAL_METRICS.record_request(&self.name, "exec", "invalidate_failed");
            return Err(e);
        }
        GLOBAL_METRICS.record_request(&self.name, "exec", "invalidate");
        Ok(result)
    }

    /// 执行写操作，不做任何缓存失效
    pub async fn exec_no_cache<R, F, Fut>(&self, exec: F) -> Result<R>
    where
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        exec(self.db.clone()).await
    }

    /// 读穿透查询单行
    ///
    /// `query` 返回 `Ok(None)` 或被“不存在”判定识别的错误时，写入空值占位符并返回 `NotFound`。
    /// 同一键上的并发调用共享一次执行，每个调用者从共享的序列化结果中解码出自己的值。
    ///
    /// 缓存读取本身出错（不可用或超时）时，默认记录告警并继续查询数据库，
    /// 而不是把缓存错误返回给调用者；需要严格行为时用
    /// [`fallback_on_cache_error(false)`](CachedConnBuilder::fallback_on_cache_error) 关闭。
    #[instrument(skip(self, query), level = "debug", fields(name = %self.name))]
    pub async fn query_row<T, F, Fut>(&self, key: &str, query: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        let (outcome, shared) = self
            .flight
            .work(key, || async {
                match self.options.query_timeout {
                    Some(limit) => tokio::time::timeout(limit, self.load(key, query))
                        .await
                        .unwrap_or_else(|_| {
                            Err(CacheError::Timeout(format!(
                                "query for {} exceeded {:?}",
                                key, limit
                            )))
                        }),
                    None => self.load(key, query).await,
                }
            })
            .await;

        if shared {
            GLOBAL_METRICS.record_request(&self.name, "query_row", "shared");
        }
        GLOBAL_METRICS.record_duration(&self.name, "query_row", start.elapsed().as_secs_f64());

        let data = outcome?;
        self.cache.serializer().deserialize(&data)
    }

    /// 直接查询数据库，绕过缓存
    pub async fn query_row_no_cache<T, F, Fut>(&self, query: F) -> Result<T>
    where
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        query(self.db.clone()).await?.ok_or(CacheError::NotFound)
    }

    /// 领导者执行的计算：查缓存，未命中时回源
    async fn load<T, F, Fut>(&self, key: &str, query: F) -> Result<Vec<u8>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.cache.get::<T>(key).await {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                GLOBAL_METRICS.record_request(&self.name, "query_row", "hit");
                return self.cache.serializer().serialize(&value);
            }
            Err(CacheError::Placeholder) => {
                debug!("Cache placeholder hit: {}", key);
                GLOBAL_METRICS.record_request(&self.name, "query_row", "placeholder");
                return Err(CacheError::NotFound);
            }
            Err(CacheError::NotFound) => {
                debug!("Cache miss: {}", key);
                GLOBAL_METRICS.record_request(&self.name, "query_row", "miss");
            }
            Err(e) if self.fallback_on_cache_error => {
                warn!("Cache read failed for {}, falling back to database: {}", key, e);
                GLOBAL_METRICS.record_request(&self.name, "query_row", "cache_error");
            }
            Err(e) => return Err(e),
        }

        GLOBAL_METRICS.record_request(&self.name, "query_row", "db_query");
        let row = match query(self.db.clone()).await {
            Ok(row) => row,
            Err(e) if (self.not_found)(&e) => None,
            Err(e) => return Err(e),
        };

        match row {
            Some(value) => {
                let data = self.cache.serializer().serialize(&value)?;
                // 回填失败只影响下次命中率
                if let Err(e) = self
                    .cache
                    .set_raw(key, &data, self.options.expiry)
                    .await
                {
                    warn!("Failed to populate cache for {}: {}", key, e);
                }
                Ok(data)
            }
            None => {
                GLOBAL_METRICS.record_request(&self.name, "query_row", "db_not_found");
                if let Err(e) = self.cache.set_placeholder(key).await {
                    warn!("Failed to write placeholder for {}: {}", key, e);
                }
                Err(CacheError::NotFound)
            }
        }
    }

    /// 读取缓存值
    pub async fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.cache.get(key).await
    }

    /// 以默认过期时间写入缓存
    pub async fn set_cache<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.cache.set(key, value).await
    }

    /// 以指定过期时间写入缓存
    pub async fn set_cache_with_expire<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiry: Duration,
    ) -> Result<()> {
        self.cache.set_with_expire(key, value, expiry).await
    }

    /// 删除缓存键
    pub async fn del_cache(&self, keys: &[String]) -> Result<()> {
        self.cache.del(keys).await
    }
}
