//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了过期时间抖动生成器，避免大量缓存项在同一时刻过期。

use crate::error::{CacheError, Result};
use rand::Rng;
use std::time::Duration;

/// 默认抖动幅度，过期时间落在 [0.95, 1.05] * 标称值
pub const DEFAULT_EXPIRY_DEVIATION: f64 = 0.05;

/// 过期时间抖动器
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    deviation: f64,
}

impl Jitter {
    /// 创建新的抖动器
    ///
    /// # 参数
    ///
    /// * `deviation` - 抖动幅度，取值范围 [0, 1)
    pub fn new(deviation: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&deviation) {
            return Err(CacheError::Configuration(format!(
                "expiry deviation must be in [0, 1), got {}",
                deviation
            )));
        }
        Ok(Self { deviation })
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    /// 在 `[(1-d)·T, (1+d)·T]` 内均匀取一个时长，每次调用独立采样
    pub fn around(&self, nominal: Duration) -> Duration {
        if self.deviation == 0.0 || nominal.is_zero() {
            return nominal;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.deviation)..=(1.0 + self.deviation));
        // 超出 Duration 表示范围时饱和
        Duration::try_from_secs_f64(nominal.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self {
            deviation: DEFAULT_EXPIRY_DEVIATION,
        }
    }
}
