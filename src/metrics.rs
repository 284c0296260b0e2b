//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存连接的指标收集功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集缓存命中、回源、失效等运行时指标
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "name:op:result"
    pub requests_total: Arc<Mutex<HashMap<String, u64>>>,
    /// 操作耗时（累积时间和计数）
    /// key: "name:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `name` - 缓存连接名称
    /// * `op` - 操作类型（query_row/exec/get）
    /// * `result` - 操作结果（hit/miss/placeholder/db_query/...）
    pub fn record_request(&self, name: &str, op: &str, result: &str) {
        let span = span!(Level::TRACE, "cache_request", name, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}", name, op, result);
        *lock(&self.requests_total).entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, name: &str, op: &str, duration_secs: f64) {
        let key = format!("{}:{}", name, op);
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个计数，不存在时为0
    pub fn get(&self, name: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}", name, op, result);
        lock(&self.requests_total).get(&key).copied().unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 以 Prometheus 文本格式导出，可选按连接名称过滤
pub fn get_metrics_string(name: Option<&str>) -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = lock(&metrics.requests_total);
    let dur = lock(&metrics.operation_duration);

    let mut keys: Vec<_> = reqs.keys().collect();
    keys.sort();

    let mut output = String::new();
    for k in keys {
        let parts: Vec<&str> = k.splitn(3, ':').collect();
        if parts.len() != 3 || name.is_some_and(|n| n != parts[0]) {
            continue;
        }
        output.push_str(&format!(
            "rowcache_requests_total{{name=\"{}\", op=\"{}\", result=\"{}\"}} {}\n",
            parts[0], parts[1], parts[2], reqs[k]
        ));
    }
    for (k, (total, count)) in dur.iter() {
        let parts: Vec<&str> = k.splitn(2, ':').collect();
        if parts.len() != 2 || name.is_some_and(|n| n != parts[0]) {
            continue;
        }
        output.push_str(&format!(
            "rowcache_operation_duration_seconds_sum{{name=\"{}\", op=\"{}\"}} {}\n",
            parts[0], parts[1], total
        ));
        output.push_str(&format!(
            "rowcache_operation_duration_seconds_count{{name=\"{}\", op=\"{}\"}} {}\n",
            parts[0], parts[1], count
        ));
    }
    output
}
