//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志初始化。

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 安装全局 fmt 日志订阅者，只生效一次
///
/// `RUST_LOG` 存在时优先使用，否则使用 `default_filter`。
/// 已经有其他全局订阅者时静默跳过。
pub fn init_logging(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(filter)
            .try_init()
            .ok();
    });
}
