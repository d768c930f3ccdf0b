//! 可观测性模块
//!
//! 提供 tracing 日志的统一初始化和 HTTP 请求追踪中间件。
//! 服务通过单一入口点配置日志级别和输出格式。

pub mod middleware;

use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

/// 初始化 tracing（日志）
///
/// RUST_LOG 环境变量优先于配置文件中的 log_level。
/// 重复初始化返回错误，由调用方决定是否忽略（测试场景常见）。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_returns_error() {
        let config = ObservabilityConfig::default();
        let first = init(&config);
        let second = init(&config);
        // 至少第二次初始化必然失败（全局 subscriber 已存在）
        assert!(first.is_err() || second.is_err());
    }
}
