//! # 日志初始化

use fintrack_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const LOG_FILE_PREFIX: &str = "fintrack.log";

/// # Summary
/// 初始化全局 tracing 订阅器。
///
/// # Logic
/// 1. `RUST_LOG` 优先，否则使用 `log.level`。
/// 2. 配置了 `log.dir` 时额外写入按天滚动的文件 (无颜色)。
///
/// # Returns
/// 文件写入器的 guard，必须持有到进程结束，否则缓冲日志会丢失。
pub fn init(log: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match log.dir.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}
