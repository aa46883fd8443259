//! # `fintrack-core` - 领域内核
//!
//! 定义行情抓取、报表生成与通知投递所需的实体、端口 (Trait) 与错误类型。
//! 本 crate 不包含任何网络或 IO 实现，具体适配器由 `feed`、`report`、
//! `notify` 等 crate 提供，并由 `app` 在启动时注入。

pub mod common;
pub mod config;
pub mod market;
pub mod notify;
pub mod report;

#[cfg(feature = "test-utils")]
pub mod test_utils;
