//! # `fintrack-feed` - 行情数据源客户端
//!
//! 每个模块对应一个上游数据源，均实现 `fintrack_core::market::port::PriceFeed`。

pub mod alpha_vantage;
pub mod fmp;
mod http;
pub mod polygon;
