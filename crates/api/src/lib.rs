//! # `fintrack-api` - HTTP API 网关
//!
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 校验日期与代码参数，格式错误在抓取之前返回 400
//! - 对受保护接口执行 HTTP Basic 鉴权
//! - 调用下层 `ReportManager` 完成抓取与报表投递
//! - 将领域模型转换为 DTO 返回给调用方

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;
