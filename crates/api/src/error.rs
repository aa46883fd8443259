//! # API 统一错误处理
//!
//! 将下层各 crate 的错误类型统一映射到 HTTP 状态码与 JSON 响应体。

use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use fintrack_core::common::DateError;
use fintrack_core::market::entity::{BatchOutcome, FailureEntry};
use fintrack_manager::ManagerError;
use thiserror::Error;

use crate::types::{ApiErrorResponse, NoDataResponse};

/// Basic 鉴权质询头
const BASIC_CHALLENGE: &str = "Basic realm=\"Restricted\"";

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 认证失败 (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 批次没有任何成功记录 (404)
    #[error("No data found for the requested symbols")]
    NoData(Vec<FailureEntry>),

    /// 请求参数错误 (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 报表生成或投递失败 (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => {
                let mut resp = (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiErrorResponse::from_msg(msg)),
                )
                    .into_response();
                resp.headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
                resp
            }
            ApiError::NoData(errors) => {
                let body = NoDataResponse {
                    success: false,
                    outcome: BatchOutcome::NotFound,
                    error: "No data found for the requested symbols".to_string(),
                    errors,
                };
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ApiErrorResponse::from_msg(msg))).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse::from_msg(msg)),
                )
                    .into_response()
            }
        }
    }
}

/// 从 `ManagerError` 转换
impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::NoData { failures } => ApiError::NoData(failures),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 日期格式错误一律视为客户端错误
impl From<DateError> for ApiError {
    fn from(err: DateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
