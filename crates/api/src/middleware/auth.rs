//! # 鉴权中间件
//!
//! 提供基于 HTTP Basic 的身份验证。

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ApiError;
use crate::server::AppState;

/// 允许访问受保护接口的唯一账号。
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// 比对 `Authorization` 头的值。
    pub fn matches(&self, header: &str) -> Result<(), ApiError> {
        let (user, pass) = decode_basic(header)?;
        let user_ok = constant_time_eq(user.as_bytes(), self.username.as_bytes());
        let pass_ok = constant_time_eq(pass.as_bytes(), self.password.as_bytes());
        if user_ok & pass_ok {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Invalid credentials".into()))
        }
    }
}

/// 等长时逐字节比较全部内容，耗时与首个差异位置无关。
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 解析 `Basic <base64(user:pass)>`。
pub fn decode_basic(header: &str) -> Result<(String, String), ApiError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Basic format".into()))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid Basic encoding".into()))?;
    let pair = String::from_utf8(decoded)
        .map_err(|_| ApiError::Unauthorized("Invalid Basic encoding".into()))?;
    let (user, pass) = pair
        .split_once(':')
        .ok_or_else(|| ApiError::Unauthorized("Invalid Basic credentials".into()))?;
    Ok((user.to_string(), pass.to_string()))
}

/// 提取并验证 Authorization: Basic <credentials>
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid auth header".into()))?,
        None => {
            tracing::warn!("Missing Authorization header for {}", req.uri().path());
            return Err(ApiError::Unauthorized("Missing Authorization header".into()));
        }
    };

    if let Err(e) = state.credentials.matches(header) {
        tracing::warn!("Basic auth rejected for {}: {}", req.uri().path(), e);
        return Err(e);
    }

    Ok(next.run(req).await)
}
