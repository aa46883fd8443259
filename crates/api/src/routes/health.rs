use axum::Json;
use axum::extract::State;

use crate::server::AppState;
use crate::types::HealthResponse;

/// 健康检查
///
/// 不访问任何数据源，仅返回服务时间与版本。
#[utoipa::path(
    get,
    path = "/health",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "服务正常", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: state.reports.clock().now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
