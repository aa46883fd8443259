use axum::Json;
use axum::extract::State;
use fintrack_core::market::catalog;

use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, CatalogResponse, RouteInfo, StatusResponse};

/// 列出支持的指数与股票代码
#[utoipa::path(
    get,
    path = "/api/v1/catalog",
    tag = "目录 (Catalog)",
    responses(
        (status = 200, description = "代码目录", body = ApiResponse<CatalogResponse>),
        (status = 401, description = "未认证", body = ApiErrorResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn get_catalog(State(state): State<AppState>) -> Json<ApiResponse<CatalogResponse>> {
    let target_indices = catalog::index_symbols();
    let all_symbols = catalog::extended_symbols();
    Json(ApiResponse::ok(CatalogResponse {
        total_indices: target_indices.len(),
        total_symbols: all_symbols.len(),
        target_indices,
        all_symbols,
        api_provider: state.reports.provider_name().to_string(),
        daily_free_calls: state.reports.daily_call_limit(),
    }))
}

/// 数据源路由状态
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "目录 (Catalog)",
    responses(
        (status = 200, description = "数据源状态", body = ApiResponse<StatusResponse>),
        (status = 401, description = "未认证", body = ApiErrorResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let index_routes = catalog::index_symbols()
        .into_iter()
        .map(|symbol| RouteInfo {
            provider: state.reports.provider_for(&symbol),
            symbol,
        })
        .collect();

    Json(ApiResponse::ok(StatusResponse {
        timestamp: state.reports.clock().now().to_rfc3339(),
        provider: state.reports.provider_name().to_string(),
        daily_call_limit: state.reports.daily_call_limit(),
        index_routes,
        total_symbols: catalog::extended_symbols().len(),
    }))
}
