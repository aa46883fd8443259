use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use fintrack_core::common::{format_date, parse_trade_date};
use fintrack_core::market::catalog::{is_valid_symbol, parse_symbol_list};
use fintrack_core::market::entity::BatchResult;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, BatchResponse, NoDataResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SymbolsQuery {
    pub symbols: Option<String>,
    pub date: Option<String>,
}

/// 解析可选日期参数，缺省为服务端当日。
///
/// 必须在任何抓取动作之前调用。
pub(crate) fn resolve_date(state: &AppState, raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Ok(parse_trade_date(raw)?),
        None => Ok(state.reports.clock().today()),
    }
}

/// 拒绝含有非法字符的代码，必须在任何抓取动作之前调用。
pub(crate) fn validate_symbols(symbols: &[String]) -> Result<(), ApiError> {
    match symbols.iter().find(|s| !is_valid_symbol(s)) {
        Some(bad) => Err(ApiError::BadRequest(format!(
            "Invalid symbol '{}'. Use letters, digits and . _ = ^ : -",
            bad
        ))),
        None => Ok(()),
    }
}

/// 解析逗号分隔的代码列表，空列表视为参数错误。
pub(crate) fn require_symbols(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let symbols = raw.map(parse_symbol_list).unwrap_or_default();
    if symbols.is_empty() {
        return Err(ApiError::BadRequest(
            "Query parameter 'symbols' must list at least one symbol".into(),
        ));
    }
    validate_symbols(&symbols)?;
    Ok(symbols)
}

// 零成功记录映射为 404
fn into_response(
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    batch: BatchResult,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    if batch.results.is_empty() {
        return Err(ApiError::NoData(batch.failures));
    }
    let dates = dates.into_iter().map(format_date).collect();
    Ok(Json(ApiResponse::ok(BatchResponse::new(symbols, dates, batch))))
}

/// 查询单个代码在指定日期的价格
#[utoipa::path(
    get,
    path = "/api/v1/stocks/{symbol}",
    tag = "行情 (Stocks)",
    params(
        ("symbol" = String, Path, description = "代码，如 SPX 或 AAPL"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD，缺省为当日")
    ),
    responses(
        (status = 200, description = "抓取成功", body = ApiResponse<BatchResponse>),
        (status = 400, description = "日期或代码格式错误", body = ApiErrorResponse),
        (status = 401, description = "未认证", body = ApiErrorResponse),
        (status = 404, description = "无数据", body = NoDataResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let date = resolve_date(&state, query.date.as_deref())?;
    let symbol = symbol.trim().to_uppercase();
    validate_symbols(std::slice::from_ref(&symbol))?;

    let batch = state.reports.fetch_symbol(&symbol, date).await;
    into_response(vec![symbol], vec![date], batch)
}

/// 批量查询多个代码在同一日期的价格
#[utoipa::path(
    get,
    path = "/api/v1/stocks",
    tag = "行情 (Stocks)",
    params(
        ("symbols" = String, Query, description = "逗号分隔的代码列表"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD，缺省为当日")
    ),
    responses(
        (status = 200, description = "至少一条成功", body = ApiResponse<BatchResponse>),
        (status = 400, description = "参数错误", body = ApiErrorResponse),
        (status = 401, description = "未认证", body = ApiErrorResponse),
        (status = 404, description = "无数据", body = NoDataResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn get_stocks(
    State(state): State<AppState>,
    Query(query): Query<SymbolsQuery>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let date = resolve_date(&state, query.date.as_deref())?;
    let symbols = require_symbols(query.symbols.as_deref())?;

    let batch = state.reports.fetch_symbols(&symbols, date).await;
    tracing::info!(
        "Batch for {} symbols on {}: {} ok, {} failed",
        symbols.len(),
        date,
        batch.results.len(),
        batch.failures.len()
    );
    into_response(symbols, vec![date], batch)
}

/// 查询本周 (周一至周五) 的价格
#[utoipa::path(
    get,
    path = "/api/v1/stocks/weekly",
    tag = "行情 (Stocks)",
    params(
        ("symbols" = String, Query, description = "逗号分隔的代码列表")
    ),
    responses(
        (status = 200, description = "至少一条成功", body = ApiResponse<BatchResponse>),
        (status = 400, description = "参数错误", body = ApiErrorResponse),
        (status = 401, description = "未认证", body = ApiErrorResponse),
        (status = 404, description = "无数据", body = NoDataResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn get_weekly(
    State(state): State<AppState>,
    Query(query): Query<SymbolsQuery>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let symbols = require_symbols(query.symbols.as_deref())?;
    let dates = fintrack_core::common::week_dates(state.reports.clock().today());

    let batch = state.reports.fetch_week(&symbols).await;
    into_response(symbols, dates, batch)
}
