use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use fintrack_core::common::{format_date, resolve_report_date};
use fintrack_core::market::catalog::parse_symbol_list;
use fintrack_manager::ReportRequest;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::routes::stocks::{resolve_date, validate_symbols};
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, NoDataResponse, ReportResponse};

const X_PROCESSED_DATE: HeaderName = HeaderName::from_static("x-processed-date");
const X_SERVER_TIME: HeaderName = HeaderName::from_static("x-server-time");
const X_DATE_LOGIC: HeaderName = HeaderName::from_static("x-date-logic");

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExcelReportQuery {
    pub symbols: Option<String>,
    pub date: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FullReportQuery {
    pub date: Option<String>,
    pub recipient: Option<String>,
}

/// 生成指定代码的 Excel 报表并发送邮件
///
/// 未指定代码时使用指数目录。
#[utoipa::path(
    post,
    path = "/api/v1/reports/excel",
    tag = "报表 (Reports)",
    params(
        ("symbols" = Option<String>, Query, description = "逗号分隔的代码列表，缺省为全部指数"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD，缺省为当日"),
        ("recipient" = Option<String>, Query, description = "追加收件人，逗号分隔")
    ),
    responses(
        (status = 200, description = "报表已发送", body = ApiResponse<ReportResponse>),
        (status = 400, description = "日期或代码格式错误", body = ApiErrorResponse),
        (status = 401, description = "未认证", body = ApiErrorResponse),
        (status = 404, description = "无数据", body = NoDataResponse),
        (status = 500, description = "渲染或投递失败", body = ApiErrorResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn send_excel_report(
    State(state): State<AppState>,
    Query(query): Query<ExcelReportQuery>,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let date = resolve_date(&state, query.date.as_deref())?;
    let symbols = query
        .symbols
        .as_deref()
        .map(parse_symbol_list)
        .filter(|s| !s.is_empty());
    if let Some(symbols) = &symbols {
        validate_symbols(symbols)?;
    }

    let summary = state
        .reports
        .send_excel_report(ReportRequest {
            symbols,
            date,
            recipient: query.recipient,
        })
        .await?;
    tracing::info!(
        "Excel report {} sent to {} recipients",
        summary.filename,
        summary.recipients.len()
    );
    Ok(Json(ApiResponse::ok(summary.into())))
}

/// 生成全目录报表并发送邮件 (无需认证)
///
/// 未指定日期时按服务端时间推断，推断方式通过 `X-Date-Logic` 回传。
#[utoipa::path(
    post,
    path = "/api/v1/reports/full",
    tag = "报表 (Reports)",
    params(
        ("date" = Option<String>, Query, description = "YYYY-MM-DD，缺省按服务端时间推断"),
        ("recipient" = Option<String>, Query, description = "追加收件人，逗号分隔")
    ),
    responses(
        (status = 200, description = "报表已发送", body = ApiResponse<ReportResponse>,
            headers(
                ("X-Processed-Date" = String, description = "实际使用的报表日期"),
                ("X-Server-Time" = String, description = "服务端时间 (RFC 3339)"),
                ("X-Date-Logic" = String, description = "manual / auto-previous-day / auto-current-day")
            )
        ),
        (status = 400, description = "日期格式错误", body = ApiErrorResponse),
        (status = 404, description = "无数据", body = NoDataResponse),
        (status = 500, description = "渲染或投递失败", body = ApiErrorResponse)
    )
)]
pub async fn send_full_report(
    State(state): State<AppState>,
    Query(query): Query<FullReportQuery>,
) -> Result<Response, ApiError> {
    let now = state.reports.clock().now();
    let (date, logic) = resolve_report_date(query.date.as_deref(), &now)?;
    let server_time = now.to_rfc3339();
    tracing::info!("Full report requested for {} ({})", date, logic.as_header());

    let summary = state
        .reports
        .send_full_report(date, query.recipient.as_deref())
        .await?;

    let mut body = ReportResponse::from(summary);
    body.date_logic = Some(logic.describe().to_string());
    body.server_time = Some(server_time.clone());

    let mut headers = HeaderMap::new();
    headers.insert(X_PROCESSED_DATE, header_value(&format_date(date))?);
    headers.insert(X_SERVER_TIME, header_value(&server_time)?);
    headers.insert(X_DATE_LOGIC, HeaderValue::from_static(logic.as_header()));

    Ok((headers, Json(ApiResponse::ok(body))).into_response())
}

/// 立即生成并发送本周周报
#[utoipa::path(
    post,
    path = "/api/v1/reports/weekly",
    tag = "报表 (Reports)",
    responses(
        (status = 200, description = "周报已发送", body = ApiResponse<ReportResponse>),
        (status = 401, description = "未认证", body = ApiErrorResponse),
        (status = 404, description = "本周无数据", body = NoDataResponse),
        (status = 500, description = "渲染或投递失败", body = ApiErrorResponse)
    ),
    security(("basic_auth" = []))
)]
pub async fn send_weekly_report(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let summary = state.reports.send_weekly_report().await?;
    Ok(Json(ApiResponse::ok(summary.into())))
}

fn header_value(raw: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(raw).map_err(|e| ApiError::Internal(format!("Invalid header value: {}", e)))
}
