//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为对外 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use fintrack_core::common::format_date;
use fintrack_core::market::entity::{BatchOutcome, BatchResult, FailureEntry, PriceRecord};
use fintrack_manager::ReportSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================
//  行情相关 DTO
// ============================================================

/// 一个批次的抓取结果 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    /// 请求的代码
    #[schema(example = json!(["SPX", "AAPL"]))]
    pub symbols: Vec<String>,
    /// 请求的日期 (YYYY-MM-DD)
    #[schema(example = json!(["2024-01-15"]))]
    pub dates: Vec<String>,
    /// 请求的组合总数 (代码 × 日期)
    #[schema(example = 2)]
    pub total: usize,
    /// 成功条数
    #[schema(example = 2)]
    pub successful: usize,
    /// 失败条数
    #[schema(example = 0)]
    pub failed: usize,
    /// not_found / partial / complete
    pub outcome: BatchOutcome,
    /// 成功记录
    pub data: Vec<PriceRecord>,
    /// 失败条目
    pub errors: Vec<FailureEntry>,
}

impl BatchResponse {
    pub fn new(symbols: Vec<String>, dates: Vec<String>, batch: BatchResult) -> Self {
        Self {
            total: symbols.len() * dates.len(),
            successful: batch.results.len(),
            failed: batch.failures.len(),
            outcome: batch.outcome(),
            symbols,
            dates,
            data: batch.results,
            errors: batch.failures,
        }
    }
}

/// 批次没有任何成功记录时的 404 响应体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoDataResponse {
    /// 固定为 false
    pub success: bool,
    /// 固定为 not_found
    pub outcome: BatchOutcome,
    /// 错误描述信息
    #[schema(example = "No data found for the requested symbols")]
    pub error: String,
    /// 各组合的失败条目
    pub errors: Vec<FailureEntry>,
}

// ============================================================
//  目录与状态 DTO
// ============================================================

/// 健康检查 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// RFC 3339 时间戳
    #[schema(example = "2024-01-15T16:30:00+00:00")]
    pub timestamp: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// 支持的代码目录 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogResponse {
    /// 指数代码
    pub target_indices: Vec<String>,
    /// 指数 + 股票
    pub all_symbols: Vec<String>,
    pub total_indices: usize,
    pub total_symbols: usize,
    /// 提供者名称
    #[schema(example = "Hybrid (Alpha Vantage + Financial Modeling Prep)")]
    pub api_provider: String,
    /// 每日调用配额合计 (仅供展示)
    #[schema(example = 750)]
    pub daily_free_calls: u32,
}

/// 单个代码的路由信息
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteInfo {
    #[schema(example = "SPX")]
    pub symbol: String,
    #[schema(example = "Alpha Vantage")]
    pub provider: String,
}

/// 数据源状态 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub timestamp: String,
    pub provider: String,
    pub daily_call_limit: u32,
    /// 指数代码各自由哪个数据源负责
    pub index_routes: Vec<RouteInfo>,
    pub total_symbols: usize,
}

// ============================================================
//  报表 DTO
// ============================================================

/// 报表投递结果 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    #[schema(example = "Report sent successfully")]
    pub message: String,
    /// 实际收件人
    pub recipients: Vec<String>,
    pub dates: Vec<String>,
    pub symbols_total: usize,
    pub symbols_success: usize,
    pub symbols_failed: usize,
    #[schema(example = "Financial_Report_2024-01-15.xlsx")]
    pub excel_filename: String,
    pub excel_size_bytes: usize,
    pub batches_processed: usize,
    /// 投递失败的收件人 (部分成功时)
    pub undelivered: Vec<String>,
    pub errors: Vec<FailureEntry>,
    pub data_summary: Vec<PriceRecord>,
    /// 日期推断说明 (仅完整报表)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_logic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_time: Option<String>,
}

impl From<ReportSummary> for ReportResponse {
    fn from(s: ReportSummary) -> Self {
        Self {
            message: "Report sent successfully".to_string(),
            recipients: s.recipients,
            dates: s.dates.into_iter().map(format_date).collect(),
            symbols_total: s.symbols_total,
            symbols_success: s.results.len(),
            symbols_failed: s.failures.len(),
            excel_filename: s.filename,
            excel_size_bytes: s.size_bytes,
            batches_processed: s.batches,
            undelivered: s.delivery.failed.into_iter().map(|(to, _)| to).collect(),
            errors: s.failures,
            data_summary: s.results,
            date_logic: None,
            server_time: None,
        }
    }
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 错误响应体 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
