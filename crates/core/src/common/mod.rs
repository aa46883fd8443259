pub mod time;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对外接口统一使用的日期格式 (ISO 8601 日历日期)。
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 自动推断报表日期时的分界小时 (本地时间)，早于该时刻使用前一日。
pub const REPORT_CUTOFF_HOUR: u32 = 15;

/// # Summary
/// 日期解析错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date format '{0}'. Use YYYY-MM-DD")]
    InvalidFormat(String),
}

/// # Summary
/// 报表日期的来源标记，通过响应头 `X-Date-Logic` 回传给调用方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateLogic {
    // 调用方显式指定
    Manual,
    // 分界时刻之前，自动回退到前一日
    AutoPreviousDay,
    // 分界时刻之后，自动使用当日
    AutoCurrentDay,
}

impl DateLogic {
    /// 响应头取值。
    pub fn as_header(&self) -> &'static str {
        match self {
            DateLogic::Manual => "manual",
            DateLogic::AutoPreviousDay => "auto-previous-day",
            DateLogic::AutoCurrentDay => "auto-current-day",
        }
    }

    /// 面向人阅读的说明文字。
    pub fn describe(&self) -> &'static str {
        match self {
            DateLogic::Manual => "Date specified manually",
            DateLogic::AutoPreviousDay => "Automatic date: previous day (before 3 PM)",
            DateLogic::AutoCurrentDay => "Automatic date: current day (after 3 PM)",
        }
    }
}

/// # Summary
/// 严格解析 `YYYY-MM-DD` 格式的交易日期。
///
/// # Logic
/// 1. 去除首尾空白后长度必须为 10。
/// 2. 按 `DATE_FORMAT` 解析，任何偏差 (如 `15-01-2024`) 均视为格式错误。
///
/// # Arguments
/// * `input`: 原始日期字符串。
///
/// # Returns
/// 成功返回 `NaiveDate`，失败返回 `DateError::InvalidFormat`。
pub fn parse_trade_date(input: &str) -> Result<NaiveDate, DateError> {
    let trimmed = input.trim();
    if trimmed.len() != 10 {
        return Err(DateError::InvalidFormat(input.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| DateError::InvalidFormat(input.to_string()))
}

/// # Summary
/// 计算 `today` 所在自然周的周一至周五日期。
///
/// # Logic
/// 1. 以周一为一周的起点回溯 (周日归属于以它结尾的那一周)。
/// 2. 连续生成五个工作日。
pub fn week_dates(today: NaiveDate) -> Vec<NaiveDate> {
    let monday = today - chrono::Duration::days(i64::from(today.weekday().num_days_from_monday()));
    monday.iter_days().take(5).collect()
}

/// # Summary
/// 根据当前时刻推断完整报表应使用的日期。
///
/// # Logic
/// 1. 本地时间早于 `REPORT_CUTOFF_HOUR` 时，当日收盘数据尚不可用，使用前一日。
/// 2. 否则使用当日。
///
/// # Returns
/// 返回 (日期, 推断来源)。
pub fn report_date<Tz: TimeZone>(now: &DateTime<Tz>) -> (NaiveDate, DateLogic) {
    let today = now.date_naive();
    if now.hour() < REPORT_CUTOFF_HOUR {
        (today.pred_opt().unwrap_or(today), DateLogic::AutoPreviousDay)
    } else {
        (today, DateLogic::AutoCurrentDay)
    }
}

/// # Summary
/// 解析可选的显式日期，缺省时回退到 `report_date` 推断。
pub fn resolve_report_date<Tz: TimeZone>(
    input: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<(NaiveDate, DateLogic), DateError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Ok((parse_trade_date(raw)?, DateLogic::Manual)),
        None => Ok(report_date(now)),
    }
}

/// 将日期格式化为 ISO 8601 字符串。
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
