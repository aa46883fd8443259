use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// 成功记录的固定状态标记。
pub const STATUS_OK: &str = "OK";

/// # Summary
/// 单个证券在单个交易日的价格数据。
///
/// # Invariants
/// - `symbol` 始终是系统内部的规范代码，绝不是数据源翻译后的代码。
/// - 创建后不可变；同一批次内不对 (symbol, date) 做去重。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    // 成功标记，固定为 "OK"
    pub status: String,
    // 数据来源提供者名称
    #[serde(rename = "from")]
    pub source: String,
    // 规范证券代码
    #[schema(example = "AAPL")]
    pub symbol: String,
    // 交易日期 (YYYY-MM-DD)
    #[schema(value_type = String, example = "2024-01-15")]
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    // 成交量 (部分数据源返回小数)
    pub volume: Decimal,
    // 盘后价格，数据源不提供时为 0
    #[serde(default)]
    pub after_hours: Decimal,
    // 盘前价格，数据源不提供时为 0
    #[serde(default)]
    pub pre_market: Decimal,
}

/// # Summary
/// 基础 OHLCV 数值，供各数据源构造 `PriceRecord` 时复用。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ohlcv {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceRecord {
    /// # Summary
    /// 构造一条成功记录，盘前/盘后价格默认为 0。
    pub fn ok(source: &str, symbol: &str, date: NaiveDate, bar: Ohlcv) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            source: source.to_string(),
            symbol: symbol.to_string(),
            date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            after_hours: Decimal::ZERO,
            pre_market: Decimal::ZERO,
        }
    }

    /// 附加盘后 / 盘前价格。
    pub fn with_extended_hours(mut self, after_hours: Decimal, pre_market: Decimal) -> Self {
        self.after_hours = after_hours;
        self.pre_market = pre_market;
        self
    }
}

/// # Summary
/// 失败条目：标识一个抓取失败的 (symbol, date)，可选附带错误详情。
///
/// # Invariants
/// - 这是面向人阅读的标签，不是结构化错误类型。
/// - 失败永远不会被自动重试。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FailureEntry(String);

impl FailureEntry {
    /// `SYM (YYYY-MM-DD)`
    pub fn new(symbol: &str, date: NaiveDate) -> Self {
        Self(format!("{} ({})", symbol, date.format(crate::common::DATE_FORMAT)))
    }

    /// `SYM (YYYY-MM-DD): detail`
    pub fn with_error(symbol: &str, date: NaiveDate, detail: impl fmt::Display) -> Self {
        Self(format!(
            "{} ({}): {}",
            symbol,
            date.format(crate::common::DATE_FORMAT),
            detail
        ))
    }

    /// 整个数据源不可用时的失败条目。
    pub fn provider_unavailable(provider: &str, detail: impl fmt::Display) -> Self {
        Self(format!("provider {} unavailable: {}", provider, detail))
    }

    /// 条目开头的证券代码。
    pub fn symbol(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// # Summary
/// 批次结果的用户可见分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    // 没有任何成功记录
    NotFound,
    // 成功与失败并存
    Partial,
    // 全部成功
    Complete,
}

/// # Summary
/// 一个批次的结果快照。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<PriceRecord>,
    pub failures: Vec<FailureEntry>,
}

impl BatchResult {
    /// 成功与失败的总条数。
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn outcome(&self) -> BatchOutcome {
        match (self.results.is_empty(), self.failures.is_empty()) {
            (true, _) => BatchOutcome::NotFound,
            (false, true) => BatchOutcome::Complete,
            (false, false) => BatchOutcome::Partial,
        }
    }

    /// 追加另一批次的结果。
    pub fn extend(&mut self, other: BatchResult) {
        self.results.extend(other.results);
        self.failures.extend(other.failures);
    }
}

/// # Summary
/// 单个提供者实例独占的可变批次状态。
///
/// # Invariants
/// - 由持有者通过互斥锁保护；并发写入的顺序不确定。
/// - 只能通过 `clear` 显式重置，不存在隐式的批次边界。
#[derive(Debug, Default)]
pub struct BatchState {
    results: Vec<PriceRecord>,
    failures: Vec<FailureEntry>,
}

impl BatchState {
    pub fn record_success(&mut self, record: PriceRecord) {
        self.results.push(record);
    }

    pub fn record_failure(&mut self, failure: FailureEntry) {
        self.failures.push(failure);
    }

    /// 合并另一批次的全部结果。
    pub fn absorb(&mut self, batch: BatchResult) {
        self.results.extend(batch.results);
        self.failures.extend(batch.failures);
    }

    pub fn clear(&mut self) {
        self.results.clear();
        self.failures.clear();
    }

    pub fn results(&self) -> &[PriceRecord] {
        &self.results
    }

    pub fn failures(&self) -> &[FailureEntry] {
        &self.failures
    }

    pub fn snapshot(&self) -> BatchResult {
        BatchResult {
            results: self.results.clone(),
            failures: self.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn record(symbol: &str) -> PriceRecord {
        PriceRecord::ok(
            "Test",
            symbol,
            date(),
            Ohlcv {
                open: dec!(1.5),
                high: dec!(2),
                low: dec!(1),
                close: dec!(1.75),
                volume: dec!(1000.5),
            },
        )
    }

    #[test]
    fn test_failure_entry_formats() {
        assert_eq!(FailureEntry::new("AAPL", date()).as_str(), "AAPL (2024-01-15)");
        let e = FailureEntry::with_error("SPX", date(), "HTTP 500");
        assert_eq!(e.to_string(), "SPX (2024-01-15): HTTP 500");
        assert_eq!(e.symbol(), "SPX");
        let p = FailureEntry::provider_unavailable("Alpha Vantage", "worker aborted");
        assert!(p.as_str().starts_with("provider Alpha Vantage unavailable"));
    }

    #[test]
    fn test_price_record_serializes_like_upstream() {
        let json = serde_json::to_value(record("AAPL")).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["from"], "Test");
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["afterHours"], 0.0);
        assert!(json.get("preMarket").is_some());
    }

    #[test]
    fn test_batch_outcome() {
        let mut batch = BatchResult::default();
        assert_eq!(batch.outcome(), BatchOutcome::NotFound);
        batch.failures.push(FailureEntry::new("X", date()));
        assert_eq!(batch.outcome(), BatchOutcome::NotFound);
        batch.results.push(record("AAPL"));
        assert_eq!(batch.outcome(), BatchOutcome::Partial);
        batch.failures.clear();
        assert_eq!(batch.outcome(), BatchOutcome::Complete);
    }

    #[test]
    fn test_batch_state_clear() {
        let mut state = BatchState::default();
        state.record_success(record("AAPL"));
        state.record_failure(FailureEntry::new("MSFT", date()));
        assert_eq!(state.snapshot().total(), 2);
        state.clear();
        assert!(state.results().is_empty());
        assert!(state.failures().is_empty());
    }
}
