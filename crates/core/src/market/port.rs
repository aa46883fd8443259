use crate::market::entity::{BatchResult, FailureEntry, PriceRecord};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// 单个提供者实例允许同时在途的抓取数量。
/// 该宽度受上游免费套餐的限流约束，而非可调的性能参数。
pub const FETCH_CONCURRENCY: usize = 5;

/// # Summary
/// 外部行情数据源客户端接口 (一个实现对应一个上游)。
///
/// # Invariants
/// - 输入的 `symbol` 为规范代码，实现内部负责翻译为数据源代码。
/// - 成功返回的 `PriceRecord.symbol` 必须等于输入的规范代码。
/// - 成功返回的 `PriceRecord.date` 必须等于请求日期。
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// 数据源名称，写入 `PriceRecord.source`。
    fn name(&self) -> &str;

    /// 上游每日调用配额 (仅供展示)。
    fn daily_call_limit(&self) -> u32;

    /// 每次请求完成后、释放并发槽位前需要暂停的时长。
    fn pacing(&self) -> Duration;

    /// # Summary
    /// 将规范代码翻译为数据源期望的代码。
    ///
    /// # Logic
    /// 1. 查询静态映射表。
    /// 2. 没有映射时原样返回。
    fn provider_symbol(&self, symbol: &str) -> String;

    /// # Summary
    /// 抓取单个证券在单个日期的价格。
    ///
    /// # Logic
    /// 1. 翻译代码并构建请求。
    /// 2. 执行网络请求，检查 HTTP 状态。
    /// 3. 防御性解析响应体，缺失字段视为失败而非 panic。
    ///
    /// # Arguments
    /// * `symbol`: 规范代码。
    /// * `date`: 交易日期。
    ///
    /// # Returns
    /// 成功返回 `PriceRecord`，失败返回 `MarketError`。
    async fn fetch_price(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, MarketError>;
}

/// # Summary
/// 批次化的价格提供者能力集合：clear / fetch_one / fetch_many / results / failures。
/// 单一数据源的编排器与组合路由器都实现该接口，从而可以统一组合。
///
/// # Invariants
/// - 每个实例独占一份批次状态，并由单把互斥锁保护。
/// - 两次 `clear` 之间的多次抓取会累积结果。
/// - 单个证券的失败只会记录为失败条目，不会中断批次。
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// 提供者名称。
    fn name(&self) -> &str;

    /// 每日调用配额 (组合提供者为各子提供者之和，仅供展示)。
    fn daily_call_limit(&self) -> u32;

    /// # Summary
    /// 抓取单个 (symbol, date) 并写入批次状态。
    ///
    /// # Returns
    /// 成功返回记录副本，失败返回已记录的失败条目。
    async fn fetch_one(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, FailureEntry>;

    /// # Summary
    /// 抓取 symbols × dates 的笛卡尔积，全部工作协程结束后才返回。
    ///
    /// # Returns
    /// 单个证券失败不会导致 `Err`；只有编排本身无法继续时才返回 `Err`，
    /// 此时已完成部分的结果仍然保留在批次状态中。
    async fn fetch_many(&self, symbols: &[String], dates: &[NaiveDate]) -> Result<(), MarketError>;

    /// 当前成功记录快照。
    fn results(&self) -> Vec<PriceRecord>;

    /// 当前失败条目快照。
    fn failures(&self) -> Vec<FailureEntry>;

    /// 重置批次状态。
    fn clear(&self);

    /// 同时获取成功与失败快照。
    fn snapshot(&self) -> BatchResult {
        BatchResult {
            results: self.results(),
            failures: self.failures(),
        }
    }

    /// 负责该代码的提供者名称 (仅用于诊断展示)。
    fn provider_for(&self, _symbol: &str) -> String {
        self.name().to_string()
    }
}
