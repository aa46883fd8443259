use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::market::catalog::{self, SymbolClass};
use fintrack_core::market::entity::{BatchResult, BatchState, FailureEntry, PriceRecord};
use fintrack_core::market::error::MarketError;
use fintrack_core::market::port::PriceProvider;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// # Summary
/// 指数 / 普通股票组合路由器。
///
/// # Invariants
/// - 目录中的指数代码交给 `index`，其余代码交给 `plain`。
/// - 自身持有独立的批次状态，子提供者的结果在两者都结束后一次性合并。
/// - 两个子提供者之间不共享锁。
pub struct HybridProvider {
    index: Arc<dyn PriceProvider>,
    plain: Arc<dyn PriceProvider>,
    name: String,
    state: Mutex<BatchState>,
}

impl HybridProvider {
    pub fn new(index: Arc<dyn PriceProvider>, plain: Arc<dyn PriceProvider>) -> Self {
        let name = format!("Hybrid ({} + {})", index.name(), plain.name());
        Self {
            index,
            plain,
            name,
            state: Mutex::new(BatchState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn route(&self, symbol: &str) -> &Arc<dyn PriceProvider> {
        match catalog::classify(symbol) {
            SymbolClass::Index => &self.index,
            SymbolClass::Plain => &self.plain,
        }
    }

    /// 组合支持的全部代码 (指数 + 股票目录)。
    pub fn supported_symbols(&self) -> Vec<String> {
        catalog::extended_symbols()
    }

    /// 用于状态展示的一行描述。
    pub fn info(&self) -> String {
        format!(
            "{} for indices ({}/day), {} for stocks ({}/day)",
            self.index.name(),
            self.index.daily_call_limit(),
            self.plain.name(),
            self.plain.daily_call_limit()
        )
    }

    async fn run_child(
        child: &dyn PriceProvider,
        symbols: &[String],
        dates: &[NaiveDate],
    ) -> Result<(), MarketError> {
        if symbols.is_empty() {
            return Ok(());
        }
        child.fetch_many(symbols, dates).await
    }

    /// # Summary
    /// 合并单个子提供者的批次。
    ///
    /// # Logic
    /// 1. 无论子提供者是否返回错误，都保留它已经完成的部分。
    /// 2. 子提供者整体失败时额外写入一条 "provider ... unavailable" 失败条目。
    fn merge(&self, child: &dyn PriceProvider, outcome: Result<(), MarketError>) {
        let partial = child.snapshot();
        let mut state = self.lock();
        state.absorb(partial);
        if let Err(e) = outcome {
            warn!("{} failed during hybrid fetch: {}", child.name(), e);
            state.record_failure(FailureEntry::provider_unavailable(child.name(), &e));
        }
    }
}

#[async_trait]
impl PriceProvider for HybridProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn daily_call_limit(&self) -> u32 {
        self.index
            .daily_call_limit()
            .saturating_add(self.plain.daily_call_limit())
    }

    async fn fetch_one(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, FailureEntry> {
        let outcome = self.route(symbol).fetch_one(symbol, date).await;
        let mut state = self.lock();
        match &outcome {
            Ok(record) => state.record_success(record.clone()),
            Err(failure) => state.record_failure(failure.clone()),
        }
        outcome
    }

    /// # Summary
    /// 按分类拆分代码，两个子提供者并发抓取后合并。
    ///
    /// # Logic
    /// 1. 清空两个子提供者的批次状态。
    /// 2. 使用 `tokio::join!` 同时运行非空的分区。
    /// 3. 两者都结束后把各自的快照并入自身状态。
    async fn fetch_many(&self, symbols: &[String], dates: &[NaiveDate]) -> Result<(), MarketError> {
        let (indices, plain): (Vec<String>, Vec<String>) =
            symbols.iter().cloned().partition(|s| catalog::is_index(s));
        info!(
            "Hybrid fetch: {} indices via {}, {} stocks via {}",
            indices.len(),
            self.index.name(),
            plain.len(),
            self.plain.name()
        );

        self.index.clear();
        self.plain.clear();

        let (index_outcome, plain_outcome) = tokio::join!(
            Self::run_child(self.index.as_ref(), &indices, dates),
            Self::run_child(self.plain.as_ref(), &plain, dates),
        );

        self.merge(self.index.as_ref(), index_outcome);
        self.merge(self.plain.as_ref(), plain_outcome);
        Ok(())
    }

    fn results(&self) -> Vec<PriceRecord> {
        self.lock().results().to_vec()
    }

    fn failures(&self) -> Vec<FailureEntry> {
        self.lock().failures().to_vec()
    }

    fn clear(&self) {
        self.index.clear();
        self.plain.clear();
        self.lock().clear();
    }

    fn snapshot(&self) -> BatchResult {
        self.lock().snapshot()
    }

    fn provider_for(&self, symbol: &str) -> String {
        self.route(symbol).name().to_string()
    }
}
