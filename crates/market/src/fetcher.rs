use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::market::entity::{BatchResult, BatchState, FailureEntry, PriceRecord};
use fintrack_core::market::error::MarketError;
use fintrack_core::market::port::{FETCH_CONCURRENCY, PriceFeed, PriceProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// # Summary
/// 单一数据源的批次编排器，实现 `PriceProvider`。
///
/// # Invariants
/// - 在途抓取数不超过 `FETCH_CONCURRENCY`。
/// - 工作协程在请求结束后先暂停 `pacing`，再归还并发槽位。
/// - 批次状态只由一把互斥锁保护，读写都经过它。
pub struct BatchFetcher {
    // 上游客户端
    feed: Arc<dyn PriceFeed>,
    // 本实例独占的批次状态
    state: Arc<Mutex<BatchState>>,
    // 并发槽位
    permits: Arc<Semaphore>,
    pacing: Duration,
}

impl BatchFetcher {
    /// # Summary
    /// 包装一个数据源客户端。
    ///
    /// # Arguments
    /// * `feed`: 数据源客户端，其 `pacing()` 作为默认暂停时长。
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        let pacing = feed.pacing();
        Self {
            feed,
            state: Arc::new(Mutex::new(BatchState::default())),
            permits: Arc::new(Semaphore::new(FETCH_CONCURRENCY)),
            pacing,
        }
    }

    /// 覆盖请求后的暂停时长。
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// # Summary
/// 抓取一个 (symbol, date) 并写入批次状态。
///
/// # Logic
/// 1. 调用数据源。
/// 2. 成功写入结果，失败转换为失败条目写入，错误不再向上传播。
async fn fetch_and_record(
    feed: &dyn PriceFeed,
    state: &Mutex<BatchState>,
    symbol: &str,
    date: NaiveDate,
) -> Result<PriceRecord, FailureEntry> {
    match feed.fetch_price(symbol, date).await {
        Ok(record) => {
            debug!("{} fetched {} on {}", feed.name(), symbol, date);
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .record_success(record.clone());
            Ok(record)
        }
        Err(e) => {
            warn!("{} failed for {} on {}: {}", feed.name(), symbol, date, e);
            let failure = FailureEntry::with_error(symbol, date, &e);
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .record_failure(failure.clone());
            Err(failure)
        }
    }
}

#[async_trait]
impl PriceProvider for BatchFetcher {
    fn name(&self) -> &str {
        self.feed.name()
    }

    fn daily_call_limit(&self) -> u32 {
        self.feed.daily_call_limit()
    }

    async fn fetch_one(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, FailureEntry> {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                let failure = FailureEntry::with_error(symbol, date, e);
                self.lock().record_failure(failure.clone());
                return Err(failure);
            }
        };

        let outcome = fetch_and_record(self.feed.as_ref(), &self.state, symbol, date).await;
        tokio::time::sleep(self.pacing).await;
        outcome
    }

    /// # Summary
    /// 并发抓取 symbols × dates。
    ///
    /// # Logic
    /// 1. 每个组合先获取一个并发槽位，再派发到 `JoinSet`。
    /// 2. 工作协程抓取、记录、暂停，然后释放槽位。
    /// 3. 等待全部工作协程结束；异常退出的协程记为其组合的失败。
    /// 4. 若槽位获取失败则停止派发，等待已派发部分结束后返回错误。
    async fn fetch_many(&self, symbols: &[String], dates: &[NaiveDate]) -> Result<(), MarketError> {
        let mut workers = JoinSet::new();
        let mut pending = HashMap::new();
        let mut aborted = None;

        'dispatch: for symbol in symbols {
            for &date in dates {
                let permit = match self.permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        aborted = Some(MarketError::Unknown(e.to_string()));
                        break 'dispatch;
                    }
                };

                let feed = self.feed.clone();
                let state = self.state.clone();
                let pacing = self.pacing;
                let worker_symbol = symbol.clone();
                let handle = workers.spawn(async move {
                    if let Err(failure) =
                        fetch_and_record(feed.as_ref(), &state, &worker_symbol, date).await
                    {
                        debug!("Recorded failure {}", failure);
                    }
                    tokio::time::sleep(pacing).await;
                    drop(permit);
                });
                pending.insert(handle.id(), (symbol.clone(), date));
            }
        }

        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((id, ())) => {
                    pending.remove(&id);
                }
                Err(e) => {
                    if let Some((symbol, date)) = pending.remove(&e.id()) {
                        warn!("Fetch worker for {} on {} died: {}", symbol, date, e);
                        self.lock()
                            .record_failure(FailureEntry::with_error(&symbol, date, "worker aborted"));
                    }
                }
            }
        }

        match aborted {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn results(&self) -> Vec<PriceRecord> {
        self.lock().results().to_vec()
    }

    fn failures(&self) -> Vec<FailureEntry> {
        self.lock().failures().to_vec()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn snapshot(&self) -> BatchResult {
        self.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::test_utils::MockFeed;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_one_records_and_returns() {
        let fetcher = BatchFetcher::new(Arc::new(MockFeed::new("Mock").failing(&["BAD"])));

        let ok = fetcher.fetch_one("AAPL", day()).await.unwrap();
        assert_eq!(ok.symbol, "AAPL");
        let failure = fetcher.fetch_one("BAD", day()).await.unwrap_err();
        assert_eq!(failure.symbol(), "BAD");
        assert!(failure.as_str().contains("connection refused"));

        let snapshot = fetcher.snapshot();
        assert_eq!(snapshot.results.len(), 1);
        assert_eq!(snapshot.failures, vec![failure]);
    }

    #[tokio::test]
    async fn test_accumulates_until_clear() {
        let fetcher = BatchFetcher::new(Arc::new(MockFeed::new("Mock")));
        let symbols = vec!["A".to_string(), "B".to_string()];

        fetcher.fetch_many(&symbols, &[day()]).await.unwrap();
        fetcher.fetch_many(&symbols, &[day()]).await.unwrap();
        assert_eq!(fetcher.results().len(), 4);

        fetcher.clear();
        assert!(fetcher.results().is_empty());
        assert!(fetcher.failures().is_empty());
    }
}
