//! 供下游 crate 集成测试复用的模拟实现，仅在 `test-utils` 特性下编译。

use crate::market::entity::{Ohlcv, PriceRecord};
use crate::market::error::MarketError;
use crate::market::port::PriceFeed;
use crate::notify::entity::{DeliveryReport, Envelope};
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use crate::report::error::ReportError;
use crate::report::port::ReportRenderer;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// # Summary
/// 可观测的模拟数据源。
///
/// # Invariants
/// - `failing` 中的代码永远返回网络错误。
/// - 记录在途请求数峰值，用于验证并发上限。
pub struct MockFeed {
    name: String,
    limit: u32,
    latency: Duration,
    failing: HashSet<String>,
    symbol_map: Vec<(String, String)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requested: Mutex<Vec<(String, NaiveDate)>>,
}

impl MockFeed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            limit: 100,
            latency: Duration::from_millis(5),
            failing: HashSet::new(),
            symbol_map: Vec::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn failing(mut self, symbols: &[&str]) -> Self {
        self.failing.extend(symbols.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_symbol_map(mut self, pairs: &[(&str, &str)]) -> Self {
        self.symbol_map
            .extend(pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 收到的 (数据源代码, 日期) 请求序列。
    pub fn requested(&self) -> Vec<(String, NaiveDate)> {
        self.requested.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PriceFeed for MockFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn daily_call_limit(&self) -> u32 {
        self.limit
    }

    fn pacing(&self) -> Duration {
        Duration::ZERO
    }

    fn provider_symbol(&self, symbol: &str) -> String {
        self.symbol_map
            .iter()
            .find(|(canonical, _)| canonical == symbol)
            .map(|(_, mapped)| mapped.clone())
            .unwrap_or_else(|| symbol.to_string())
    }

    async fn fetch_price(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.provider_symbol(symbol), date));

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(symbol) {
            return Err(MarketError::Network("connection refused".into()));
        }
        Ok(PriceRecord::ok(
            &self.name,
            symbol,
            date,
            Ohlcv {
                open: Decimal::new(10_000, 2),
                high: Decimal::new(10_500, 2),
                low: Decimal::new(9_500, 2),
                close: Decimal::new(10_200, 2),
                volume: Decimal::new(1_000_000, 0),
            },
        ))
    }
}

/// # Summary
/// 记录调用次数的模拟报表渲染器。
#[derive(Default)]
pub struct MockRenderer {
    fail: bool,
    calls: AtomicUsize,
    rows: AtomicUsize,
}

impl MockRenderer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最近一次渲染的行数。
    pub fn last_rows(&self) -> usize {
        self.rows.load(Ordering::SeqCst)
    }
}

impl ReportRenderer for MockRenderer {
    fn render(&self, records: &[PriceRecord]) -> Result<Vec<u8>, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.store(records.len(), Ordering::SeqCst);
        if self.fail {
            return Err(ReportError::Workbook("disk full".into()));
        }
        Ok(b"PK\x03\x04mock".to_vec())
    }
}

/// # Summary
/// 保存所有投递请求的模拟通知器。
#[derive(Default)]
pub struct MockNotifier {
    fail: bool,
    sent: Mutex<Vec<Envelope>>,
}

impl MockNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn deliver(&self, envelope: &Envelope) -> Result<DeliveryReport, NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery(format!(
                "{}: SMTP unavailable",
                envelope.recipients.join(", ")
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(envelope.clone());
        Ok(DeliveryReport {
            delivered: envelope.recipients.clone(),
            failed: Vec::new(),
        })
    }
}
