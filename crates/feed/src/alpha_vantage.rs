use crate::http::{build_client, get_json, normalize_base};
use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::common::format_date;
use fintrack_core::common::time::{RealTimeProvider, TimeProvider};
use fintrack_core::market::entity::{Ohlcv, PriceRecord};
use fintrack_core::market::error::MarketError;
use fintrack_core::market::port::PriceFeed;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://www.alphavantage.co";

pub const PROVIDER_NAME: &str = "Alpha Vantage";

pub const DAILY_CALL_LIMIT: u32 = 500;

/// `compact` 输出只覆盖最近约 100 个交易日，更早的日期需要 `full`。
const COMPACT_WINDOW_DAYS: i64 = 140;

/// 指数 → ETF 代理。
const ETF_PROXY_MAP: &[(&str, &str)] = &[
    ("SPX", "SPY"),  // S&P 500 → SPDR S&P 500 ETF
    ("NDX", "QQQ"),  // Nasdaq 100 → Invesco QQQ
    ("DJI", "DIA"),  // Dow Jones → SPDR Dow Jones ETF
    ("NYA", "VTI"),  // NYSE Composite → Vanguard Total Stock Market
    ("ES_F", "SPY"), // E-mini S&P 500 期货
    ("NQ_F", "QQQ"), // E-mini Nasdaq 100 期货
];

/// # Summary
/// Alpha Vantage 日线客户端，通过 ETF 代理提供指数行情。
///
/// # Invariants
/// - 超时 30 秒，每次请求后暂停 200 毫秒。
/// - 返回记录中的代码始终是指数代码 (如 SPX)，而不是代理 ETF (SPY)。
#[derive(Clone)]
pub struct AlphaVantageFeed {
    client: Client,
    api_key: String,
    base_url: String,
    pacing: Duration,
    clock: Arc<dyn TimeProvider>,
}

impl AlphaVantageFeed {
    pub fn new(api_key: &str) -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            pacing: Duration::from_millis(200),
            clock: Arc::new(RealTimeProvider),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base(base_url);
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// outputsize 按此时钟的今天计算。
    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    fn output_size_for(&self, date: NaiveDate) -> &'static str {
        output_size(date, self.clock.today())
    }
}

/// TIME_SERIES_DAILY 响应
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyQuote>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    // 限流提示
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl TimeSeriesResponse {
    fn provider_message(&mut self) -> Option<String> {
        self.error_message
            .take()
            .or_else(|| self.note.take())
            .or_else(|| self.information.take())
    }
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl DailyQuote {
    fn ohlcv(&self) -> Result<Ohlcv, MarketError> {
        Ok(Ohlcv {
            open: parse_decimal("open", &self.open)?,
            high: parse_decimal("high", &self.high)?,
            low: parse_decimal("low", &self.low)?,
            close: parse_decimal("close", &self.close)?,
            volume: parse_decimal("volume", &self.volume)?,
        })
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, MarketError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| MarketError::Parse(format!("{} '{}': {}", field, raw, e)))
}

/// 根据请求日期与今天的距离选择 outputsize。
fn output_size(date: NaiveDate, today: NaiveDate) -> &'static str {
    if (today - date).num_days() > COMPACT_WINDOW_DAYS {
        "full"
    } else {
        "compact"
    }
}

#[async_trait]
impl PriceFeed for AlphaVantageFeed {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn daily_call_limit(&self) -> u32 {
        DAILY_CALL_LIMIT
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    fn provider_symbol(&self, symbol: &str) -> String {
        ETF_PROXY_MAP
            .iter()
            .find(|(index, _)| *index == symbol)
            .map(|(_, etf)| etf.to_string())
            .unwrap_or_else(|| symbol.to_string())
    }

    /// # Summary
    /// 从 Alpha Vantage 抓取单日价格。
    ///
    /// # Logic
    /// 1. 将指数映射为 ETF 代理代码。
    /// 2. 请求 TIME_SERIES_DAILY，响应中的 Error Message / Note / Information 视为数据源错误。
    /// 3. 只取请求日期对应的条目，缺失即为空数据。
    /// 4. 字符串价格解析为 Decimal，无法解析视为解析错误。
    async fn fetch_price(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, MarketError> {
        let proxy = self.provider_symbol(symbol);
        let day = format_date(date);
        let size = self.output_size_for(date);
        debug!("Alpha Vantage request {} via {} on {} ({})", symbol, proxy, day, size);

        let request = self.client.get(format!("{}/query", self.base_url)).query(&[
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", proxy.as_str()),
            ("outputsize", size),
            ("apikey", self.api_key.as_str()),
        ]);
        let mut response: TimeSeriesResponse = get_json(request).await?;

        if let Some(message) = response.provider_message() {
            return Err(MarketError::Provider(message));
        }

        let series = response.time_series.ok_or(MarketError::NotFound)?;
        let quote = series.get(&day).ok_or(MarketError::NotFound)?;

        Ok(PriceRecord::ok(PROVIDER_NAME, symbol, date, quote.ohlcv()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use fintrack_core::common::time::FakeClockProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_etf_proxy() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let feed = AlphaVantageFeed::new("key").unwrap();
        assert_eq!(feed.provider_symbol("SPX"), "SPY");
        assert_eq!(feed.provider_symbol("NYA"), "VTI");
        assert_eq!(feed.provider_symbol("NQ_F"), "QQQ");
        assert_eq!(feed.provider_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_output_size() {
        assert_eq!(output_size(d(2024, 1, 15), d(2024, 1, 20)), "compact");
        assert_eq!(output_size(d(2023, 1, 15), d(2024, 1, 20)), "full");
    }

    #[test]
    fn test_output_size_follows_injected_clock() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let clock = Arc::new(FakeClockProvider::new(
            Local.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap(),
        ));
        let feed = AlphaVantageFeed::new("key").unwrap().with_clock(clock.clone());
        assert_eq!(feed.output_size_for(d(2024, 1, 15)), "compact");
        assert_eq!(feed.output_size_for(d(2023, 6, 1)), "full");

        clock.set_time(Local.with_ymd_and_hms(2023, 6, 5, 9, 0, 0).unwrap());
        assert_eq!(feed.output_size_for(d(2023, 6, 1)), "compact");
    }

    #[test]
    fn test_provider_message_priority() {
        let mut resp: TimeSeriesResponse = serde_json::from_str(
            r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        )
        .unwrap();
        assert!(resp.provider_message().unwrap().starts_with("Thank you"));
        assert!(resp.time_series.is_none());
    }

    #[test]
    fn test_daily_quote_rejects_garbage() {
        let quote = DailyQuote {
            open: "1.0".into(),
            high: "n/a".into(),
            low: "0.5".into(),
            close: "0.9".into(),
            volume: "100".into(),
        };
        assert!(matches!(quote.ohlcv(), Err(MarketError::Parse(_))));
    }
}
