use crate::http::{build_client, endpoint, get_json, normalize_base};
use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::common::format_date;
use fintrack_core::market::entity::{Ohlcv, PriceRecord};
use fintrack_core::market::error::MarketError;
use fintrack_core::market::port::PriceFeed;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://financialmodelingprep.com";

/// 写入 `PriceRecord.source` 的数据源名称。
pub const PROVIDER_NAME: &str = "Financial Modeling Prep";

/// 免费套餐每日调用上限。
pub const DAILY_CALL_LIMIT: u32 = 250;

/// 规范代码 → FMP 代码。
const SYMBOL_MAP: &[(&str, &str)] = &[
    ("SPX", "^GSPC"),
    ("NDX", "^IXIC"),
    ("DJI", "^DJI"),
    ("NYA", "^NYA"),
    ("ES_F", "ES=F"),
    ("NQ_F", "NQ=F"),
    ("ES=F", "ES=F"),
    ("NQ=F", "NQ=F"),
];

/// # Summary
/// Financial Modeling Prep 日线历史价格客户端，负责普通股票。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端，超时 10 秒。
/// - 每次请求后暂停 1 秒以满足免费套餐限流。
#[derive(Clone)]
pub struct FmpFeed {
    // 内部使用的 HTTP 客户端
    client: Client,
    api_key: String,
    base_url: String,
    pacing: Duration,
}

impl FmpFeed {
    /// # Summary
    /// 创建一个新的 FmpFeed 实例。
    ///
    /// # Arguments
    /// * `api_key`: FMP API Key。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Unknown`。
    pub fn new(api_key: &str) -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            pacing: Duration::from_secs(1),
        })
    }

    /// 指向其他服务地址 (测试桩或代理)。
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base(base_url);
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// # Summary
/// FMP `historical-price-full` 响应顶层结构。
#[derive(Deserialize, Debug)]
struct HistoricalResponse {
    #[serde(default)]
    historical: Vec<HistoricalBar>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

/// # Summary
/// FMP 单日价格。
#[derive(Deserialize, Debug)]
struct HistoricalBar {
    date: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

impl HistoricalBar {
    fn ohlcv(&self) -> Ohlcv {
        Ohlcv {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

#[async_trait]
impl PriceFeed for FmpFeed {
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
        SYMBOL_MAP
            .iter()
            .find(|(canonical, _)| *canonical == symbol)
            .map(|(_, mapped)| mapped.to_string())
            .unwrap_or_else(|| symbol.to_string())
    }

    /// # Summary
    /// 从 FMP 抓取单日价格。
    ///
    /// # Logic
    /// 1. 翻译为 FMP 代码，以 from = to = date 请求历史价格。
    /// 2. 响应体中的 "Error Message" 视为数据源错误。
    /// 3. 优先取与请求日期一致的条目，否则取第一条。
    /// 4. 记录中写回规范代码与请求日期。
    async fn fetch_price(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, MarketError> {
        let fmp_symbol = self.provider_symbol(symbol);
        let day = format_date(date);
        debug!("FMP request {} as {} on {}", symbol, fmp_symbol, day);

        let url = endpoint(
            &self.base_url,
            &["api", "v3", "historical-price-full", fmp_symbol.as_str()],
        )?;
        let request = self.client.get(url).query(&[
            ("from", day.as_str()),
            ("to", day.as_str()),
            ("apikey", self.api_key.as_str()),
        ]);
        let response: HistoricalResponse = get_json(request).await?;

        if let Some(message) = response.error_message {
            return Err(MarketError::Provider(message));
        }

        let bar = response
            .historical
            .iter()
            .find(|bar| bar.date == day)
            .or_else(|| response.historical.first())
            .ok_or(MarketError::NotFound)?;

        Ok(PriceRecord::ok(PROVIDER_NAME, symbol, date, bar.ohlcv()))
    }
}
