use crate::http::{build_client, endpoint, get_json, normalize_base};
use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::common::format_date;
use fintrack_core::market::entity::{Ohlcv, PriceRecord, STATUS_OK};
use fintrack_core::market::error::MarketError;
use fintrack_core::market::port::PriceFeed;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.polygon.io";

pub const PROVIDER_NAME: &str = "Polygon";

pub const DAILY_CALL_LIMIT: u32 = 7200;

const SYMBOL_MAP: &[(&str, &str)] = &[
    ("SPX", "I:SPX"),
    ("NDX", "I:NDX"),
    ("DJI", "I:DJI"),
    ("NYA", "I:NYA"),
];

/// # Summary
/// Polygon `open-close` 日线客户端，可替代 FMP 处理普通股票。
///
/// # Invariants
/// - 超时 10 秒，每次请求后暂停 1 秒。
/// - 返回记录携带盘前与盘后价格。
#[derive(Clone)]
pub struct PolygonFeed {
    client: Client,
    api_key: String,
    base_url: String,
    pacing: Duration,
}

impl PolygonFeed {
    pub fn new(api_key: &str) -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            pacing: Duration::from_secs(1),
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
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenCloseResponse {
    status: String,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    volume: Option<Decimal>,
    after_hours: Option<Decimal>,
    pre_market: Option<Decimal>,
    message: Option<String>,
}

#[async_trait]
impl PriceFeed for PolygonFeed {
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

    async fn fetch_price(&self, symbol: &str, date: NaiveDate) -> Result<PriceRecord, MarketError> {
        let polygon_symbol = self.provider_symbol(symbol);
        let day = format_date(date);
        debug!("Polygon request {} ({}) on {}", symbol, polygon_symbol, day);

        let url = endpoint(
            &self.base_url,
            &["v1", "open-close", polygon_symbol.as_str(), day.as_str()],
        )?;
        let request = self
            .client
            .get(url)
            .query(&[("adjusted", "false"), ("apiKey", self.api_key.as_str())]);
        let response: OpenCloseResponse = get_json(request).await?;

        if response.status != STATUS_OK {
            return Err(MarketError::Provider(
                response.message.unwrap_or(response.status),
            ));
        }

        // 状态为 OK 却缺少收盘价，视为当日无数据
        let close = response.close.ok_or(MarketError::NotFound)?;
        let bar = Ohlcv {
            open: response.open.unwrap_or(close),
            high: response.high.unwrap_or(close),
            low: response.low.unwrap_or(close),
            close,
            volume: response.volume.unwrap_or_default(),
        };

        Ok(PriceRecord::ok(PROVIDER_NAME, symbol, date, bar).with_extended_hours(
            response.after_hours.unwrap_or_default(),
            response.pre_market.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_prefix() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let feed = PolygonFeed::new("key").unwrap();
        assert_eq!(feed.provider_symbol("SPX"), "I:SPX");
        assert_eq!(feed.provider_symbol("TSLA"), "TSLA");
    }

    #[test]
    fn test_error_status_shape() {
        let resp: OpenCloseResponse =
            serde_json::from_str(r#"{"status":"NOT_FOUND","message":"Data not found."}"#).unwrap();
        assert_eq!(resp.status, "NOT_FOUND");
        assert!(resp.close.is_none());
        assert_eq!(resp.message.as_deref(), Some("Data not found."));
    }
}
