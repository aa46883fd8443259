use fintrack_core::market::error::MarketError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// 构建带超时与浏览器 User-Agent 的 HTTP 客户端。
///
/// # Arguments
/// * `timeout`: 单次请求超时，超时后释放并发槽位。
pub(crate) fn build_client(timeout: Duration) -> Result<Client, MarketError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| MarketError::Unknown(format!("Failed to build HTTP client: {}", e)))
}

/// # Summary
/// 发送请求并将响应体解析为 `T`。
///
/// # Logic
/// 1. 传输失败映射为 `Network` (去除 URL，避免 API Key 出现在失败条目中)。
/// 2. 非 2xx 状态映射为 `Http`。
/// 3. 先读取完整文本再反序列化，结构不符映射为 `Parse`。
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MarketError> {
    let resp = request
        .send()
        .await
        .map_err(|e| MarketError::Network(e.without_url().to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MarketError::Http(status.as_u16()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| MarketError::Network(e.without_url().to_string()))?;

    serde_json::from_str(&body).map_err(|e| MarketError::Parse(e.to_string()))
}

/// # Summary
/// 在 `base_url` 之后追加路径段。
///
/// # Logic
/// 每个段单独做百分号编码，代码中的 `/`、`?`、`..` 不会改变请求的端点。
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, MarketError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| MarketError::Unknown(format!("Invalid base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| MarketError::Unknown(format!("Base URL cannot carry a path: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// 去掉末尾斜杠，便于拼接路径。
pub(crate) fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
