use chrono::{Local, TimeZone};
use fintrack_api::middleware::auth::BasicCredentials;
use fintrack_api::server::{AppState, build_router};
use fintrack_core::common::time::FakeClockProvider;
use fintrack_core::market::catalog;
use fintrack_core::market::port::PriceProvider;
use fintrack_core::test_utils::{MockFeed, MockNotifier, MockRenderer};
use fintrack_manager::ReportManager;
use fintrack_market::{BatchFetcher, ChunkPolicy, HybridProvider};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const USER: &str = "admin";
const PASS: &str = "s3cret";

struct TestServer {
    addr: String,
    client: reqwest::Client,
    index_feed: Arc<MockFeed>,
    stock_feed: Arc<MockFeed>,
    notifier: Arc<MockNotifier>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    async fn get_auth(&self, path: &str) -> anyhow::Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .basic_auth(USER, Some(PASS))
            .send()
            .await?)
    }

    fn feed_calls(&self) -> usize {
        self.index_feed.calls() + self.stock_feed.calls()
    }
}

// 帮助函数：在随机端口启动测试服务器
async fn spawn_test_server(failing: &[&str], renderer: MockRenderer) -> anyhow::Result<TestServer> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let index_feed = Arc::new(
        MockFeed::new("IndexFeed")
            .with_latency(Duration::ZERO)
            .with_limit(500)
            .failing(failing),
    );
    let stock_feed = Arc::new(
        MockFeed::new("StockFeed")
            .with_latency(Duration::ZERO)
            .with_limit(250)
            .failing(failing),
    );
    let provider: Arc<dyn PriceProvider> = Arc::new(HybridProvider::new(
        Arc::new(BatchFetcher::new(index_feed.clone())),
        Arc::new(BatchFetcher::new(stock_feed.clone())),
    ));

    // 2024-01-17 09:00，早于分界时刻
    let clock = Arc::new(FakeClockProvider::new(
        Local.with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap(),
    ));
    let notifier = Arc::new(MockNotifier::default());
    let reports = ReportManager::new(
        provider,
        Arc::new(renderer),
        Arc::new(MockRenderer::default()),
        notifier.clone(),
        vec!["ops@example.com".to_string()],
        clock,
    )
    .with_chunk_policy(ChunkPolicy {
        size: 10,
        pause: Duration::ZERO,
    });

    let state = AppState::new(Arc::new(reports), BasicCredentials::new(USER, PASS));
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok(TestServer {
        addr,
        client: reqwest::Client::builder().build()?,
        index_feed,
        stock_feed,
        notifier,
    })
}

async fn default_server() -> anyhow::Result<TestServer> {
    spawn_test_server(&[], MockRenderer::default()).await
}

#[tokio::test]
async fn test_health_is_public() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server.client.get(server.url("/health")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_str().unwrap().starts_with("2024-01-17T09:00:00"));
    assert_eq!(server.feed_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_require_basic_auth() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server
        .client
        .get(server.url("/api/v1/stocks/AAPL?date=2024-01-15"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()["www-authenticate"].to_str()?,
        "Basic realm=\"Restricted\""
    );
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);

    let resp = server
        .client
        .get(server.url("/api/v1/catalog"))
        .basic_auth(USER, Some("wrong"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .post(server.url("/api/v1/reports/weekly"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(server.feed_calls(), 0);
    assert!(server.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_date_rejected_before_fetch() -> anyhow::Result<()> {
    let server = default_server().await?;

    for path in [
        "/api/v1/stocks/AAPL?date=15-01-2024",
        "/api/v1/stocks?symbols=AAPL,SPX&date=2024/01/15",
    ] {
        let resp = server.get_auth(path).await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", path);
        let body: Value = resp.json().await?;
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    let resp = server
        .client
        .post(server.url("/api/v1/reports/full?date=2024-13-01"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.feed_calls(), 0);
    assert!(server.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_symbol_list_is_bad_request() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server.get_auth("/api/v1/stocks?symbols=%20,%20").await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = server.get_auth("/api/v1/stocks/weekly").await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.feed_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_symbol_rejected_before_fetch() -> anyhow::Result<()> {
    let server = default_server().await?;

    for path in [
        "/api/v1/stocks?symbols=AAPL,..%2F..%2FV4%2FOTHER%3FX%3D&date=2024-01-15",
        "/api/v1/stocks/%3Cb%3E?date=2024-01-15",
        "/api/v1/stocks/weekly?symbols=AAPL%20MSFT",
    ] {
        let resp = server.get_auth(path).await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", path);
        let body: Value = resp.json().await?;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid symbol"));
    }

    let resp = server
        .client
        .post(server.url("/api/v1/reports/excel?symbols=%3CA%20HREF%3DX%3E&date=2024-01-15"))
        .basic_auth(USER, Some(PASS))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.feed_calls(), 0);
    assert!(server.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_batch_routes_indices_and_stocks() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server
        .get_auth("/api/v1/stocks?symbols=spx,AAPL&date=2024-01-15")
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    let data = &body["data"];
    assert_eq!(data["total"], 2);
    assert_eq!(data["successful"], 2);
    assert_eq!(data["failed"], 0);
    assert_eq!(data["outcome"], "complete");

    let records = data["data"].as_array().unwrap();
    let source_of = |sym: &str| {
        records
            .iter()
            .find(|r| r["symbol"] == sym)
            .map(|r| r["from"].as_str().unwrap().to_string())
    };
    assert_eq!(source_of("SPX").as_deref(), Some("IndexFeed"));
    assert_eq!(source_of("AAPL").as_deref(), Some("StockFeed"));
    assert_eq!(server.index_feed.calls(), 1);
    assert_eq!(server.stock_feed.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_single_symbol_defaults_to_today() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server.get_auth("/api/v1/stocks/msft").await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["dates"][0], "2024-01-17");
    assert_eq!(body["data"]["data"][0]["symbol"], "MSFT");
    Ok(())
}

#[tokio::test]
async fn test_partial_and_not_found_outcomes() -> anyhow::Result<()> {
    let server = spawn_test_server(&["TSLA", "NVDA"], MockRenderer::default()).await?;

    let resp = server
        .get_auth("/api/v1/stocks?symbols=AAPL,TSLA&date=2024-01-15")
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["outcome"], "partial");
    let failure = body["data"]["errors"][0].as_str().unwrap();
    assert!(failure.starts_with("TSLA (2024-01-15): "), "{}", failure);
    assert!(failure.contains("connection refused"), "{}", failure);

    let resp = server
        .get_auth("/api/v1/stocks?symbols=TSLA,NVDA&date=2024-01-15")
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["outcome"], "not_found");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_weekly_covers_monday_to_friday() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server.get_auth("/api/v1/stocks/weekly?symbols=AAPL").await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    let dates: Vec<&str> = body["data"]["dates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        vec!["2024-01-15", "2024-01-16", "2024-01-17", "2024-01-18", "2024-01-19"]
    );
    assert_eq!(body["data"]["successful"], 5);
    Ok(())
}

#[tokio::test]
async fn test_catalog_and_status() -> anyhow::Result<()> {
    let server = default_server().await?;

    let body: Value = server.get_auth("/api/v1/catalog").await?.json().await?;
    assert_eq!(
        body["data"]["total_indices"],
        catalog::index_symbols().len()
    );
    assert_eq!(
        body["data"]["total_symbols"],
        catalog::extended_symbols().len()
    );
    assert_eq!(body["data"]["api_provider"], "Hybrid (IndexFeed + StockFeed)");
    assert_eq!(body["data"]["daily_free_calls"], 750);

    let body: Value = server.get_auth("/api/v1/status").await?.json().await?;
    let routes = body["data"]["index_routes"].as_array().unwrap();
    assert_eq!(routes.len(), catalog::index_symbols().len());
    assert!(routes.iter().all(|r| r["provider"] == "IndexFeed"));
    assert_eq!(server.feed_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_full_report_is_public_with_date_headers() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server
        .client
        .post(server.url("/api/v1/reports/full?recipient=extra@example.com"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    // 09:00 早于分界时刻，回退到前一日
    assert_eq!(resp.headers()["x-processed-date"].to_str()?, "2024-01-16");
    assert_eq!(resp.headers()["x-date-logic"].to_str()?, "auto-previous-day");
    assert!(resp.headers()["x-server-time"].to_str()?.starts_with("2024-01-17T09:00:00"));

    let body: Value = resp.json().await?;
    let data = &body["data"];
    assert_eq!(data["symbols_total"], catalog::extended_symbols().len());
    assert_eq!(data["symbols_failed"], 0);
    assert_eq!(
        data["batches_processed"],
        catalog::extended_symbols().len().div_ceil(10)
    );
    assert_eq!(data["excel_filename"], "Full_Report_2024-01-16.xlsx");
    assert!(data["date_logic"].as_str().unwrap().contains("previous day"));

    let sent = server.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Full Report - 2024-01-16");
    assert_eq!(sent[0].recipients, vec!["ops@example.com", "extra@example.com"]);
    Ok(())
}

#[tokio::test]
async fn test_full_report_manual_date() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server
        .client
        .post(server.url("/api/v1/reports/full?date=2024-01-12"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-processed-date"].to_str()?, "2024-01-12");
    assert_eq!(resp.headers()["x-date-logic"].to_str()?, "manual");
    Ok(())
}

#[tokio::test]
async fn test_full_report_without_data_is_not_found() -> anyhow::Result<()> {
    let all = catalog::extended_symbols();
    let failing: Vec<&str> = all.iter().map(String::as_str).collect();
    let server = spawn_test_server(&failing, MockRenderer::default()).await?;

    let resp = server
        .client
        .post(server.url("/api/v1/reports/full?date=2024-01-15"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await?;
    assert_eq!(body["outcome"], "not_found");
    assert_eq!(body["errors"].as_array().unwrap().len(), all.len());
    assert!(server.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_excel_report_render_failure_is_internal_error() -> anyhow::Result<()> {
    let server = spawn_test_server(&[], MockRenderer::failing()).await?;

    let resp = server
        .client
        .post(server.url("/api/v1/reports/excel?symbols=AAPL&date=2024-01-15"))
        .basic_auth(USER, Some(PASS))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await?;
    assert!(body["error"].as_str().unwrap().contains("disk full"));
    assert!(server.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_excel_report_defaults_to_indices() -> anyhow::Result<()> {
    let server = default_server().await?;

    let resp = server
        .client
        .post(server.url("/api/v1/reports/excel?date=2024-01-15"))
        .basic_auth(USER, Some(PASS))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["symbols_total"], catalog::index_symbols().len());
    assert_eq!(body["data"]["excel_filename"], "Financial_Report_2024-01-15.xlsx");
    assert!(body["data"].get("date_logic").is_none());
    assert_eq!(server.stock_feed.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document_lists_routes() -> anyhow::Result<()> {
    let server = default_server().await?;

    let doc: Value = server
        .client
        .get(server.url("/api-docs/openapi.json"))
        .send()
        .await?
        .json()
        .await?;
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/health",
        "/api/v1/stocks",
        "/api/v1/stocks/{symbol}",
        "/api/v1/stocks/weekly",
        "/api/v1/reports/full",
    ] {
        assert!(paths.contains_key(path), "{}", path);
    }
    assert!(doc["components"]["securitySchemes"]["basic_auth"].is_object());
    Ok(())
}
