use chrono::{Local, NaiveDate, TimeZone};
use fintrack_core::common::time::FakeClockProvider;
use fintrack_core::market::catalog;
use fintrack_core::market::port::PriceProvider;
use fintrack_core::test_utils::{MockFeed, MockNotifier, MockRenderer};
use fintrack_manager::{ManagerError, ReportKind, ReportManager, ReportRequest};
use fintrack_market::{BatchFetcher, ChunkPolicy, HybridProvider};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    manager: Arc<ReportManager>,
    detailed: Arc<MockRenderer>,
    weekly: Arc<MockRenderer>,
    notifier: Arc<MockNotifier>,
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn fixed() -> Vec<String> {
    vec!["ops@example.com".to_string(), "desk@example.com".to_string()]
}

/// # Summary
/// 组装完整的依赖图：两个模拟数据源 → 组合路由器 → ReportManager。
fn harness(failing: &[&str], detailed: MockRenderer, notifier: MockNotifier) -> Harness {
    let index_feed = MockFeed::new("IndexFeed")
        .with_latency(Duration::ZERO)
        .failing(failing);
    let stock_feed = MockFeed::new("StockFeed")
        .with_latency(Duration::ZERO)
        .failing(failing);
    let provider: Arc<dyn PriceProvider> = Arc::new(HybridProvider::new(
        Arc::new(BatchFetcher::new(Arc::new(index_feed))),
        Arc::new(BatchFetcher::new(Arc::new(stock_feed))),
    ));

    // 2024-01-17 是周三
    let clock = Arc::new(FakeClockProvider::new(
        Local.with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap(),
    ));
    let detailed = Arc::new(detailed);
    let weekly = Arc::new(MockRenderer::default());
    let notifier = Arc::new(notifier);

    let manager = ReportManager::new(
        provider,
        detailed.clone(),
        weekly.clone(),
        notifier.clone(),
        fixed(),
        clock,
    )
    .with_chunk_policy(ChunkPolicy {
        size: 10,
        pause: Duration::ZERO,
    });

    Harness {
        manager: Arc::new(manager),
        detailed,
        weekly,
        notifier,
    }
}

fn default_harness() -> Harness {
    harness(&[], MockRenderer::default(), MockNotifier::default())
}

#[tokio::test]
async fn test_excel_report_defaults_to_indices() -> anyhow::Result<()> {
    let h = default_harness();

    let summary = h
        .manager
        .send_excel_report(ReportRequest {
            symbols: None,
            date: day(),
            recipient: Some(" analyst@example.com , OPS@example.com".to_string()),
        })
        .await?;

    assert_eq!(summary.kind, ReportKind::Excel);
    assert_eq!(summary.symbols_total, catalog::INDEX_SYMBOLS.len());
    assert_eq!(summary.results.len(), catalog::INDEX_SYMBOLS.len());
    assert!(summary.results.iter().all(|r| r.source == "IndexFeed"));
    assert_eq!(summary.filename, "Financial_Report_2024-01-15.xlsx");
    assert_eq!(
        summary.recipients,
        vec!["ops@example.com", "desk@example.com", "analyst@example.com"]
    );

    assert_eq!(h.detailed.calls(), 1);
    assert_eq!(h.weekly.calls(), 0);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Financial Report - 2024-01-15");
    assert_eq!(sent[0].record_count, 6);
    let attachment = sent[0].attachment.as_ref().unwrap();
    assert!(attachment.bytes.starts_with(b"PK"));
    Ok(())
}

/// # Summary
/// 5 个代码全部失败：返回 NoData，不渲染也不发送。
#[tokio::test]
async fn test_no_data_skips_render_and_delivery() {
    let list = ["SPX", "NDX", "AAPL", "MSFT", "NVDA"];
    let h = harness(&list, MockRenderer::default(), MockNotifier::default());

    let err = h
        .manager
        .send_excel_report(ReportRequest {
            symbols: Some(list.iter().map(|s| s.to_string()).collect()),
            date: day(),
            recipient: None,
        })
        .await
        .unwrap_err();

    match err {
        ManagerError::NoData { failures } => assert_eq!(failures.len(), 5),
        other => panic!("expected NoData, got {:?}", other),
    }
    assert_eq!(h.detailed.calls(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_render_and_delivery_errors_propagate() {
    let req = ReportRequest {
        symbols: Some(vec!["AAPL".to_string()]),
        date: day(),
        recipient: None,
    };

    let broken_renderer = harness(&[], MockRenderer::failing(), MockNotifier::default());
    let err = broken_renderer
        .manager
        .send_excel_report(req.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Report(_)));
    assert!(err.to_string().contains("disk full"));

    let broken_smtp = harness(&[], MockRenderer::default(), MockNotifier::failing());
    let err = broken_smtp.manager.send_excel_report(req).await.unwrap_err();
    assert!(matches!(err, ManagerError::Delivery(_)));
}

#[tokio::test]
async fn test_full_report_chunks_catalog() -> anyhow::Result<()> {
    let h = harness(&["TSLA", "SPX"], MockRenderer::default(), MockNotifier::default());
    let total = catalog::extended_symbols().len();

    let summary = h.manager.send_full_report(day(), None).await?;

    assert_eq!(summary.kind, ReportKind::Full);
    assert_eq!(summary.symbols_total, total);
    assert_eq!(summary.batches, total.div_ceil(10));
    assert_eq!(summary.results.len(), total - 2);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.recipients, fixed());

    let sent = h.notifier.sent();
    assert_eq!(sent[0].subject, "Full Report - 2024-01-15");
    assert!(sent[0].body.contains("Stocks fetched"));
    assert!(sent[0].body.contains("TSLA (2024-01-15)"));
    Ok(())
}

#[tokio::test]
async fn test_weekly_report_uses_current_week() -> anyhow::Result<()> {
    let h = default_harness();

    let summary = h.manager.send_weekly_report().await?;

    let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    assert_eq!(summary.dates.len(), 5);
    assert_eq!(summary.dates[0], monday);
    assert_eq!(summary.dates[4], NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());
    assert_eq!(summary.results.len(), catalog::extended_symbols().len() * 5);
    assert_eq!(summary.filename, "Weekly_Report_2024-01-15.xlsx");

    assert_eq!(h.weekly.calls(), 1);
    assert_eq!(h.detailed.calls(), 0);
    assert_eq!(h.notifier.sent()[0].subject, "Weekly Data Report");
    Ok(())
}

/// # Summary
/// 并发的两个批次互不混入对方的结果。
#[tokio::test]
async fn test_concurrent_batches_are_isolated() {
    let h = default_harness();
    let first: Vec<String> = ["AAPL", "MSFT", "SPX"].iter().map(|s| s.to_string()).collect();
    let second: Vec<String> = ["TSLA", "NDX"].iter().map(|s| s.to_string()).collect();

    let (m1, m2) = (h.manager.clone(), h.manager.clone());
    let (s1, s2) = (first.clone(), second.clone());
    let a = tokio::spawn(async move { m1.fetch_symbols(&s1, day()).await });
    let b = tokio::spawn(async move { m2.fetch_symbols(&s2, day()).await });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_eq!(a.results.len(), 3);
    assert!(a.results.iter().all(|r| first.contains(&r.symbol)));
    assert_eq!(b.results.len(), 2);
    assert!(b.results.iter().all(|r| second.contains(&r.symbol)));
}

#[tokio::test]
async fn test_fetch_symbol_and_week() {
    let h = harness(&["ZZZZ"], MockRenderer::default(), MockNotifier::default());

    let single = h.manager.fetch_symbol("DJI", day()).await;
    assert_eq!(single.results.len(), 1);
    assert_eq!(single.results[0].source, "IndexFeed");

    let missing = h.manager.fetch_symbol("ZZZZ", day()).await;
    assert!(missing.results.is_empty());
    assert_eq!(missing.failures.len(), 1);

    let week = h.manager.fetch_week(&["AAPL".to_string()]).await;
    assert_eq!(week.results.len(), 5);
    assert_eq!(h.manager.provider_for("SPX"), "IndexFeed");
}
