use chrono::{Local, NaiveDate, TimeZone};
use fintrack_core::common::time::FakeClockProvider;
use fintrack_core::market::entity::{Ohlcv, PriceRecord};
use fintrack_core::report::port::{ReportRenderer, XLSX_CONTENT_TYPE};
use fintrack_report::{ReportLayout, XlsxReportRenderer};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn records() -> Vec<PriceRecord> {
    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let bar = Ohlcv {
        open: dec!(185.5),
        high: dec!(187.25),
        low: dec!(184.75),
        close: dec!(186.5),
        volume: dec!(52000000),
    };
    vec![
        PriceRecord::ok("Alpha Vantage", "SPX", date, bar),
        PriceRecord::ok("Polygon", "AAPL", date, bar).with_extended_hours(dec!(187), dec!(185)),
    ]
}

/// # Summary
/// 两种版式都能生成合法的 zip 容器 (xlsx)。
#[test]
fn test_render_both_layouts() {
    for layout in [ReportLayout::Weekly, ReportLayout::Detailed] {
        let renderer = XlsxReportRenderer::new(layout);
        let bytes = renderer.render(&records()).unwrap();
        assert!(bytes.starts_with(b"PK"), "{:?} is not a zip archive", layout);
        assert_eq!(renderer.content_type(), XLSX_CONTENT_TYPE);
    }
}

#[test]
fn test_detailed_is_larger_than_weekly() {
    let clock = Arc::new(FakeClockProvider::new(
        Local.with_ymd_and_hms(2024, 1, 15, 16, 0, 0).unwrap(),
    ));
    let weekly = XlsxReportRenderer::new(ReportLayout::Weekly)
        .render(&records())
        .unwrap();
    let detailed = XlsxReportRenderer::new(ReportLayout::Detailed)
        .with_clock(clock)
        .render(&records())
        .unwrap();
    // 明细版式多出汇总表与样式
    assert!(detailed.len() > weekly.len());
}

#[test]
fn test_render_empty_input() {
    let bytes = XlsxReportRenderer::new(ReportLayout::Weekly)
        .render(&[])
        .unwrap();
    assert!(bytes.starts_with(b"PK"));
}
