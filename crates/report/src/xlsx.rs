use chrono::{DateTime, Local};
use fintrack_core::common::format_date;
use fintrack_core::common::time::{RealTimeProvider, TimeProvider};
use fintrack_core::market::catalog::{self, SymbolClass};
use fintrack_core::market::entity::PriceRecord;
use fintrack_core::report::error::ReportError;
use fintrack_core::report::port::ReportRenderer;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 单张工作表的最大行数 (含表头)。
const MAX_ROWS: usize = 1_048_576;

const WEEKLY_SHEET: &str = "Weekly Data";
const WEEKLY_HEADERS: [&str; 11] = [
    "Status",
    "From",
    "Symbol",
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "AfterHours",
    "PreMarket",
];

const DETAILED_SHEET: &str = "Financial Report";
const DETAILED_HEADERS: [&str; 10] = [
    "Type", "Symbol", "Date", "Open", "High", "Low", "Close", "Volume", "Source", "Status",
];
const DETAILED_WIDTHS: [f64; 10] = [10.0, 12.0, 12.0, 12.0, 12.0, 12.0, 12.0, 15.0, 15.0, 10.0];

const SUMMARY_SHEET: &str = "Summary";

/// 工作簿版式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// 单表，11 列原始字段 (周报)。
    Weekly,
    /// 带类型列与样式表头的明细表，外加汇总表。
    Detailed,
}

/// # Summary
/// 基于 `rust_xlsxwriter` 的报表组装器。
///
/// # Invariants
/// - 每条记录恰好一行，表头位于第 0 行。
/// - 只在内存中生成，不落盘。
pub struct XlsxReportRenderer {
    layout: ReportLayout,
    // 汇总表的生成时间来源
    clock: Arc<dyn TimeProvider>,
}

impl XlsxReportRenderer {
    pub fn new(layout: ReportLayout) -> Self {
        Self {
            layout,
            clock: Arc::new(RealTimeProvider),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn layout(&self) -> ReportLayout {
        self.layout
    }
}

fn workbook_error(e: XlsxError) -> ReportError {
    ReportError::Workbook(e.to_string())
}

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn write_weekly(records: &[PriceRecord]) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(WEEKLY_SHEET)?;

    for (col, header) in (0u16..).zip(WEEKLY_HEADERS) {
        sheet.write_string(0, col, header)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, record.status.as_str())?;
        sheet.write_string(row, 1, record.source.as_str())?;
        sheet.write_string(row, 2, record.symbol.as_str())?;
        sheet.write_string(row, 3, format_date(record.date))?;
        sheet.write_number(row, 4, number(record.open))?;
        sheet.write_number(row, 5, number(record.high))?;
        sheet.write_number(row, 6, number(record.low))?;
        sheet.write_number(row, 7, number(record.close))?;
        sheet.write_number(row, 8, number(record.volume))?;
        sheet.write_number(row, 9, number(record.after_hours))?;
        sheet.write_number(row, 10, number(record.pre_market))?;
    }

    sheet.set_active(true);
    Ok(sheet)
}

fn write_detailed(records: &[PriceRecord]) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(DETAILED_SHEET)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_size(12)
        .set_background_color(Color::RGB(0xE6E6FA))
        .set_border(FormatBorder::Thin);

    for (col, (header, width)) in (0u16..).zip(DETAILED_HEADERS.into_iter().zip(DETAILED_WIDTHS)) {
        sheet.write_string_with_format(0, col, header, &header_format)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, catalog::classify(&record.symbol).to_string())?;
        sheet.write_string(row, 1, record.symbol.as_str())?;
        sheet.write_string(row, 2, format_date(record.date))?;
        sheet.write_number(row, 3, number(record.open))?;
        sheet.write_number(row, 4, number(record.high))?;
        sheet.write_number(row, 5, number(record.low))?;
        sheet.write_number(row, 6, number(record.close))?;
        sheet.write_number(row, 7, number(record.volume))?;
        sheet.write_string(row, 8, record.source.as_str())?;
        sheet.write_string(row, 9, record.status.as_str())?;
    }

    sheet.set_active(true);
    Ok(sheet)
}

/// # Summary
/// 汇总表内容，每个元素占一行，空字符串表示空行。
///
/// # Logic
/// 1. 标题、生成时间与记录总数。
/// 2. 按类型 (指数 / 股票) 统计。
/// 3. 按数据源统计，按名称排序。
pub fn summary_lines(records: &[PriceRecord], generated_at: DateTime<Local>) -> Vec<String> {
    let indices = records
        .iter()
        .filter(|r| catalog::classify(&r.symbol) == SymbolClass::Index)
        .count();
    let stocks = records.len() - indices;

    let mut sources: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *sources.entry(record.source.as_str()).or_default() += 1;
    }

    let mut lines = vec![
        "FINANCIAL REPORT SUMMARY".to_string(),
        format!("Generated at: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Total symbols: {}", records.len()),
        String::new(),
        "DISTRIBUTION BY TYPE:".to_string(),
        format!("Stocks: {}", stocks),
        format!("Indices: {}", indices),
        String::new(),
        "DATA SOURCES:".to_string(),
    ];
    lines.extend(
        sources
            .into_iter()
            .map(|(source, count)| format!("{}: {} symbols", source, count)),
    );
    lines
}

fn write_summary(lines: &[String]) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.set_column_width(0, 35)?;
    for (row, line) in (0u32..).zip(lines) {
        if !line.is_empty() {
            sheet.write_string(row, 0, line.as_str())?;
        }
    }
    Ok(sheet)
}

impl ReportRenderer for XlsxReportRenderer {
    /// # Summary
    /// 按版式生成工作簿字节。
    ///
    /// # Logic
    /// 1. 行数超过表格上限时直接拒绝。
    /// 2. Weekly 只有一张数据表；Detailed 还附带汇总表。
    /// 3. 保存到内存缓冲区。
    fn render(&self, records: &[PriceRecord]) -> Result<Vec<u8>, ReportError> {
        if records.len() >= MAX_ROWS {
            return Err(ReportError::Capacity(records.len()));
        }

        let mut workbook = Workbook::new();
        match self.layout {
            ReportLayout::Weekly => {
                workbook.push_worksheet(write_weekly(records).map_err(workbook_error)?);
            }
            ReportLayout::Detailed => {
                workbook.push_worksheet(write_detailed(records).map_err(workbook_error)?);
                let lines = summary_lines(records, self.clock.now());
                workbook.push_worksheet(write_summary(&lines).map_err(workbook_error)?);
            }
        }

        let bytes = workbook.save_to_buffer().map_err(workbook_error)?;
        debug!(
            "Rendered {:?} workbook: {} rows, {} bytes",
            self.layout,
            records.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}
