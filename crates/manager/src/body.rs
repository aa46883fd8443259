//! 报表邮件正文 (HTML 片段，由通知器套入模板)。

use chrono::NaiveDate;
use fintrack_core::common::format_date;
use fintrack_core::market::catalog;
use fintrack_core::market::entity::{BatchResult, FailureEntry};

const INDEX_QUOTA_WARNING: &str = r#"<div class="warning">
<strong>Index data:</strong><br>
No index prices could be fetched. Possible causes:<br>
&bull; The index data source reached its daily call limit<br>
&bull; Call limits reset every 24 hours<br>
&bull; Consider a stocks-only report or a premium plan
</div>"#;

/// 按类型统计成功记录：(股票, 指数)。
pub fn type_counts(batch: &BatchResult) -> (usize, usize) {
    let indices = batch
        .results
        .iter()
        .filter(|r| catalog::is_index(&r.symbol))
        .count();
    (batch.results.len() - indices, indices)
}

/// 转义 HTML 特殊字符。失败条目含有调用方代码与数据源返回的文本。
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn failure_list(failures: &[FailureEntry]) -> String {
    failures
        .iter()
        .map(|f| escape_html(f.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 有指数失败且没有任何指数成功时，提示可能触及配额。
fn index_quota_exhausted(batch: &BatchResult) -> bool {
    let (_, indices) = type_counts(batch);
    indices == 0 && batch.failures.iter().any(|f| catalog::is_index(f.symbol()))
}

fn failure_section(batch: &BatchResult, with_count: bool) -> String {
    if batch.failures.is_empty() {
        return String::new();
    }
    let mut section = if with_count {
        format!(
            "<p>Warning: no data could be fetched for {} symbols: {}</p>",
            batch.failures.len(),
            failure_list(&batch.failures)
        )
    } else {
        format!(
            "<p>Warning: no data could be fetched for: {}</p>",
            failure_list(&batch.failures)
        )
    };
    if index_quota_exhausted(batch) {
        section.push('\n');
        section.push_str(INDEX_QUOTA_WARNING);
    }
    section
}

/// 指定代码报表的正文。
pub fn excel_body(date: NaiveDate, batch: &BatchResult) -> String {
    let mut body = format!(
        "<p>Attached is the financial report for {}.</p>",
        format_date(date)
    );
    body.push_str(&failure_section(batch, false));
    body
}

/// 全目录报表的正文，包含股票 / 指数汇总。
pub fn full_body(date: NaiveDate, batch: &BatchResult) -> String {
    let (stocks, indices) = type_counts(batch);
    let mut body = format!(
        "<p>Attached is the full report with {} symbols for {}.</p>\n\
         <p>Report summary:<br>&bull; Stocks fetched: {}<br>&bull; Indices fetched: {}</p>",
        batch.results.len(),
        format_date(date),
        stocks,
        indices
    );
    body.push_str(&failure_section(batch, true));
    body
}

pub fn weekly_body(batch: &BatchResult) -> String {
    let mut body = "<p>Attached is the weekly financial data report.</p>".to_string();
    if !batch.failures.is_empty() {
        body.push_str(&format!(
            "<p>Failures: no data could be fetched for: {}</p>",
            failure_list(&batch.failures)
        ));
    }
    body
}
