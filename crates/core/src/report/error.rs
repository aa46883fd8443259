use thiserror::Error;

/// # Summary
/// 报表生成错误。
#[derive(Error, Debug)]
pub enum ReportError {
    /// 工作簿写入失败
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// 数据超出表格容量
    #[error("Too many rows: {0}")]
    Capacity(usize),
}
