use crate::market::entity::PriceRecord;
use crate::report::error::ReportError;

/// 电子表格附件的 MIME 类型。
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// # Summary
/// 报表组装器接口：将成功记录渲染为二进制工作簿。
///
/// # Invariants
/// - 纯函数语义：相同输入得到等价输出，不产生外部副作用。
pub trait ReportRenderer: Send + Sync {
    /// # Summary
    /// 渲染报表。
    ///
    /// # Arguments
    /// * `records`: 一行一条的成功记录。
    ///
    /// # Returns
    /// 成功返回工作簿字节，失败返回 `ReportError`。
    fn render(&self, records: &[PriceRecord]) -> Result<Vec<u8>, ReportError>;

    /// 附件的 MIME 类型。
    fn content_type(&self) -> &str {
        XLSX_CONTENT_TYPE
    }
}
