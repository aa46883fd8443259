//! 将成功的价格记录渲染为 xlsx 工作簿。

pub mod xlsx;

pub use xlsx::{ReportLayout, XlsxReportRenderer};
