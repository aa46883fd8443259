//! 应用服务层：批次抓取、报表生成与邮件投递的编排。

pub mod body;
pub mod report;

pub use report::{ManagerError, ReportKind, ReportManager, ReportRequest, ReportSummary};
