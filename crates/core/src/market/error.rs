use thiserror::Error;

/// # Summary
/// 行情抓取错误枚举，覆盖传输、协议、解析及空数据四类问题。
///
/// # Invariants
/// - 在数据源边界被捕获并转换为失败条目，不会中断整个批次。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    // 网络层错误 (连接失败、超时)
    #[error("Network error: {0}")]
    Network(String),
    // 数据源返回非成功 HTTP 状态码
    #[error("HTTP {0}")]
    Http(u16),
    // 响应体不是预期的 JSON 结构
    #[error("Parse error: {0}")]
    Parse(String),
    // 响应成功但没有对应日期的数据点
    #[error("Data not found")]
    NotFound,
    // 数据源在响应体中显式报告的错误 (限流、无效代码等)
    #[error("Provider error: {0}")]
    Provider(String),
    // 未分类错误 (如工作协程异常退出)
    #[error("Unknown error: {0}")]
    Unknown(String),
}
