use thiserror::Error;

/// # Summary
/// 通知服务错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 配置错误 (如 SMTP 主机、发件地址非法)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 邮件构建失败
    #[error("Message error: {0}")]
    Message(String),

    /// 所有收件人均投递失败
    #[error("Could not deliver to any recipient: {0}")]
    Delivery(String),
}
