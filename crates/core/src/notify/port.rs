use crate::notify::entity::{DeliveryReport, Envelope};
use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 发送通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 每个收件人独立投递，结果逐一汇总。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 投递一封 (可带附件的) 通知。
    ///
    /// # Logic
    /// 1. 根据目标平台要求格式化消息。
    /// 2. 逐个收件人发送并记录结果。
    /// 3. 至少一个收件人成功即视为成功。
    ///
    /// # Arguments
    /// * `envelope` - 收件人、主题、正文与附件。
    ///
    /// # Returns
    /// * 成功返回按收件人汇总的 `DeliveryReport`。
    /// * 全部失败返回 `Err(NotifyError::Delivery)`。
    async fn deliver(&self, envelope: &Envelope) -> Result<DeliveryReport, NotifyError>;
}
