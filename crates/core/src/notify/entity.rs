use serde::{Deserialize, Serialize};

/// # Summary
/// 邮件正文格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyFormat {
    Html,
    Plain,
}

/// # Summary
/// 邮件附件。
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// # Summary
/// 一次投递请求的全部数据。
///
/// # Invariants
/// - `recipients` 已经过 `RecipientList::merge` 去重。
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
    pub attachment: Option<Attachment>,
    // 报表包含的记录数，HTML 模板中展示
    pub record_count: usize,
}

/// # Summary
/// 按收件人汇总的投递结果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    // (收件人, 错误信息)
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn is_partial(&self) -> bool {
        !self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// # Summary
/// 收件人列表构造器。
pub struct RecipientList;

impl RecipientList {
    /// # Summary
    /// 合并固定收件人与调用方追加的收件人。
    ///
    /// # Logic
    /// 1. 固定收件人按原顺序排在最前。
    /// 2. 追加列表按逗号拆分并去除空白。
    /// 3. 丢弃空地址与重复地址 (大小写不敏感)。
    ///
    /// # Arguments
    /// * `fixed`: 配置中始终包含的收件人。
    /// * `extra`: 逗号分隔的追加收件人，可为空。
    pub fn merge(fixed: &[String], extra: Option<&str>) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        let extras = extra.unwrap_or_default().split(',');
        for addr in fixed.iter().map(String::as_str).chain(extras) {
            let addr = addr.trim();
            if addr.is_empty() || merged.iter().any(|m| m.eq_ignore_ascii_case(addr)) {
                continue;
            }
            merged.push(addr.to_string());
        }
        merged
    }
}
