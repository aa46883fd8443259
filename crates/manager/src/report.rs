use crate::body;
use chrono::NaiveDate;
use fintrack_core::common::time::TimeProvider;
use fintrack_core::common::{format_date, week_dates};
use fintrack_core::market::catalog;
use fintrack_core::market::entity::{BatchResult, FailureEntry, PriceRecord};
use fintrack_core::market::port::PriceProvider;
use fintrack_core::notify::entity::{
    Attachment, BodyFormat, DeliveryReport, Envelope, RecipientList,
};
use fintrack_core::notify::error::NotifyError;
use fintrack_core::notify::port::Notifier;
use fintrack_core::report::error::ReportError;
use fintrack_core::report::port::ReportRenderer;
use fintrack_market::{ChunkPolicy, fetch_in_chunks};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// # Summary
/// Manager 层的统一错误类型。
#[derive(Error, Debug)]
pub enum ManagerError {
    /// 批次没有任何成功记录，不生成空报表
    #[error("No data found for the requested symbols")]
    NoData { failures: Vec<FailureEntry> },
    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
    #[error("Email delivery failed: {0}")]
    Delivery(#[from] NotifyError),
}

/// 报表种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Excel,
    Full,
    Weekly,
}

/// # Summary
/// 指定代码报表请求。
#[derive(Debug, Clone)]
pub struct ReportRequest {
    // 为空时使用指数目录
    pub symbols: Option<Vec<String>>,
    pub date: NaiveDate,
    // 逗号分隔的追加收件人
    pub recipient: Option<String>,
}

/// # Summary
/// 一次报表投递的结果摘要。
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub kind: ReportKind,
    pub dates: Vec<NaiveDate>,
    pub recipients: Vec<String>,
    pub symbols_total: usize,
    pub results: Vec<PriceRecord>,
    pub failures: Vec<FailureEntry>,
    pub filename: String,
    pub size_bytes: usize,
    // 分块数 (非分块报表为 1)
    pub batches: usize,
    pub delivery: DeliveryReport,
}

// 渲染与投递前的报表草稿
struct ReportDraft {
    kind: ReportKind,
    batch: BatchResult,
    dates: Vec<NaiveDate>,
    symbols_total: usize,
    batches: usize,
    recipients: Vec<String>,
    subject: String,
    filename: String,
    body: String,
}

/// # Summary
/// 报表管理器，系统的应用服务层门面 (Facade)。
/// 只依赖 `fintrack-core` 中的接口，具体实现通过构造函数注入。
///
/// # Invariants
/// - 共享提供者上的 clear → fetch → snapshot 由 `batch_lock` 串行化，
///   并发请求不会互相混入结果。
/// - 没有成功记录时不渲染也不发送。
pub struct ReportManager {
    provider: Arc<dyn PriceProvider>,
    // 批次边界锁
    batch_lock: Mutex<()>,
    // 指定代码 / 全目录报表使用的渲染器
    detailed: Arc<dyn ReportRenderer>,
    // 周报渲染器
    weekly: Arc<dyn ReportRenderer>,
    notifier: Arc<dyn Notifier>,
    // 每封邮件都包含的收件人
    fixed_recipients: Vec<String>,
    clock: Arc<dyn TimeProvider>,
    chunk_policy: ChunkPolicy,
}

impl ReportManager {
    /// # Summary
    /// 创建 ReportManager 实例。
    ///
    /// # Arguments
    /// * `provider` - 批次价格提供者 (通常是组合路由器)。
    /// * `detailed` - 明细版式渲染器。
    /// * `weekly` - 周报版式渲染器。
    /// * `notifier` - 邮件投递接口。
    /// * `fixed_recipients` - 固定收件人。
    /// * `clock` - 时间供给器。
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        detailed: Arc<dyn ReportRenderer>,
        weekly: Arc<dyn ReportRenderer>,
        notifier: Arc<dyn Notifier>,
        fixed_recipients: Vec<String>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            provider,
            batch_lock: Mutex::new(()),
            detailed,
            weekly,
            notifier,
            fixed_recipients,
            clock,
            chunk_policy: ChunkPolicy::default(),
        }
    }

    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    pub fn clock(&self) -> &Arc<dyn TimeProvider> {
        &self.clock
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn daily_call_limit(&self) -> u32 {
        self.provider.daily_call_limit()
    }

    pub fn provider_for(&self, symbol: &str) -> String {
        self.provider.provider_for(symbol)
    }

    /// 合并固定收件人与追加收件人。
    pub fn recipients_for(&self, extra: Option<&str>) -> Vec<String> {
        RecipientList::merge(&self.fixed_recipients, extra)
    }

    /// # Summary
    /// 抓取单个代码单个日期。
    pub async fn fetch_symbol(&self, symbol: &str, date: NaiveDate) -> BatchResult {
        let _batch = self.batch_lock.lock().await;
        self.provider.clear();
        if let Err(failure) = self.provider.fetch_one(symbol, date).await {
            info!("Single fetch failed: {}", failure);
        }
        self.provider.snapshot()
    }

    /// # Summary
    /// 以一个独立批次抓取 symbols × dates。
    ///
    /// # Logic
    /// 1. 获取批次锁。
    /// 2. 清空提供者状态后抓取。
    /// 3. 编排层错误只记录日志，已完成部分照常返回。
    async fn fetch_batch(&self, symbols: &[String], dates: &[NaiveDate]) -> BatchResult {
        let _batch = self.batch_lock.lock().await;
        self.provider.clear();
        if let Err(e) = self.provider.fetch_many(symbols, dates).await {
            warn!("Batch fetch stopped early: {}", e);
        }
        self.provider.snapshot()
    }

    pub async fn fetch_symbols(&self, symbols: &[String], date: NaiveDate) -> BatchResult {
        self.fetch_batch(symbols, &[date]).await
    }

    /// 抓取当前自然周周一至周五的数据。
    pub async fn fetch_week(&self, symbols: &[String]) -> BatchResult {
        let dates = week_dates(self.clock.today());
        self.fetch_batch(symbols, &dates).await
    }

    /// # Summary
    /// 渲染并投递报表。
    ///
    /// # Logic
    /// 1. 没有成功记录时返回 `NoData`，不渲染。
    /// 2. 渲染工作簿并作为附件发送给全部收件人。
    async fn deliver_report(&self, draft: ReportDraft) -> Result<ReportSummary, ManagerError> {
        let ReportDraft {
            kind,
            batch,
            dates,
            symbols_total,
            batches,
            recipients,
            subject,
            filename,
            body,
        } = draft;

        if batch.results.is_empty() {
            warn!("{:?} report skipped: no data ({} failures)", kind, batch.failures.len());
            return Err(ManagerError::NoData {
                failures: batch.failures,
            });
        }

        let renderer = match kind {
            ReportKind::Weekly => &self.weekly,
            ReportKind::Excel | ReportKind::Full => &self.detailed,
        };
        let bytes = renderer.render(&batch.results)?;
        let size_bytes = bytes.len();

        let envelope = Envelope {
            recipients: recipients.clone(),
            subject,
            body,
            format: BodyFormat::Html,
            attachment: Some(Attachment {
                filename: filename.clone(),
                content_type: renderer.content_type().to_string(),
                bytes,
            }),
            record_count: batch.results.len(),
        };
        let delivery = self.notifier.deliver(&envelope).await?;
        info!(
            "{:?} report '{}' delivered to {}/{} recipients",
            kind,
            filename,
            delivery.delivered.len(),
            recipients.len()
        );

        Ok(ReportSummary {
            kind,
            dates,
            recipients,
            symbols_total,
            results: batch.results,
            failures: batch.failures,
            filename,
            size_bytes,
            batches,
            delivery,
        })
    }

    /// # Summary
    /// 指定代码报表。
    ///
    /// # Logic
    /// 1. 未指定代码时使用指数目录。
    /// 2. 以单一批次抓取请求日期。
    /// 3. 明细版式渲染并发送。
    pub async fn send_excel_report(&self, req: ReportRequest) -> Result<ReportSummary, ManagerError> {
        let symbols = req
            .symbols
            .filter(|s| !s.is_empty())
            .unwrap_or_else(catalog::index_symbols);
        let batch = self.fetch_symbols(&symbols, req.date).await;
        let day = format_date(req.date);

        self.deliver_report(ReportDraft {
            kind: ReportKind::Excel,
            body: body::excel_body(req.date, &batch),
            batch,
            dates: vec![req.date],
            symbols_total: symbols.len(),
            batches: 1,
            recipients: self.recipients_for(req.recipient.as_deref()),
            subject: format!("Financial Report - {}", day),
            filename: format!("Financial_Report_{}.xlsx", day),
        })
        .await
    }

    /// # Summary
    /// 全目录报表 (指数 + 股票)。
    ///
    /// # Logic
    /// 1. 持有批次锁，按分块策略逐块抓取。
    /// 2. 正文附带股票 / 指数统计。
    pub async fn send_full_report(
        &self,
        date: NaiveDate,
        recipient: Option<&str>,
    ) -> Result<ReportSummary, ManagerError> {
        let symbols = catalog::extended_symbols();
        let (batch, chunks) = {
            let _batch = self.batch_lock.lock().await;
            fetch_in_chunks(self.provider.as_ref(), &symbols, &[date], self.chunk_policy).await
        };
        info!(
            "Full report for {}: {} ok, {} failed in {} chunks",
            date,
            batch.results.len(),
            batch.failures.len(),
            chunks
        );
        let day = format_date(date);

        self.deliver_report(ReportDraft {
            kind: ReportKind::Full,
            body: body::full_body(date, &batch),
            batch,
            dates: vec![date],
            symbols_total: symbols.len(),
            batches: chunks,
            recipients: self.recipients_for(recipient),
            subject: format!("Full Report - {}", day),
            filename: format!("Full_Report_{}.xlsx", day),
        })
        .await
    }

    /// # Summary
    /// 周报：全目录 × 本周工作日，周报版式，仅发送给固定收件人。
    pub async fn send_weekly_report(&self) -> Result<ReportSummary, ManagerError> {
        let symbols = catalog::extended_symbols();
        let dates = week_dates(self.clock.today());
        let batch = self.fetch_batch(&symbols, &dates).await;
        let monday = dates.first().copied().map(format_date).unwrap_or_default();

        self.deliver_report(ReportDraft {
            kind: ReportKind::Weekly,
            body: body::weekly_body(&batch),
            batch,
            dates,
            symbols_total: symbols.len(),
            batches: 1,
            recipients: self.recipients_for(None),
            subject: "Weekly Data Report".to_string(),
            filename: format!("Weekly_Report_{}.xlsx", monday),
        })
        .await
    }
}
