use chrono::NaiveDate;
use fintrack_core::market::entity::BatchResult;
use fintrack_core::market::port::PriceProvider;
use std::time::Duration;
use tracing::{info, warn};

/// # Summary
/// 大批量代码的分块策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// 每块的代码数量，至少为 1。
    pub size: usize,
    /// 两块之间的暂停。
    pub pause: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            size: 10,
            pause: Duration::from_millis(100),
        }
    }
}

/// # Summary
/// 分块调用提供者，逐块清空、抓取并拷出结果。
///
/// # Logic
/// 1. 按 `policy.size` 切分代码列表。
/// 2. 每块先 `clear`，再 `fetch_many`，然后拷出快照并追加到总结果。
/// 3. 块与块之间暂停 `policy.pause`，最后一块之后不暂停。
/// 4. 单块返回错误只记录日志，已完成部分照常保留。
///
/// # Returns
/// 合并后的批次结果与处理的块数。
pub async fn fetch_in_chunks(
    provider: &dyn PriceProvider,
    symbols: &[String],
    dates: &[NaiveDate],
    policy: ChunkPolicy,
) -> (BatchResult, usize) {
    let mut merged = BatchResult::default();
    let mut processed = 0;
    let chunks: Vec<&[String]> = symbols.chunks(policy.size.max(1)).collect();
    let total = chunks.len();

    for (idx, chunk) in chunks.into_iter().enumerate() {
        info!("Processing chunk {}/{} ({} symbols)", idx + 1, total, chunk.len());
        provider.clear();
        if let Err(e) = provider.fetch_many(chunk, dates).await {
            warn!("Chunk {}/{} stopped early: {}", idx + 1, total, e);
        }
        merged.extend(provider.snapshot());
        processed += 1;

        if idx + 1 < total && !policy.pause.is_zero() {
            tokio::time::sleep(policy.pause).await;
        }
    }

    (merged, processed)
}
