//! 批次抓取编排：单数据源编排器、指数/股票组合路由器与分块抓取策略。

pub mod chunked;
pub mod fetcher;
pub mod hybrid;

pub use chunked::{ChunkPolicy, fetch_in_chunks};
pub use fetcher::BatchFetcher;
pub use hybrid::HybridProvider;
