//! 静态证券目录：指数代码、股票代码及两者合并后的扩展集合。

use serde::{Deserialize, Serialize};

/// 由指数数据源负责的规范指数代码。
pub const INDEX_SYMBOLS: &[&str] = &[
    "SPX",  // S&P 500
    "NDX",  // Nasdaq 100
    "DJI",  // Dow Jones Industrial Average
    "NYA",  // NYSE Composite
    "ES_F", // E-mini S&P 500 Futures
    "NQ_F", // E-mini Nasdaq 100 Futures
];

/// 每日抓取的普通股票 / ETF 代码。
pub const STOCK_SYMBOLS: &[&str] = &[
    // 宽基 ETF
    "SPY", "QQQ", "IWM", "DIA", "SMH",
    // 债券与反向 ETF
    "TLT", "PSQ", "SH",
    // 个股
    "NFLX", "COST", "NVDA", "META", "MSFT", "AMZN", "GOOG", "AAPL", "TSLA", "PLTR",
    "AMD", "MSTR", "LLY", "AVGO", "UNH", "PFE",
    "BRK.B",
    // 商品
    "GLD", "SLV",
    // 杠杆 ETF
    "TQQQ", "SQQQ", "UPRO", "SPXS", "UDOW", "SDOW", "URTY", "SRTY",
    // SPDR 行业 ETF
    "XLC", "XLF", "XLE", "XLK", "XLY", "XLI", "XLB", "XLRE", "XLP", "XLV", "XLU",
    "ETH",
    // 加密货币 ETF
    "IBIT",
];

/// # Summary
/// 证券分类，决定由哪个数据源负责。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolClass {
    Index,
    Plain,
}

impl std::fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolClass::Index => write!(f, "Index"),
            SymbolClass::Plain => write!(f, "Stock"),
        }
    }
}

/// 是否为已知指数代码；未知代码一律视为普通股票。
pub fn is_index(symbol: &str) -> bool {
    INDEX_SYMBOLS.contains(&symbol)
}

pub fn classify(symbol: &str) -> SymbolClass {
    if is_index(symbol) {
        SymbolClass::Index
    } else {
        SymbolClass::Plain
    }
}

/// 目标指数列表。
pub fn index_symbols() -> Vec<String> {
    INDEX_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

/// 股票列表。
pub fn stock_symbols() -> Vec<String> {
    STOCK_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

/// 指数在前、股票在后的完整目录。
pub fn extended_symbols() -> Vec<String> {
    INDEX_SYMBOLS
        .iter()
        .chain(STOCK_SYMBOLS.iter())
        .map(|s| s.to_string())
        .collect()
}

/// 规范代码允许的字符：大写字母、数字与 `. _ = ^ : -`。
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || "._=^:-".contains(c))
}

/// 将逗号分隔的代码列表拆分为去空白、非空的大写代码。
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}
