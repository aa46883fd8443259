//! # 配置加载
//!
//! 按 默认值 → 配置文件 → 环境变量 的顺序逐层覆盖。

use config::{Config, ConfigError, Environment, File};
use fintrack_core::config::AppConfig;

/// 环境变量前缀，如 `FINTRACK__SERVER__PORT=9000`
const ENV_PREFIX: &str = "FINTRACK";
/// 指定配置文件路径的环境变量
const CONFIG_PATH_VAR: &str = "FINTRACK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "fintrack";

/// 从默认位置加载配置。
pub fn load() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(&path)
}

/// # Summary
/// 从指定文件加载配置，文件不存在时只使用默认值与环境变量。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 作为最底层。
/// 2. 叠加可选的配置文件 (格式由扩展名推断)。
/// 3. 叠加 `FINTRACK__` 前缀的环境变量，`email.default_recipients` 按逗号拆分。
pub fn load_from(path: &str) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default())?;

    Config::builder()
        .add_source(defaults)
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("email.default_recipients")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::config::StockFeedKind;
    use std::io::Write;

    #[test]
    fn test_missing_file_keeps_defaults() {
        let config = load_from("does/not/exist/fintrack").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.schedule.weekday, "Fri");
        assert!(config.email.from.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[providers]
stocks = "polygon"
polygon_api_key = "pk"

[email]
host = "smtp.example.com"
default_recipients = ["ops@example.com", "desk@example.com"]

[schedule]
enabled = true
hour = 7
"#
        )
        .unwrap();

        let config = load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.providers.stocks, StockFeedKind::Polygon);
        assert_eq!(config.providers.polygon_api_key, "pk");
        assert_eq!(config.email.port, 587);
        assert_eq!(config.email.default_recipients.len(), 2);
        assert!(config.schedule.enabled);
        assert_eq!(config.schedule.hour, 7);
        assert_eq!(config.schedule.minute, 0);
    }
}
