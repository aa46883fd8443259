use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid setting {0}: {1}")]
    Invalid(String, String),
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub providers: ProviderConfig,
    pub email: EmailConfig,
    pub schedule: ScheduleConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Basic 鉴权凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

/// 普通股票使用的数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockFeedKind {
    Fmp,
    Polygon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub stocks: StockFeedKind,
    pub fmp_api_key: String,
    pub alpha_vantage_api_key: String,
    pub polygon_api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    // 发件地址，缺省使用 `user`
    pub from: Option<String>,
    // 每份报表固定包含的收件人
    pub default_recipients: Vec<String>,
}

impl EmailConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.user)
    }
}

/// 周报定时任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub weekday: String,
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleConfig {
    pub fn weekday(&self) -> Result<Weekday, ConfigError> {
        self.weekday
            .parse::<Weekday>()
            .map_err(|_| ConfigError::Invalid("schedule.weekday".into(), self.weekday.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    // 日志过滤指令，`RUST_LOG` 优先
    pub level: String,
    // 滚动日志目录，为空时只输出到标准输出
    pub dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            auth: AuthConfig {
                username: String::new(),
                password: String::new(),
            },
            providers: ProviderConfig {
                stocks: StockFeedKind::Fmp,
                fmp_api_key: String::new(),
                alpha_vantage_api_key: String::new(),
                polygon_api_key: String::new(),
            },
            email: EmailConfig {
                host: String::new(),
                port: 587,
                user: String::new(),
                pass: String::new(),
                from: None,
                default_recipients: Vec::new(),
            },
            schedule: ScheduleConfig {
                enabled: false,
                weekday: "Fri".to_string(),
                hour: 9,
                minute: 0,
            },
            log: LogConfig {
                level: "info".to_string(),
                dir: None,
            },
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 启动前校验必填配置。
    ///
    /// # Logic
    /// 1. 收集所有为空的必填项，一次性报告。
    /// 2. 只要求当前选用的普通股票数据源的密钥。
    /// 3. 校验定时任务的星期与时刻。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        let mut require = |name: &str, value: &str| {
            if value.trim().is_empty() {
                missing.push(name.to_string());
            }
        };

        require("auth.username", &self.auth.username);
        require("auth.password", &self.auth.password);
        require("providers.alpha_vantage_api_key", &self.providers.alpha_vantage_api_key);
        match self.providers.stocks {
            StockFeedKind::Fmp => require("providers.fmp_api_key", &self.providers.fmp_api_key),
            StockFeedKind::Polygon => {
                require("providers.polygon_api_key", &self.providers.polygon_api_key)
            }
        }
        require("email.host", &self.email.host);
        require("email.user", &self.email.user);
        require("email.pass", &self.email.pass);

        if self.email.default_recipients.iter().all(|r| r.trim().is_empty()) {
            missing.push("email.default_recipients".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        self.schedule.weekday()?;
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(ConfigError::Invalid(
                "schedule".into(),
                format!("{:02}:{:02}", self.schedule.hour, self.schedule.minute),
            ));
        }
        Ok(())
    }
}
