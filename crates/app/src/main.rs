mod logging;
mod scheduler;
mod settings;

use std::sync::Arc;

use fintrack_api::middleware::auth::BasicCredentials;
use fintrack_api::server::{AppState, start_server};
use fintrack_core::common::time::{RealTimeProvider, TimeProvider};
use fintrack_core::config::StockFeedKind;
use fintrack_core::market::port::{PriceFeed, PriceProvider};
use fintrack_feed::alpha_vantage::AlphaVantageFeed;
use fintrack_feed::fmp::FmpFeed;
use fintrack_feed::polygon::PolygonFeed;
use fintrack_manager::ReportManager;
use fintrack_market::{BatchFetcher, HybridProvider};
use fintrack_notify::email::EmailNotifier;
use fintrack_report::{ReportLayout, XlsxReportRenderer};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::scheduler::WeeklySchedule;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 ReportManager。
///
/// # Logic
/// 1. 加载 `.env` 与分层配置，初始化全局日志，校验必填项。
/// 2. 安装 rustls 加密后端。
/// 3. 实例化数据源 (指数走 Alpha Vantage，股票按配置选择)。
/// 4. 组合路由器、渲染器、邮件通知器，构造 ReportManager。
/// 5. 按需启动周报定时任务。
/// 6. 启动 HTTP 服务，收到 Ctrl-C / SIGTERM 后优雅退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let dotenv = dotenvy::dotenv();
    let config = settings::load()?;
    let _log_guard = logging::init(&config.log);
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
    config.validate()?;
    info!("FinTrack starting...");

    // 2. TLS 后端
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    // 3. 数据源
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let index_feed: Arc<dyn PriceFeed> = Arc::new(
        AlphaVantageFeed::new(&config.providers.alpha_vantage_api_key)?.with_clock(clock.clone()),
    );
    let stock_feed: Arc<dyn PriceFeed> = match config.providers.stocks {
        StockFeedKind::Fmp => Arc::new(FmpFeed::new(&config.providers.fmp_api_key)?),
        StockFeedKind::Polygon => Arc::new(PolygonFeed::new(&config.providers.polygon_api_key)?),
    };

    // 4. 组合路由器与应用服务层
    let hybrid = HybridProvider::new(
        Arc::new(BatchFetcher::new(index_feed)),
        Arc::new(BatchFetcher::new(stock_feed)),
    );
    info!("Provider: {}", hybrid.info());
    let provider: Arc<dyn PriceProvider> = Arc::new(hybrid);

    let notifier = EmailNotifier::new(
        &config.email.host,
        config.email.port,
        &config.email.user,
        &config.email.pass,
        config.email.sender(),
    )?
    .with_clock(clock.clone());

    let reports = Arc::new(ReportManager::new(
        provider,
        Arc::new(XlsxReportRenderer::new(ReportLayout::Detailed).with_clock(clock.clone())),
        Arc::new(XlsxReportRenderer::new(ReportLayout::Weekly).with_clock(clock.clone())),
        Arc::new(notifier),
        config.email.default_recipients.clone(),
        clock,
    ));

    // 5. 周报定时任务
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = if config.schedule.enabled {
        let schedule = WeeklySchedule::from_config(&config.schedule)?;
        info!("Weekly report scheduled: {:?}", schedule);
        Some(tokio::spawn(scheduler::run(
            schedule,
            reports.clone(),
            shutdown_rx,
        )))
    } else {
        info!("Weekly report schedule disabled");
        None
    };

    // 6. HTTP 服务
    let state = AppState::new(
        reports,
        BasicCredentials::new(&config.auth.username, &config.auth.password),
    );
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    start_server(state, &bind_addr, shutdown_signal(shutdown_tx)).await?;

    if let Some(handle) = scheduler_task {
        if let Err(e) = handle.await {
            error!("Weekly scheduler task failed: {}", e);
        }
    }
    info!("FinTrack stopped");
    Ok(())
}

/// 等待 Ctrl-C 或 SIGTERM，并通知后台任务退出。
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    if shutdown.send(true).is_err() {
        debug!("No background task is listening for shutdown");
    }
}
