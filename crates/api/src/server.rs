//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 持有并调用。

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use fintrack_manager::ReportManager;

use crate::middleware::auth::{BasicCredentials, basic_auth_middleware};
use crate::routes::{catalog, health, reports, stocks};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - `reports` 在服务启动前注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 报表管理器 (Facade)
    pub reports: Arc<ReportManager>,
    /// 受保护接口的 Basic 账号
    pub credentials: Arc<BasicCredentials>,
}

impl AppState {
    pub fn new(reports: Arc<ReportManager>, credentials: BasicCredentials) -> Self {
        Self {
            reports,
            credentials: Arc::new(credentials),
        }
    }
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FinTrack API",
        version = "0.1.0",
        description = "股票与指数日线价格的查询、Excel 报表生成与邮件投递。",
        contact(name = "FinTrack Team"),
        license(name = "MIT")
    ),
    tags(
        (name = "系统 (System)", description = "健康检查"),
        (name = "行情 (Stocks)", description = "单代码、多代码与本周价格查询"),
        (name = "目录 (Catalog)", description = "支持的代码与数据源路由"),
        (name = "报表 (Reports)", description = "Excel 报表生成与邮件投递")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 为 OpenAPI 文档注入 HTTP Basic 鉴权方案。
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "basic_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Basic)
                    .description(Some("配置文件中 auth.username / auth.password 对应的账号"))
                    .build(),
            ),
        );
    }
}

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树 (含 Swagger UI 与 CORS)。
pub fn build_router(state: AppState) -> Router {
    // 1. 无需鉴权的公开路由
    let public_router = OpenApiRouter::new()
        .routes(routes!(health::health))
        .routes(routes!(reports::send_full_report));

    // 2. Basic 鉴权路由
    let protected_router = OpenApiRouter::new()
        .routes(routes!(stocks::get_weekly))
        .routes(routes!(stocks::get_stock))
        .routes(routes!(stocks::get_stocks))
        .routes(routes!(catalog::get_catalog))
        .routes(routes!(catalog::get_status))
        .routes(routes!(reports::send_excel_report))
        .routes(routes!(reports::send_weekly_report))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            basic_auth_middleware,
        ));

    // 3. 合并所有路由与自动收集的 OpenAPI Doc
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 绑定端口并启动 HTTP 服务，直到 `shutdown` 完成后优雅退出。
///
/// # Arguments
/// * `state` - 共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8000"`
/// * `shutdown` - 关闭信号
pub async fn start_server<F>(
    state: AppState,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    tracing::info!("🚀 FinTrack API Server listening on {}", bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
