//! HTTP 接口层
//!
//! - `POST /generate-questions`: 上传 PDF 生成题目
//! - `GET /get-subjects`: 有历史记录的科目
//! - `GET /get-history/{subject}`: 某科目的历史题目
//! - `GET /health`: 健康检查

pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::clients::ChatBackend;
use crate::config::Config;
use crate::infrastructure::HistoryStore;
use crate::workflow::QuizFlow;

pub use handlers::{get_history, get_subjects, generate_questions, health_check, ApiError};

/// 所有 handler 共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flow: Arc<QuizFlow>,
    pub history: Arc<HistoryStore>,
}

impl AppState {
    /// 创建共享状态
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `backend`: 启动时创建好的模型客户端
    pub fn new(config: Config, backend: Arc<dyn ChatBackend>) -> Self {
        let history = Arc::new(HistoryStore::new(&config.data_dir));
        let flow = Arc::new(QuizFlow::new(&config, backend, history.clone()));
        Self {
            config: Arc::new(config),
            flow,
            history,
        }
    }
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/generate-questions", post(generate_questions))
        .route("/get-subjects", get(get_subjects))
        .route("/get-history/{subject}", get(get_history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 在已绑定的监听器上运行服务，直到收到 Ctrl-C
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl-C 信号: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 收到退出信号，正在关闭服务...");
}
