//! 应用装配与启动

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, AppState};
use crate::clients::{ChatBackend, OpenAiBackend};
use crate::config::Config;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    state: AppState,
    bind_addr: String,
}

impl App {
    /// 初始化应用
    ///
    /// 模型客户端只在这里创建一次，所有请求共享
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("无法创建历史记录目录 {}", config.data_dir.display()))?;

        let backend: Arc<dyn ChatBackend> = Arc::new(OpenAiBackend::new(&config));
        let bind_addr = config.bind_addr.clone();

        Ok(Self {
            state: AppState::new(config, backend),
            bind_addr,
        })
    }

    /// 绑定地址并提供服务，直到收到退出信号
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .with_context(|| format!("无法监听 {}", self.bind_addr))?;
        info!("✅ 服务已就绪: http://{}", listener.local_addr()?);

        api::serve(listener, self.state)
            .await
            .context("HTTP 服务异常退出")?;

        info!("👋 服务已停止");
        Ok(())
    }
}
