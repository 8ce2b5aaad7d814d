//! 题目生成服务 - 业务能力层
//!
//! 只负责"调用模型拿到原始文本"能力：
//! - Transient 错误按重试策略重试，耗尽后作为最终错误返回
//! - Fatal 错误立即返回，不重试
//! - 可选的轻量级备用模型，在主模型重试耗尽后接手

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::ChatBackend;
use crate::config::Config;
use crate::error::GenerationError;

/// 重试间隔的增长方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 每次等待相同时间
    Fixed,
    /// 第 n 次重试等待 n × delay
    Linear,
    /// 第 n 次重试等待 2^(n-1) × delay
    Exponential,
}

/// 重试策略
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 基础等待时间
    pub delay: Duration,
    pub backoff: Backoff,
    /// 哪些错误值得重试
    pub retryable: fn(&GenerationError) -> bool,
}

impl RetryPolicy {
    /// 固定间隔，只重试 Transient
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
            retryable: GenerationError::is_transient,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::fixed(config.max_attempts, config.retry_delay())
    }

    /// 第 `retry` 次重试（从 1 开始）之前的等待时间
    pub fn delay_before(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(retry),
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1))),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

/// 题目生成服务
pub struct GenerationClient {
    backend: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
    model: String,
    fallback_model: Option<String>,
    json_mode: bool,
}

impl GenerationClient {
    /// 创建新的生成服务
    ///
    /// # 参数
    /// - `backend`: 启动时创建好的模型客户端
    /// - `policy`: 重试策略
    /// - `model`: 主模型名称
    pub fn new(backend: Arc<dyn ChatBackend>, policy: RetryPolicy, model: impl Into<String>) -> Self {
        Self {
            backend,
            policy,
            model: model.into(),
            fallback_model: None,
            json_mode: true,
        }
    }

    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &Config) -> Self {
        Self::new(backend, RetryPolicy::from_config(config), &config.llm_model_name)
            .with_fallback(config.llm_fallback_model.clone())
            .with_json_mode(config.json_mode)
    }

    pub fn with_fallback(mut self, fallback_model: Option<String>) -> Self {
        self.fallback_model = fallback_model;
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 生成题目，返回模型原始文本
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        match self.generate_with(&self.model, prompt).await {
            Err(err) if err.is_transient() => match &self.fallback_model {
                Some(fallback) => {
                    warn!("⚠️ 主模型 {} 重试耗尽，切换到备用模型 {}", self.model, fallback);
                    self.generate_with(fallback, prompt).await
                }
                None => Err(err),
            },
            other => other,
        }
    }

    /// 对指定模型执行带重试的调用
    async fn generate_with(&self, model: &str, prompt: &str) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("🤖 调用模型 {} (尝试 {}/{})", model, attempt, max_attempts);

            match self.backend.complete(model, prompt, self.json_mode).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!("✓ 模型 {} 在第 {} 次尝试成功", model, attempt);
                    }
                    return Ok(text);
                }
                Err(err) if (self.policy.retryable)(&err) && attempt < max_attempts => {
                    let wait = self.policy.delay_before(attempt);
                    warn!(
                        "模型暂时不可用 (尝试 {}/{})，{:?} 后重试: {}",
                        attempt, max_attempts, wait, err
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!("❌ 模型 {} 调用失败 (尝试 {}/{}): {}", model, attempt, max_attempts, err);
                    return Err(err.with_attempts(attempt));
                }
            }
        }
    }
}
