//! LLM API 客户端
//!
//! 封装与模型服务的通信，并把各种失败归类为 Transient / Fatal
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（Gemini 通过其 OpenAI 兼容端点接入）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GenerationError;

/// 模型调用能力
///
/// 生成服务只依赖这个 trait，测试时可以替换为假实现
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 发送单条用户消息，返回模型的原始回复文本
    ///
    /// # 参数
    /// - `model`: 模型名称
    /// - `prompt`: 提示词
    /// - `json_mode`: 是否请求 JSON 输出模式（尽力而为）
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, GenerationError>;
}

/// 基于 `async-openai` 的实现
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiBackend {
    /// 启动时创建一次，之后作为依赖传入
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", model);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| GenerationError::fatal(model, e.to_string()))?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)]);
        // json_object 在 OpenAI 官方端点上要求顶层是对象，见 `Config::json_mode`
        if json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        let request = args
            .build()
            .map_err(|e| GenerationError::fatal(model, e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let err = classify_openai_error(model, e);
            warn!("LLM API 调用失败: {}", err);
            err
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GenerationError::fatal(model, "模型返回内容为空"));
        }

        debug!("LLM API 调用成功");
        Ok(content)
    }
}

/// 把 `async-openai` 的错误归类
fn classify_openai_error(model: &str, err: OpenAIError) -> GenerationError {
    match err {
        OpenAIError::Reqwest(e) => {
            let status = e.status().map(|s| s.as_u16());
            if e.is_timeout() || e.is_connect() || status.map(is_transient_status).unwrap_or(false)
            {
                GenerationError::transient(model, e.to_string())
            } else {
                GenerationError::fatal(model, e.to_string())
            }
        }
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let text = format!("{} {}", kind, api.message);
            if is_transient_message(&text) {
                GenerationError::transient(model, api.message)
            } else {
                GenerationError::fatal(model, api.message)
            }
        }
        OpenAIError::InvalidArgument(msg) => GenerationError::fatal(model, msg),
        other => {
            // 例如网关返回的 HTML 错误页无法反序列化
            let text = other.to_string();
            if is_transient_message(&text) {
                GenerationError::transient(model, text)
            } else {
                GenerationError::fatal(model, text)
            }
        }
    }
}

/// 429 与 5xx 视为暂时性错误
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// 根据错误文本判断是否为服务过载/暂不可用
pub(crate) fn is_transient_message(text: &str) -> bool {
    const MARKERS: &[&str] = &[
        "overloaded",
        "unavailable",
        "resource_exhausted",
        "resource exhausted",
        "rate limit",
        "rate_limit",
        "too many requests",
        "try again later",
        "timed out",
        "timeout",
        "internal error",
        "503",
        "429",
    ];
    let lower = text.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_messages_are_transient() {
        assert!(is_transient_message("The model is overloaded. Please try again later."));
        assert!(is_transient_message("503 UNAVAILABLE"));
        assert!(is_transient_message("RESOURCE_EXHAUSTED: quota"));
        assert!(is_transient_message("rate_limit_exceeded"));
    }

    #[test]
    fn auth_and_validation_messages_are_fatal() {
        assert!(!is_transient_message("API key not valid. Please pass a valid API key."));
        assert!(!is_transient_message("invalid_request_error: model not found"));
        assert!(!is_transient_message("401 Unauthorized"));
    }

    #[test]
    fn status_classification() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_transient_status(code));
        }
        for code in [400, 401, 403, 404, 422] {
            assert!(!is_transient_status(code));
        }
    }
}
