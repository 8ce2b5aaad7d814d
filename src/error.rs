//! 错误类型
//!
//! 按关注点分组：请求参数、PDF 提取、模型调用、响应解析、历史存储、配置。
//! 顶层 [`AppError`] 负责把各组错误映射为 HTTP 状态码和面向用户的提示。

use axum::http::StatusCode;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求参数错误
    #[error(transparent)]
    Request(#[from] RequestError),
    /// PDF 文本提取失败（ExtractionFailed）
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// 模型调用失败（Transient / Fatal）
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// 模型输出未通过结构校验（MalformedResponse）
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// 历史记录读写失败
    #[error(transparent)]
    History(#[from] HistoryError),
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 区分客户端错误（400）与服务端/上游错误（500）
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Request(_) | AppError::Extraction(_) => StatusCode::BAD_REQUEST,
            AppError::Generation(_)
            | AppError::Parse(_)
            | AppError::History(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 面向用户的错误信息
    pub fn user_message(&self) -> String {
        match self {
            AppError::Extraction(_) => format!(
                "{}。这个 PDF 可能是无法选择文字的图片格式（扫描件），请上传包含可选中文字的 PDF。",
                self
            ),
            AppError::Generation(e) => format!("AI 模型调用失败: {}", e),
            AppError::Parse(e) => format!("AI 返回的题目格式无效: {}", e),
            _ => self.to_string(),
        }
    }
}

/// 请求参数错误
#[derive(Debug, Error)]
pub enum RequestError {
    /// 缺少上传文件
    #[error("没有找到上传的文件 (字段 `file`)")]
    MissingFile,
    /// 题目数量不合法
    #[error("题目数量无效: '{value}'，需要 1 到 {max} 之间的整数")]
    InvalidCount { value: String, max: u32 },
    /// 资料文本为空，不会调用模型
    #[error("讲义文本为空，无法生成题目")]
    EmptySourceText,
    /// multipart 表单解析失败
    #[error("表单解析失败: {0}")]
    Multipart(String),
}

/// PDF 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 文档无法打开（损坏或不是 PDF）
    #[error("无法读取 PDF 文件: {reason}")]
    Unreadable { reason: String },
    /// 所有页面都没有可提取的文字
    #[error("PDF 共 {page_count} 页，但没有提取到任何文字")]
    NoText { page_count: usize },
}

/// 模型调用错误
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// 服务过载/暂时不可用，可重试
    #[error("模型服务暂时不可用 (模型: {model}, 已尝试 {attempts} 次): {message}")]
    Transient {
        model: String,
        attempts: u32,
        message: String,
    },
    /// 鉴权失败、请求无效等，重试无意义
    #[error("模型调用失败 (模型: {model}): {message}")]
    Fatal { model: String, message: String },
}

impl GenerationError {
    pub fn transient(model: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Transient {
            model: model.into(),
            attempts: 1,
            message: message.into(),
        }
    }

    pub fn fatal(model: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Fatal {
            model: model.into(),
            message: message.into(),
        }
    }

    /// 是否属于可重试的暂时性错误
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient { .. })
    }

    /// 记录实际尝试次数（仅对 Transient 有意义）
    pub(crate) fn with_attempts(self, total: u32) -> Self {
        match self {
            GenerationError::Transient { model, message, .. } => GenerationError::Transient {
                model,
                attempts: total,
                message,
            },
            other => other,
        }
    }
}

/// 模型响应解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 输出不是合法的题目数组
    #[error("模型输出格式错误: {reason}")]
    MalformedResponse {
        reason: String,
        /// 原始响应文本，仅用于日志诊断
        raw: String,
    },
}

impl ParseError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        ParseError::MalformedResponse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            ParseError::MalformedResponse { raw, .. } => raw,
        }
    }
}

/// 历史记录存储错误
#[derive(Debug, Error)]
pub enum HistoryError {
    /// 读写文件失败
    #[error("历史记录文件操作失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 现有历史文件无法解析，拒绝覆盖
    #[error("历史记录文件已损坏 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 序列化失败
    #[error("历史记录序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    /// 后台写入任务异常退出
    #[error("历史记录写入任务失败: {0}")]
    Task(String),
}

impl HistoryError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        HistoryError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必需的配置项缺失
    #[error("缺少必需的配置项: {name}")]
    Missing { name: String },
    /// 配置值不合法
    #[error("配置项 {name} 不合法: {reason}")]
    Invalid { name: String, reason: String },
    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无法加载: {reason}")]
    File { path: String, reason: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        let err = AppError::from(ExtractionError::NoText { page_count: 3 });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(RequestError::MissingFile).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_errors_map_to_500() {
        let err = AppError::from(GenerationError::fatal("m", "401 unauthorized"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = AppError::from(ParseError::malformed("not an array", "{}"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn extraction_message_hints_at_scanned_documents() {
        let err = AppError::from(ExtractionError::Unreadable {
            reason: "invalid file header".into(),
        });
        let msg = err.user_message();
        assert!(msg.contains("扫描件"));
        assert!(msg.contains("图片"));
    }

    #[test]
    fn attempts_are_recorded_on_transient_only() {
        let t = GenerationError::transient("m", "503").with_attempts(3);
        assert!(matches!(t, GenerationError::Transient { attempts: 3, .. }));
        let f = GenerationError::fatal("m", "400").with_attempts(3);
        assert!(!f.is_transient());
    }
}
