use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Gemini 的 OpenAI 兼容端点
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 历史记录目录（每个科目一个 JSON 文件）
    pub data_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    /// API 密钥，只从环境变量读取
    #[serde(skip)]
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 轻量级备用模型，主模型重试耗尽后使用
    pub llm_fallback_model: Option<String>,
    /// 是否请求 JSON 输出模式（`response_format = json_object`）
    ///
    /// Gemini 的兼容端点在此模式下仍按提示词返回数组；OpenAI 官方端点会强制
    /// 返回顶层对象，而解析器只接受数组，接入 OpenAI 时需设置 `LLM_JSON_MODE=false`
    pub json_mode: bool,
    // --- 生成参数 ---
    /// 讲义文本的最大字符数
    pub source_char_budget: usize,
    /// 单个模型的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 重试间隔（秒）
    pub retry_delay_secs: u64,
    /// 解析失败时尝试修复 LaTeX 反斜杠
    pub repair_escapes: bool,
    /// 单次请求允许的最大题目数
    pub max_question_count: u32,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            data_dir: PathBuf::from("history"),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            llm_model_name: "gemini-3-flash-preview".to_string(),
            llm_fallback_model: None,
            json_mode: true,
            source_char_budget: 15_000,
            max_attempts: 3,
            retry_delay_secs: 5,
            repair_escapes: true,
            max_question_count: 50,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 配置文件（可选）→ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("QUIZ_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or("quiz.toml"));

        let base = if path.exists() {
            Self::from_toml_file(&path)?
        } else if explicit.is_some() {
            return Err(ConfigError::File {
                path: path.display().to_string(),
                reason: "文件不存在".to_string(),
            });
        } else {
            Self::default()
        };

        let config = base.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，未出现的字段取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::File { reason, .. } => ConfigError::File {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::File {
            path: String::new(),
            reason: e.to_string(),
        })
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 抽象了环境读取，测试时可以传入固定的映射
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("QUIZ_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("QUIZ_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = parse_var("VERBOSE_LOGGING", &v, "bool")?;
        }
        if let Some(v) = lookup("LLM_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = lookup("LLM_FALLBACK_MODEL") {
            self.llm_fallback_model = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = lookup("LLM_JSON_MODE") {
            self.json_mode = parse_var("LLM_JSON_MODE", &v, "bool")?;
        }
        if let Some(v) = lookup("SOURCE_CHAR_BUDGET") {
            self.source_char_budget = parse_var("SOURCE_CHAR_BUDGET", &v, "usize")?;
        }
        if let Some(v) = lookup("LLM_MAX_ATTEMPTS") {
            self.max_attempts = parse_var("LLM_MAX_ATTEMPTS", &v, "u32")?;
        }
        if let Some(v) = lookup("LLM_RETRY_DELAY_SECS") {
            self.retry_delay_secs = parse_var("LLM_RETRY_DELAY_SECS", &v, "u64")?;
        }
        if let Some(v) = lookup("REPAIR_LATEX_ESCAPES") {
            self.repair_escapes = parse_var("REPAIR_LATEX_ESCAPES", &v, "bool")?;
        }
        if let Some(v) = lookup("MAX_QUESTION_COUNT") {
            self.max_question_count = parse_var("MAX_QUESTION_COUNT", &v, "u32")?;
        }
        if let Some(v) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &v, "usize")?;
        }
        Ok(self)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "LLM_API_KEY (或 GEMINI_API_KEY)".to_string(),
            });
        }
        if self.llm_model_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "LLM_MODEL_NAME".to_string(),
            });
        }
        for (name, value) in [
            ("source_char_budget", self.source_char_budget as u64),
            ("max_attempts", self.max_attempts as u64),
            ("max_question_count", self.max_question_count as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name: name.to_string(),
                    reason: "必须大于 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn parse_var<T: std::str::FromStr>(
    var_name: &str,
    value: &str,
    expected_type: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}
