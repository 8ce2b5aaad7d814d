//! # Lecture Quiz
//!
//! 上传讲义 PDF，调用大模型生成练习题，并按科目保存出题历史
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有文件和解析器，只暴露能力
//! - `LopdfReader` - 逐页读取 PDF 文本
//! - `HistoryStore` - 按科目存储题目，原子替换写入
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 外部服务的访问方式
//! - `ChatBackend` - 模型调用抽象，`OpenAiBackend` 为 OpenAI 兼容实现
//!
//! ### ③ 业务能力层（Services）
//! - `TextExtractor` - 提取并拼接页面文本
//! - `PromptBuilder` - 构建出题提示词
//! - `GenerationClient` - 带重试的模型调用
//! - `ResponseParser` - 解析、修复并校验模型输出
//!
//! ### ④ 流程层（Workflow）
//! - `QuizFlow` - 提取 → 提示词 → 生成 → 解析 → 写入历史
//!
//! ### ⑤ 接口层（API）
//! - `api/` - axum 路由与 handler
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{build_router, AppState};
pub use app::App;
pub use clients::{ChatBackend, OpenAiBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::HistoryStore;
pub use models::{QuestionRecord, QuizParams};
pub use workflow::QuizFlow;
