//! 出题流程 - 流程层
//!
//! 核心职责：定义"一次出题请求"的完整处理流程
//!
//! 流程顺序（任一阶段失败即终止，不再进入后续阶段）：
//! 1. 提取 PDF 文本
//! 2. 构建提示词
//! 3. 调用模型（带重试）
//! 4. 解析并校验输出
//! 5. 写入科目历史

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::clients::ChatBackend;
use crate::config::Config;
use crate::error::{AppResult, ExtractionError};
use crate::infrastructure::HistoryStore;
use crate::models::{GenerationRequest, QuestionRecord, QuizParams};
use crate::services::{GenerationClient, PromptBuilder, ResponseParser, TextExtractor};
use crate::workflow::quiz_ctx::QuizCtx;

/// 请求所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Extracting,
    Prompting,
    Generating,
    Parsing,
    Persisting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "已接收",
            Stage::Extracting => "提取文本",
            Stage::Prompting => "构建提示词",
            Stage::Generating => "调用模型",
            Stage::Parsing => "解析输出",
            Stage::Persisting => "写入历史",
            Stage::Done => "完成",
        };
        f.write_str(name)
    }
}

/// 出题流程
///
/// - 编排完整的出题流程
/// - 不持有请求级状态，可被多个请求并发共享
/// - 只依赖业务能力（services）和历史存储
pub struct QuizFlow {
    extractor: TextExtractor,
    prompt_builder: PromptBuilder,
    generator: GenerationClient,
    parser: ResponseParser,
    history: Arc<HistoryStore>,
}

impl QuizFlow {
    /// 按配置创建流程
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `backend`: 启动时创建好的模型客户端
    /// - `history`: 历史存储
    pub fn new(config: &Config, backend: Arc<dyn ChatBackend>, history: Arc<HistoryStore>) -> Self {
        Self {
            extractor: TextExtractor::default(),
            prompt_builder: PromptBuilder::new(config.source_char_budget),
            generator: GenerationClient::from_config(backend, config),
            parser: ResponseParser::new(config.repair_escapes),
            history,
        }
    }

    /// 用现成的组件创建流程
    pub fn from_parts(
        extractor: TextExtractor,
        prompt_builder: PromptBuilder,
        generator: GenerationClient,
        parser: ResponseParser,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            extractor,
            prompt_builder,
            generator,
            parser,
            history,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// 处理一次出题请求
    ///
    /// # 参数
    /// - `document`: 上传的 PDF 内容
    /// - `params`: 科目、题型、数量
    ///
    /// # 返回
    /// 返回校验后的题目列表；历史写入失败只记录日志，不影响返回
    pub async fn run(&self, document: Vec<u8>, params: QuizParams) -> AppResult<Vec<QuestionRecord>> {
        let ctx = QuizCtx::new(&params.subject);
        self.log_stage(&ctx, Stage::Received);
        info!(
            "{} 📥 题型: {} | 数量: {} | 文件大小: {} 字节",
            ctx,
            params.question_type,
            params.question_count,
            document.len()
        );

        // ========== 阶段 1: 提取文本 ==========
        self.log_stage(&ctx, Stage::Extracting);
        let extractor = self.extractor.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| ExtractionError::Unreadable {
                reason: format!("解析任务异常退出: {}", e),
            })?
            .map_err(|e| {
                error!("{} ❌ 文本提取失败: {}", ctx, e);
                e
            })?;

        // ========== 阶段 2: 构建提示词 ==========
        self.log_stage(&ctx, Stage::Prompting);
        let request = GenerationRequest::new(params, extracted.text);
        let prompt = self.prompt_builder.build(&request)?;

        // ========== 阶段 3: 调用模型 ==========
        self.log_stage(&ctx, Stage::Generating);
        let raw = self.generator.generate(&prompt).await.map_err(|e| {
            error!("{} ❌ 模型调用失败: {}", ctx, e);
            e
        })?;

        // ========== 阶段 4: 解析输出 ==========
        self.log_stage(&ctx, Stage::Parsing);
        let records = self.parser.parse(&raw)?;
        info!("{} ✓ 解析得到 {} 道题", ctx, records.len());

        // ========== 阶段 5: 写入历史 ==========
        self.log_stage(&ctx, Stage::Persisting);
        if let Err(e) = self.history.append(&request.params.subject, &records).await {
            error!("{} ⚠️ 历史记录写入失败，题目仍会返回: {}", ctx, e);
        }

        self.log_stage(&ctx, Stage::Done);
        Ok(records)
    }

    fn log_stage(&self, ctx: &QuizCtx, stage: Stage) {
        info!("{} ▶ {}", ctx, stage);
    }
}
