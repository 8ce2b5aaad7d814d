use serde::{Deserialize, Serialize};

/// 默认科目
pub const DEFAULT_SUBJECT: &str = "general";
/// 默认题型
pub const DEFAULT_QUESTION_TYPE: &str = "Q&A";
/// 默认题目数量
pub const DEFAULT_QUESTION_COUNT: u32 = 5;

/// 单道题目
///
/// 同一批次内 `id` 从 1 开始连续编号，顺序即出题顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u32,
    pub question: String,
    pub answer: String,
    pub explanation: String,
}

impl QuestionRecord {
    pub fn new(
        id: u32,
        question: impl Into<String>,
        answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            question: question.into(),
            answer: answer.into(),
            explanation: explanation.into(),
        }
    }
}

/// 出题参数（来自表单）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizParams {
    /// 科目，同时决定历史记录的分区
    pub subject: String,
    /// 题型，如 "Q&A"、"选择题"
    pub question_type: String,
    /// 题目数量
    pub question_count: u32,
}

impl QuizParams {
    pub fn new(
        subject: impl Into<String>,
        question_type: impl Into<String>,
        question_count: u32,
    ) -> Self {
        Self {
            subject: subject.into(),
            question_type: question_type.into(),
            question_count,
        }
    }
}

impl Default for QuizParams {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT, DEFAULT_QUESTION_TYPE, DEFAULT_QUESTION_COUNT)
    }
}

/// 一次生成请求：出题参数 + 讲义文本
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub params: QuizParams,
    pub source_text: String,
}

impl GenerationRequest {
    pub fn new(params: QuizParams, source_text: impl Into<String>) -> Self {
        Self {
            params,
            source_text: source_text.into(),
        }
    }
}
