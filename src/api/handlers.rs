//! HTTP 请求处理

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::error::{AppError, RequestError};
use crate::models::{
    QuestionRecord, QuizParams, DEFAULT_QUESTION_COUNT, DEFAULT_QUESTION_TYPE, DEFAULT_SUBJECT,
};

/// 错误响应：`{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self {
            status: err.status_code(),
            message: err.user_message(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        AppError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// 健康检查
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 上传讲义 PDF 并生成题目
///
/// 表单字段：`file`（必需）、`subject`、`type`、`count`
pub async fn generate_questions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<QuestionRecord>>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut subject = None;
    let mut question_type = None;
    let mut count = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RequestError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RequestError::Multipart(e.to_string()))?;
                file = Some(bytes.to_vec());
            }
            "subject" | "type" | "count" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| RequestError::Multipart(e.to_string()))?;
                match name.as_str() {
                    "subject" => subject = Some(value),
                    "type" => question_type = Some(value),
                    _ => count = Some(value),
                }
            }
            other => warn!("忽略未知的表单字段: {}", other),
        }
    }

    let document = file.ok_or(RequestError::MissingFile)?;
    let params = parse_params(
        subject,
        question_type,
        count,
        state.config.max_question_count,
    )?;

    info!(
        "📨 收到出题请求: 科目 {} | 题型 {} | 数量 {}",
        params.subject, params.question_type, params.question_count
    );

    // 在独立任务中执行：客户端断开连接时，已开始的生成仍会完成并写入历史
    let flow = state.flow.clone();
    let records = tokio::spawn(async move { flow.run(document, params).await })
        .await
        .map_err(|e| {
            error!("出题任务异常退出: {}", e);
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "出题任务异常退出".to_string(),
            }
        })??;

    Ok(Json(records))
}

/// 列出所有有历史记录的科目
pub async fn get_subjects(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let subjects = state
        .history
        .list_subjects()
        .await
        .map_err(AppError::from)?;
    Ok(Json(subjects))
}

/// 读取某个科目的历史题目（新的在前）
pub async fn get_history(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<QuestionRecord>>, ApiError> {
    let records = state
        .history
        .read(&subject)
        .await
        .map_err(AppError::from)?;
    Ok(Json(records))
}

/// 表单参数 → 出题参数
///
/// 空白值使用默认值；数量必须是 `1..=max_count` 的整数
pub fn parse_params(
    subject: Option<String>,
    question_type: Option<String>,
    count: Option<String>,
    max_count: u32,
) -> Result<QuizParams, RequestError> {
    fn or_default(value: Option<String>, default: &str) -> String {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    let question_count = match count.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => DEFAULT_QUESTION_COUNT,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=max_count).contains(n))
            .ok_or_else(|| RequestError::InvalidCount {
                value: raw.to_string(),
                max: max_count,
            })?,
    };

    Ok(QuizParams::new(
        or_default(subject, DEFAULT_SUBJECT),
        or_default(question_type, DEFAULT_QUESTION_TYPE),
        question_count,
    ))
}
