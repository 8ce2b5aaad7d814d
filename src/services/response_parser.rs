//! 响应解析服务 - 业务能力层
//!
//! 把模型的原始文本解析为题目列表：
//! 1. 严格按单个 JSON 值解析，必须是数组
//! 2. 每个元素必须有 id / question / answer / explanation
//! 3. 保持数组顺序，id 按位置重新编号为 1..=n
//!
//! 开启修复时，修复先于严格解析：`\frac`、`\theta` 是合法的 JSON 转义，
//! 严格解析能通过，但会变成换页符、制表符。

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::QuestionRecord;
use crate::utils::truncate_text;

/// 反斜杠及其后面可能构成转义的部分
static BACKSLASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\(\\|"|/|u[0-9a-fA-F]{4}|[A-Za-z]+|[\s\S]?)"#)
        .expect("反斜杠正则无效")
});

/// 以 `b f n r t` 开头、会被误读成 JSON 转义的 LaTeX 命令
///
/// 只有整个单词命中时才翻倍，`\nLine` 这类普通换行保持不变
const ESCAPE_LIKE_COMMANDS: &[&str] = &[
    // b
    "backslash", "bar", "because", "begin", "beta", "bigcap", "bigcup", "bigl", "bigr",
    "binom", "bmod", "boldsymbol", "bot", "boxed", "bullet",
    // f
    "flat", "forall", "frac", "frown",
    // n
    "nabla", "natural", "nearrow", "neg", "neq", "newline", "nexists", "ngeq", "nleq",
    "nmid", "noindent", "nolimits", "nonumber", "notin", "nu", "nwarrow",
    // r
    "rangle", "rbrace", "rceil", "rfloor", "rho", "right", "rightarrow",
    "rightleftharpoons", "rvert",
    // t
    "tan", "tanh", "tau", "tbinom", "text", "textbf", "textit", "textrm", "tfrac",
    "therefore", "theta", "tilde", "times", "top", "triangle",
];

/// 响应解析器
#[derive(Debug, Clone, Copy)]
pub struct ResponseParser {
    repair_escapes: bool,
}

impl ResponseParser {
    pub fn new(repair_escapes: bool) -> Self {
        Self { repair_escapes }
    }

    /// 只做严格解析
    pub fn strict() -> Self {
        Self::new(false)
    }

    /// 解析模型回复
    ///
    /// # 返回
    /// - `Ok(Vec<QuestionRecord>)`: 顺序与数组一致，id 为 1..=n
    /// - `Err(ParseError::MalformedResponse)`: 附带原因和原始文本（严格解析的失败原因）
    pub fn parse(&self, raw: &str) -> Result<Vec<QuestionRecord>, ParseError> {
        let body = strip_code_fence(raw);

        if self.repair_escapes {
            let repaired = repair_latex_backslashes(body);
            if repaired != body {
                match parse_records(&repaired) {
                    Ok(records) => {
                        warn!("⚠️ 模型输出包含未转义的 LaTeX 反斜杠，已修复");
                        return Ok(records);
                    }
                    Err(reason) => debug!("修复后仍无法解析: {}", reason),
                }
            }
        }

        parse_records(body).map_err(|reason| {
            warn!(
                "❌ 模型输出无法解析: {} | 原始内容: {}",
                reason,
                truncate_text(raw, 500)
            );
            ParseError::malformed(reason, raw)
        })
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(true)
    }
}

fn parse_records(body: &str) -> Result<Vec<QuestionRecord>, String> {
    let value: JsonValue =
        serde_json::from_str(body).map_err(|e| format!("不是合法的 JSON: {}", e))?;

    let items = match value {
        JsonValue::Array(items) => items,
        other => return Err(format!("顶层必须是数组，实际是 {}", json_kind(&other))),
    };

    if items.is_empty() {
        return Err("题目数组为空".to_string());
    }

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let position = idx + 1;
        let obj = item
            .as_object()
            .ok_or_else(|| format!("第 {} 个元素不是对象", position))?;

        let id = obj
            .get("id")
            .and_then(coerce_id)
            .ok_or_else(|| format!("第 {} 个元素缺少有效的 id", position))?;
        if id as usize != position {
            debug!("第 {} 个元素的 id 为 {}，按位置重新编号", position, id);
        }

        let field = |name: &str| {
            obj.get(name)
                .and_then(coerce_text)
                .ok_or_else(|| format!("第 {} 个元素的 {} 缺失或为空", position, name))
        };

        records.push(QuestionRecord {
            id: position as u32,
            question: field("question")?,
            answer: field("answer")?,
            explanation: field("explanation")?,
        });
    }

    Ok(records)
}

fn coerce_id(value: &JsonValue) -> Option<u32> {
    let id = match value {
        JsonValue::Number(n) => n.as_u64()?,
        JsonValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(id).ok().filter(|&id| id > 0)
}

fn coerce_text(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "布尔值",
        JsonValue::Number(_) => "数字",
        JsonValue::String(_) => "字符串",
        JsonValue::Array(_) => "数组",
        JsonValue::Object(_) => "对象",
    }
}

/// 去掉包住整个回复的 Markdown 代码块
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // 跳过语言标记（如 ```json）
    match inner.find('\n') {
        Some(pos) if inner[..pos].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            inner[pos + 1..].trim()
        }
        _ => inner.trim(),
    }
}

/// 把 LaTeX 留下的裸反斜杠改成 `\\`
///
/// 保留：`\\`、`\"`、`\/`、`\uXXXX`，以及不构成已知 LaTeX 命令的 `\b \f \n \r \t`。
/// 翻倍：[`ESCAPE_LIKE_COMMANDS`] 中的命令和其它非法转义（如 `\alpha`、`\left`）。
pub(crate) fn repair_latex_backslashes(text: &str) -> Cow<'_, str> {
    BACKSLASH_RE.replace_all(text, |caps: &Captures| {
        let tail = &caps[1];
        let keep = match tail.chars().next() {
            Some('\\' | '"' | '/') => true,
            Some('u') if tail.len() == 5 && tail[1..].chars().all(|c| c.is_ascii_hexdigit()) => {
                true
            }
            Some('b' | 'f' | 'n' | 'r' | 't') => !ESCAPE_LIKE_COMMANDS.contains(&tail),
            _ => false,
        };
        if keep {
            caps[0].to_string()
        } else {
            format!("\\\\{}", tail)
        }
    })
}
