//! 提示词构建 - 业务能力层
//!
//! 纯函数：同样的请求永远得到同样的提示词

use crate::error::RequestError;
use crate::models::GenerationRequest;

/// 提示词构建器
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    char_budget: usize,
}

impl PromptBuilder {
    /// # 参数
    /// - `char_budget`: 讲义文本最多保留的字符数
    pub fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }

    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    /// 构建出题提示词
    ///
    /// 讲义为空（或只有空白）时直接拒绝，不会走到模型调用
    pub fn build(&self, request: &GenerationRequest) -> Result<String, RequestError> {
        if request.source_text.trim().is_empty() {
            return Err(RequestError::EmptySourceText);
        }

        let params = &request.params;
        let material = truncate_chars(&request.source_text, self.char_budget);

        Ok(format!(
            r#"请根据以下讲义资料（科目: {subject}）出学习用的练习题。

【条件】
- 题型: {question_type}
- 题目数量: {count} 道

【输出格式】
- 只输出一个 JSON 数组，不要输出任何说明文字，也不要使用 ``` 代码块
- 数组恰好包含 {count} 个元素，每个元素的结构如下：
  {{"id": 1, "question": "题目", "answer": "答案", "explanation": "解析"}}
- id 从 1 开始连续编号，按出题顺序排列
- question、answer、explanation 都必须是非空字符串

【数学公式】
- 行内公式用单个美元符号包裹，例如 $E = mc^2$
- 独立公式用两个美元符号包裹，例如 $$\int_0^1 x\,dx$$
- JSON 字符串中的反斜杠必须写成两个反斜杠，例如 "\frac{{1}}{{2}}" 要写成 "\\frac{{1}}{{2}}"，保证整体仍是合法的 JSON

【讲义资料】
{material}
"#,
            subject = params.subject,
            question_type = params.question_type,
            count = params.question_count,
            material = material,
        ))
    }
}

/// 按字符（而不是字节）截断，不会切断 UTF-8 序列
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
