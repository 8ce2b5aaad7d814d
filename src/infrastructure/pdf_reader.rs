//! PDF 读取器 - 基础设施层
//!
//! 持有 PDF 解析能力（`lopdf`），只暴露"逐页取文字"的能力

use lopdf::Document;
use tracing::debug;

/// 逐页提取文字的能力
///
/// - 文档打不开时返回 `Err(原因)`
/// - 单页提取失败时该页为 `None`，不影响其它页
pub trait PageTextSource: Send + Sync {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<Option<String>>, String>;
}

/// 基于 `lopdf` 的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfReader;

impl PageTextSource for LopdfReader {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<Option<String>>, String> {
        let doc = Document::load_mem(bytes).map_err(|e| e.to_string())?;

        // BTreeMap，按页码升序
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_number in pages.keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => texts.push(Some(text)),
                Err(e) => {
                    debug!("第 {} 页文字提取失败: {}", page_number, e);
                    texts.push(None);
                }
            }
        }

        Ok(texts)
    }
}

#[cfg(test)]
#[path = "../../tests/common/pdf.rs"]
pub(crate) mod test_pdf;
