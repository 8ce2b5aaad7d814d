//! 文本提取服务 - 业务能力层
//!
//! 只负责"从 PDF 取文字"能力：单页失败容忍，整份文档无字或打不开才算失败。
//! 解析失败是结构性的，不重试。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ExtractionError;
use crate::infrastructure::{LopdfReader, PageTextSource};

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

/// 文本提取服务
#[derive(Clone)]
pub struct TextExtractor {
    source: Arc<dyn PageTextSource>,
}

impl TextExtractor {
    pub fn new(source: Arc<dyn PageTextSource>) -> Self {
        Self { source }
    }

    /// 提取全文
    ///
    /// # 返回
    /// - `Ok(ExtractedText)`: 至少一页有文字
    /// - `Err(ExtractionError::Unreadable)`: 文档无法打开
    /// - `Err(ExtractionError::NoText)`: 所有页面都没有文字（多半是扫描件）
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let pages = self.source.page_texts(bytes).map_err(|reason| {
            warn!("PDF 无法打开: {}", reason);
            ExtractionError::Unreadable { reason }
        })?;

        let page_count = pages.len();
        let text = pages
            .into_iter()
            .map(|page| page.map(|t| t.trim().to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        info!("📄 PDF 解析完成: 共 {} 页，提取 {} 个字符", page_count, text.chars().count());

        if text.is_empty() {
            return Err(ExtractionError::NoText { page_count });
        }

        Ok(ExtractedText { text, page_count })
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LopdfReader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::pdf_reader::test_pdf;

    struct FixedPages(Result<Vec<Option<String>>, String>);

    impl PageTextSource for FixedPages {
        fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<Option<String>>, String> {
            self.0.clone()
        }
    }

    fn extractor(pages: Result<Vec<Option<String>>, String>) -> TextExtractor {
        TextExtractor::new(Arc::new(FixedPages(pages)))
    }

    #[test]
    fn failed_pages_contribute_nothing() {
        let result = extractor(Ok(vec![
            None,
            Some("  第二页  ".into()),
            Some(String::new()),
            Some("第四页".into()),
        ]))
        .extract(b"")
        .unwrap();

        assert_eq!(result.page_count, 4);
        assert!(result.text.starts_with("第二页"));
        assert!(result.text.ends_with("第四页"));
    }

    #[test]
    fn all_empty_pages_is_no_text() {
        let err = extractor(Ok(vec![None, Some("   \n".into())]))
            .extract(b"")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoText { page_count: 2 }));
    }

    #[test]
    fn zero_pages_is_no_text() {
        let err = extractor(Ok(vec![])).extract(b"").unwrap_err();
        assert!(matches!(err, ExtractionError::NoText { page_count: 0 }));
    }

    #[test]
    fn unopenable_document_is_unreadable() {
        let err = extractor(Err("invalid file header".into()))
            .extract(b"")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }

    #[test]
    fn real_pdf_with_text() {
        let bytes = test_pdf::build(&[None, Some("The capital of France is Paris.")]);
        let result = TextExtractor::default().extract(&bytes).unwrap();
        assert_eq!(result.page_count, 2);
        assert!(result.text.contains("Paris"));
    }

    #[test]
    fn real_pdf_without_text() {
        let bytes = test_pdf::build(&[None, None]);
        let err = TextExtractor::default().extract(&bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText { page_count: 2 }));
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let err = TextExtractor::default()
            .extract(b"%PDF-garbage")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }
}
