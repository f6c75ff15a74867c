use super::*;
use regex::Regex;

/// PDF 文本提取器
///
/// 只支持文字版 PDF，扫描版没有可提取的文本
#[derive(Clone)]
pub struct PdfExtractor {
    trailing_space: Regex,
    blank_runs: Regex,
}

impl PdfExtractor {
    /// 创建新的 PDF 提取器实例
    pub fn new() -> Self {
        Self {
            trailing_space: Regex::new(r"[ \t]+\n").expect("valid regex"),
            blank_runs: Regex::new(r"\n{3,}").expect("valid regex"),
        }
    }

    /// 整理单页文本：统一换行，去掉行尾空白，压缩连续空行
    fn normalize_page(&self, page: &str) -> String {
        let page = page.replace("\r\n", "\n");
        let page = self.trailing_space.replace_all(&page, "\n");
        self.blank_runs.replace_all(&page, "\n\n").trim().to_string()
    }

    /// 拼接各页文本
    ///
    /// 去掉空白页，页面之间用两个换行拼接
    fn join_pages<S: AsRef<str>>(&self, pages: &[S]) -> String {
        pages
            .iter()
            .map(|page| self.normalize_page(page.as_ref()))
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        let pages =
            pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))?;
        debug!(pages = pages.len(), "pdf text extracted");

        let text = self.join_pages(&pages);
        if text.is_empty() {
            return Err(DocumentError::NoText);
        }
        Ok(text)
    }

    fn supported_extensions(&self) -> Vec<&str> {
        vec!["pdf"]
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}
