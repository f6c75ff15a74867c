use crate::types::NewLibraryBook;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// 子模块声明
pub mod pdf_export;
pub mod pdf_import;
pub mod text_import;

/// 页面分隔符：导入的多页文档按两个换行拼接
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("读取文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法识别文件扩展名")]
    UnknownExtension,
    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),
    #[error("PDF 解析失败: {0}")]
    Pdf(String),
    #[error("此文件无法提取文本内容（可能是扫描版或加密的 PDF）")]
    NoText,
    #[error("PDF 导出失败: {0}")]
    Export(String),
    #[error("PDF 导出失败: {count} 个字符无法用内置 Times 字体表示（如 '{sample}'）")]
    UnsupportedCharacters { count: usize, sample: char },
}

/// 导入的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedDocument {
    /// 原始文件名（含扩展名）
    pub name: String,
    /// 提取出的纯文本
    pub text: String,
}

impl ImportedDocument {
    /// 去掉扩展名的文件名，用作书库标题
    pub fn title(&self) -> String {
        title_from_file_name(&self.name)
    }

    /// 转换为书库条目
    ///
    /// # 参数
    /// - `title`: 覆盖默认标题（文件名去掉扩展名）
    /// - `objective`: 写作目标，可以为空
    pub fn into_library_book(self, title: Option<String>, objective: Option<String>) -> Result<NewLibraryBook, DocumentError> {
        if self.text.trim().is_empty() {
            return Err(DocumentError::NoText);
        }
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.title());

        Ok(NewLibraryBook {
            title,
            objective: objective.unwrap_or_default(),
            content: self.text,
        })
    }
}

/// 文本提取器 trait
///
/// 所有导入格式必须实现此 trait；单次转换，任何错误都会中止本次操作
pub trait TextExtractor: Send + Sync {
    /// 从文件字节中提取纯文本
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError>;

    /// 获取支持的文件扩展名列表
    fn supported_extensions(&self) -> Vec<&str>;
}

/// 导入路由器
///
/// 根据文件扩展名路由到对应的文本提取器
pub struct DocumentRouter {
    /// 扩展名到提取器的映射
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl DocumentRouter {
    /// 创建新的路由器实例
    ///
    /// 注册所有可用的提取器
    pub fn new() -> Self {
        let mut router = Self {
            extractors: HashMap::new(),
        };
        router.register(Arc::new(text_import::PlainTextExtractor::new()));
        router.register(Arc::new(pdf_import::PdfExtractor::new()));
        router
    }

    fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        for ext in extractor.supported_extensions() {
            self.extractors.insert(ext.to_string(), Arc::clone(&extractor));
        }
    }

    /// 根据文件路径路由到对应的提取器
    pub fn route(&self, file_path: &Path) -> Result<&dyn TextExtractor, DocumentError> {
        let ext = file_path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or(DocumentError::UnknownExtension)?
            .to_lowercase();

        self.extractors
            .get(&ext)
            .map(|e| e.as_ref())
            .ok_or(DocumentError::UnsupportedFormat(ext))
    }

    /// 检查是否支持指定的文件扩展名
    pub fn supports(&self, extension: &str) -> bool {
        self.extractors.contains_key(&extension.to_lowercase())
    }

    /// 获取所有支持的文件扩展名
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.extractors.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// 导入内存中的文件
    ///
    /// # 参数
    /// - `name`: 文件名，用于选择提取器
    /// - `bytes`: 文件内容
    pub fn import_bytes(&self, name: &str, bytes: &[u8]) -> Result<ImportedDocument, DocumentError> {
        let extractor = self.route(Path::new(name))?;
        let text = extractor.extract(bytes)?;
        info!(file = name, chars = text.chars().count(), "document imported");

        Ok(ImportedDocument {
            name: name.to_string(),
            text,
        })
    }

    /// 导入磁盘上的文件
    pub fn import_file(&self, file_path: &Path) -> Result<ImportedDocument, DocumentError> {
        // 先检查格式，避免读取不支持的大文件
        self.route(file_path)?;

        let bytes = fs::read(file_path).map_err(|source| DocumentError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.import_bytes(&name, &bytes)
    }

    /// 导入多个文件作为写作种子上下文
    ///
    /// 任何一个文件失败都会中止整个导入
    pub fn import_seed_files(&self, paths: &[PathBuf]) -> Result<String, DocumentError> {
        let documents = paths
            .iter()
            .map(|p| self.import_file(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!("seed import failed: {}", e);
                e
            })?;

        Ok(combine_seed_context(&documents))
    }
}

impl Default for DocumentRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// 合并多个文档为一个种子上下文
///
/// 每个文件用起止标记包裹，文件之间以空行分隔
pub fn combine_seed_context(documents: &[ImportedDocument]) -> String {
    documents
        .iter()
        .map(|d| {
            format!(
                "--- Start of context from file: {name} ---\n\n{text}\n\n--- End of context from file: {name} ---",
                name = d.name,
                text = d.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 去掉最后一个扩展名
pub fn title_from_file_name(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_router_creation() {
        let router = DocumentRouter::new();
        assert_eq!(router.supported_extensions(), vec!["md", "pdf", "txt"]);
        assert!(router.supports("PDF"));
        assert!(!router.supports("epub"));
    }

    #[test]
    fn test_route_unsupported_format() {
        let router = DocumentRouter::new();
        match router.route(Path::new("book.epub")) {
            Err(DocumentError::UnsupportedFormat(ext)) => assert_eq!(ext, "epub"),
            _ => panic!("epub should not be routable"),
        }
    }

    #[test]
    fn test_route_no_extension() {
        let router = DocumentRouter::new();
        assert!(matches!(
            router.route(Path::new("README")),
            Err(DocumentError::UnknownExtension)
        ));
    }

    #[test]
    fn test_import_bytes_text() {
        let router = DocumentRouter::new();
        let doc = router.import_bytes("notes.md", "# Notes\n\nThe sea.".as_bytes()).unwrap();

        assert_eq!(doc.name, "notes.md");
        assert_eq!(doc.text, "# Notes\n\nThe sea.");
        assert_eq!(doc.title(), "notes");
    }

    #[test]
    fn test_into_library_book() {
        let doc = ImportedDocument {
            name: "winter.txt".to_string(),
            text: "Snow fell.".to_string(),
        };
        let book = doc.clone().into_library_book(None, None).unwrap();
        assert_eq!(book.title, "winter");
        assert_eq!(book.objective, "");
        assert_eq!(book.content, "Snow fell.");

        let book = doc.into_library_book(Some("Winter".to_string()), Some("Quiet".to_string())).unwrap();
        assert_eq!(book.title, "Winter");
        assert_eq!(book.objective, "Quiet");
    }

    #[test]
    fn test_into_library_book_rejects_empty_text() {
        let doc = ImportedDocument {
            name: "empty.md".to_string(),
            text: " \n ".to_string(),
        };
        assert!(matches!(doc.into_library_book(None, None), Err(DocumentError::NoText)));
    }

    #[test]
    fn test_import_file_missing() {
        let router = DocumentRouter::new();
        let result = router.import_file(Path::new("/nonexistent/draft.txt"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }

    #[test]
    fn test_import_seed_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.md");
        fs::File::create(&a).unwrap().write_all(b"alpha").unwrap();
        fs::File::create(&b).unwrap().write_all(b"beta").unwrap();

        let router = DocumentRouter::new();
        let seed = router.import_seed_files(&[a, b]).unwrap();

        assert_eq!(
            seed,
            "--- Start of context from file: a.txt ---\n\nalpha\n\n--- End of context from file: a.txt ---\n\n\
             --- Start of context from file: b.md ---\n\nbeta\n\n--- End of context from file: b.md ---"
        );
    }

    #[test]
    fn test_import_seed_files_aborts_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "ok").unwrap();
        let bad = dir.path().join("bad.docx");

        let router = DocumentRouter::new();
        assert!(router.import_seed_files(&[good, bad]).is_err());
    }

    #[test]
    fn test_title_from_file_name() {
        assert_eq!(title_from_file_name("my.novel.pdf"), "my.novel");
        assert_eq!(title_from_file_name("draft"), "draft");
        assert_eq!(title_from_file_name(".hidden"), ".hidden");
    }
}
