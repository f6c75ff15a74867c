use super::*;
use encoding_rs::*;

/// 纯文本提取器
///
/// 支持 TXT 和 Markdown，自动检测编码（UTF-8, GBK 等）；Markdown 保留原文
#[derive(Clone)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// 创建新的纯文本提取器实例
    pub fn new() -> Self {
        Self
    }

    /// 检测文件编码
    ///
    /// 依次检查 BOM、UTF-8 合法性和 GBK，都不符合时按 Windows-1252 处理
    fn detect_encoding(&self, bytes: &[u8]) -> &'static Encoding {
        if let Some((encoding, _bom_length)) = Encoding::for_bom(bytes) {
            return encoding;
        }

        if std::str::from_utf8(bytes).is_ok() {
            return UTF_8;
        }

        if self.decodes_as_gbk(bytes) {
            return GBK;
        }

        // Windows 导出的西文文本
        WINDOWS_1252
    }

    /// 非 ASCII 内容能否按 GBK 无损解码
    ///
    /// 西文单字节编码（如 Windows-1252）的高位字节后常跟 ASCII，GBK 解码会失败
    fn decodes_as_gbk(&self, bytes: &[u8]) -> bool {
        !bytes.is_ascii()
            && GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .is_some()
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        let encoding = self.detect_encoding(bytes);

        // decode 会自动去掉 BOM
        let (content, encoding_used, had_errors) = encoding.decode(bytes);
        if had_errors {
            warn!(encoding = encoding_used.name(), "text decoded with replacement characters");
        }

        Ok(content.replace("\r\n", "\n"))
    }

    fn supported_extensions(&self) -> Vec<&str> {
        vec!["txt", "md"]
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_extensions() {
        let extractor = PlainTextExtractor::new();
        assert_eq!(extractor.supported_extensions(), vec!["txt", "md"]);
    }

    #[test]
    fn test_detect_utf8_encoding() {
        let extractor = PlainTextExtractor::new();
        assert_eq!(extractor.detect_encoding("测试文本".as_bytes()), UTF_8);
        assert_eq!(extractor.detect_encoding(b"Hello World"), UTF_8);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let extractor = PlainTextExtractor::new();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("第一页".as_bytes());

        assert_eq!(extractor.extract(&bytes).unwrap(), "第一页");
    }

    #[test]
    fn test_gbk_decoded() {
        let extractor = PlainTextExtractor::new();
        // GBK 编码的 "测试" (0xB2E2 0xCAD4)
        let gbk_bytes = vec![0xB2, 0xE2, 0xCA, 0xD4];

        assert_eq!(extractor.detect_encoding(&gbk_bytes), GBK);
        assert_eq!(extractor.extract(&gbk_bytes).unwrap(), "测试");
    }

    #[test]
    fn test_decodes_as_gbk() {
        let extractor = PlainTextExtractor::new();
        assert!(extractor.decodes_as_gbk(&[0xB2, 0xE2, 0xCA, 0xD4]));
        assert!(!extractor.decodes_as_gbk(b"This is a test"));
        // Windows-1252 的 "Café au lait"
        assert!(!extractor.decodes_as_gbk(b"Caf\xe9 au lait"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let extractor = PlainTextExtractor::new();
        let bytes = b"Caf\xe9 au lait";

        assert_eq!(extractor.detect_encoding(bytes), WINDOWS_1252);
        assert_eq!(extractor.extract(bytes).unwrap(), "Caf\u{e9} au lait");
    }

    #[test]
    fn test_crlf_normalized() {
        let extractor = PlainTextExtractor::new();
        let text = extractor.extract(b"line one\r\nline two\r\n\r\nnext").unwrap();
        assert_eq!(text, "line one\nline two\n\nnext");
    }

    #[test]
    fn test_markdown_kept_verbatim() {
        let extractor = PlainTextExtractor::new();
        let text = extractor.extract(b"# Title\n\n*emphasis*").unwrap();
        assert_eq!(text, "# Title\n\n*emphasis*");
    }
}
