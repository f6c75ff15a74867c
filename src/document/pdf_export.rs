use super::*;
use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::borrow::Cow;

const MM_TO_PT: f32 = 72.0 / 25.4;

/// Times-Roman 字宽（AFM，单位为千分之一 em），按 WinAnsi 字节索引
#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, 0,
    500, 0, 333, 500, 444, 1000, 500, 500, 333, 1000, 556, 333, 889, 0, 611, 0,
    0, 333, 333, 444, 444, 350, 500, 1000, 333, 980, 389, 333, 722, 0, 444, 722,
    250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
    400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
    722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
    444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
];

/// 导出版式（单位：毫米，A4）
#[derive(Debug, Clone, PartialEq)]
pub struct ExportLayout {
    pub page_width: f32,
    pub page_height: f32,
    /// 正文左边距
    pub margin_left: f32,
    /// 标题基线位置（居中）
    pub title_y: f32,
    /// 第一页正文起始位置
    pub body_start_y: f32,
    /// 续页正文起始位置
    pub top_y: f32,
    pub line_height: f32,
    /// 超过此位置换页
    pub page_break_y: f32,
    /// 正文折行宽度
    pub wrap_width: f32,
    pub font_size: f32,
    pub title_font_size: f32,
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin_left: 15.0,
            title_y: 20.0,
            body_start_y: 35.0,
            top_y: 20.0,
            line_height: 7.0,
            page_break_y: 280.0,
            wrap_width: 180.0,
            font_size: 12.0,
            title_font_size: 18.0,
        }
    }
}

impl ExportLayout {
    /// 所有尺寸为正且落在页面内
    pub fn is_valid(&self) -> bool {
        let positive = [
            self.page_width,
            self.page_height,
            self.line_height,
            self.wrap_width,
            self.font_size,
            self.title_font_size,
        ]
        .iter()
        .all(|v| *v > 0.0);

        positive
            && self.margin_left >= 0.0
            && self.margin_left + self.wrap_width <= self.page_width
            && self.page_break_y <= self.page_height
            && self.top_y < self.page_break_y
            && self.body_start_y < self.page_break_y
    }

    /// 正文折行宽度（磅）
    pub fn wrap_width_pt(&self) -> f32 {
        self.wrap_width * MM_TO_PT
    }
}

/// 排好版的一行
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// 距页面顶部的距离（毫米）
    pub y: f32,
    pub text: String,
}

/// 文本宽度（磅），按 Times-Roman 字宽计算
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    let units: u32 = bytes.iter().map(|b| TIMES_ROMAN_WIDTHS[*b as usize] as u32).sum();
    units as f32 * font_size / 1000.0
}

/// 按实际字宽折行
///
/// 保留原有换行和空行；比一整行还宽的单词按字符截断
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space = text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let mut word = Cow::Borrowed(word);
            let mut word_width = text_width(&word, font_size);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                let (pieces, rest) = split_long_word(&word, max_width, font_size);
                lines.extend(pieces);
                word_width = text_width(&rest, font_size);
                word = Cow::Owned(rest);
            }

            if !current.is_empty() && current_width + space + word_width > max_width {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_width += space;
            }
            current.push_str(&word);
            current_width += word_width;
        }

        lines.push(current);
    }

    lines
}

/// 截断超宽单词，返回已填满的行和剩余部分
fn split_long_word(word: &str, max_width: f32, font_size: f32) -> (Vec<String>, String) {
    let mut pieces = Vec::new();
    let mut chunk = String::new();
    let mut chunk_width = 0.0;
    let mut buf = [0u8; 4];

    for c in word.chars() {
        let width = text_width(c.encode_utf8(&mut buf), font_size);
        if !chunk.is_empty() && chunk_width + width > max_width {
            pieces.push(std::mem::take(&mut chunk));
            chunk_width = 0.0;
        }
        chunk.push(c);
        chunk_width += width;
    }

    (pieces, chunk)
}

/// 把行分配到页面
///
/// 第一页从 `body_start_y` 开始，位置超过 `page_break_y` 时换页并从 `top_y` 继续
pub fn paginate(lines: &[String], layout: &ExportLayout) -> Vec<Vec<PlacedLine>> {
    let mut pages = vec![Vec::new()];
    let mut y = layout.body_start_y;

    for line in lines {
        if y > layout.page_break_y {
            pages.push(Vec::new());
            y = layout.top_y;
        }
        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine {
                y,
                text: line.clone(),
            });
        }
        y += layout.line_height;
    }

    pages
}

/// 渲染 PDF
///
/// # 参数
/// - `title`: 第一页居中标题，可选
/// - `text`: 正文
/// - `layout`: 版式
///
/// # 返回
/// PDF 文件字节；包含内置字体无法表示的字符时返回 `UnsupportedCharacters`
pub fn render_pdf(title: Option<&str>, text: &str, layout: &ExportLayout) -> Result<Vec<u8>, DocumentError> {
    let text = text.replace("\r\n", "\n").replace(|c: char| c == '\r' || c == '\t', " ");
    if let Some(title) = title {
        encode_win_ansi(title)?;
    }
    encode_win_ansi(&text)?;

    let lines = wrap_text(&text, layout.wrap_width_pt(), layout.font_size);
    let pages = paginate(&lines, layout);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let mut operations = Vec::new();

        if index == 0 {
            if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
                let width = text_width(title, layout.title_font_size);
                let x = (layout.page_width * MM_TO_PT - width) / 2.0;
                push_text(&mut operations, layout.title_font_size, x.max(0.0), layout.title_y, title, layout);
            }
        }

        for line in page.iter().filter(|l| !l.text.is_empty()) {
            push_text(
                &mut operations,
                layout.font_size,
                layout.margin_left * MM_TO_PT,
                line.y,
                &line.text,
                layout,
            );
        }

        let content = Content { operations };
        let encoded = content.encode().map_err(|e| DocumentError::Export(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0i64.into(),
        0i64.into(),
        to_pt(layout.page_width).into(),
        to_pt(layout.page_height).into(),
    ];
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| DocumentError::Export(e.to_string()))?;
    Ok(bytes)
}

/// 渲染并写入文件
pub fn write_pdf(path: &Path, title: Option<&str>, text: &str, layout: &ExportLayout) -> Result<(), DocumentError> {
    let bytes = render_pdf(title, text, layout)?;
    fs::write(path, &bytes).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "pdf exported");
    Ok(())
}

fn push_text(operations: &mut Vec<Operation>, size: f32, x_pt: f32, y_mm: f32, text: &str, layout: &ExportLayout) {
    let y_pt = (layout.page_height - y_mm) * MM_TO_PT;
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), (size.round() as i64).into()]));
    operations.push(Operation::new("Td", vec![(x_pt.round() as i64).into(), (y_pt.round() as i64).into()]));
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    operations.push(Operation::new("Tj", vec![Object::string_literal(bytes.into_owned())]));
    operations.push(Operation::new("ET", vec![]));
}

fn to_pt(mm: f32) -> i64 {
    (mm * MM_TO_PT).round() as i64
}

/// 转换为 WinAnsi 编码
///
/// 内置 Times 字体只覆盖 Windows-1252 字符集，其他字符直接报错
pub fn encode_win_ansi(text: &str) -> Result<Cow<'_, [u8]>, DocumentError> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if !had_errors {
        return Ok(bytes);
    }

    let mut unsupported = text.chars().filter(|c| !is_win_ansi(*c));
    match unsupported.next() {
        Some(sample) => Err(DocumentError::UnsupportedCharacters {
            count: 1 + unsupported.count(),
            sample,
        }),
        None => Ok(bytes),
    }
}

fn is_win_ansi(c: char) -> bool {
    let mut buf = [0u8; 4];
    !WINDOWS_1252.encode(c.encode_utf8(&mut buf)).2
}
