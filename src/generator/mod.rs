use crate::types::Phase;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// 子模块声明
pub mod gemini;

pub use gemini::GeminiClient;

/// 默认翻译目标语言
pub const DEFAULT_TRANSLATION_LANGUAGE: &str = "Brazilian Portuguese";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("未配置生成服务 API Key（请设置 GEMINI_API_KEY）")]
    MissingApiKey,
    #[error("生成服务请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("生成服务返回错误 ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("生成服务响应格式错误: {0}")]
    MalformedResponse(String),
    #[error("生成服务未返回任何文本")]
    EmptyResponse,
}

/// 单页生成请求
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub objective: String,
    pub phase: Phase,
    /// 已提交的上下文（种子或此前全部页面）
    pub context: String,
    /// 已生成的页数，新页的页码为 page_count + 1
    pub page_count: usize,
}

/// 全文翻译请求
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
}

/// 文本生成服务
///
/// 所有生成后端必须实现此 trait；失败不自动重试，由调用方决定是否重新调用
#[async_trait]
pub trait PageGenerator: Send + Sync {
    /// 生成下一页正文（不含标题、页码等多余内容）
    async fn generate_page(&self, request: &PageRequest) -> Result<String, GenerationError>;

    /// 翻译整部书稿
    async fn translate(&self, request: &TranslationRequest) -> Result<String, GenerationError>;
}

/// 构建单页生成提示词
pub fn page_prompt(request: &PageRequest) -> String {
    let context = if request.context.trim().is_empty() {
        "This is the very first page. Start the story."
    } else {
        request.context.as_str()
    };
    let next_page = request.page_count + 1;

    format!(
        "You are an expert ghostwriter creating a book page by page.

BOOK OBJECTIVE:
{objective}

CURRENT PHASE: {phase}
This phase dictates the tone and progression of the narrative.
- BEGINNING: Introduce characters, setting, and the core conflict.
- MIDDLE: Develop the plot, raise the stakes, and present challenges.
- END: Climax, falling action, and resolution of the conflict.

EXISTING CONTENT (CONTEXT):
---
{context}
---

INSTRUCTION:
Based on all the information above, write the complete text for the next page, which is page number {next_page}.
Your response should ONLY be the text for this new page. Do not add any commentary, titles, page numbers, or formatting like \"Page {next_page}\".
",
        objective = request.objective,
        phase = request.phase,
        context = context,
        next_page = next_page,
    )
}

/// 构建翻译提示词
pub fn translation_prompt(request: &TranslationRequest) -> String {
    format!(
        "You are an expert translator. Translate the following book text into {language}.
Preserve the original tone, style, narrative voice, and formatting (like line breaks and paragraphs) as closely as possible.
Your response should ONLY be the translated text.

TEXT TO TRANSLATE:
---
{text}
---
",
        language = request.target_language,
        text = request.text,
    )
}
