use crate::checkpoint::CheckpointPolicy;
use crate::generator::{GenerationError, PageGenerator, PageRequest, TranslationRequest};
use crate::library::{LibraryError, LibraryStore};
use crate::phase::PhaseThresholds;
use crate::types::{AppState, BookDetails, NewLibraryBook, Phase};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 上下文分隔符：已提交上下文和各页之间使用
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("书籍设定无效：标题和目标不能为空，预计页数必须大于 0")]
    InvalidDetails,
    #[error("当前状态 {state:?} 不允许此操作")]
    InvalidState { state: AppState },
    #[error("页码 {index} 超出范围（共 {len} 页）")]
    PageOutOfRange { index: usize, len: usize },
    #[error("没有正在进行的生成请求")]
    NoGenerationInFlight,
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("翻译失败: {0}")]
    Translation(GenerationError),
    #[error("{0}")]
    Library(#[from] LibraryError),
}

/// 会话参数
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub thresholds: PhaseThresholds,
    pub checkpoint: CheckpointPolicy,
    pub context_separator: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            thresholds: PhaseThresholds::default(),
            checkpoint: CheckpointPolicy::default(),
            context_separator: CONTEXT_SEPARATOR.to_string(),
        }
    }
}

/// 写作会话控制器
///
/// 每个写作会话一个实例，持有全部会话状态并驱动状态机：
/// HOME → WRITING → CHECKPOINT → WRITING → … → FINAL_REVIEW。
/// 生成步骤拆成 `begin_generation` / `complete_generation` 两个显式转换，
/// 同一时刻最多只有一个生成请求在进行。
pub struct SessionController {
    settings: SessionSettings,
    state: AppState,
    details: Option<BookDetails>,
    /// 当前可编辑的页面（尚未折叠进上下文）
    generated_pages: Vec<String>,
    /// 已提交、不再显示为可编辑页面的上下文
    pdf_context: String,
    total_page_count: usize,
    phase: Phase,
    is_auto_generating: bool,
    is_fully_generating: bool,
    in_flight: bool,
    reached_final_review: bool,
    translated_content: Option<String>,
    error: Option<String>,
}

impl SessionController {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            state: AppState::Home,
            details: None,
            generated_pages: Vec::new(),
            pdf_context: String::new(),
            total_page_count: 0,
            phase: Phase::Beginning,
            is_auto_generating: false,
            is_fully_generating: false,
            in_flight: false,
            reached_final_review: false,
            translated_content: None,
            error: None,
        }
    }

    // ==================== 状态查询 ====================

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn details(&self) -> Option<&BookDetails> {
        self.details.as_ref()
    }

    pub fn pages(&self) -> &[String] {
        &self.generated_pages
    }

    pub fn pdf_context(&self) -> &str {
        &self.pdf_context
    }

    pub fn total_page_count(&self) -> usize {
        self.total_page_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_auto_generating(&self) -> bool {
        self.is_auto_generating
    }

    pub fn is_fully_generating(&self) -> bool {
        self.is_fully_generating
    }

    /// 是否有生成请求正在进行
    pub fn is_generating(&self) -> bool {
        self.in_flight
    }

    pub fn translated_content(&self) -> Option<&str> {
        self.translated_content.as_deref()
    }

    /// 当前待显示的错误信息（同一时刻最多一条）
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// 记录由外部操作（导入、书库等）产生的错误
    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.error = Some(message);
    }

    // ==================== 会话生命周期 ====================

    /// 初始化会话但不生成页面
    ///
    /// # 参数
    /// - `details`: 书籍设定
    /// - `initial_context`: 可选的种子上下文
    /// - `fully_automatic`: 全自动模式，检查点自动折叠并持续生成
    pub fn prepare_session(
        &mut self,
        details: BookDetails,
        initial_context: Option<String>,
        fully_automatic: bool,
    ) -> Result<(), SessionError> {
        if !details.is_valid() {
            return Err(SessionError::InvalidDetails);
        }

        self.reset();
        self.phase = self.settings.thresholds.classify(0, details.estimated_pages);
        info!(
            title = %details.title,
            estimated_pages = details.estimated_pages,
            fully_automatic,
            "writing session started"
        );
        self.details = Some(details);
        if let Some(context) = initial_context.filter(|c| !c.trim().is_empty()) {
            self.pdf_context = context;
        }
        self.is_fully_generating = fully_automatic;
        self.is_auto_generating = fully_automatic;
        self.state = AppState::Writing;
        Ok(())
    }

    /// 开始会话并生成第一页
    pub async fn start_session(
        &mut self,
        generator: &dyn PageGenerator,
        details: BookDetails,
        initial_context: Option<String>,
        fully_automatic: bool,
    ) -> Result<AppState, SessionError> {
        self.prepare_session(details, initial_context, fully_automatic)?;
        self.generate_next_page(generator).await
    }

    /// 回到首页，无条件丢弃全部会话状态
    pub fn go_home(&mut self) {
        if self.state != AppState::Home {
            info!(pages = self.total_page_count, "session discarded");
        }
        self.reset();
    }

    fn reset(&mut self) {
        let settings = std::mem::take(&mut self.settings);
        *self = Self::new(settings);
    }

    // ==================== 页面生成 ====================

    /// 发送给生成服务的上下文：已提交上下文和全部可见页面
    pub fn current_context(&self) -> String {
        std::iter::once(self.pdf_context.as_str())
            .chain(self.generated_pages.iter().map(String::as_str))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(&self.settings.context_separator)
    }

    /// 开始一次生成
    ///
    /// # 返回
    /// - Ok(Some(request)): 需要发送的请求
    /// - Ok(None): 已有请求在进行，本次调用被忽略
    /// - Err: 当前不在写作状态
    pub fn begin_generation(&mut self) -> Result<Option<PageRequest>, SessionError> {
        if self.in_flight {
            debug!("generation already in flight, request ignored");
            return Ok(None);
        }
        if self.state != AppState::Writing {
            return Err(SessionError::InvalidState { state: self.state });
        }
        let details = self
            .details
            .as_ref()
            .ok_or(SessionError::InvalidState { state: self.state })?;

        let request = PageRequest {
            objective: details.objective.clone(),
            phase: self.phase,
            context: self.current_context(),
            page_count: self.total_page_count,
        };

        self.in_flight = true;
        self.error = None;
        debug!(page = self.total_page_count + 1, phase = %self.phase, "generation started");
        Ok(Some(request))
    }

    /// 应用生成结果
    ///
    /// 成功时追加页面、重新计算阶段并评估检查点和完成条件；
    /// 失败时记录一条错误并停止自动生成，不追加页面。
    ///
    /// # 返回
    /// 转换后的状态
    pub fn complete_generation(&mut self, result: Result<String, GenerationError>) -> Result<AppState, SessionError> {
        if !self.in_flight {
            return Err(SessionError::NoGenerationInFlight);
        }
        self.in_flight = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.report_error(e.to_string());
                self.is_auto_generating = false;
                self.is_fully_generating = false;
                return Err(SessionError::Generation(e));
            }
        };

        self.generated_pages.push(page);
        self.total_page_count += 1;
        if let Some(details) = &self.details {
            self.phase = self.settings.thresholds.classify(self.total_page_count, details.estimated_pages);
        }
        info!(page = self.total_page_count, phase = %self.phase, "page generated");

        self.advance_after_page();
        Ok(self.state)
    }

    fn advance_after_page(&mut self) {
        let Some(estimated) = self.details.as_ref().map(|d| d.estimated_pages) else {
            return;
        };

        if self.total_page_count >= estimated as usize {
            self.is_auto_generating = false;
            self.is_fully_generating = false;
            if !self.reached_final_review {
                self.reached_final_review = true;
                self.state = AppState::FinalReview;
                info!(pages = self.total_page_count, "manuscript complete");
            }
            return;
        }

        if self
            .settings
            .checkpoint
            .fires(self.generated_pages.len(), self.total_page_count, estimated)
        {
            if self.is_fully_generating {
                debug!(pages = self.total_page_count, "checkpoint folded automatically");
                self.fold_pages();
            } else {
                info!(pages = self.total_page_count, "checkpoint reached");
                self.state = AppState::Checkpoint;
            }
        }
    }

    /// 生成下一页
    ///
    /// 已有请求在进行时不做任何事；失败不会自动重试
    pub async fn generate_next_page(&mut self, generator: &dyn PageGenerator) -> Result<AppState, SessionError> {
        let Some(request) = self.begin_generation()? else {
            return Ok(self.state);
        };
        let result = generator.generate_page(&request).await;
        self.complete_generation(result)
    }

    /// 开关自动生成
    pub fn set_auto_generating(&mut self, enabled: bool) {
        self.is_auto_generating = enabled;
        if !enabled {
            self.is_fully_generating = false;
        }
    }

    /// 自动生成循环
    ///
    /// 在写作状态且自动生成开启时持续生成；遇到检查点（非全自动）、完成或错误时停止
    pub async fn run_automatic(&mut self, generator: &dyn PageGenerator) -> Result<AppState, SessionError> {
        while self.is_auto_generating && self.state == AppState::Writing {
            self.generate_next_page(generator).await?;
        }
        Ok(self.state)
    }

    /// 修改某一页
    ///
    /// 已有译文会被丢弃，之后导出和保存使用修改后的原文
    pub fn update_page(&mut self, index: usize, content: impl Into<String>) -> Result<(), SessionError> {
        let len = self.generated_pages.len();
        let page = self
            .generated_pages
            .get_mut(index)
            .ok_or(SessionError::PageOutOfRange { index, len })?;
        *page = content.into();
        if self.translated_content.take().is_some() {
            info!(page = index + 1, "page edited, translation discarded");
        }
        Ok(())
    }

    // ==================== 检查点 ====================

    fn fold_pages(&mut self) {
        let folded = self.current_context().trim().to_string();
        debug!(folded = self.generated_pages.len(), "pages folded into context");
        self.pdf_context = folded;
        self.generated_pages.clear();
    }

    fn require_state(&self, expected: AppState) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState { state: self.state });
        }
        Ok(())
    }

    /// 检查点：把可见页面折叠进上下文并继续写作
    pub fn continue_automatically(&mut self) -> Result<(), SessionError> {
        self.require_state(AppState::Checkpoint)?;
        self.fold_pages();
        self.state = AppState::Writing;
        Ok(())
    }

    /// 检查点：用导入的文档替换上下文并继续写作
    pub fn reseed_from_document(&mut self, text: &str) -> Result<(), SessionError> {
        self.require_state(AppState::Checkpoint)?;
        self.pdf_context = text.trim().to_string();
        self.generated_pages.clear();
        info!(chars = self.pdf_context.chars().count(), "context re-seeded from document");
        self.state = AppState::Writing;
        Ok(())
    }

    /// 检查点展示的最近页面
    pub fn checkpoint_pages(&self) -> &[String] {
        self.settings.checkpoint.recent_pages(&self.generated_pages)
    }

    /// 检查点页面的导出文本
    pub fn checkpoint_text(&self) -> String {
        self.checkpoint_pages().join(&self.settings.context_separator)
    }

    pub fn checkpoint_export_name(&self) -> String {
        let title = self.details.as_ref().map(|d| d.title.as_str()).unwrap_or("");
        self.settings.checkpoint.export_file_name(title, self.total_page_count)
    }

    // ==================== 完成审阅 ====================

    /// 完整书稿：已提交上下文加全部可见页面
    pub fn full_content(&self) -> String {
        self.current_context().trim().to_string()
    }

    /// 用于导出和保存的书稿（有译文时使用译文）
    pub fn manuscript(&self) -> String {
        self.translated_content.clone().unwrap_or_else(|| self.full_content())
    }

    /// 翻译完整书稿
    pub async fn translate(
        &mut self,
        generator: &dyn PageGenerator,
        target_language: &str,
    ) -> Result<&str, SessionError> {
        self.require_state(AppState::FinalReview)?;
        self.error = None;

        let request = TranslationRequest {
            text: self.full_content(),
            target_language: target_language.to_string(),
        };
        match generator.translate(&request).await {
            Ok(translated) => {
                info!(language = target_language, "manuscript translated");
                Ok(self.translated_content.insert(translated).as_str())
            }
            Err(e) => {
                self.report_error(format!("翻译失败: {}", e));
                Err(SessionError::Translation(e))
            }
        }
    }

    /// 待保存到书库的书籍
    pub fn library_entry(&self) -> Option<NewLibraryBook> {
        let details = self.details.as_ref()?;
        Some(NewLibraryBook {
            title: details.title.clone(),
            objective: details.objective.clone(),
            content: self.manuscript(),
        })
    }

    /// 保存到书库
    pub fn save_to_library(&mut self, store: &LibraryStore) -> Result<i64, SessionError> {
        self.require_state(AppState::FinalReview)?;
        let entry = self
            .library_entry()
            .ok_or(SessionError::InvalidState { state: self.state })?;

        store.add(&entry).map_err(|e| {
            self.report_error(e.to_string());
            SessionError::Library(e)
        })
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按脚本返回结果的生成器；脚本用完后返回 "page N"
    #[derive(Default)]
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<String, GenerationError>>>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedGenerator {
        fn failing_first() -> Self {
            let generator = Self::default();
            generator
                .script
                .lock()
                .unwrap()
                .push_back(Err(GenerationError::EmptyResponse));
            generator
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageGenerator for ScriptedGenerator {
        async fn generate_page(&self, request: &PageRequest) -> Result<String, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("page {}", request.page_count + 1)))
        }

        async fn translate(&self, request: &TranslationRequest) -> Result<String, GenerationError> {
            Ok(format!("[{}] {}", request.target_language, request.text))
        }
    }

    fn details(pages: u32) -> BookDetails {
        BookDetails::new("The Lighthouse", "A keeper's last winter", pages)
    }

    #[test]
    fn test_prepare_rejects_invalid_details() {
        let mut session = SessionController::default();
        let result = session.prepare_session(BookDetails::new("", "x", 10), None, false);
        assert!(matches!(result, Err(SessionError::InvalidDetails)));
        assert_eq!(session.state(), AppState::Home);
    }

    #[tokio::test]
    async fn test_start_session_generates_first_page_from_seed() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();

        let state = session
            .start_session(&generator, details(10), Some("Seed text.".to_string()), false)
            .await
            .unwrap();

        assert_eq!(state, AppState::Writing);
        assert_eq!(session.pages(), &["page 1".to_string()]);
        assert_eq!(session.total_page_count(), 1);

        let requests = generator.requests();
        assert_eq!(requests[0].context, "Seed text.");
        assert_eq!(requests[0].page_count, 0);
        assert_eq!(requests[0].phase, Phase::Beginning);
        assert_eq!(requests[0].objective, "A keeper's last winter");
    }

    #[tokio::test]
    async fn test_context_joins_seed_and_pages() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session
            .start_session(&generator, details(10), Some("Seed".to_string()), false)
            .await
            .unwrap();
        session.generate_next_page(&generator).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests[1].context, "Seed\n\n---\n\npage 1");
        assert_eq!(requests[1].page_count, 1);
    }

    #[tokio::test]
    async fn test_phase_follows_progress() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.prepare_session(details(10), None, true).unwrap();

        let mut phases = Vec::new();
        while session.state() == AppState::Writing {
            session.generate_next_page(&generator).await.unwrap();
            phases.push(session.phase());
        }

        assert_eq!(phases.len(), 10);
        assert_eq!(&phases[0..2], &[Phase::Beginning; 2]);
        assert_eq!(&phases[2..7], &[Phase::Middle; 5]);
        assert_eq!(&phases[7..10], &[Phase::End; 3]);
    }

    #[tokio::test]
    async fn test_manual_mode_pauses_at_checkpoint() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.start_session(&generator, details(20), None, false).await.unwrap();

        for _ in 0..3 {
            assert_eq!(session.generate_next_page(&generator).await.unwrap(), AppState::Writing);
        }
        assert_eq!(session.generate_next_page(&generator).await.unwrap(), AppState::Checkpoint);
        assert_eq!(session.checkpoint_pages().len(), 5);
        assert_eq!(session.checkpoint_export_name(), "The Lighthouse-pages-1-5.pdf");

        // 检查点期间不能继续生成
        assert!(matches!(
            session.generate_next_page(&generator).await,
            Err(SessionError::InvalidState { state: AppState::Checkpoint })
        ));

        session.continue_automatically().unwrap();
        assert_eq!(session.state(), AppState::Writing);
        assert!(session.pages().is_empty());
        assert_eq!(
            session.pdf_context(),
            "page 1\n\n---\n\npage 2\n\n---\n\npage 3\n\n---\n\npage 4\n\n---\n\npage 5"
        );
        assert_eq!(session.total_page_count(), 5);
    }

    #[tokio::test]
    async fn test_reseed_replaces_context() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session
            .start_session(&generator, details(20), Some("old seed".to_string()), false)
            .await
            .unwrap();
        for _ in 0..4 {
            session.generate_next_page(&generator).await.unwrap();
        }
        assert_eq!(session.state(), AppState::Checkpoint);

        session.reseed_from_document("  edited manuscript \n").unwrap();
        assert_eq!(session.state(), AppState::Writing);
        assert_eq!(session.pdf_context(), "edited manuscript");
        assert!(session.pages().is_empty());

        session.generate_next_page(&generator).await.unwrap();
        let last = generator.requests().pop().unwrap();
        assert_eq!(last.context, "edited manuscript");
        assert_eq!(last.page_count, 5);
    }

    #[test]
    fn test_checkpoint_resolution_requires_checkpoint_state() {
        let mut session = SessionController::default();
        assert!(session.continue_automatically().is_err());
        assert!(session.reseed_from_document("x").is_err());
    }

    #[tokio::test]
    async fn test_fully_automatic_run_reaches_final_review_once() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.start_session(&generator, details(12), None, true).await.unwrap();

        let state = session.run_automatic(&generator).await.unwrap();

        assert_eq!(state, AppState::FinalReview);
        assert_eq!(session.total_page_count(), 12);
        assert!(!session.is_auto_generating());
        // 第 5、10 页时自动折叠，只剩最后两页可见
        assert_eq!(session.pages(), &["page 11".to_string(), "page 12".to_string()]);

        let expected: Vec<String> = (1..=12).map(|i| format!("page {}", i)).collect();
        assert_eq!(session.full_content(), expected.join(CONTEXT_SEPARATOR));

        // 完成后不能继续生成
        assert!(session.generate_next_page(&generator).await.is_err());
        assert_eq!(generator.requests().len(), 12);
    }

    #[tokio::test]
    async fn test_auto_mode_without_full_generation_stops_at_checkpoint() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.start_session(&generator, details(20), None, false).await.unwrap();
        session.set_auto_generating(true);

        let state = session.run_automatic(&generator).await.unwrap();
        assert_eq!(state, AppState::Checkpoint);
        assert_eq!(session.total_page_count(), 5);
        assert!(session.is_auto_generating());

        session.continue_automatically().unwrap();
        let state = session.run_automatic(&generator).await.unwrap();
        assert_eq!(state, AppState::Checkpoint);
        assert_eq!(session.total_page_count(), 10);
    }

    #[tokio::test]
    async fn test_final_review_takes_precedence_over_checkpoint() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.start_session(&generator, details(5), None, false).await.unwrap();
        for _ in 0..4 {
            session.generate_next_page(&generator).await.unwrap();
        }
        assert_eq!(session.state(), AppState::FinalReview);
    }

    #[tokio::test]
    async fn test_failed_generation_surfaces_one_error() {
        let generator = ScriptedGenerator::failing_first();
        let mut session = SessionController::default();

        let result = session.start_session(&generator, details(10), None, true).await;

        assert!(matches!(result, Err(SessionError::Generation(GenerationError::EmptyResponse))));
        assert!(!session.is_auto_generating());
        assert!(!session.is_fully_generating());
        assert!(!session.is_generating());
        assert_eq!(session.total_page_count(), 0);
        assert!(session.pages().is_empty());
        assert_eq!(session.error(), Some("生成服务未返回任何文本"));
        assert_eq!(session.state(), AppState::Writing);

        // 调用方重试
        session.generate_next_page(&generator).await.unwrap();
        assert_eq!(session.total_page_count(), 1);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_single_flight_guard() {
        let mut session = SessionController::default();
        session.prepare_session(details(10), None, false).unwrap();

        let first = session.begin_generation().unwrap();
        assert!(first.is_some());
        assert!(session.is_generating());
        assert!(session.begin_generation().unwrap().is_none());

        session.complete_generation(Ok("text".to_string())).unwrap();
        assert!(!session.is_generating());
        assert!(session.begin_generation().unwrap().is_some());
    }

    #[test]
    fn test_late_completion_after_go_home_is_dropped() {
        let mut session = SessionController::default();
        session.prepare_session(details(10), None, false).unwrap();
        session.begin_generation().unwrap();

        session.go_home();
        assert!(matches!(
            session.complete_generation(Ok("late".to_string())),
            Err(SessionError::NoGenerationInFlight)
        ));
        assert!(session.pages().is_empty());
        assert_eq!(session.state(), AppState::Home);
    }

    #[test]
    fn test_update_page() {
        let mut session = SessionController::default();
        session.prepare_session(details(10), None, false).unwrap();
        session.begin_generation().unwrap();
        session.complete_generation(Ok("draft".to_string())).unwrap();

        session.update_page(0, "revised").unwrap();
        assert_eq!(session.pages()[0], "revised");
        assert!(matches!(
            session.update_page(3, "nope"),
            Err(SessionError::PageOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_go_home_discards_everything() {
        let mut session = SessionController::default();
        session
            .prepare_session(details(10), Some("seed".to_string()), true)
            .unwrap();
        session.report_error("boom");

        session.go_home();
        assert_eq!(session.state(), AppState::Home);
        assert!(session.details().is_none());
        assert_eq!(session.pdf_context(), "");
        assert!(!session.is_auto_generating());
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn test_translate_and_save() {
        let generator = ScriptedGenerator::default();
        let store = LibraryStore::open_in_memory().unwrap();
        let mut session = SessionController::default();
        session.start_session(&generator, details(2), None, false).await.unwrap();
        session.generate_next_page(&generator).await.unwrap();
        assert_eq!(session.state(), AppState::FinalReview);

        let translated = session.translate(&generator, "Brazilian Portuguese").await.unwrap().to_string();
        assert_eq!(translated, "[Brazilian Portuguese] page 1\n\n---\n\npage 2");

        let id = session.save_to_library(&store).unwrap();
        let saved = store.get(id).unwrap().unwrap();
        assert_eq!(saved.title, "The Lighthouse");
        assert_eq!(saved.content, translated);
    }

    #[tokio::test]
    async fn test_edit_after_translation_discards_stale_translation() {
        let generator = ScriptedGenerator::default();
        let store = LibraryStore::open_in_memory().unwrap();
        let mut session = SessionController::default();
        session.start_session(&generator, details(2), None, false).await.unwrap();
        session.generate_next_page(&generator).await.unwrap();
        session.translate(&generator, "French").await.unwrap();
        assert!(session.translated_content().is_some());

        session.update_page(1, "page 2, revised").unwrap();

        assert_eq!(session.translated_content(), None);
        assert_eq!(session.manuscript(), "page 1\n\n---\n\npage 2, revised");
        let id = session.save_to_library(&store).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().content, "page 1\n\n---\n\npage 2, revised");
    }

    #[tokio::test]
    async fn test_translate_requires_final_review() {
        let generator = ScriptedGenerator::default();
        let mut session = SessionController::default();
        session.prepare_session(details(10), None, false).unwrap();
        assert!(matches!(
            session.translate(&generator, "French").await,
            Err(SessionError::InvalidState { state: AppState::Writing })
        ));
    }

    #[test]
    fn test_custom_cadence() {
        let settings = SessionSettings {
            checkpoint: CheckpointPolicy::new(2),
            ..SessionSettings::default()
        };
        let mut session = SessionController::new(settings);
        session.prepare_session(details(10), None, false).unwrap();

        for expected in [AppState::Writing, AppState::Checkpoint] {
            session.begin_generation().unwrap();
            assert_eq!(session.complete_generation(Ok("p".to_string())).unwrap(), expected);
        }
        assert_eq!(session.checkpoint_export_name(), "The Lighthouse-pages-1-2.pdf");
    }
}
