//! 逐页写书助手
//!
//! 会话状态机驱动生成服务逐页写作，定期在检查点暂停，
//! 完成后可翻译、导出 PDF 或保存到本地书库。

pub mod checkpoint;
pub mod config;
pub mod db;
pub mod document;
pub mod generator;
pub mod library;
pub mod phase;
pub mod session;
pub mod types;

pub use config::{AppConfig, ConfigError};
pub use document::{DocumentError, DocumentRouter, ImportedDocument};
pub use generator::{GeminiClient, GenerationError, PageGenerator, PageRequest, TranslationRequest};
pub use library::{LibraryError, LibraryStore};
pub use session::{SessionController, SessionError, SessionSettings};
pub use types::{AppState, BookDetails, LibraryBook, NewLibraryBook, Phase};

use tracing_subscriber::EnvFilter;

/// 默认日志过滤规则，可用 `RUST_LOG` 覆盖
pub const DEFAULT_LOG_FILTER: &str = "book_writer=info,book_writer_lib=info";

/// 初始化日志
///
/// 日志写到 stderr，stdout 留给书稿输出；重复调用时忽略
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
