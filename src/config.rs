use crate::checkpoint::CheckpointPolicy;
use crate::document::pdf_export::ExportLayout;
use crate::generator::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::generator::DEFAULT_TRANSLATION_LANGUAGE;
use crate::phase::PhaseThresholds;
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "book-writer";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件格式错误: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

// ==================== 磁盘上的 TOML 结构 ====================

/// 磁盘上的配置文件
///
/// 所有字段都是可选的，缺省项使用默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub generation: Option<GenerationSection>,
    pub session: Option<SessionSection>,
    pub library: Option<LibrarySection>,
    pub export: Option<ExportSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub translation_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    pub checkpoint_interval: Option<usize>,
    pub beginning_threshold: Option<f64>,
    pub end_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrarySection {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSection {
    pub margin_left: Option<f32>,
    pub line_height: Option<f32>,
    pub page_break_y: Option<f32>,
    pub wrap_width: Option<f32>,
}

// ==================== 解析后的配置 ====================

/// 生成服务配置
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub translation_language: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            translation_language: DEFAULT_TRANSLATION_LANGUAGE.to_string(),
        }
    }
}

/// 书库配置
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConfig {
    pub db_path: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub session: SessionSettings,
    pub library: LibraryConfig,
    pub export: ExportLayout,
}

impl AppConfig {
    /// 加载配置
    ///
    /// 优先使用显式指定的配置文件，否则使用平台配置目录下的 `book-writer/config.toml`，
    /// 都不存在时使用默认值。随后应用环境变量覆盖并校验。
    ///
    /// # 参数
    /// - `explicit`: 命令行指定的配置文件路径
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => read_config_file(path)?,
            None => match config_path().filter(|p| p.exists()) {
                Some(path) => read_config_file(&path)?,
                None => ConfigFile::default(),
            },
        };

        let mut config = Self::from_file(file);
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 把配置文件合并到默认值上
    pub fn from_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(g) = file.generation {
            if let Some(key) = g.api_key {
                config.generation.api_key = Some(key);
            }
            if let Some(model) = g.model {
                config.generation.model = model;
            }
            if let Some(url) = g.base_url {
                config.generation.base_url = url;
            }
            if let Some(timeout) = g.timeout_secs {
                config.generation.timeout_secs = timeout;
            }
            if let Some(lang) = g.translation_language {
                config.generation.translation_language = lang;
            }
        }

        if let Some(s) = file.session {
            if let Some(interval) = s.checkpoint_interval {
                config.session.checkpoint = CheckpointPolicy::new(interval);
            }
            config.session.thresholds = PhaseThresholds::new(
                s.beginning_threshold.unwrap_or(config.session.thresholds.beginning),
                s.end_threshold.unwrap_or(config.session.thresholds.end),
            );
        }

        if let Some(path) = file.library.and_then(|l| l.db_path) {
            config.library.db_path = PathBuf::from(path);
        }

        if let Some(e) = file.export {
            if let Some(v) = e.margin_left {
                config.export.margin_left = v;
            }
            if let Some(v) = e.line_height {
                config.export.line_height = v;
            }
            if let Some(v) = e.page_break_y {
                config.export.page_break_y = v;
            }
            if let Some(v) = e.wrap_width {
                config.export.wrap_width = v;
            }
        }

        config
    }

    /// 应用环境变量覆盖
    ///
    /// `GEMINI_API_KEY`（或 `API_KEY`）、`BOOK_WRITER_MODEL`、`BOOK_WRITER_DB`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY")) {
            debug!("API key taken from environment");
            self.generation.api_key = Some(key);
        }
        if let Some(model) = lookup("BOOK_WRITER_MODEL") {
            self.generation.model = model;
        }
        if let Some(db) = lookup("BOOK_WRITER_DB") {
            self.library.db_path = PathBuf::from(db);
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.checkpoint.interval == 0 {
            return Err(ConfigError::Invalid("checkpoint_interval 必须大于 0".to_string()));
        }
        if !self.session.thresholds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "阶段阈值必须满足 0 <= beginning <= end <= 1（当前 {} / {}）",
                self.session.thresholds.beginning, self.session.thresholds.end
            )));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model 不能为空".to_string()));
        }
        if !self.export.is_valid() {
            return Err(ConfigError::Invalid("导出版式参数超出页面范围".to_string()));
        }
        Ok(())
    }
}

/// 平台配置文件路径：`<config_dir>/book-writer/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// 默认书库路径：`<data_dir>/book-writer/library.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("library.db")
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(toml::from_str(&content)?)
}
