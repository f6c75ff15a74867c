use crate::db;
use crate::types::{LibraryBook, NewLibraryBook};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("书库初始化失败 ({path}): {message}")]
    Init { path: PathBuf, message: String },
    #[error("书库操作失败: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("书籍时间戳无法解析: {0}")]
    InvalidTimestamp(String),
    #[error("无法保存书籍: {0}")]
    InvalidBook(String),
}

/// 本地书库
///
/// 只支持新增、列表、读取和删除；书籍保存后不可修改
pub struct LibraryStore {
    conn: Connection,
}

impl LibraryStore {
    /// 打开书库（显式初始化）
    ///
    /// 自动创建父目录和表结构，可重复调用。失败时只影响书库功能。
    ///
    /// # 参数
    /// - `path`: 数据库文件路径
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let init_error = |message: String| LibraryError::Init {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| init_error(e.to_string()))?;
        }
        let conn = db::init_db(path).map_err(|e| init_error(e.to_string()))?;

        info!(path = %path.display(), "library opened");
        Ok(Self { conn })
    }

    /// 打开内存书库
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = db::init_memory_db().map_err(|e| LibraryError::Init {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        Ok(Self { conn })
    }

    /// 保存书籍
    ///
    /// # 返回
    /// 书库分配的书籍 ID
    pub fn add(&self, book: &NewLibraryBook) -> Result<i64, LibraryError> {
        if book.title.trim().is_empty() {
            return Err(LibraryError::InvalidBook("标题不能为空".to_string()));
        }

        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.conn.execute(
            "INSERT INTO books (title, objective, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![book.title, book.objective, book.content, created_at],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(id, title = %book.title, "book saved to library");
        Ok(id)
    }

    /// 列出全部书籍，按创建时间倒序
    pub fn list(&self) -> Result<Vec<LibraryBook>, LibraryError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, objective, content, created_at
             FROM books ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([], raw_book)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawBook::into_book).collect()
    }

    /// 读取单本书籍
    pub fn get(&self, id: i64) -> Result<Option<LibraryBook>, LibraryError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, title, objective, content, created_at FROM books WHERE id = ?1",
                [id],
                raw_book,
            )
            .optional()?;

        raw.map(RawBook::into_book).transpose()
    }

    /// 删除书籍
    ///
    /// # 返回
    /// 书籍存在并被删除时返回 true
    pub fn delete(&self, id: i64) -> Result<bool, LibraryError> {
        let removed = self.conn.execute("DELETE FROM books WHERE id = ?1", [id])?;
        debug!(id, removed, "delete from library");
        Ok(removed > 0)
    }
}

struct RawBook {
    id: i64,
    title: String,
    objective: String,
    content: String,
    created_at: String,
}

impl RawBook {
    fn into_book(self) -> Result<LibraryBook, LibraryError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| LibraryError::InvalidTimestamp(format!("{}: {}", self.created_at, e)))?
            .with_timezone(&Utc);

        Ok(LibraryBook {
            id: self.id,
            title: self.title,
            objective: self.objective,
            content: self.content,
            created_at,
        })
    }
}

fn raw_book(row: &Row<'_>) -> rusqlite::Result<RawBook> {
    Ok(RawBook {
        id: row.get(0)?,
        title: row.get(1)?,
        objective: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
