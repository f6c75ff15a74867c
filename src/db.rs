use rusqlite::{Connection, Result};
use std::path::Path;

/// 书库表结构
///
/// `books` 以自增整数为主键，标题上建非唯一索引
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        objective TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_books_title ON books (title);
";

/// 打开（必要时创建）书库数据库
///
/// 可重复调用：表和索引已存在时不做任何修改
pub fn init_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

/// 内存数据库，用于测试和临时会话
pub fn init_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA encoding = 'UTF-8'", [])?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
