use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 应用状态
///
/// 会话状态机的各个阶段
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    /// 首页（无活动会话）
    Home,
    /// 正在写作
    Writing,
    /// 检查点：等待用户处理最近生成的页面
    Checkpoint,
    /// 全书完成，等待审阅
    FinalReview,
}

/// 叙事阶段
///
/// 由写作进度推导，不能直接设置
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Beginning, // 开篇：人物、场景、核心冲突
    Middle,    // 发展：推进情节、提高赌注
    End,       // 结局：高潮、回落、解决冲突
}

impl Phase {
    /// 发送给生成服务的阶段名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Beginning => "BEGINNING",
            Phase::Middle => "MIDDLE",
            Phase::End => "END",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 书籍设定
///
/// 会话开始后不可修改
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub title: String,
    pub objective: String,
    pub estimated_pages: u32,
}

impl BookDetails {
    pub fn new(title: impl Into<String>, objective: impl Into<String>, estimated_pages: u32) -> Self {
        Self {
            title: title.into(),
            objective: objective.into(),
            estimated_pages,
        }
    }

    /// 标题和目标非空且预计页数大于 0 时才允许开始写作
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.objective.trim().is_empty() && self.estimated_pages > 0
    }
}

/// 书库中的书籍
///
/// 保存后不再修改，只能删除
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryBook {
    pub id: i64,
    pub title: String,
    pub objective: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 待保存的书籍（id 和创建时间由书库分配）
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewLibraryBook {
    pub title: String,
    pub objective: String,
    pub content: String,
}
