use serde::{Deserialize, Serialize};

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 5;

/// 检查点策略
///
/// 每生成 `interval` 页暂停一次，把页面折叠进长期上下文
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointPolicy {
    pub interval: usize,
}

impl CheckpointPolicy {
    pub fn new(interval: usize) -> Self {
        Self { interval }
    }

    /// 判断检查点是否触发
    ///
    /// # 参数
    /// - `visible_pages`: 当前可编辑（尚未折叠）的页数
    /// - `total_pages`: 本次会话已生成的总页数
    /// - `estimated_pages`: 预计总页数
    ///
    /// # 返回
    /// 可见页数为正且是间隔的整数倍，并且尚未达到预计页数时返回 true
    pub fn fires(&self, visible_pages: usize, total_pages: usize, estimated_pages: u32) -> bool {
        self.interval > 0
            && visible_pages > 0
            && visible_pages % self.interval == 0
            && total_pages < estimated_pages as usize
    }

    /// 检查点展示的最近页面
    pub fn recent_pages<'a>(&self, pages: &'a [String]) -> &'a [String] {
        let start = pages.len().saturating_sub(self.interval);
        &pages[start..]
    }

    /// 检查点导出文件名：`{title}-pages-{first}-{last}.pdf`
    pub fn export_file_name(&self, title: &str, total_pages: usize) -> String {
        let title = if title.trim().is_empty() { "book" } else { title };
        let first = total_pages.saturating_sub(self.interval.saturating_sub(1)).max(1);
        format!("{}-pages-{}-{}.pdf", title, first, total_pages)
    }
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_INTERVAL)
    }
}
