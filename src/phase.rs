use crate::types::Phase;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BEGINNING_THRESHOLD: f64 = 0.25;
pub const DEFAULT_END_THRESHOLD: f64 = 0.75;

/// 阶段分类阈值
///
/// 进度 < beginning 为开篇，< end 为发展，其余为结局
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PhaseThresholds {
    pub beginning: f64,
    pub end: f64,
}

impl PhaseThresholds {
    pub fn new(beginning: f64, end: f64) -> Self {
        Self { beginning, end }
    }

    /// 阈值必须满足 0 <= beginning <= end <= 1
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.beginning)
            && (0.0..=1.0).contains(&self.end)
            && self.beginning <= self.end
    }

    /// 按进度比例分类
    pub fn classify_ratio(&self, ratio: f64) -> Phase {
        if ratio < self.beginning {
            Phase::Beginning
        } else if ratio < self.end {
            Phase::Middle
        } else {
            Phase::End
        }
    }

    /// 按已写页数和预计总页数分类
    ///
    /// # 参数
    /// - `pages_written`: 已生成页数
    /// - `estimated_pages`: 预计总页数
    ///
    /// # 返回
    /// 当前叙事阶段；预计页数为 0 时视为结局
    pub fn classify(&self, pages_written: usize, estimated_pages: u32) -> Phase {
        if estimated_pages == 0 {
            return Phase::End;
        }
        self.classify_ratio(pages_written as f64 / estimated_pages as f64)
    }
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_BEGINNING_THRESHOLD, DEFAULT_END_THRESHOLD)
    }
}
