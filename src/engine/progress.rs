// ==========================================
// 教务排课系统 - 生成进度发布
// ==========================================
// 职责: 定义进度发布 trait, 实现依赖倒置
// 说明: 引擎层定义 trait, API 层实现共享状态适配器
// ==========================================

use crate::domain::types::ScheduleStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

// ==========================================
// GenerationProgress - 生成进度快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub progress: f64,           // 完成度 0..1 (已处理会话/总会话)
    pub status: ScheduleStatus,  // 运行状态
    pub current_step: String,    // 当前阶段标识
    pub conflicts_found: u32,    // 已发现冲突数
    pub entries_generated: u32,  // 已生成条目数
}

impl GenerationProgress {
    /// 初始进度
    pub fn starting() -> Self {
        Self {
            progress: 0.0,
            status: ScheduleStatus::Generating,
            current_step: "validating".to_string(),
            conflicts_found: 0,
            entries_generated: 0,
        }
    }
}

// ==========================================
// 进度发布 Trait
// ==========================================

/// 进度发布者 Trait
///
/// 引擎在每个提交边界发布一次进度快照;
/// 实现方不得阻塞 (求解线程同步调用)
pub trait ProgressSink: Send + Sync {
    /// 发布进度快照
    fn publish(&self, progress: &GenerationProgress);
}

/// 空操作进度发布者
///
/// 用于不需要进度上报的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn publish(&self, progress: &GenerationProgress) {
        tracing::trace!(
            progress = progress.progress,
            step = %progress.current_step,
            "NoOpProgressSink: 跳过进度发布"
        );
    }
}

// ==========================================
// SharedProgress - 共享进度状态
// ==========================================
// 用途: API 层轮询接口的后备存储; 求解线程写, 调用方读
#[derive(Debug, Clone, Default)]
pub struct SharedProgress {
    inner: Arc<RwLock<Option<GenerationProgress>>>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取最近一次进度快照
    pub fn snapshot(&self) -> Option<GenerationProgress> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressSink for SharedProgress {
    fn publish(&self, progress: &GenerationProgress) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(progress.clone());
    }
}
