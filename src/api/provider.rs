// ==========================================
// 教务排课系统 - 实体快照提供者
// ==========================================
// 职责: 定义外部数据协作方的读取接口 (不包含实现细节)
// 说明: 引擎只消费只读快照; CRUD 与持久化属于外部协作方
// ==========================================

use crate::domain::snapshot::ScheduleSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

// ==========================================
// SnapshotProvider Trait
// ==========================================
// 实现者: 应用层数据服务 (数据库/远程接口)
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// 加载指定排课范围的只读实体快照
    ///
    /// # 参数
    /// - department_id: 院系ID
    /// - academic_year: 学年 (如 "2025-2026")
    /// - semester: 学期
    async fn load_snapshot(
        &self,
        department_id: &str,
        academic_year: &str,
        semester: &str,
    ) -> Result<ScheduleSnapshot>;
}

// ==========================================
// InMemorySnapshotProvider - 内存实现
// ==========================================
// 用途: 测试与演示; 按院系ID存取
#[derive(Debug, Default)]
pub struct InMemorySnapshotProvider {
    snapshots: RwLock<HashMap<String, ScheduleSnapshot>>,
}

impl InMemorySnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一份院系快照 (同院系覆盖旧值)
    pub fn insert(&self, snapshot: ScheduleSnapshot) {
        let mut guard = self
            .snapshots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(snapshot.department.id.clone(), snapshot);
    }
}

#[async_trait]
impl SnapshotProvider for InMemorySnapshotProvider {
    async fn load_snapshot(
        &self,
        department_id: &str,
        _academic_year: &str,
        _semester: &str,
    ) -> Result<ScheduleSnapshot> {
        let guard = self
            .snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get(department_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("院系快照不存在: department_id={}", department_id))
    }
}
