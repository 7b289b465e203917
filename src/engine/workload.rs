// ==========================================
// 教务排课系统 - 教师工作量跟踪器
// ==========================================
// 职责: 求解期间维护每位教师的周/日已提交学时
// 红线: 与可用性索引对称回退, 回溯撤销后计数必须恢复原状
// ==========================================

use crate::domain::snapshot::ScheduleSnapshot;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct TeacherLoad {
    max_workload: u32, // 周上限
    weekly: u32,       // 已提交周学时
    daily: Vec<u32>,   // 按教学日的已提交学时
}

// ==========================================
// WorkloadTracker - 工作量跟踪器
// ==========================================
#[derive(Debug, Clone)]
pub struct WorkloadTracker {
    loads: BTreeMap<String, TeacherLoad>,
}

impl WorkloadTracker {
    /// 每轮排课从快照构建一次, 初始计数为零
    pub fn build(snapshot: &ScheduleSnapshot, days: usize) -> Self {
        let loads = snapshot
            .teachers
            .iter()
            .map(|t| {
                (
                    t.id.clone(),
                    TeacherLoad {
                        max_workload: t.max_workload,
                        weekly: 0,
                        daily: vec![0u32; days],
                    },
                )
            })
            .collect();
        Self { loads }
    }

    /// 已提交周学时
    pub fn assigned_hours(&self, teacher_id: &str) -> u32 {
        self.loads.get(teacher_id).map(|l| l.weekly).unwrap_or(0)
    }

    /// 当日已提交学时
    pub fn assigned_hours_on(&self, teacher_id: &str, day_idx: usize) -> u32 {
        self.loads
            .get(teacher_id)
            .and_then(|l| l.daily.get(day_idx))
            .copied()
            .unwrap_or(0)
    }

    /// 剩余周容量 (小时)
    pub fn remaining_capacity(&self, teacher_id: &str) -> u32 {
        self.loads
            .get(teacher_id)
            .map(|l| l.max_workload.saturating_sub(l.weekly))
            .unwrap_or(0)
    }

    /// 追加 hours 是否会超出周上限
    pub fn would_exceed(&self, teacher_id: &str, hours: u32) -> bool {
        match self.loads.get(teacher_id) {
            Some(l) => l.weekly + hours > l.max_workload,
            None => true,
        }
    }

    /// 追加 hours 是否会超出单日上限
    pub fn would_exceed_daily(
        &self,
        teacher_id: &str,
        day_idx: usize,
        hours: u32,
        max_daily_hours: u32,
    ) -> bool {
        self.assigned_hours_on(teacher_id, day_idx) + hours > max_daily_hours
    }

    /// 提交一次分配
    pub fn add(&mut self, teacher_id: &str, day_idx: usize, hours: u32) {
        if let Some(l) = self.loads.get_mut(teacher_id) {
            l.weekly += hours;
            if let Some(d) = l.daily.get_mut(day_idx) {
                *d += hours;
            }
        }
    }

    /// 撤销一次分配 (回溯), 与 add 严格对称
    pub fn remove(&mut self, teacher_id: &str, day_idx: usize, hours: u32) {
        if let Some(l) = self.loads.get_mut(teacher_id) {
            l.weekly = l.weekly.saturating_sub(hours);
            if let Some(d) = l.daily.get_mut(day_idx) {
                *d = d.saturating_sub(hours);
            }
        }
    }
}
