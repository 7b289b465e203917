// ==========================================
// 教务排课系统 - 求解器调参配置
// ==========================================
// 红线: 罚分权重一律可配置, 求解器内不得硬编码
// ==========================================

use crate::domain::timeslot::SlotGrid;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 资格策略 (Qualification Policy)
// ==========================================
// 裁决对象: 资格清单为空的教师
// - OpenWorld: 允许授任意课程, 施加重罚分
// - Strict: 一律排除
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualificationPolicy {
    #[default]
    OpenWorld, // 开放默认
    Strict,    // 严格模式
}

impl fmt::Display for QualificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualificationPolicy::OpenWorld => write!(f, "OPEN_WORLD"),
            QualificationPolicy::Strict => write!(f, "STRICT"),
        }
    }
}

// ==========================================
// PenaltyWeights - 软约束罚分权重
// ==========================================
// 罚分越低越优; 对应偏好未开启时权重不参与计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub workload_balance: f64,         // 工作量均衡
    pub batch_gap: f64,                // 班级当日空档
    pub morning_preference: f64,       // 上午偏好 (每偏移一个时段)
    pub batch_grouping: f64,           // 同班课程相邻
    pub non_preferred_course: f64,     // 非擅长课程
    pub unlisted_course: f64,          // 开放默认下的未列资格授课
    pub cross_department: f64,         // 跨院系教师
    pub outside_preferred_window: f64, // 偏好时窗之外
    pub capacity_headroom: f64,        // 容量利用率超软上限
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            workload_balance: 4.0,
            batch_gap: 3.0,
            morning_preference: 1.0,
            batch_grouping: 2.0,
            non_preferred_course: 2.0,
            unlisted_course: 8.0,
            cross_department: 3.0,
            outside_preferred_window: 2.0,
            capacity_headroom: 1.0,
        }
    }
}

// ==========================================
// SolverTuning - 求解器预算与策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverTuning {
    pub slot_grid: SlotGrid,                       // 全校时段网格
    pub qualification_policy: QualificationPolicy, // 资格策略
    pub backtrack_budget: u32,                     // 回溯预算 (撤销次数上限)
    pub step_budget: u64,                          // 提交边界操作数预算
    pub time_budget_ms: Option<u64>,               // 墙钟预算 (毫秒, None=不限)
    pub repair_attempts: u32,                      // 兜底会话修复尝试上限
    pub weights: PenaltyWeights,                   // 罚分权重
}

impl Default for SolverTuning {
    fn default() -> Self {
        Self {
            slot_grid: SlotGrid::default(),
            qualification_policy: QualificationPolicy::default(),
            backtrack_budget: 10_000,
            step_budget: 1_000_000,
            time_budget_ms: None,
            repair_attempts: 64,
            weights: PenaltyWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualification_policy_default_open_world() {
        assert_eq!(QualificationPolicy::default(), QualificationPolicy::OpenWorld);
        assert_eq!(
            serde_json::to_string(&QualificationPolicy::OpenWorld).unwrap(),
            "\"OPEN_WORLD\""
        );
    }

    #[test]
    fn test_tuning_defaults_sane() {
        let tuning = SolverTuning::default();
        assert!(tuning.backtrack_budget > 0);
        assert!(tuning.step_budget > 0);
        assert!(tuning.time_budget_ms.is_none());
        assert!(tuning.weights.unlisted_course > tuning.weights.non_preferred_course);
    }
}
