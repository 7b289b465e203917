// ==========================================
// 教务排课系统 - 课表与冲突报告 (对外契约)
// ==========================================
// 红线: 字段形状与应用层接口契约一致, 不得私自增删重命名
// ==========================================

use crate::domain::types::{ConflictSeverity, ConflictType, ScheduleStatus};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduleEntry - 课表条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,            // 条目ID (生成顺序确定)
    pub course_id: String,     // 课程ID
    pub teacher_id: String,    // 教师ID
    pub room_id: String,       // 教室ID
    pub batch_id: String,      // 班级ID
    pub day_of_week: u8,       // 星期 (0-6)
    pub start_time: NaiveTime, // 开始时刻
    pub end_time: NaiveTime,   // 结束时刻
}

// ==========================================
// Conflict - 冲突记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,                            // 冲突ID (报告内顺序确定)
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,           // 冲突类型
    pub severity: ConflictSeverity,            // 严重度
    pub description: String,                   // 描述
    pub affected_entities: AffectedEntities,   // 关联实体
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_resolution: Option<String>,  // 建议处理方式
}

/// 冲突关联的实体引用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedEntities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

// ==========================================
// 统计报表形状
// ==========================================

/// 教室利用率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUtilization {
    pub room_id: String,                // 教室ID
    pub room_number: String,            // 教室编号
    pub total_hours: f64,               // 每周可用总小时
    pub utilized_hours: f64,            // 已占用小时
    pub utilization_percentage: f64,    // 利用率 (0-100)
}

/// 教师工作量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherWorkload {
    pub teacher_id: String,          // 教师ID
    pub teacher_name: String,        // 姓名
    pub assigned_hours: f64,         // 已分配小时
    pub max_hours: f64,              // 周上限小时
    pub workload_percentage: f64,    // 负载率 (0-100)
}

/// 课表统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatistics {
    pub total_entries: u32,                      // 条目总数
    pub total_courses: u32,                      // 涉及课程数
    pub total_teachers: u32,                     // 涉及教师数
    pub total_rooms: u32,                        // 涉及教室数
    pub conflicts: Vec<Conflict>,                // 冲突列表 (与 Schedule.conflicts 一致)
    pub room_utilization: Vec<RoomUtilization>,  // 教室利用率
    pub teacher_workload: Vec<TeacherWorkload>,  // 教师工作量
}

// ==========================================
// Schedule - 课表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,                       // 课表ID
    pub name: String,                     // 课表名称
    pub department_id: String,            // 院系范围
    pub academic_year: String,            // 学年 (如 "2025-2026")
    pub semester: String,                 // 学期
    pub status: ScheduleStatus,           // 状态
    pub created_at: DateTime<Utc>,        // 创建时间
    pub updated_at: DateTime<Utc>,        // 更新时间
    pub entries: Vec<ScheduleEntry>,      // 课表条目
    pub conflicts: Vec<Conflict>,         // 冲突列表
    pub statistics: ScheduleStatistics,   // 统计报表
}

impl Schedule {
    /// 按冲突ID查找
    pub fn conflict_by_id(&self, conflict_id: &str) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| c.id == conflict_id)
    }
}
