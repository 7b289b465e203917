// ==========================================
// 教务排课系统 - 领域类型定义
// ==========================================
// 红线: 对外序列化格式与应用层接口契约一致 (snake_case)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 课程类型 (Course Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    Theory,   // 理论课
    Lab,      // 实验课
    Tutorial, // 辅导课
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseType::Theory => write!(f, "theory"),
            CourseType::Lab => write!(f, "lab"),
            CourseType::Tutorial => write!(f, "tutorial"),
        }
    }
}

// ==========================================
// 教室类型 (Room Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Classroom,   // 普通教室
    Lab,         // 实验室
    LectureHall, // 阶梯教室
    SeminarRoom, // 研讨室
}

impl RoomType {
    /// 判断是否为实验室类型
    pub fn is_lab(&self) -> bool {
        matches!(self, RoomType::Lab)
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomType::Classroom => write!(f, "classroom"),
            RoomType::Lab => write!(f, "lab"),
            RoomType::LectureHall => write!(f, "lecture_hall"),
            RoomType::SeminarRoom => write!(f, "seminar_room"),
        }
    }
}

// ==========================================
// 课表状态 (Schedule Status)
// ==========================================
// 状态机: draft → generating → generated/failed → published → archived
// 红线: generating → generated/failed 由引擎迁移, 其余迁移只接受外部显式请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Draft,      // 草稿
    Generating, // 生成中
    Generated,  // 已生成
    Failed,     // 生成失败 (含取消)
    Published,  // 已发布
    Archived,   // 已归档
}

impl ScheduleStatus {
    /// 判断是否为终态 (引擎视角)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Generated | ScheduleStatus::Failed)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Draft => write!(f, "draft"),
            ScheduleStatus::Generating => write!(f, "generating"),
            ScheduleStatus::Generated => write!(f, "generated"),
            ScheduleStatus::Failed => write!(f, "failed"),
            ScheduleStatus::Published => write!(f, "published"),
            ScheduleStatus::Archived => write!(f, "archived"),
        }
    }
}

// ==========================================
// 冲突类型 (Conflict Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TeacherConflict,    // 教师时段冲突
    RoomConflict,       // 教室时段冲突
    BatchConflict,      // 班级时段冲突
    CapacityViolation,  // 教室容量不足
    WorkloadExceeded,   // 教师工作量超限
    UnscheduledSession, // 未能安排的会话
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::TeacherConflict => write!(f, "teacher_conflict"),
            ConflictType::RoomConflict => write!(f, "room_conflict"),
            ConflictType::BatchConflict => write!(f, "batch_conflict"),
            ConflictType::CapacityViolation => write!(f, "capacity_violation"),
            ConflictType::WorkloadExceeded => write!(f, "workload_exceeded"),
            ConflictType::UnscheduledSession => write!(f, "unscheduled_session"),
        }
    }
}

// ==========================================
// 冲突严重度 (Conflict Severity)
// ==========================================
// 顺序: Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,    // 轻微
    Medium, // 关注
    High,   // 严重
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictSeverity::Low => write!(f, "low"),
            ConflictSeverity::Medium => write!(f, "medium"),
            ConflictSeverity::High => write!(f, "high"),
        }
    }
}
