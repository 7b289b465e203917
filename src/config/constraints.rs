// ==========================================
// 教务排课系统 - 排课约束配置 (对外契约)
// ==========================================
// 红线: 未设置的可选偏好一律视为关闭, 不施加罚分
// ==========================================

use crate::domain::types::CourseType;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduleConstraints - 硬约束配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConstraints {
    pub max_continuous_hours: u8,                  // 连续授课上限 (小时)
    pub break_duration: u32,                       // 连续块之间强制间歇 (分钟)
    pub preferred_time_slots: PreferredTimeSlots,  // 按课程类型的偏好时窗 (软)
    pub room_constraints: RoomConstraints,         // 教室约束
    pub teacher_constraints: TeacherConstraints,   // 教师约束
}

/// 按课程类型的偏好时窗, 线上格式 "HH:MM-HH:MM"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferredTimeSlots {
    #[serde(default)]
    pub theory: Vec<String>,
    #[serde(default)]
    pub lab: Vec<String>,
    #[serde(default)]
    pub tutorial: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConstraints {
    pub lab_courses_only_in_labs: bool, // 实验课仅排实验室 (硬)
    pub max_capacity_utilization: f64,  // 容量利用率软上限 (0-1]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherConstraints {
    pub max_daily_hours: u8,         // 教师单日授课上限 (小时, 硬)
    pub preferred_departments: bool, // 偏好本院系教师 (软)
}

impl Default for ScheduleConstraints {
    fn default() -> Self {
        Self {
            max_continuous_hours: 2,
            break_duration: 60,
            preferred_time_slots: PreferredTimeSlots::default(),
            room_constraints: RoomConstraints {
                lab_courses_only_in_labs: true,
                max_capacity_utilization: 1.0,
            },
            teacher_constraints: TeacherConstraints {
                max_daily_hours: 6,
                preferred_departments: false,
            },
        }
    }
}

impl ScheduleConstraints {
    /// 间歇时长折算为整时段数 (向上取整)
    pub fn break_slots(&self) -> u8 {
        self.break_duration.div_ceil(60) as u8
    }

    /// 解析指定课程类型的偏好时窗
    ///
    /// 无法解析的条目直接忽略 (对外契约未约定错误通道)
    pub fn preferred_windows(&self, course_type: CourseType) -> Vec<(NaiveTime, NaiveTime)> {
        let raw = match course_type {
            CourseType::Theory => &self.preferred_time_slots.theory,
            CourseType::Lab => &self.preferred_time_slots.lab,
            CourseType::Tutorial => &self.preferred_time_slots.tutorial,
        };
        raw.iter().filter_map(|s| parse_window(s)).collect()
    }
}

/// 解析 "HH:MM-HH:MM" 时窗
fn parse_window(raw: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = raw.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    if start < end {
        Some((start, end))
    } else {
        None
    }
}

// ==========================================
// SchedulePreferences - 软约束开关
// ==========================================
// 未设置 (None) 与 false 等价: 不施加罚分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePreferences {
    #[serde(default)]
    pub distribute_workload_evenly: bool, // 教师工作量均衡
    #[serde(default)]
    pub minimize_gap_hours: bool,         // 压缩班级当日空档
    #[serde(default)]
    pub prefer_morning_slots: bool,       // 偏好上午时段
    #[serde(default)]
    pub group_same_batch_courses: bool,   // 同班课程尽量相邻
}
