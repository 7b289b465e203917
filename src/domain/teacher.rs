// ==========================================
// 教务排课系统 - 教师实体定义
// ==========================================
// 红线: 同一教师同一天的可用时段窗口不得重叠
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AvailabilityWindow - 每周可用时段窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub day_of_week: u8,      // 星期 (0-6, 0=周一)
    pub start_time: NaiveTime, // 开始时刻
    pub end_time: NaiveTime,   // 结束时刻
    pub is_available: bool,    // 可用标志 (false 表示显式不可用窗口)
}

impl AvailabilityWindow {
    /// 判断窗口是否覆盖指定时段 [start, end)
    pub fn covers(&self, day_of_week: u8, start: NaiveTime, end: NaiveTime) -> bool {
        self.day_of_week == day_of_week && self.start_time <= start && end <= self.end_time
    }

    /// 判断与另一窗口是否重叠 (仅同日比较)
    pub fn overlaps(&self, other: &AvailabilityWindow) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

// ==========================================
// CourseQualification - 授课资格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseQualification {
    pub course_id: String,  // 课程ID
    pub is_preferred: bool, // 是否为擅长课程
}

// ==========================================
// Teacher - 教师
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,                            // 教师ID
    pub name: String,                          // 姓名
    pub department_id: String,                 // 所属院系
    pub max_workload: u32,                     // 周最大工作量 (小时, >0)
    pub availability: Vec<AvailabilityWindow>, // 每周可用时段
    pub qualifications: Vec<CourseQualification>, // 授课资格列表
}

impl Teacher {
    /// 校验字段范围与窗口重叠红线
    pub fn validate(&self) -> ValidationResult<()> {
        if self.max_workload == 0 {
            return Err(ValidationError::FieldOutOfRange {
                entity: "Teacher",
                id: self.id.clone(),
                field: "max_workload",
                message: "周最大工作量必须大于0".to_string(),
            });
        }

        // 同日窗口两两比较, 重叠即拒绝
        for (i, a) in self.availability.iter().enumerate() {
            if a.day_of_week > 6 {
                return Err(ValidationError::FieldOutOfRange {
                    entity: "Teacher",
                    id: self.id.clone(),
                    field: "availability.day_of_week",
                    message: format!("星期值 {} 超出范围 [0, 6]", a.day_of_week),
                });
            }
            if a.start_time >= a.end_time {
                return Err(ValidationError::FieldOutOfRange {
                    entity: "Teacher",
                    id: self.id.clone(),
                    field: "availability",
                    message: "窗口开始时刻必须早于结束时刻".to_string(),
                });
            }
            for b in self.availability.iter().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(ValidationError::OverlappingAvailability {
                        teacher_id: self.id.clone(),
                        day_of_week: a.day_of_week,
                    });
                }
            }
        }
        Ok(())
    }

    /// 判断教师在指定时段是否可用
    ///
    /// # 规则
    /// - 无任何窗口 → 视为全周可用 (开放默认)
    /// - 存在 is_available=false 的窗口覆盖该时段 → 不可用
    /// - 存在 is_available=true 的窗口 → 必须被某个可用窗口覆盖
    pub fn is_available_at(&self, day_of_week: u8, start: NaiveTime, end: NaiveTime) -> bool {
        if self.availability.is_empty() {
            return true;
        }
        for w in &self.availability {
            if !w.is_available && w.covers(day_of_week, start, end) {
                return false;
            }
        }
        let has_positive = self.availability.iter().any(|w| w.is_available);
        if !has_positive {
            // 只有黑名单窗口: 未被覆盖的时段可用
            return true;
        }
        self.availability
            .iter()
            .any(|w| w.is_available && w.covers(day_of_week, start, end))
    }

    /// 查询授课资格
    ///
    /// # 返回
    /// - Some(qualification): 已列出该课程
    /// - None: 未列出 (资格策略决定是否允许)
    pub fn qualification_for(&self, course_id: &str) -> Option<&CourseQualification> {
        self.qualifications.iter().find(|q| q.course_id == course_id)
    }

    /// 判断资格列表是否为空 (开放世界默认的判定输入)
    pub fn has_listed_qualifications(&self) -> bool {
        !self.qualifications.is_empty()
    }
}
