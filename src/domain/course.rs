// ==========================================
// 教务排课系统 - 课程与工作量指派
// ==========================================
// 红线: 先修课程图必须无环且不得自引用
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::types::CourseType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ===== 字段范围红线 =====
pub const CREDITS_MIN: u8 = 1;
pub const CREDITS_MAX: u8 = 10;
pub const HOURS_PER_WEEK_MIN: u8 = 1;
pub const HOURS_PER_WEEK_MAX: u8 = 20;

// ==========================================
// Course - 课程
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,                      // 课程ID
    pub name: String,                    // 课程名称
    pub code: String,                    // 课程编码 (唯一)
    pub credits: u8,                     // 学分 (1-10)
    pub course_type: CourseType,         // 课程类型
    pub hours_per_week: u8,              // 周学时 (1-20)
    pub department_id: String,           // 所属院系
    pub prerequisites: BTreeSet<String>, // 先修课程ID集合
}

impl Course {
    /// 校验字段范围与自引用
    pub fn validate(&self) -> ValidationResult<()> {
        if self.credits < CREDITS_MIN || self.credits > CREDITS_MAX {
            return Err(ValidationError::FieldOutOfRange {
                entity: "Course",
                id: self.id.clone(),
                field: "credits",
                message: format!(
                    "学分 {} 超出范围 [{}, {}]",
                    self.credits, CREDITS_MIN, CREDITS_MAX
                ),
            });
        }
        if self.hours_per_week < HOURS_PER_WEEK_MIN || self.hours_per_week > HOURS_PER_WEEK_MAX {
            return Err(ValidationError::FieldOutOfRange {
                entity: "Course",
                id: self.id.clone(),
                field: "hours_per_week",
                message: format!(
                    "周学时 {} 超出范围 [{}, {}]",
                    self.hours_per_week, HOURS_PER_WEEK_MIN, HOURS_PER_WEEK_MAX
                ),
            });
        }
        if self.prerequisites.contains(&self.id) {
            return Err(ValidationError::SelfPrerequisite {
                course_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

// ==========================================
// WorkloadAssignment - 工作量预指派
// ==========================================
// 用途: 外部 CRUD 层把 (教师, 课程, 班级) 预先绑定
// 红线: is_confirmed=true 时求解器不得替换教师
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadAssignment {
    pub id: String,         // 指派ID
    pub teacher_id: String, // 教师ID
    pub course_id: String,  // 课程ID
    pub batch_id: String,   // 班级ID
    pub hours_per_week: u8, // 周学时
    pub is_confirmed: bool, // 已确认标志 (确认后教师被钉死)
}

impl WorkloadAssignment {
    /// 校验字段范围
    pub fn validate(&self) -> ValidationResult<()> {
        if self.hours_per_week < HOURS_PER_WEEK_MIN || self.hours_per_week > HOURS_PER_WEEK_MAX {
            return Err(ValidationError::FieldOutOfRange {
                entity: "WorkloadAssignment",
                id: self.id.clone(),
                field: "hours_per_week",
                message: format!(
                    "周学时 {} 超出范围 [{}, {}]",
                    self.hours_per_week, HOURS_PER_WEEK_MIN, HOURS_PER_WEEK_MAX
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        Course {
            id: "C001".to_string(),
            name: "数据结构".to_string(),
            code: "CS201".to_string(),
            credits: 4,
            course_type: CourseType::Theory,
            hours_per_week: 4,
            department_id: "D001".to_string(),
            prerequisites: BTreeSet::new(),
        }
    }

    #[test]
    fn test_course_valid() {
        assert!(sample_course().validate().is_ok());
    }

    #[test]
    fn test_credits_range() {
        let mut course = sample_course();
        course.credits = 0;
        assert!(course.validate().is_err());
        course.credits = 11;
        assert!(course.validate().is_err());
    }

    #[test]
    fn test_hours_per_week_range() {
        let mut course = sample_course();
        course.hours_per_week = 0;
        assert!(course.validate().is_err());
        course.hours_per_week = 21;
        assert!(course.validate().is_err());
    }

    #[test]
    fn test_self_prerequisite_rejected() {
        let mut course = sample_course();
        course.prerequisites.insert("C001".to_string());
        assert!(matches!(
            course.validate(),
            Err(ValidationError::SelfPrerequisite { .. })
        ));
    }
}
