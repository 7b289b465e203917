// ==========================================
// 教务排课系统 - 基础实体定义
// ==========================================
// 红线: 实体为每轮排课的只读快照, 构造后不可变
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::types::RoomType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ===== 容量与范围红线 =====
pub const ROOM_CAPACITY_MIN: u32 = 1;
pub const ROOM_CAPACITY_MAX: u32 = 500;

// ==========================================
// Department - 院系
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,   // 院系ID
    pub name: String, // 院系名称
    pub code: String, // 院系编码 (唯一)
}

// ==========================================
// Program - 专业
// ==========================================
// 层级: Department → Program → Batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,            // 专业ID
    pub department_id: String, // 所属院系
    pub name: String,          // 专业名称
}

// ==========================================
// Batch - 班级
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,          // 班级ID
    pub program_id: String,  // 所属专业
    pub name: String,        // 班级名称 (如 "2023级计算机1班")
    pub year: u16,           // 年级
    pub section: String,     // 分班 (如 "A")
    pub students_count: u32, // 学生人数
}

impl Batch {
    /// 校验字段范围
    pub fn validate(&self) -> ValidationResult<()> {
        if self.students_count == 0 {
            return Err(ValidationError::FieldOutOfRange {
                entity: "Batch",
                id: self.id.clone(),
                field: "students_count",
                message: "学生人数必须大于0".to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// Room - 教室
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,                 // 教室ID
    pub number: String,             // 教室编号
    pub building: String,           // 所在楼宇
    pub capacity: u32,              // 容量 (1-500)
    pub room_type: RoomType,        // 教室类型
    pub equipment: BTreeSet<String>, // 设备集合 (投影仪/实验台等)
}

impl Room {
    /// 校验字段范围
    pub fn validate(&self) -> ValidationResult<()> {
        if self.capacity < ROOM_CAPACITY_MIN || self.capacity > ROOM_CAPACITY_MAX {
            return Err(ValidationError::FieldOutOfRange {
                entity: "Room",
                id: self.id.clone(),
                field: "capacity",
                message: format!(
                    "容量 {} 超出范围 [{}, {}]",
                    self.capacity, ROOM_CAPACITY_MIN, ROOM_CAPACITY_MAX
                ),
            });
        }
        Ok(())
    }

    /// 判断教室能否容纳指定班级人数
    pub fn fits(&self, students_count: u32) -> bool {
        self.capacity >= students_count
    }
}
