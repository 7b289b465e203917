// ==========================================
// 教务排课系统 - 领域层错误类型
// ==========================================
// 职责: 定义输入快照校验错误, 校验失败时排课不得启动
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 领域层校验错误
/// 所有错误信息必须包含显式原因与实体 ID
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ===== 字段范围错误 =====
    #[error("字段值越界 (entity={entity}, id={id}, field={field}): {message}")]
    FieldOutOfRange {
        entity: &'static str,
        id: String,
        field: &'static str,
        message: String,
    },

    // ===== 唯一性错误 =====
    #[error("重复 ID: {entity} id={id}")]
    DuplicateId { entity: &'static str, id: String },

    #[error("重复编码: {entity} code={code}")]
    DuplicateCode { entity: &'static str, code: String },

    // ===== 引用完整性错误 =====
    #[error("引用不存在: {entity}(id={id}) 引用 {target}(id={target_id})")]
    DanglingReference {
        entity: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    // ===== 结构性错误 =====
    #[error("先修课程图存在环: 经过 course id={course_id}")]
    PrerequisiteCycle { course_id: String },

    #[error("课程先修引用自身: course id={course_id}")]
    SelfPrerequisite { course_id: String },

    #[error("教师可用时段重叠: teacher id={teacher_id}, day={day_of_week}")]
    OverlappingAvailability { teacher_id: String, day_of_week: u8 },

    #[error("时段网格无效: {0}")]
    InvalidSlotGrid(String),

    // ===== 预指派错误 =====
    #[error("已确认的工作量指派教师不具备资格: teacher id={teacher_id}, course id={course_id}")]
    UnqualifiedAssignment {
        teacher_id: String,
        course_id: String,
    },
}

/// Result 类型别名
pub type ValidationResult<T> = Result<T, ValidationError>;
