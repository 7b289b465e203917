// ==========================================
// 教务排课系统 - 配置层
// ==========================================
// 职责: 对外约束/偏好契约与引擎内调参
// ==========================================

pub mod constraints;
pub mod tuning;

pub use constraints::{
    PreferredTimeSlots, RoomConstraints, ScheduleConstraints, SchedulePreferences,
    TeacherConstraints,
};
pub use tuning::{PenaltyWeights, QualificationPolicy, SolverTuning};
