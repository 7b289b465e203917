// ==========================================
// 教务排课系统 - 领域层
// ==========================================
// 职责: 实体定义、输入快照校验、对外课表契约
// ==========================================

pub mod course;
pub mod entity;
pub mod error;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod teacher;
pub mod timeslot;
pub mod types;

pub use course::{Course, WorkloadAssignment};
pub use entity::{Batch, Department, Program, Room};
pub use error::{ValidationError, ValidationResult};
pub use schedule::{
    AffectedEntities, Conflict, RoomUtilization, Schedule, ScheduleEntry, ScheduleStatistics,
    TeacherWorkload,
};
pub use session::{derive_sessions, split_hours, Session};
pub use snapshot::{ScheduleSnapshot, SnapshotIndex};
pub use teacher::{AvailabilityWindow, CourseQualification, Teacher};
pub use timeslot::{SlotGrid, TimeSlot};
