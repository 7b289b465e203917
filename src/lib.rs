// ==========================================
// 教务排课系统 - 排课引擎核心库
// ==========================================
// 技术栈: Rust + Tokio
// 系统定位: 自动排课引擎 (外部 CRUD 层提供数据快照)
// 红线: 引擎不持久化、不渲染, 只做求解与报告
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 约束与调参
pub mod config;

// 引擎层 - 求解核心
pub mod engine;

// API 层 - 业务接口
pub mod api;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictSeverity, ConflictType, CourseType, RoomType, ScheduleStatus};

// 领域实体
pub use domain::{
    AvailabilityWindow, Batch, Conflict, Course, CourseQualification, Department, Program, Room,
    RoomUtilization, Schedule, ScheduleEntry, ScheduleSnapshot, ScheduleStatistics, Session,
    SlotGrid, Teacher, TeacherWorkload, TimeSlot, ValidationError, WorkloadAssignment,
};

// 配置
pub use config::{
    PenaltyWeights, QualificationPolicy, ScheduleConstraints, SchedulePreferences, SolverTuning,
};

// 引擎
pub use engine::{
    AvailabilityIndex, ConstraintEvaluator, GenerationProgress, NoOpProgressSink, ProgressSink,
    ScheduleReportBuilder, Solver, SolverOutcome, WorkloadTracker,
};

// API
pub use api::{
    ApiError, ApiResult, ConflictResolution, GenerateScheduleRequest, InMemorySnapshotProvider,
    SchedulerService, SnapshotProvider,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "教务排课系统";
