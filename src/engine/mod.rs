// ==========================================
// 教务排课系统 - 引擎层
// ==========================================
// 职责: 求解核心 (可用性索引/约束评估/回溯搜索/工作量跟踪/报告/修复)
// ==========================================

pub mod availability;
pub mod evaluator;
pub mod progress;
pub mod repair;
pub mod report;
pub mod solver;
pub mod workload;

pub use availability::AvailabilityIndex;
pub use evaluator::{Candidate, ConstraintEvaluator, HardViolation};
pub use progress::{GenerationProgress, NoOpProgressSink, ProgressSink, SharedProgress};
pub use repair::{ConflictRepairer, ConflictResolution, RepairError};
pub use report::{ReportScope, ScheduleReportBuilder};
pub use solver::{
    Assignment, CancelToken, InfeasibleConstraint, PendingRecord, SolveStats, Solver,
    SolverOutcome,
};
pub use workload::WorkloadTracker;
