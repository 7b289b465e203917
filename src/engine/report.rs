// ==========================================
// 教务排课系统 - 课表报告构建器
// ==========================================
// 职责: 求解器内部状态 → 对外 Schedule/Conflict/统计形状的纯转换
// 红线: 无副作用, 相同输入重复调用必须产出逐字节一致的结果
// ==========================================

use crate::domain::schedule::{
    AffectedEntities, Conflict, RoomUtilization, Schedule, ScheduleEntry, ScheduleStatistics,
    TeacherWorkload,
};
use crate::domain::snapshot::ScheduleSnapshot;
use crate::domain::timeslot::SlotGrid;
use crate::domain::types::ScheduleStatus;
use crate::engine::solver::SolverOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

// ==========================================
// ReportScope - 课表报告的外部标识
// ==========================================
// 说明: ID 与时间戳由调用方提供, 构建器自身不产生任何非确定值
#[derive(Debug, Clone, PartialEq)]
pub struct ReportScope {
    pub schedule_id: String,
    pub name: String,
    pub department_id: String,
    pub academic_year: String,
    pub semester: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ScheduleReportBuilder - 报告构建器
// ==========================================
pub struct ScheduleReportBuilder<'a> {
    snapshot: &'a ScheduleSnapshot,
    grid: &'a SlotGrid,
}

impl<'a> ScheduleReportBuilder<'a> {
    pub fn new(snapshot: &'a ScheduleSnapshot, grid: &'a SlotGrid) -> Self {
        Self { snapshot, grid }
    }

    /// 从求解结果构建课表
    ///
    /// 条目排序: (星期, 开始时刻, 班级, 课程, 教师) 升序后顺序编号
    /// 冲突排序: 沿用求解器兜底顺序 (本身确定) 后顺序编号
    pub fn build(
        &self,
        scope: &ReportScope,
        status: ScheduleStatus,
        outcome: &SolverOutcome,
    ) -> Schedule {
        let mut raw_entries: Vec<ScheduleEntry> = outcome
            .committed
            .iter()
            .filter_map(|a| {
                let slot = self
                    .grid
                    .slot(a.day_idx, a.start_slot, a.session.block_hours)?;
                Some(ScheduleEntry {
                    id: String::new(), // 排序后统一编号
                    course_id: a.session.course_id.clone(),
                    teacher_id: a.teacher_id.clone(),
                    room_id: a.room_id.clone(),
                    batch_id: a.session.batch_id.clone(),
                    day_of_week: slot.day_of_week,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                })
            })
            .collect();
        sort_and_number_entries(&mut raw_entries);

        let conflicts: Vec<Conflict> = outcome
            .pending
            .iter()
            .enumerate()
            .map(|(i, record)| Conflict {
                id: format!("CF-{:04}", i + 1),
                conflict_type: record.conflict_type,
                severity: record.severity,
                description: record.description.clone(),
                affected_entities: AffectedEntities {
                    teacher_id: record.session.pinned_teacher_id.clone(),
                    room_id: None,
                    batch_id: Some(record.session.batch_id.clone()),
                    course_id: Some(record.session.course_id.clone()),
                },
                suggested_resolution: record.suggested_resolution.clone(),
            })
            .collect();

        self.assemble(scope, status, raw_entries, conflicts)
    }

    /// 从既有条目与冲突组装课表 (局部修复后重算统计用)
    pub fn assemble(
        &self,
        scope: &ReportScope,
        status: ScheduleStatus,
        entries: Vec<ScheduleEntry>,
        conflicts: Vec<Conflict>,
    ) -> Schedule {
        let statistics = self.statistics(&entries, &conflicts);
        Schedule {
            id: scope.schedule_id.clone(),
            name: scope.name.clone(),
            department_id: scope.department_id.clone(),
            academic_year: scope.academic_year.clone(),
            semester: scope.semester.clone(),
            status,
            created_at: scope.created_at,
            updated_at: scope.updated_at,
            entries,
            conflicts,
            statistics,
        }
    }

    fn statistics(&self, entries: &[ScheduleEntry], conflicts: &[Conflict]) -> ScheduleStatistics {
        let courses: BTreeSet<&str> = entries.iter().map(|e| e.course_id.as_str()).collect();
        let teachers: BTreeSet<&str> = entries.iter().map(|e| e.teacher_id.as_str()).collect();
        let rooms: BTreeSet<&str> = entries.iter().map(|e| e.room_id.as_str()).collect();

        let total_week_hours = self.grid.total_week_slots() as f64;

        // 教室利用率: 快照内全部教室, 按 ID 升序
        let mut sorted_rooms: Vec<_> = self.snapshot.rooms.iter().collect();
        sorted_rooms.sort_by(|a, b| a.id.cmp(&b.id));
        let room_utilization = sorted_rooms
            .into_iter()
            .map(|room| {
                let utilized: f64 = entries
                    .iter()
                    .filter(|e| e.room_id == room.id)
                    .map(entry_hours)
                    .sum();
                RoomUtilization {
                    room_id: room.id.clone(),
                    room_number: room.number.clone(),
                    total_hours: total_week_hours,
                    utilized_hours: utilized,
                    utilization_percentage: percentage(utilized, total_week_hours),
                }
            })
            .collect();

        // 教师工作量: 快照内全部教师, 按 ID 升序
        let mut sorted_teachers: Vec<_> = self.snapshot.teachers.iter().collect();
        sorted_teachers.sort_by(|a, b| a.id.cmp(&b.id));
        let teacher_workload = sorted_teachers
            .into_iter()
            .map(|teacher| {
                let assigned: f64 = entries
                    .iter()
                    .filter(|e| e.teacher_id == teacher.id)
                    .map(entry_hours)
                    .sum();
                TeacherWorkload {
                    teacher_id: teacher.id.clone(),
                    teacher_name: teacher.name.clone(),
                    assigned_hours: assigned,
                    max_hours: teacher.max_workload as f64,
                    workload_percentage: percentage(assigned, teacher.max_workload as f64),
                }
            })
            .collect();

        ScheduleStatistics {
            total_entries: entries.len() as u32,
            total_courses: courses.len() as u32,
            total_teachers: teachers.len() as u32,
            total_rooms: rooms.len() as u32,
            conflicts: conflicts.to_vec(),
            room_utilization,
            teacher_workload,
        }
    }
}

/// 条目统一排序并顺序编号
///
/// 排序键: (星期, 开始时刻, 班级, 课程, 教师) 升序; 编号 TT-0001 起
pub fn sort_and_number_entries(entries: &mut [ScheduleEntry]) {
    entries.sort_by(|a, b| {
        (a.day_of_week, a.start_time, &a.batch_id, &a.course_id, &a.teacher_id).cmp(&(
            b.day_of_week,
            b.start_time,
            &b.batch_id,
            &b.course_id,
            &b.teacher_id,
        ))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.id = format!("TT-{:04}", i + 1);
    }
}

/// 条目时长 (小时)
fn entry_hours(entry: &ScheduleEntry) -> f64 {
    (entry.end_time - entry.start_time).num_minutes() as f64 / 60.0
}

/// 百分比 (保留两位小数)
fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    (part / whole * 100.0 * 100.0).round() / 100.0
}
