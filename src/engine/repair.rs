// ==========================================
// 教务排课系统 - 冲突定向修复
// ==========================================
// 职责: 针对单个冲突的局部重排, 不做全量重新生成
// 红线: 修复只允许动受影响 (课程,班级) 的条目, 其余条目冻结
// 红线: 全部或全不: 修复不完整时返回错误, 原课表不动
// ==========================================

use crate::config::constraints::{ScheduleConstraints, SchedulePreferences};
use crate::config::tuning::SolverTuning;
use crate::domain::schedule::{Schedule, ScheduleEntry};
use crate::domain::session::{split_hours, Session};
use crate::domain::snapshot::ScheduleSnapshot;
use crate::domain::types::ScheduleStatus;
use crate::engine::availability::AvailabilityIndex;
use crate::engine::report::{sort_and_number_entries, ReportScope, ScheduleReportBuilder};
use crate::engine::solver::Solver;
use crate::engine::workload::WorkloadTracker;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ==========================================
// ConflictResolution - 修复指令 (对外契约)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// 重新安排受影响会话 (教师/教室/时段全部放开)
    Reassign,
    /// 限定教室后重新安排
    ChangeRoom { room_id: String },
    /// 限定教师后重新安排
    ChangeTeacher { teacher_id: String },
    /// 仅确认冲突, 从报告中移除
    Acknowledge,
}

// ==========================================
// 修复错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    #[error("冲突不存在: conflict_id={0}")]
    ConflictNotFound(String),

    #[error("冲突缺少可定位的实体引用: conflict_id={0}")]
    MissingEntityRefs(String),

    #[error("课表条目与时段网格不对应: entry_id={0}")]
    EntryOutsideGrid(String),

    #[error("局部修复失败: {0}")]
    Infeasible(String),
}

// ==========================================
// ConflictRepairer - 定向修复器
// ==========================================
pub struct ConflictRepairer<'a> {
    snapshot: &'a ScheduleSnapshot,
    constraints: &'a ScheduleConstraints,
    preferences: &'a SchedulePreferences,
    tuning: &'a SolverTuning,
}

impl<'a> ConflictRepairer<'a> {
    pub fn new(
        snapshot: &'a ScheduleSnapshot,
        constraints: &'a ScheduleConstraints,
        preferences: &'a SchedulePreferences,
        tuning: &'a SolverTuning,
    ) -> Self {
        Self {
            snapshot,
            constraints,
            preferences,
            tuning,
        }
    }

    /// 执行一次定向修复
    ///
    /// # 返回
    /// 修复成功: 移除该冲突并重算统计后的新课表
    /// 修复失败: 错误, 调用方持有的原课表不受影响
    pub fn resolve(
        &self,
        schedule: &Schedule,
        conflict_id: &str,
        resolution: &ConflictResolution,
    ) -> Result<Schedule, RepairError> {
        let conflict = schedule
            .conflict_by_id(conflict_id)
            .ok_or_else(|| RepairError::ConflictNotFound(conflict_id.to_string()))?
            .clone();

        info!(
            conflict_id,
            conflict_type = %conflict.conflict_type,
            "开始定向修复"
        );

        let grid = &self.tuning.slot_grid;
        let builder = ScheduleReportBuilder::new(self.snapshot, grid);
        let scope = scope_of(schedule);
        let remaining_conflicts: Vec<_> = schedule
            .conflicts
            .iter()
            .filter(|c| c.id != conflict_id)
            .cloned()
            .collect();

        if matches!(resolution, ConflictResolution::Acknowledge) {
            return Ok(builder.assemble(
                &scope,
                schedule.status,
                schedule.entries.clone(),
                remaining_conflicts,
            ));
        }

        let (Some(course_id), Some(batch_id)) = (
            conflict.affected_entities.course_id.clone(),
            conflict.affected_entities.batch_id.clone(),
        ) else {
            return Err(RepairError::MissingEntityRefs(conflict_id.to_string()));
        };

        // 受影响条目移出, 其余条目冻结并重新占用索引
        let (removed, retained): (Vec<_>, Vec<_>) = schedule
            .entries
            .iter()
            .cloned()
            .partition(|e| e.course_id == course_id && e.batch_id == batch_id);
        debug!(removed = removed.len(), retained = retained.len(), "条目分区完成");

        let mut avail = AvailabilityIndex::build(self.snapshot, grid);
        let mut tracker = WorkloadTracker::build(self.snapshot, grid.days.len());
        for entry in &retained {
            let (day_idx, start_slot, len) = locate_entry(grid, entry)?;
            avail.occupy(
                &entry.teacher_id,
                &entry.room_id,
                &entry.batch_id,
                day_idx,
                start_slot,
                len,
            );
            tracker.add(&entry.teacher_id, day_idx, len as u32);
        }

        // 重建受影响 (课程,班级) 的全部会话块
        let sessions = self.sessions_for(&course_id, &batch_id, resolution)?;
        let solver = Solver::new(self.snapshot, self.constraints, self.preferences, self.tuning);

        let mut new_entries = retained;
        for session in &sessions {
            let (candidates, _) = solver.enumerate(session, &avail, &tracker, usize::MAX);
            let chosen = match resolution {
                ConflictResolution::ChangeRoom { room_id } => candidates
                    .into_iter()
                    .find(|c| &c.room_id == room_id),
                _ => candidates.into_iter().next(),
            };
            let Some(cand) = chosen else {
                return Err(RepairError::Infeasible(format!(
                    "会话 {} 在修复限定下无可行位置",
                    session.id
                )));
            };
            solver.commit(session, &cand, &mut avail, &mut tracker);
            let Some(slot) = grid.slot(cand.day_idx, cand.start_slot, session.block_hours) else {
                return Err(RepairError::Infeasible(format!(
                    "会话 {} 的候选位置超出网格",
                    session.id
                )));
            };
            new_entries.push(ScheduleEntry {
                id: String::new(),
                course_id: session.course_id.clone(),
                teacher_id: cand.teacher_id.clone(),
                room_id: cand.room_id.clone(),
                batch_id: session.batch_id.clone(),
                day_of_week: slot.day_of_week,
                start_time: slot.start_time,
                end_time: slot.end_time,
            });
        }

        sort_and_number_entries(&mut new_entries);
        info!(
            conflict_id,
            placed = sessions.len(),
            "定向修复完成"
        );
        Ok(builder.assemble(&scope, ScheduleStatus::Generated, new_entries, remaining_conflicts))
    }

    /// 重建受影响 (课程,班级) 的会话块
    ///
    /// 学时来源: 工作量预指派优先, 否则 Course.hours_per_week
    fn sessions_for(
        &self,
        course_id: &str,
        batch_id: &str,
        resolution: &ConflictResolution,
    ) -> Result<Vec<Session>, RepairError> {
        let assignment = self
            .snapshot
            .workload_assignments
            .iter()
            .find(|wa| wa.course_id == course_id && wa.batch_id == batch_id);
        let (total_hours, mut pinned) = match assignment {
            Some(wa) => (
                wa.hours_per_week,
                wa.is_confirmed.then(|| wa.teacher_id.clone()),
            ),
            None => {
                let course = self
                    .snapshot
                    .courses
                    .iter()
                    .find(|c| c.id == course_id)
                    .ok_or_else(|| {
                        RepairError::Infeasible(format!("课程不存在: course_id={}", course_id))
                    })?;
                (course.hours_per_week, None)
            }
        };
        // 限定教师的修复指令覆盖预指派
        if let ConflictResolution::ChangeTeacher { teacher_id } = resolution {
            pinned = Some(teacher_id.clone());
        }

        Ok(
            split_hours(total_hours, self.constraints.max_continuous_hours)
                .into_iter()
                .enumerate()
                .map(|(idx, hours)| Session {
                    id: format!("{}#{}#{}", course_id, batch_id, idx),
                    course_id: course_id.to_string(),
                    batch_id: batch_id.to_string(),
                    block_hours: hours,
                    block_index: idx as u8,
                    total_hours,
                    pinned_teacher_id: pinned.clone(),
                })
                .collect(),
        )
    }
}

/// 从既有课表提取报告标识
fn scope_of(schedule: &Schedule) -> ReportScope {
    ReportScope {
        schedule_id: schedule.id.clone(),
        name: schedule.name.clone(),
        department_id: schedule.department_id.clone(),
        academic_year: schedule.academic_year.clone(),
        semester: schedule.semester.clone(),
        created_at: schedule.created_at,
        updated_at: schedule.updated_at,
    }
}

/// 课表条目定位回网格坐标 (教学日索引, 起始时段索引, 时长)
fn locate_entry(
    grid: &crate::domain::timeslot::SlotGrid,
    entry: &ScheduleEntry,
) -> Result<(usize, usize, usize), RepairError> {
    use chrono::Timelike;

    let day_idx = grid
        .days
        .iter()
        .position(|&d| d == entry.day_of_week)
        .ok_or_else(|| RepairError::EntryOutsideGrid(entry.id.clone()))?;
    let start_slot = grid
        .slot_start_hours()
        .iter()
        .position(|&h| h == entry.start_time.hour())
        .ok_or_else(|| RepairError::EntryOutsideGrid(entry.id.clone()))?;
    let minutes = (entry.end_time - entry.start_time).num_minutes();
    if minutes <= 0 || minutes % 60 != 0 {
        return Err(RepairError::EntryOutsideGrid(entry.id.clone()));
    }
    Ok((day_idx, start_slot, (minutes / 60) as usize))
}
