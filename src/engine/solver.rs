// ==========================================
// 教务排课系统 - 排课求解器
// ==========================================
// 职责: 约束制导的回溯搜索 + 预算耗尽后的松弛兜底
// 红线: "无完整解"不是错误, 求解器总是返回部分课表与冲突
// 红线: 取消与预算只在提交边界检查, 不打断约束判定中途
// ==========================================

use crate::config::constraints::{ScheduleConstraints, SchedulePreferences};
use crate::config::tuning::{QualificationPolicy, SolverTuning};
use crate::domain::session::Session;
use crate::domain::snapshot::{ScheduleSnapshot, SnapshotIndex};
use crate::domain::types::{ConflictSeverity, ConflictType, CourseType, ScheduleStatus};
use crate::engine::availability::AvailabilityIndex;
use crate::engine::evaluator::{Candidate, ConstraintEvaluator, HardViolation};
use crate::engine::progress::{GenerationProgress, ProgressSink};
use crate::engine::workload::WorkloadTracker;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

// MRV 计数上限: 候选数超过该值后不再区分约束度
const MRV_COUNT_CAP: usize = 48;

// ==========================================
// 预检错误
// ==========================================

/// 约束配置自相矛盾, 搜索开始前拒绝
#[derive(Error, Debug, Clone, PartialEq)]
#[error("约束配置自相矛盾 (constraint={constraint}): {detail}")]
pub struct InfeasibleConstraint {
    pub constraint: &'static str,
    pub detail: String,
}

// ==========================================
// CancelToken - 协作式取消令牌
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消; 求解器在下一个提交边界响应
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ==========================================
// 求解结果类型
// ==========================================

/// 已提交分配
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub session: Session,   // 会话
    pub teacher_id: String, // 教师ID
    pub room_id: String,    // 教室ID
    pub day_idx: usize,     // 教学日索引
    pub start_slot: usize,  // 起始时段索引
}

/// 兜底会话记录 (松弛模式产物)
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub session: Session,                     // 未能安排的会话
    pub conflict_type: ConflictType,          // 归因冲突类型
    pub severity: ConflictSeverity,           // 严重度
    pub description: String,                  // 归因描述
    pub suggested_resolution: Option<String>, // 建议处理方式
}

/// 搜索统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveStats {
    pub steps: u64,       // 提交边界操作数
    pub backtracks: u32,  // 回溯撤销次数
    pub repaired: u32,    // 修复通过的兜底会话数
    pub cancelled: bool,  // 是否被取消
    pub timed_out: bool,  // 是否预算耗尽提前收束
}

/// 求解结果: 部分或完整课表 + 兜底冲突
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub committed: Vec<Assignment>,
    pub pending: Vec<PendingRecord>,
    pub stats: SolveStats,
}

// 搜索帧: 一次已提交决策与其余候选
struct Frame {
    session_idx: usize,
    chosen: Candidate,
    candidates: Vec<Candidate>,
    next: usize,
}

// 死路归因信息 (候选枚举的副产物)
#[derive(Debug, Default)]
pub(crate) struct Blockers {
    no_qualified_teacher: bool,
    no_room_capacity: bool,
    no_room_type: bool,
    no_teacher_capacity: bool,
    teacher_time_rejections: u32,
}

// ==========================================
// Solver - 排课求解器
// ==========================================
pub struct Solver<'a> {
    snapshot: &'a ScheduleSnapshot,
    index: SnapshotIndex<'a>,
    constraints: &'a ScheduleConstraints,
    preferences: &'a SchedulePreferences,
    tuning: &'a SolverTuning,
}

impl<'a> Solver<'a> {
    pub fn new(
        snapshot: &'a ScheduleSnapshot,
        constraints: &'a ScheduleConstraints,
        preferences: &'a SchedulePreferences,
        tuning: &'a SolverTuning,
    ) -> Self {
        Self {
            snapshot,
            index: snapshot.index(),
            constraints,
            preferences,
            tuning,
        }
    }

    fn evaluator(&self) -> ConstraintEvaluator<'_> {
        ConstraintEvaluator {
            index: &self.index,
            grid: &self.tuning.slot_grid,
            constraints: self.constraints,
            preferences: self.preferences,
            tuning: self.tuning,
        }
    }

    // ==========================================
    // 预检: 配置自相矛盾在搜索前拒绝
    // ==========================================

    /// 搜索前预检
    ///
    /// # 检查项
    /// 1. 时段网格有效
    /// 2. max_continuous_hours ≥ 1
    /// 3. 最大会话块能放进网格内最长连续段
    /// 4. max_daily_hours 不小于最大会话块
    pub fn preflight(&self, sessions: &[Session]) -> Result<(), InfeasibleConstraint> {
        if let Err(e) = self.tuning.slot_grid.validate() {
            return Err(InfeasibleConstraint {
                constraint: "slot_grid",
                detail: e.to_string(),
            });
        }
        if self.constraints.max_continuous_hours == 0 {
            return Err(InfeasibleConstraint {
                constraint: "max_continuous_hours",
                detail: "连续授课上限不得为0".to_string(),
            });
        }

        let max_block = sessions.iter().map(|s| s.block_hours).max().unwrap_or(0);
        let longest_run = self.longest_contiguous_run();
        if max_block as usize > longest_run {
            return Err(InfeasibleConstraint {
                constraint: "max_continuous_hours",
                detail: format!(
                    "会话块 {} 小时超过网格内最长连续段 {} 小时",
                    max_block, longest_run
                ),
            });
        }
        if max_block > self.constraints.teacher_constraints.max_daily_hours {
            return Err(InfeasibleConstraint {
                constraint: "teacher_constraints.max_daily_hours",
                detail: format!(
                    "单日上限 {} 小时小于最大会话块 {} 小时",
                    self.constraints.teacher_constraints.max_daily_hours, max_block
                ),
            });
        }
        Ok(())
    }

    /// 网格内最长的实际时间连续段
    fn longest_contiguous_run(&self) -> usize {
        let spd = self.tuning.slot_grid.slots_per_day();
        let mut longest = 0usize;
        let mut current = if spd > 0 { 1 } else { 0 };
        for i in 0..spd.saturating_sub(1) {
            if self.tuning.slot_grid.slots_adjacent(i) {
                current += 1;
            } else {
                longest = longest.max(current);
                current = 1;
            }
        }
        longest.max(current)
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 执行求解
    ///
    /// # 终止性
    /// 有限会话 × 有限时段 × 有限回溯预算, 必然终止
    ///
    /// # 确定性
    /// 相同快照与配置下, 所有排序与平手裁决均显式固定
    pub fn solve(
        &self,
        sessions: &[Session],
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> SolverOutcome {
        let grid = &self.tuning.slot_grid;
        let mut avail = AvailabilityIndex::build(self.snapshot, grid);
        let mut tracker = WorkloadTracker::build(self.snapshot, grid.days.len());
        let evaluator = self.evaluator();

        let total = sessions.len();
        let mut unassigned: BTreeSet<usize> = (0..total).collect();
        let mut frames: Vec<Frame> = Vec::new();
        let mut pending: Vec<PendingRecord> = Vec::new();
        let mut stats = SolveStats::default();
        let started = Instant::now();

        info!(
            sessions_total = total,
            backtrack_budget = self.tuning.backtrack_budget,
            qualification_policy = %self.tuning.qualification_policy,
            "开始排课搜索"
        );

        loop {
            // ===== 提交边界: 取消与预算检查 =====
            stats.steps += 1;
            if cancel.is_cancelled() {
                stats.cancelled = true;
                warn!(committed = frames.len(), "排课被取消, 返回部分结果");
                break;
            }
            let over_steps = stats.steps > self.tuning.step_budget;
            let over_time = self
                .tuning
                .time_budget_ms
                .map(|ms| started.elapsed().as_millis() as u64 > ms)
                .unwrap_or(false);
            if over_steps || over_time {
                stats.timed_out = true;
                for &sidx in &unassigned {
                    pending.push(PendingRecord {
                        session: sessions[sidx].clone(),
                        conflict_type: ConflictType::UnscheduledSession,
                        severity: ConflictSeverity::Medium,
                        description: format!(
                            "Search budget exhausted before session {} could be placed",
                            sessions[sidx].id
                        ),
                        suggested_resolution: Some(
                            "Increase the solver budget or relax constraints".to_string(),
                        ),
                    });
                }
                unassigned.clear();
                warn!(pending = pending.len(), "搜索预算耗尽, 剩余会话转入兜底");
                break;
            }
            if unassigned.is_empty() {
                break;
            }

            // ===== MRV: 最受约束会话优先 =====
            let sidx = self.select_most_constrained(sessions, &unassigned, &avail, &tracker);
            let (candidates, blockers) =
                self.enumerate(&sessions[sidx], &avail, &tracker, usize::MAX);

            if let Some(first) = candidates.first().cloned() {
                // 提交首个候选 (枚举已按罚分与平手规则排序)
                self.commit(&sessions[sidx], &first, &mut avail, &mut tracker);
                unassigned.remove(&sidx);
                frames.push(Frame {
                    session_idx: sidx,
                    chosen: first,
                    candidates,
                    next: 1,
                });
                self.publish(sink, frames.len(), pending.len(), total);
                continue;
            }

            // ===== 死路: 回溯或松弛 =====
            debug!(session = %sessions[sidx].id, "会话无可行候选, 进入回溯");
            let mut placed_via_backtrack = false;
            while !placed_via_backtrack {
                if stats.backtracks >= self.tuning.backtrack_budget || frames.is_empty() {
                    // 松弛模式: 当前无法安排的会话转入兜底, 不阻塞整轮
                    let record = self.classify(&sessions[sidx], &blockers);
                    debug!(
                        session = %sessions[sidx].id,
                        conflict = %record.conflict_type,
                        "松弛模式: 会话转入兜底"
                    );
                    pending.push(record);
                    unassigned.remove(&sidx);
                    break;
                }

                let Some(mut frame) = frames.pop() else {
                    break;
                };
                let frame_session = frame.session_idx;
                self.revert(&sessions[frame_session], &frame.chosen, &mut avail, &mut tracker);
                stats.backtracks += 1;

                // 该帧的后续候选逐个重验 (状态已变化)
                let mut advanced = false;
                while frame.next < frame.candidates.len() {
                    let cand = frame.candidates[frame.next].clone();
                    frame.next += 1;
                    if evaluator
                        .check_hard(&sessions[frame_session], &cand, &avail, &tracker)
                        .is_empty()
                    {
                        self.commit(&sessions[frame_session], &cand, &mut avail, &mut tracker);
                        frame.chosen = cand;
                        frames.push(frame);
                        advanced = true;
                        break;
                    }
                }
                if advanced {
                    // 重新进入主循环, sidx 仍在未分配池中
                    placed_via_backtrack = true;
                } else {
                    // 该帧会话也回到未分配池, 继续向上回溯
                    unassigned.insert(frame_session);
                }
            }
            self.publish(sink, frames.len(), pending.len(), total);
        }

        // ===== 兜底修复: 对最终状态再试一轮 =====
        let mut committed: Vec<Assignment> = frames
            .iter()
            .map(|f| Assignment {
                session: sessions[f.session_idx].clone(),
                teacher_id: f.chosen.teacher_id.clone(),
                room_id: f.chosen.room_id.clone(),
                day_idx: f.chosen.day_idx,
                start_slot: f.chosen.start_slot,
            })
            .collect();

        if !stats.cancelled && !pending.is_empty() {
            let mut attempts = self.tuning.repair_attempts;
            let mut remaining = Vec::with_capacity(pending.len());
            for record in pending.into_iter() {
                if attempts == 0 {
                    remaining.push(record);
                    continue;
                }
                attempts -= 1;
                let (cands, _) = self.enumerate(&record.session, &avail, &tracker, 1);
                match cands.into_iter().next() {
                    Some(cand) => {
                        self.commit(&record.session, &cand, &mut avail, &mut tracker);
                        committed.push(Assignment {
                            session: record.session.clone(),
                            teacher_id: cand.teacher_id,
                            room_id: cand.room_id,
                            day_idx: cand.day_idx,
                            start_slot: cand.start_slot,
                        });
                        stats.repaired += 1;
                    }
                    None => remaining.push(record),
                }
            }
            pending = remaining;
        }

        self.publish(sink, committed.len(), pending.len(), total);
        info!(
            committed = committed.len(),
            pending = pending.len(),
            backtracks = stats.backtracks,
            steps = stats.steps,
            cancelled = stats.cancelled,
            "排课搜索结束"
        );

        SolverOutcome {
            committed,
            pending,
            stats,
        }
    }

    // ==========================================
    // 候选枚举与排序
    // ==========================================

    /// 会话允许的授课教师 (按 ID 升序)
    fn allowed_teachers(&self, session: &Session) -> Vec<&'a str> {
        if let Some(pinned) = &session.pinned_teacher_id {
            return match self.index.teachers.get_key_value(pinned.as_str()) {
                Some((id, _)) => vec![*id],
                None => Vec::new(),
            };
        }
        self.index
            .teachers
            .iter()
            .filter(|(_, t)| {
                if t.qualification_for(&session.course_id).is_some() {
                    return true;
                }
                !t.has_listed_qualifications()
                    && self.tuning.qualification_policy == QualificationPolicy::OpenWorld
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// 枚举会话的全部可行候选
    ///
    /// # 排序 (确定性平手裁决)
    /// 软罚分升序 → 教学日升序 → 起始时段升序 → 教室ID升序 → 教师ID升序
    ///
    /// # 参数
    /// - limit: 候选数上限 (MRV 计数时截断, 全量枚举传 usize::MAX)
    pub(crate) fn enumerate(
        &self,
        session: &Session,
        avail: &AvailabilityIndex,
        tracker: &WorkloadTracker,
        limit: usize,
    ) -> (Vec<Candidate>, Blockers) {
        let evaluator = self.evaluator();
        let grid = &self.tuning.slot_grid;
        let len = session.block_hours as usize;
        let spd = grid.slots_per_day();
        let mut blockers = Blockers::default();

        let teachers = self.allowed_teachers(session);
        if teachers.is_empty() {
            blockers.no_qualified_teacher = true;
            return (Vec::new(), blockers);
        }

        // 教室预过滤: 容量与类型
        let batch = self.index.batches.get(session.batch_id.as_str());
        let course = self.index.courses.get(session.course_id.as_str());
        let mut rooms_capacity_ok = false;
        let rooms: Vec<&str> = self
            .index
            .rooms
            .iter()
            .filter(|(_, r)| {
                let capacity_ok = batch.map(|b| r.fits(b.students_count)).unwrap_or(false);
                if capacity_ok {
                    rooms_capacity_ok = true;
                }
                let type_ok = match course {
                    Some(c)
                        if self.constraints.room_constraints.lab_courses_only_in_labs
                            && c.course_type == CourseType::Lab =>
                    {
                        r.room_type.is_lab()
                    }
                    _ => true,
                };
                capacity_ok && type_ok
            })
            .map(|(id, _)| *id)
            .collect();
        if rooms.is_empty() {
            if rooms_capacity_ok {
                blockers.no_room_type = true;
            } else {
                blockers.no_room_capacity = true;
            }
            return (Vec::new(), blockers);
        }

        // 教师容量预判 (死路归因用)
        let max_daily = self.constraints.teacher_constraints.max_daily_hours as u32;
        blockers.no_teacher_capacity = !teachers.iter().any(|t| {
            !tracker.would_exceed(t, len as u32)
                && (0..grid.days.len())
                    .any(|d| !tracker.would_exceed_daily(t, d, len as u32, max_daily))
        });

        let mut scored: Vec<(f64, Candidate)> = Vec::new();
        'search: for teacher_id in &teachers {
            for room_id in &rooms {
                for day_idx in 0..grid.days.len() {
                    for start_slot in 0..=spd.saturating_sub(len) {
                        if !grid.contiguous_run(start_slot, len) {
                            continue;
                        }
                        let cand = Candidate {
                            teacher_id: teacher_id.to_string(),
                            room_id: room_id.to_string(),
                            day_idx,
                            start_slot,
                        };
                        let violations = evaluator.check_hard(session, &cand, avail, tracker);
                        if violations.is_empty() {
                            let score = evaluator.score_soft(session, &cand, avail, tracker);
                            scored.push((score, cand));
                            if scored.len() >= limit {
                                break 'search;
                            }
                        } else if violations.iter().any(|v| {
                            matches!(
                                v,
                                HardViolation::TeacherBusy | HardViolation::TeacherUnavailable
                            )
                        }) {
                            blockers.teacher_time_rejections += 1;
                        }
                    }
                }
            }
        }

        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.day_idx.cmp(&b.1.day_idx))
                .then_with(|| a.1.start_slot.cmp(&b.1.start_slot))
                .then_with(|| a.1.room_id.cmp(&b.1.room_id))
                .then_with(|| a.1.teacher_id.cmp(&b.1.teacher_id))
        });
        (scored.into_iter().map(|(_, c)| c).collect(), blockers)
    }

    /// MRV 选择: 可行候选最少的会话优先
    ///
    /// 平手裁决: 学分降序 → 课程编码升序 → 块序号升序 → 会话索引升序
    fn select_most_constrained(
        &self,
        sessions: &[Session],
        unassigned: &BTreeSet<usize>,
        avail: &AvailabilityIndex,
        tracker: &WorkloadTracker,
    ) -> usize {
        let mut best: Option<(usize, usize, i32, &str, u8)> = None;
        for &sidx in unassigned {
            let session = &sessions[sidx];
            let (cands, _) = self.enumerate(session, avail, tracker, MRV_COUNT_CAP);
            let count = cands.len();
            let course = self.index.courses.get(session.course_id.as_str());
            let credits = course.map(|c| c.credits as i32).unwrap_or(0);
            let code = course.map(|c| c.code.as_str()).unwrap_or("");
            let key = (count, -credits, code, session.block_index);
            let replace = match &best {
                None => true,
                Some((_, bc, bneg, bcode, bblock)) => {
                    key < (*bc, *bneg, *bcode, *bblock)
                }
            };
            if replace {
                best = Some((sidx, count, -credits, code, session.block_index));
            }
        }
        best.map(|(sidx, ..)| sidx).unwrap_or(0)
    }

    // ==========================================
    // 提交/撤销 (与索引和跟踪器严格对称)
    // ==========================================

    pub(crate) fn commit(
        &self,
        session: &Session,
        cand: &Candidate,
        avail: &mut AvailabilityIndex,
        tracker: &mut WorkloadTracker,
    ) {
        let len = session.block_hours as usize;
        avail.occupy(
            &cand.teacher_id,
            &cand.room_id,
            &session.batch_id,
            cand.day_idx,
            cand.start_slot,
            len,
        );
        tracker.add(&cand.teacher_id, cand.day_idx, len as u32);
    }

    fn revert(
        &self,
        session: &Session,
        cand: &Candidate,
        avail: &mut AvailabilityIndex,
        tracker: &mut WorkloadTracker,
    ) {
        let len = session.block_hours as usize;
        avail.release(
            &cand.teacher_id,
            &cand.room_id,
            &session.batch_id,
            cand.day_idx,
            cand.start_slot,
            len,
        );
        tracker.remove(&cand.teacher_id, cand.day_idx, len as u32);
    }

    // ==========================================
    // 死路归因
    // ==========================================

    /// 兜底会话的冲突归因
    ///
    /// # 规则 (优先级自上而下)
    /// 1. 无任何具备资格的教师 → unscheduled_session
    /// 2. 无容量足够的教室 → capacity_violation
    /// 3. 无类型匹配的教室 → unscheduled_session
    /// 4. 所有教师工作量已满 → workload_exceeded
    /// 5. 教师时段受阻为主因 → teacher_conflict
    /// 6. 其他 → unscheduled_session
    fn classify(&self, session: &Session, blockers: &Blockers) -> PendingRecord {
        let (conflict_type, severity, description, suggested) = if blockers.no_qualified_teacher {
            (
                ConflictType::UnscheduledSession,
                ConflictSeverity::Medium,
                format!(
                    "No qualified teacher available for course {} (batch {})",
                    session.course_id, session.batch_id
                ),
                Some("Add course qualifications or switch qualification policy".to_string()),
            )
        } else if blockers.no_room_capacity {
            (
                ConflictType::CapacityViolation,
                ConflictSeverity::High,
                format!(
                    "No room large enough for batch {} (course {})",
                    session.batch_id, session.course_id
                ),
                Some("Assign a larger room or split the batch".to_string()),
            )
        } else if blockers.no_room_type {
            (
                ConflictType::UnscheduledSession,
                ConflictSeverity::Medium,
                format!(
                    "No lab room available for course {} (batch {})",
                    session.course_id, session.batch_id
                ),
                Some("Add lab rooms or disable lab_courses_only_in_labs".to_string()),
            )
        } else if blockers.no_teacher_capacity {
            (
                ConflictType::WorkloadExceeded,
                ConflictSeverity::Medium,
                format!(
                    "All qualified teachers are at workload capacity for course {} (batch {})",
                    session.course_id, session.batch_id
                ),
                Some("Raise max_workload or add teaching staff".to_string()),
            )
        } else if blockers.teacher_time_rejections > 0 {
            (
                ConflictType::TeacherConflict,
                ConflictSeverity::Medium,
                format!(
                    "Qualified teachers have no free slot left for course {} (batch {})",
                    session.course_id, session.batch_id
                ),
                Some("Extend teacher availability or relax constraints".to_string()),
            )
        } else {
            (
                ConflictType::UnscheduledSession,
                ConflictSeverity::Medium,
                format!(
                    "Session {} could not be placed under current constraints",
                    session.id
                ),
                Some("Relax constraints or extend the slot grid".to_string()),
            )
        };
        PendingRecord {
            session: session.clone(),
            conflict_type,
            severity,
            description,
            suggested_resolution: suggested,
        }
    }

    fn publish(&self, sink: &dyn ProgressSink, committed: usize, pending: usize, total: usize) {
        let processed = committed + pending;
        let progress = if total == 0 {
            1.0
        } else {
            processed as f64 / total as f64
        };
        sink.publish(&GenerationProgress {
            progress: progress.min(1.0),
            status: ScheduleStatus::Generating,
            current_step: "searching".to_string(),
            conflicts_found: pending as u32,
            entries_generated: committed as u32,
        });
    }
}
