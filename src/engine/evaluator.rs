// ==========================================
// 教务排课系统 - 约束评估器
// ==========================================
// 职责: 硬约束判定与软约束罚分的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::config::constraints::{ScheduleConstraints, SchedulePreferences};
use crate::config::tuning::{QualificationPolicy, SolverTuning};
use crate::domain::session::Session;
use crate::domain::snapshot::SnapshotIndex;
use crate::domain::timeslot::SlotGrid;
use crate::domain::types::CourseType;
use crate::engine::availability::{block_mask, AvailabilityIndex};
use crate::engine::workload::WorkloadTracker;
use std::fmt;

// ==========================================
// Candidate - 候选分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub teacher_id: String, // 教师ID
    pub room_id: String,    // 教室ID
    pub day_idx: usize,     // 教学日索引 (非星期值)
    pub start_slot: usize,  // 起始时段索引
}

// ==========================================
// HardViolation - 硬约束违规
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardViolation {
    TeacherBusy,            // 教师时段已占用
    RoomBusy,               // 教室时段已占用
    BatchBusy,              // 班级时段已占用
    TeacherUnavailable,     // 教师可用窗口之外
    RoomCapacityExceeded,   // 教室容量不足
    RoomTypeMismatch,       // 实验课未排实验室
    NotQualified,           // 教师不具备授课资格
    PinnedTeacherMismatch,  // 违反已确认预指派
    WeeklyWorkloadExceeded, // 周工作量超限
    DailyHoursExceeded,     // 单日学时超限
    ContinuousRunExceeded,  // 连续授课超限
    BreakRequired,          // 连续块间歇不足
    BlockNotContiguous,     // 时段块跨越非相邻时段
    UnknownEntity,          // 引用实体缺失 (防御)
}

impl fmt::Display for HardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            HardViolation::TeacherBusy => "TEACHER_BUSY",
            HardViolation::RoomBusy => "ROOM_BUSY",
            HardViolation::BatchBusy => "BATCH_BUSY",
            HardViolation::TeacherUnavailable => "TEACHER_UNAVAILABLE",
            HardViolation::RoomCapacityExceeded => "ROOM_CAPACITY_EXCEEDED",
            HardViolation::RoomTypeMismatch => "ROOM_TYPE_MISMATCH",
            HardViolation::NotQualified => "NOT_QUALIFIED",
            HardViolation::PinnedTeacherMismatch => "PINNED_TEACHER_MISMATCH",
            HardViolation::WeeklyWorkloadExceeded => "WEEKLY_WORKLOAD_EXCEEDED",
            HardViolation::DailyHoursExceeded => "DAILY_HOURS_EXCEEDED",
            HardViolation::ContinuousRunExceeded => "CONTINUOUS_RUN_EXCEEDED",
            HardViolation::BreakRequired => "BREAK_REQUIRED",
            HardViolation::BlockNotContiguous => "BLOCK_NOT_CONTIGUOUS",
            HardViolation::UnknownEntity => "UNKNOWN_ENTITY",
        };
        write!(f, "{}", code)
    }
}

// ==========================================
// ConstraintEvaluator - 约束评估器
// ==========================================
pub struct ConstraintEvaluator<'a> {
    pub index: &'a SnapshotIndex<'a>,
    pub grid: &'a SlotGrid,
    pub constraints: &'a ScheduleConstraints,
    pub preferences: &'a SchedulePreferences,
    pub tuning: &'a SolverTuning,
}

impl<'a> ConstraintEvaluator<'a> {
    /// 硬约束判定
    ///
    /// # 返回
    /// 空列表表示候选可提交; 否则返回全部命中的违规 (顺序固定)
    pub fn check_hard(
        &self,
        session: &Session,
        cand: &Candidate,
        avail: &AvailabilityIndex,
        tracker: &WorkloadTracker,
    ) -> Vec<HardViolation> {
        let mut violations = Vec::new();
        let len = session.block_hours as usize;

        let (Some(&teacher), Some(&room), Some(&batch), Some(&course)) = (
            self.index.teachers.get(cand.teacher_id.as_str()),
            self.index.rooms.get(cand.room_id.as_str()),
            self.index.batches.get(session.batch_id.as_str()),
            self.index.courses.get(session.course_id.as_str()),
        ) else {
            violations.push(HardViolation::UnknownEntity);
            return violations;
        };

        // 规则 1: 已确认预指派钉死教师
        if let Some(pinned) = &session.pinned_teacher_id {
            if pinned != &cand.teacher_id {
                violations.push(HardViolation::PinnedTeacherMismatch);
            }
        }

        // 规则 2: 授课资格
        // 列出了资格清单的教师受清单约束; 空清单交由资格策略裁决
        match teacher.qualification_for(&course.id) {
            Some(_) => {}
            None if teacher.has_listed_qualifications() => {
                violations.push(HardViolation::NotQualified);
            }
            None => {
                if self.tuning.qualification_policy == QualificationPolicy::Strict {
                    violations.push(HardViolation::NotQualified);
                }
            }
        }

        // 规则 3: 时段块必须实际时间连续
        if !self.grid.contiguous_run(cand.start_slot, len) {
            violations.push(HardViolation::BlockNotContiguous);
            return violations;
        }

        // 规则 4: 教师静态可用窗口
        if !avail.teacher_available(&cand.teacher_id, cand.day_idx, cand.start_slot, len) {
            violations.push(HardViolation::TeacherUnavailable);
        }

        // 规则 5: 三方时段占用
        if !avail.teacher_free(&cand.teacher_id, cand.day_idx, cand.start_slot, len) {
            violations.push(HardViolation::TeacherBusy);
        }
        if !avail.room_free(&cand.room_id, cand.day_idx, cand.start_slot, len) {
            violations.push(HardViolation::RoomBusy);
        }
        if !avail.batch_free(&session.batch_id, cand.day_idx, cand.start_slot, len) {
            violations.push(HardViolation::BatchBusy);
        }

        // 规则 6: 教室容量
        if !room.fits(batch.students_count) {
            violations.push(HardViolation::RoomCapacityExceeded);
        }

        // 规则 7: 实验课教室类型
        if self.constraints.room_constraints.lab_courses_only_in_labs
            && course.course_type == CourseType::Lab
            && !room.room_type.is_lab()
        {
            violations.push(HardViolation::RoomTypeMismatch);
        }

        // 规则 8: 工作量上限 (周/日)
        if tracker.would_exceed(&cand.teacher_id, len as u32) {
            violations.push(HardViolation::WeeklyWorkloadExceeded);
        }
        if tracker.would_exceed_daily(
            &cand.teacher_id,
            cand.day_idx,
            len as u32,
            self.constraints.teacher_constraints.max_daily_hours as u32,
        ) {
            violations.push(HardViolation::DailyHoursExceeded);
        }

        // 规则 9: 连续授课与强制间歇 (教师与班级两侧)
        let teacher_mask = avail.teacher_busy_mask(&cand.teacher_id, cand.day_idx);
        if let Some(v) = self.run_violation(teacher_mask, cand.start_slot, len) {
            violations.push(v);
        }
        let batch_mask = avail.batch_busy_mask(&session.batch_id, cand.day_idx);
        if let Some(v) = self.run_violation(batch_mask, cand.start_slot, len) {
            violations.push(v);
        }

        violations
    }

    /// 连续授课/间歇检查
    ///
    /// # 规则
    /// - 候选块并入当日占用位图后, 所在实际连续段长度 ≤ max_continuous_hours
    /// - 连续段两侧需保持 break_slots 个空时段 (自然断点如午休视为间歇)
    fn run_violation(&self, busy: u32, start: usize, len: usize) -> Option<HardViolation> {
        let combined = busy | block_mask(start, len);
        let spd = self.grid.slots_per_day();

        // 向两侧扩展所在连续段
        let mut left = start;
        while left > 0
            && self.grid.slots_adjacent(left - 1)
            && combined & block_mask(left - 1, 1) != 0
        {
            left -= 1;
        }
        let mut right = start + len - 1;
        while right + 1 < spd
            && self.grid.slots_adjacent(right)
            && combined & block_mask(right + 1, 1) != 0
        {
            right += 1;
        }

        let run_len = right - left + 1;
        if run_len > self.constraints.max_continuous_hours as usize {
            return Some(HardViolation::ContinuousRunExceeded);
        }

        // 间歇检查: 段边界外 break_slots 个相邻时段必须空闲
        let break_slots = self.constraints.break_slots() as usize;
        if break_slots > 0 {
            let mut pos = left;
            for _ in 0..break_slots {
                if pos == 0 || !self.grid.slots_adjacent(pos - 1) {
                    break; // 到达日界或自然断点
                }
                pos -= 1;
                if combined & block_mask(pos, 1) != 0 {
                    return Some(HardViolation::BreakRequired);
                }
            }
            let mut pos = right;
            for _ in 0..break_slots {
                if pos + 1 >= spd || !self.grid.slots_adjacent(pos) {
                    break;
                }
                pos += 1;
                if combined & block_mask(pos, 1) != 0 {
                    return Some(HardViolation::BreakRequired);
                }
            }
        }
        None
    }

    /// 软约束罚分 (越低越优)
    ///
    /// 对应偏好未开启时该项不计; 权重全部来自调参配置
    pub fn score_soft(
        &self,
        session: &Session,
        cand: &Candidate,
        avail: &AvailabilityIndex,
        tracker: &WorkloadTracker,
    ) -> f64 {
        let weights = &self.tuning.weights;
        let len = session.block_hours as usize;
        let mut penalty = 0.0;

        let teacher = self.index.teachers.get(cand.teacher_id.as_str());
        let room = self.index.rooms.get(cand.room_id.as_str());
        let batch = self.index.batches.get(session.batch_id.as_str());
        let course = self.index.courses.get(session.course_id.as_str());

        // 上午偏好: 起始时段越晚罚分越高
        if self.preferences.prefer_morning_slots {
            penalty += weights.morning_preference * cand.start_slot as f64;
        }

        // 工作量均衡: 负载率越高罚分越高
        if self.preferences.distribute_workload_evenly {
            if let Some(t) = teacher {
                if t.max_workload > 0 {
                    let after = tracker.assigned_hours(&cand.teacher_id) + len as u32;
                    penalty += weights.workload_balance * (after as f64 / t.max_workload as f64);
                }
            }
        }

        let batch_mask = avail.batch_busy_mask(&session.batch_id, cand.day_idx);

        // 班级空档: 罚新引入的空档时段数
        if self.preferences.minimize_gap_hours {
            let before = gap_slots(batch_mask);
            let after = gap_slots(batch_mask | block_mask(cand.start_slot, len));
            penalty += weights.batch_gap * (after.saturating_sub(before)) as f64;
        }

        // 同班相邻: 当日已有课程但候选块与之不相邻时罚分
        if self.preferences.group_same_batch_courses && batch_mask != 0 {
            let left_adjacent = cand.start_slot > 0
                && self.grid.slots_adjacent(cand.start_slot - 1)
                && batch_mask & block_mask(cand.start_slot - 1, 1) != 0;
            let end = cand.start_slot + len;
            let right_adjacent = end < self.grid.slots_per_day()
                && self.grid.slots_adjacent(end - 1)
                && batch_mask & block_mask(end, 1) != 0;
            if !left_adjacent && !right_adjacent {
                penalty += weights.batch_grouping;
            }
        }

        // 资格相关: 非擅长课程 / 未列资格授课
        if let Some(t) = teacher {
            match t.qualification_for(&session.course_id) {
                Some(q) if !q.is_preferred => penalty += weights.non_preferred_course,
                Some(_) => {}
                None => penalty += weights.unlisted_course,
            }
        }

        // 跨院系教师
        if self.constraints.teacher_constraints.preferred_departments {
            if let (Some(t), Some(c)) = (teacher, course) {
                if t.department_id != c.department_id {
                    penalty += weights.cross_department;
                }
            }
        }

        // 偏好时窗
        if let Some(c) = course {
            let windows = self.constraints.preferred_windows(c.course_type);
            if !windows.is_empty() {
                if let Some(slot) = self.grid.slot(cand.day_idx, cand.start_slot, session.block_hours)
                {
                    let inside = windows
                        .iter()
                        .any(|(ws, we)| *ws <= slot.start_time && slot.end_time <= *we);
                    if !inside {
                        penalty += weights.outside_preferred_window;
                    }
                }
            }
        }

        // 容量利用率软上限
        if let (Some(r), Some(b)) = (room, batch) {
            if r.capacity > 0 {
                let util = b.students_count as f64 / r.capacity as f64;
                let cap = self.constraints.room_constraints.max_capacity_utilization;
                if util > cap {
                    penalty += weights.capacity_headroom;
                }
            }
        }

        penalty
    }
}

/// 位图内部空档时段数 (最低与最高占用位之间的空位)
fn gap_slots(mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let low = mask.trailing_zeros();
    let high = 31 - mask.leading_zeros();
    (high - low + 1) - mask.count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::course::Course;
    use crate::domain::entity::{Batch, Department, Program, Room};
    use crate::domain::snapshot::ScheduleSnapshot;
    use crate::domain::teacher::{CourseQualification, Teacher};
    use crate::domain::types::RoomType;
    use std::collections::BTreeSet;

    fn base_snapshot() -> ScheduleSnapshot {
        ScheduleSnapshot {
            department: Department {
                id: "D001".to_string(),
                name: "计算机学院".to_string(),
                code: "CS".to_string(),
            },
            programs: vec![Program {
                id: "P001".to_string(),
                department_id: "D001".to_string(),
                name: "软件工程".to_string(),
            }],
            teachers: vec![Teacher {
                id: "T001".to_string(),
                name: "张老师".to_string(),
                department_id: "D001".to_string(),
                max_workload: 16,
                availability: vec![],
                qualifications: vec![CourseQualification {
                    course_id: "C001".to_string(),
                    is_preferred: true,
                }],
            }],
            courses: vec![Course {
                id: "C001".to_string(),
                name: "数据结构".to_string(),
                code: "CS201".to_string(),
                credits: 4,
                course_type: CourseType::Theory,
                hours_per_week: 4,
                department_id: "D001".to_string(),
                prerequisites: BTreeSet::new(),
            }],
            rooms: vec![Room {
                id: "R001".to_string(),
                number: "101".to_string(),
                building: "主楼".to_string(),
                capacity: 60,
                room_type: RoomType::Classroom,
                equipment: BTreeSet::new(),
            }],
            batches: vec![Batch {
                id: "B001".to_string(),
                program_id: "P001".to_string(),
                name: "2023级1班".to_string(),
                year: 2023,
                section: "A".to_string(),
                students_count: 40,
            }],
            workload_assignments: vec![],
        }
    }

    fn session_for(course: &str, batch: &str, hours: u8) -> Session {
        Session {
            id: format!("{}#{}#0", course, batch),
            course_id: course.to_string(),
            batch_id: batch.to_string(),
            block_hours: hours,
            block_index: 0,
            total_hours: hours,
            pinned_teacher_id: None,
        }
    }

    fn candidate(start_slot: usize) -> Candidate {
        Candidate {
            teacher_id: "T001".to_string(),
            room_id: "R001".to_string(),
            day_idx: 0,
            start_slot,
        }
    }

    struct Fixture {
        snapshot: ScheduleSnapshot,
        grid: SlotGrid,
        constraints: ScheduleConstraints,
        preferences: SchedulePreferences,
        tuning: SolverTuning,
    }

    impl Fixture {
        fn new(snapshot: ScheduleSnapshot) -> Self {
            Self {
                snapshot,
                grid: SlotGrid::default(),
                constraints: ScheduleConstraints::default(),
                preferences: SchedulePreferences::default(),
                tuning: SolverTuning::default(),
            }
        }

        fn check(
            &self,
            session: &Session,
            cand: &Candidate,
            avail: &AvailabilityIndex,
            tracker: &WorkloadTracker,
        ) -> Vec<HardViolation> {
            let index = self.snapshot.index();
            let evaluator = ConstraintEvaluator {
                index: &index,
                grid: &self.grid,
                constraints: &self.constraints,
                preferences: &self.preferences,
                tuning: &self.tuning,
            };
            evaluator.check_hard(session, cand, avail, tracker)
        }

        fn score(
            &self,
            session: &Session,
            cand: &Candidate,
            avail: &AvailabilityIndex,
            tracker: &WorkloadTracker,
        ) -> f64 {
            let index = self.snapshot.index();
            let evaluator = ConstraintEvaluator {
                index: &index,
                grid: &self.grid,
                constraints: &self.constraints,
                preferences: &self.preferences,
                tuning: &self.tuning,
            };
            evaluator.score_soft(session, cand, avail, tracker)
        }

        fn fresh_state(&self) -> (AvailabilityIndex, WorkloadTracker) {
            let avail = AvailabilityIndex::build(&self.snapshot, &self.grid);
            let tracker = WorkloadTracker::build(&self.snapshot, self.grid.days.len());
            (avail, tracker)
        }
    }

    #[test]
    fn test_clean_candidate_passes() {
        let fx = Fixture::new(base_snapshot());
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C001", "B001", 2);
        assert!(fx.check(&session, &candidate(0), &avail, &tracker).is_empty());
    }

    #[test]
    fn test_capacity_violation_detected() {
        let mut snap = base_snapshot();
        snap.batches[0].students_count = 100;
        let fx = Fixture::new(snap);
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C001", "B001", 2);
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::RoomCapacityExceeded));
    }

    #[test]
    fn test_lab_course_requires_lab_room() {
        let mut snap = base_snapshot();
        snap.courses[0].course_type = CourseType::Lab;
        let fx = Fixture::new(snap);
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C001", "B001", 2);
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::RoomTypeMismatch));
    }

    #[test]
    fn test_listed_qualifications_are_binding() {
        let mut snap = base_snapshot();
        snap.teachers[0].qualifications = vec![CourseQualification {
            course_id: "C001".to_string(),
            is_preferred: false,
        }];
        snap.courses.push(Course {
            id: "C002".to_string(),
            name: "操作系统".to_string(),
            code: "CS301".to_string(),
            credits: 3,
            course_type: CourseType::Theory,
            hours_per_week: 3,
            department_id: "D001".to_string(),
            prerequisites: BTreeSet::new(),
        });
        let fx = Fixture::new(snap);
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C002", "B001", 1);
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::NotQualified));
    }

    #[test]
    fn test_empty_qualification_list_open_world_vs_strict() {
        let mut snap = base_snapshot();
        snap.teachers[0].qualifications = vec![];
        let mut fx = Fixture::new(snap);
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C001", "B001", 2);

        // 开放默认: 允许
        assert!(fx.check(&session, &candidate(0), &avail, &tracker).is_empty());
        // 但要付出未列资格罚分
        assert!(fx.score(&session, &candidate(0), &avail, &tracker) > 0.0);

        // 严格模式: 拒绝
        fx.tuning.qualification_policy = QualificationPolicy::Strict;
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::NotQualified));
    }

    #[test]
    fn test_weekly_workload_cap() {
        let mut snap = base_snapshot();
        snap.teachers[0].max_workload = 3;
        let fx = Fixture::new(snap);
        let (avail, mut tracker) = fx.fresh_state();
        tracker.add("T001", 1, 2);
        let session = session_for("C001", "B001", 2);
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::WeeklyWorkloadExceeded));
    }

    #[test]
    fn test_daily_hours_cap() {
        let mut fx = Fixture::new(base_snapshot());
        fx.constraints.teacher_constraints.max_daily_hours = 3;
        let (avail, mut tracker) = fx.fresh_state();
        tracker.add("T001", 0, 2);
        let session = session_for("C001", "B001", 2);
        let violations = fx.check(&session, &candidate(4), &avail, &tracker);
        assert!(violations.contains(&HardViolation::DailyHoursExceeded));
    }

    #[test]
    fn test_continuous_run_and_break() {
        let mut fx = Fixture::new(base_snapshot());
        fx.constraints.max_continuous_hours = 2;
        fx.constraints.break_duration = 60;
        let (mut avail, tracker) = fx.fresh_state();
        // 教师已占用时段 0-1 (9:00-11:00)
        avail.occupy("T001", "R001", "B001", 0, 0, 2);

        // 紧邻续排 11:00 会形成3小时连续段
        let session = session_for("C001", "B001", 1);
        let violations = fx.check(&session, &candidate(2), &avail, &tracker);
        assert!(violations.contains(&HardViolation::ContinuousRunExceeded));

        // 跨午休的 13:00 时段是自然断点, 允许
        let violations = fx.check(&session, &candidate(3), &avail, &tracker);
        assert!(!violations.contains(&HardViolation::ContinuousRunExceeded));
        assert!(!violations.contains(&HardViolation::BreakRequired));
    }

    #[test]
    fn test_break_required_two_slots() {
        let mut fx = Fixture::new(base_snapshot());
        fx.constraints.max_continuous_hours = 2;
        fx.constraints.break_duration = 120; // 2 个时段间歇
        let (mut avail, tracker) = fx.fresh_state();
        // 班级已占用 13:00-15:00 (索引 3,4)
        avail.occupy("T002", "R002", "B001", 0, 3, 2);

        // 15:00 (索引5) 紧邻占用段, 并入后连续段超限
        let session = session_for("C001", "B001", 1);
        let violations = fx.check(&session, &candidate(5), &avail, &tracker);
        assert!(violations.contains(&HardViolation::ContinuousRunExceeded));

        // 16:00 (索引6) 距占用段仅 1 个空时段, 不足 2 个间歇时段
        let violations = fx.check(&session, &candidate(6), &avail, &tracker);
        assert!(violations.contains(&HardViolation::BreakRequired));
    }

    #[test]
    fn test_pinned_teacher_enforced() {
        let fx = Fixture::new(base_snapshot());
        let (avail, tracker) = fx.fresh_state();
        let mut session = session_for("C001", "B001", 2);
        session.pinned_teacher_id = Some("T999".to_string());
        let violations = fx.check(&session, &candidate(0), &avail, &tracker);
        assert!(violations.contains(&HardViolation::PinnedTeacherMismatch));
    }

    #[test]
    fn test_morning_preference_orders_slots() {
        let mut fx = Fixture::new(base_snapshot());
        fx.preferences.prefer_morning_slots = true;
        let (avail, tracker) = fx.fresh_state();
        let session = session_for("C001", "B001", 1);
        let early = fx.score(&session, &candidate(0), &avail, &tracker);
        let late = fx.score(&session, &candidate(5), &avail, &tracker);
        assert!(early < late);
    }

    #[test]
    fn test_gap_penalty_counts_new_gaps() {
        let mut fx = Fixture::new(base_snapshot());
        fx.preferences.minimize_gap_hours = true;
        let (mut avail, tracker) = fx.fresh_state();
        // 班级已占用时段 0
        avail.occupy("T002", "R002", "B001", 0, 0, 1);

        let session = session_for("C001", "B001", 1);
        // 紧邻时段 1: 无新空档
        let adjacent = fx.score(&session, &candidate(1), &avail, &tracker);
        // 时段 4: 引入 3 个空档
        let distant = fx.score(&session, &candidate(4), &avail, &tracker);
        assert!(adjacent < distant);
    }

    #[test]
    fn test_gap_slots_helper() {
        assert_eq!(gap_slots(0), 0);
        assert_eq!(gap_slots(0b1), 0);
        assert_eq!(gap_slots(0b101), 1);
        assert_eq!(gap_slots(0b10001), 3);
    }
}
