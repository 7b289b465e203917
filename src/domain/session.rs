// ==========================================
// 教务排课系统 - 排课会话派生
// ==========================================
// 职责: 每轮排课从 Course/Batch/WorkloadAssignment 快照重新派生会话
// 规则: 周学时按 max_continuous_hours 切分为若干连续时段块
// ==========================================

use crate::domain::snapshot::ScheduleSnapshot;
use serde::{Deserialize, Serialize};

// ==========================================
// Session - 排课会话 (一个连续时段块)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,                        // 会话ID (course#batch#块序号, 派生确定)
    pub course_id: String,                 // 课程ID
    pub batch_id: String,                  // 班级ID
    pub block_hours: u8,                   // 本块连续小时数
    pub block_index: u8,                   // 块序号 (0起)
    pub total_hours: u8,                   // 该 (课程,班级) 的周学时总数
    pub pinned_teacher_id: Option<String>, // 已确认预指派钉死的教师
}

impl Session {
    /// 派生确定的会话ID
    fn make_id(course_id: &str, batch_id: &str, block_index: u8) -> String {
        format!("{}#{}#{}", course_id, batch_id, block_index)
    }
}

/// 将周学时切分为连续时段块
///
/// # 规则
/// - 每块不超过 max_continuous_hours
/// - 先切满块, 余数为尾块
///
/// # 示例
/// - (5, 2) → [2, 2, 1]
/// - (3, 4) → [3]
pub fn split_hours(total_hours: u8, max_continuous_hours: u8) -> Vec<u8> {
    let cap = max_continuous_hours.max(1);
    let mut blocks = Vec::new();
    let mut remaining = total_hours;
    while remaining > 0 {
        let take = remaining.min(cap);
        blocks.push(take);
        remaining -= take;
    }
    blocks
}

/// 从快照派生全部待排会话
///
/// # 规则
/// - 快照含工作量预指派时: 以预指派为准 (学时与钉死教师来自指派)
/// - 否则: 本院系全部课程 × 全部班级, 学时取 Course.hours_per_week
/// - 迭代顺序按 (batch_id, course_id) 升序, 保证派生结果确定
pub fn derive_sessions(snapshot: &ScheduleSnapshot, max_continuous_hours: u8) -> Vec<Session> {
    let mut sessions = Vec::new();

    if !snapshot.workload_assignments.is_empty() {
        let mut assignments: Vec<_> = snapshot.workload_assignments.iter().collect();
        assignments.sort_by(|a, b| {
            (&a.batch_id, &a.course_id, &a.id).cmp(&(&b.batch_id, &b.course_id, &b.id))
        });
        for wa in assignments {
            let pinned = if wa.is_confirmed {
                Some(wa.teacher_id.clone())
            } else {
                None
            };
            for (idx, hours) in split_hours(wa.hours_per_week, max_continuous_hours)
                .into_iter()
                .enumerate()
            {
                sessions.push(Session {
                    id: Session::make_id(&wa.course_id, &wa.batch_id, idx as u8),
                    course_id: wa.course_id.clone(),
                    batch_id: wa.batch_id.clone(),
                    block_hours: hours,
                    block_index: idx as u8,
                    total_hours: wa.hours_per_week,
                    pinned_teacher_id: pinned.clone(),
                });
            }
        }
        return sessions;
    }

    let mut batches: Vec<_> = snapshot.batches.iter().collect();
    batches.sort_by(|a, b| a.id.cmp(&b.id));
    let mut courses: Vec<_> = snapshot
        .courses
        .iter()
        .filter(|c| c.department_id == snapshot.department.id)
        .collect();
    courses.sort_by(|a, b| a.id.cmp(&b.id));

    for batch in &batches {
        for course in &courses {
            for (idx, hours) in split_hours(course.hours_per_week, max_continuous_hours)
                .into_iter()
                .enumerate()
            {
                sessions.push(Session {
                    id: Session::make_id(&course.id, &batch.id, idx as u8),
                    course_id: course.id.clone(),
                    batch_id: batch.id.clone(),
                    block_hours: hours,
                    block_index: idx as u8,
                    total_hours: course.hours_per_week,
                    pinned_teacher_id: None,
                });
            }
        }
    }
    sessions
}
