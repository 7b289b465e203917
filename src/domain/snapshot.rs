// ==========================================
// 教务排课系统 - 输入快照与校验
// ==========================================
// 红线: 快照校验失败时排课不得启动
// 红线: 快照在整轮排课期间只读, 外部数据变更需另起新轮
// ==========================================

use crate::domain::course::{Course, WorkloadAssignment};
use crate::domain::entity::{Batch, Department, Program, Room};
use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::teacher::Teacher;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ==========================================
// ScheduleSnapshot - 单轮排课输入快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub department: Department,                        // 排课范围院系
    pub programs: Vec<Program>,                        // 专业列表
    pub teachers: Vec<Teacher>,                        // 教师列表 (可含外院系教师)
    pub courses: Vec<Course>,                          // 课程列表
    pub rooms: Vec<Room>,                              // 教室列表
    pub batches: Vec<Batch>,                           // 班级列表
    pub workload_assignments: Vec<WorkloadAssignment>, // 工作量预指派 (可为空)
}

impl ScheduleSnapshot {
    /// 全量校验快照
    ///
    /// # 检查项
    /// 1. 各实体字段范围
    /// 2. ID 唯一性与编码唯一性
    /// 3. 引用完整性 (班级→专业, 资格→课程, 先修→课程, 预指派→三方)
    /// 4. 先修课程图无环
    /// 5. 已确认预指派的教师资格
    pub fn validate(&self) -> ValidationResult<()> {
        self.check_field_ranges()?;
        self.check_uniqueness()?;
        self.check_references()?;
        self.check_prerequisite_cycles()?;
        self.check_confirmed_assignments()?;
        Ok(())
    }

    fn check_field_ranges(&self) -> ValidationResult<()> {
        for t in &self.teachers {
            t.validate()?;
        }
        for c in &self.courses {
            c.validate()?;
        }
        for r in &self.rooms {
            r.validate()?;
        }
        for b in &self.batches {
            b.validate()?;
        }
        for wa in &self.workload_assignments {
            wa.validate()?;
        }
        Ok(())
    }

    fn check_uniqueness(&self) -> ValidationResult<()> {
        fn unique<'a, I>(entity: &'static str, ids: I) -> ValidationResult<()>
        where
            I: Iterator<Item = &'a String>,
        {
            let mut seen = HashSet::new();
            for id in ids {
                if !seen.insert(id.as_str()) {
                    return Err(ValidationError::DuplicateId {
                        entity,
                        id: id.clone(),
                    });
                }
            }
            Ok(())
        }

        unique("Program", self.programs.iter().map(|p| &p.id))?;
        unique("Teacher", self.teachers.iter().map(|t| &t.id))?;
        unique("Course", self.courses.iter().map(|c| &c.id))?;
        unique("Room", self.rooms.iter().map(|r| &r.id))?;
        unique("Batch", self.batches.iter().map(|b| &b.id))?;
        unique(
            "WorkloadAssignment",
            self.workload_assignments.iter().map(|w| &w.id),
        )?;

        let mut codes = HashSet::new();
        for c in &self.courses {
            if !codes.insert(c.code.as_str()) {
                return Err(ValidationError::DuplicateCode {
                    entity: "Course",
                    code: c.code.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_references(&self) -> ValidationResult<()> {
        let program_ids: HashSet<&str> = self.programs.iter().map(|p| p.id.as_str()).collect();
        let course_ids: HashSet<&str> = self.courses.iter().map(|c| c.id.as_str()).collect();
        let teacher_ids: HashSet<&str> = self.teachers.iter().map(|t| t.id.as_str()).collect();
        let batch_ids: HashSet<&str> = self.batches.iter().map(|b| b.id.as_str()).collect();

        for b in &self.batches {
            if !program_ids.contains(b.program_id.as_str()) {
                return Err(ValidationError::DanglingReference {
                    entity: "Batch",
                    id: b.id.clone(),
                    target: "Program",
                    target_id: b.program_id.clone(),
                });
            }
        }
        for t in &self.teachers {
            for q in &t.qualifications {
                if !course_ids.contains(q.course_id.as_str()) {
                    return Err(ValidationError::DanglingReference {
                        entity: "Teacher",
                        id: t.id.clone(),
                        target: "Course",
                        target_id: q.course_id.clone(),
                    });
                }
            }
        }
        for c in &self.courses {
            for p in &c.prerequisites {
                if !course_ids.contains(p.as_str()) {
                    return Err(ValidationError::DanglingReference {
                        entity: "Course",
                        id: c.id.clone(),
                        target: "Course",
                        target_id: p.clone(),
                    });
                }
            }
        }
        for wa in &self.workload_assignments {
            if !teacher_ids.contains(wa.teacher_id.as_str()) {
                return Err(ValidationError::DanglingReference {
                    entity: "WorkloadAssignment",
                    id: wa.id.clone(),
                    target: "Teacher",
                    target_id: wa.teacher_id.clone(),
                });
            }
            if !course_ids.contains(wa.course_id.as_str()) {
                return Err(ValidationError::DanglingReference {
                    entity: "WorkloadAssignment",
                    id: wa.id.clone(),
                    target: "Course",
                    target_id: wa.course_id.clone(),
                });
            }
            if !batch_ids.contains(wa.batch_id.as_str()) {
                return Err(ValidationError::DanglingReference {
                    entity: "WorkloadAssignment",
                    id: wa.id.clone(),
                    target: "Batch",
                    target_id: wa.batch_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// 先修课程图环检测 (三色标记深度优先)
    fn check_prerequisite_cycles(&self) -> ValidationResult<()> {
        let by_id: BTreeMap<&str, &Course> =
            self.courses.iter().map(|c| (c.id.as_str(), c)).collect();

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }
        let mut marks: BTreeMap<&str, Mark> =
            by_id.keys().map(|&id| (id, Mark::White)).collect();

        // 显式栈, 避免递归深度受课程链长度影响
        fn children_of(course: &Course) -> Vec<&str> {
            course.prerequisites.iter().map(|s| s.as_str()).collect()
        }
        for &start in by_id.keys() {
            if marks[start] != Mark::White {
                continue;
            }
            let mut stack: Vec<(&str, Vec<&str>)> = vec![(start, children_of(by_id[start]))];
            marks.insert(start, Mark::Gray);

            loop {
                let next = match stack.last_mut() {
                    Some(top) => top.1.pop(),
                    None => break,
                };
                match next {
                    Some(next) => match marks[next] {
                        Mark::Gray => {
                            return Err(ValidationError::PrerequisiteCycle {
                                course_id: next.to_string(),
                            });
                        }
                        Mark::White => {
                            marks.insert(next, Mark::Gray);
                            stack.push((next, children_of(by_id[next])));
                        }
                        Mark::Black => {}
                    },
                    None => {
                        if let Some((node, _)) = stack.pop() {
                            marks.insert(node, Mark::Black);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// 已确认预指派的资格检查
    ///
    /// 规则: 教师列出了资格清单却不含该课程 → 拒绝
    /// (资格清单为空的教师交由资格策略在求解期裁决)
    fn check_confirmed_assignments(&self) -> ValidationResult<()> {
        let by_id: BTreeMap<&str, &Teacher> =
            self.teachers.iter().map(|t| (t.id.as_str(), t)).collect();
        for wa in &self.workload_assignments {
            if !wa.is_confirmed {
                continue;
            }
            if let Some(teacher) = by_id.get(wa.teacher_id.as_str()) {
                if teacher.has_listed_qualifications()
                    && teacher.qualification_for(&wa.course_id).is_none()
                {
                    return Err(ValidationError::UnqualifiedAssignment {
                        teacher_id: wa.teacher_id.clone(),
                        course_id: wa.course_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 构建按 ID 排序的快照索引
    pub fn index(&self) -> SnapshotIndex<'_> {
        SnapshotIndex {
            teachers: self.teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            rooms: self.rooms.iter().map(|r| (r.id.as_str(), r)).collect(),
            batches: self.batches.iter().map(|b| (b.id.as_str(), b)).collect(),
            courses: self.courses.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }
}

// ==========================================
// SnapshotIndex - 只读查询索引
// ==========================================
// 用途: 引擎内按 ID 查询; BTreeMap 保证迭代顺序确定
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    pub teachers: BTreeMap<&'a str, &'a Teacher>,
    pub rooms: BTreeMap<&'a str, &'a Room>,
    pub batches: BTreeMap<&'a str, &'a Batch>,
    pub courses: BTreeMap<&'a str, &'a Course>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CourseType, RoomType};
    use std::collections::BTreeSet;

    fn minimal_snapshot() -> ScheduleSnapshot {
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
            teachers: vec![],
            courses: vec![],
            rooms: vec![],
            batches: vec![],
            workload_assignments: vec![],
        }
    }

    fn course(id: &str, code: &str, prereqs: &[&str]) -> Course {
        Course {
            id: id.to_string(),
            name: format!("课程{}", id),
            code: code.to_string(),
            credits: 3,
            course_type: CourseType::Theory,
            hours_per_week: 3,
            department_id: "D001".to_string(),
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_empty_snapshot_valid() {
        assert!(minimal_snapshot().validate().is_ok());
    }

    #[test]
    fn test_prerequisite_cycle_detected() {
        let mut snap = minimal_snapshot();
        snap.courses = vec![
            course("C001", "CS101", &["C002"]),
            course("C002", "CS102", &["C003"]),
            course("C003", "CS103", &["C001"]),
        ];
        assert!(matches!(
            snap.validate(),
            Err(ValidationError::PrerequisiteCycle { .. })
        ));
    }

    #[test]
    fn test_prerequisite_chain_ok() {
        let mut snap = minimal_snapshot();
        snap.courses = vec![
            course("C001", "CS101", &[]),
            course("C002", "CS102", &["C001"]),
            course("C003", "CS103", &["C001", "C002"]),
        ];
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn test_duplicate_course_code_rejected() {
        let mut snap = minimal_snapshot();
        snap.courses = vec![course("C001", "CS101", &[]), course("C002", "CS101", &[])];
        assert!(matches!(
            snap.validate(),
            Err(ValidationError::DuplicateCode { .. })
        ));
    }

    #[test]
    fn test_dangling_batch_program_rejected() {
        let mut snap = minimal_snapshot();
        snap.batches = vec![Batch {
            id: "B001".to_string(),
            program_id: "P999".to_string(),
            name: "2023级1班".to_string(),
            year: 2023,
            section: "A".to_string(),
            students_count: 30,
        }];
        assert!(matches!(
            snap.validate(),
            Err(ValidationError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_dangling_prerequisite_rejected() {
        let mut snap = minimal_snapshot();
        snap.courses = vec![course("C001", "CS101", &["C999"])];
        assert!(matches!(
            snap.validate(),
            Err(ValidationError::DanglingReference { .. })
        ));
    }
}
