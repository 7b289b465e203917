// ==========================================
// 教务排课系统 - 演示入口
// ==========================================
// 用途: 构造示例院系快照, 跑一轮完整排课, 输出课表 JSON
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use timetable_engine::api::{
    GenerateScheduleRequest, InMemorySnapshotProvider, SchedulerService,
};
use timetable_engine::config::{ScheduleConstraints, SchedulePreferences, SolverTuning};
use timetable_engine::domain::{
    AvailabilityWindow, Batch, Course, CourseQualification, Department, Program, Room,
    ScheduleSnapshot, Teacher,
};
use timetable_engine::domain::types::{CourseType, RoomType, ScheduleStatus};
use timetable_engine::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 自动排课引擎", timetable_engine::APP_NAME);
    tracing::info!("系统版本: {}", timetable_engine::VERSION);
    tracing::info!("==================================================");

    let provider = Arc::new(InMemorySnapshotProvider::new());
    provider.insert(demo_snapshot());

    let service = SchedulerService::new(provider, SolverTuning::default());
    let accepted = service
        .generate(GenerateScheduleRequest {
            department_id: "D001".to_string(),
            academic_year: "2025-2026".to_string(),
            semester: "2".to_string(),
            constraints: ScheduleConstraints::default(),
            preferences: Some(SchedulePreferences {
                prefer_morning_slots: true,
                minimize_gap_hours: true,
                ..Default::default()
            }),
        })
        .await?;

    tracing::info!(run_id = %accepted.run_id, "生成已受理, 开始轮询进度");

    // 轮询直至终态
    loop {
        let progress = service.progress(&accepted.run_id)?;
        tracing::info!(
            progress = format!("{:.0}%", progress.progress * 100.0),
            step = %progress.current_step,
            entries = progress.entries_generated,
            conflicts = progress.conflicts_found,
            "进度"
        );
        if progress.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let schedule = service.result(&accepted.run_id)?;
    tracing::info!(
        status = %schedule.status,
        entries = schedule.entries.len(),
        conflicts = schedule.conflicts.len(),
        "排课完成"
    );
    println!("{}", serde_json::to_string_pretty(&schedule)?);

    if schedule.status == ScheduleStatus::Failed {
        anyhow::bail!("排课运行未正常完成");
    }
    Ok(())
}

/// 构造演示用院系快照: 3 位教师 / 4 门课 / 2 个班级 / 3 间教室
fn demo_snapshot() -> ScheduleSnapshot {
    let hm = |h: u32| chrono::NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(chrono::NaiveTime::MIN);

    let qualification = |course_id: &str, preferred: bool| CourseQualification {
        course_id: course_id.to_string(),
        is_preferred: preferred,
    };

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
        teachers: vec![
            Teacher {
                id: "T001".to_string(),
                name: "张老师".to_string(),
                department_id: "D001".to_string(),
                max_workload: 14,
                availability: vec![],
                qualifications: vec![
                    qualification("C001", true),
                    qualification("C002", false),
                ],
            },
            Teacher {
                id: "T002".to_string(),
                name: "李老师".to_string(),
                department_id: "D001".to_string(),
                max_workload: 12,
                // 周一全天不可用
                availability: vec![AvailabilityWindow {
                    day_of_week: 0,
                    start_time: hm(8),
                    end_time: hm(18),
                    is_available: false,
                }],
                qualifications: vec![
                    qualification("C003", true),
                    qualification("C002", true),
                ],
            },
            Teacher {
                id: "T003".to_string(),
                name: "王老师".to_string(),
                department_id: "D001".to_string(),
                max_workload: 10,
                availability: vec![],
                qualifications: vec![qualification("C004", true)],
            },
        ],
        courses: vec![
            Course {
                id: "C001".to_string(),
                name: "数据结构".to_string(),
                code: "CS201".to_string(),
                credits: 4,
                course_type: CourseType::Theory,
                hours_per_week: 4,
                department_id: "D001".to_string(),
                prerequisites: BTreeSet::new(),
            },
            Course {
                id: "C002".to_string(),
                name: "操作系统".to_string(),
                code: "CS301".to_string(),
                credits: 3,
                course_type: CourseType::Theory,
                hours_per_week: 3,
                department_id: "D001".to_string(),
                prerequisites: ["C001".to_string()].into_iter().collect(),
            },
            Course {
                id: "C003".to_string(),
                name: "数据库实验".to_string(),
                code: "CS302L".to_string(),
                credits: 2,
                course_type: CourseType::Lab,
                hours_per_week: 2,
                department_id: "D001".to_string(),
                prerequisites: BTreeSet::new(),
            },
            Course {
                id: "C004".to_string(),
                name: "算法设计辅导".to_string(),
                code: "CS303T".to_string(),
                credits: 1,
                course_type: CourseType::Tutorial,
                hours_per_week: 2,
                department_id: "D001".to_string(),
                prerequisites: BTreeSet::new(),
            },
        ],
        rooms: vec![
            Room {
                id: "R101".to_string(),
                number: "101".to_string(),
                building: "教学主楼".to_string(),
                capacity: 60,
                room_type: RoomType::Classroom,
                equipment: ["projector".to_string()].into_iter().collect(),
            },
            Room {
                id: "R201".to_string(),
                number: "201".to_string(),
                building: "实验楼".to_string(),
                capacity: 48,
                room_type: RoomType::Lab,
                equipment: ["workstation".to_string()].into_iter().collect(),
            },
            Room {
                id: "R301".to_string(),
                number: "301".to_string(),
                building: "教学主楼".to_string(),
                capacity: 120,
                room_type: RoomType::LectureHall,
                equipment: BTreeSet::new(),
            },
        ],
        batches: vec![
            Batch {
                id: "B001".to_string(),
                program_id: "P001".to_string(),
                name: "2023级软工1班".to_string(),
                year: 2023,
                section: "A".to_string(),
                students_count: 38,
            },
            Batch {
                id: "B002".to_string(),
                program_id: "P001".to_string(),
                name: "2023级软工2班".to_string(),
                year: 2023,
                section: "B".to_string(),
                students_count: 42,
            },
        ],
        workload_assignments: vec![],
    }
}
