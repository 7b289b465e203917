// ==========================================
// API 层集成测试
// ==========================================
// 职责: generate/progress/result/cancel/resolve_conflict 全流程
// ==========================================


use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;
use timetable_engine::api::{
    ApiError, ConflictResolution, GenerateScheduleRequest, InMemorySnapshotProvider,
    SchedulerService,
};
use timetable_engine::config::{SchedulePreferences, SolverTuning};
use timetable_engine::domain::types::{ConflictType, CourseType, RoomType, ScheduleStatus};
use timetable_engine::domain::{Schedule, ScheduleSnapshot};

// ==========================================
// 测试辅助
// ==========================================

fn service_with(snapshot: ScheduleSnapshot) -> SchedulerService<InMemorySnapshotProvider> {
    let provider = Arc::new(InMemorySnapshotProvider::new());
    provider.insert(snapshot);
    SchedulerService::new(provider, SolverTuning::default())
}

fn request() -> GenerateScheduleRequest {
    GenerateScheduleRequest {
        department_id: "D001".to_string(),
        academic_year: "2025-2026".to_string(),
        semester: "2".to_string(),
        constraints: default_constraints(),
        preferences: Some(SchedulePreferences::default()),
    }
}

/// 轮询直到运行进入终态 (上限 10 秒)
async fn wait_for_terminal(
    service: &SchedulerService<InMemorySnapshotProvider>,
    run_id: &str,
) -> Schedule {
    for _ in 0..200 {
        let progress = service.progress(run_id).expect("进度查询应当成功");
        if progress.status.is_terminal() {
            return service.result(run_id).expect("终态后结果应当可用");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("运行 {} 未在限时内进入终态", run_id);
}

fn small_snapshot() -> ScheduleSnapshot {
    let mut snap = snapshot_base();
    let mut teacher = make_teacher("T001", "张老师", 16);
    qualify(&mut teacher, "C001", true);
    qualify(&mut teacher, "C002", true);
    snap.teachers = vec![teacher];
    snap.courses = vec![
        make_course("C001", "CS201", 3, CourseType::Theory),
        make_course("C002", "CS202", 2, CourseType::Theory),
    ];
    snap.batches = vec![make_batch("B001", 20)];
    snap.rooms = vec![make_room("R001", "101", 30, RoomType::Classroom)];
    snap
}

// ==========================================
// 完整生成流程
// ==========================================

#[tokio::test]
async fn test_generate_flow_end_to_end() {
    let service = service_with(small_snapshot());
    let accepted = service.generate(request()).await.expect("生成应当受理");
    assert_eq!(accepted.status, ScheduleStatus::Generating);
    assert!(accepted.estimated_time >= 1);

    let schedule = wait_for_terminal(&service, &accepted.run_id).await;
    assert_eq!(schedule.status, ScheduleStatus::Generated);
    assert_eq!(schedule.id, accepted.run_id);
    assert!(schedule.conflicts.is_empty());

    // 5 学时 = 3 个条目 (2+1 与 2)
    let hours: i64 = schedule
        .entries
        .iter()
        .map(|e| (e.end_time - e.start_time).num_hours())
        .sum();
    assert_eq!(hours, 5);

    // 终态进度
    let progress = service.progress(&accepted.run_id).unwrap();
    assert_eq!(progress.progress, 1.0);
    assert_eq!(progress.current_step, "completed");
    assert_eq!(progress.entries_generated as usize, schedule.entries.len());
}

#[tokio::test]
async fn test_generate_deterministic_across_runs() {
    let service = service_with(small_snapshot());

    let a = service.generate(request()).await.unwrap();
    let first = wait_for_terminal(&service, &a.run_id).await;
    let b = service.generate(request()).await.unwrap();
    let second = wait_for_terminal(&service, &b.run_id).await;

    // 课表 ID 与时间戳不同, 条目/冲突/统计必须一致
    assert_eq!(first.entries, second.entries);
    assert_eq!(first.conflicts, second.conflicts);
    assert_eq!(first.statistics, second.statistics);
}

#[tokio::test]
async fn test_validation_failure_blocks_generation() {
    let mut snap = small_snapshot();
    // 教师可用窗口重叠: 校验必须拒绝
    snap.teachers[0].availability = vec![window(0, 9, 12, true), window(0, 11, 14, true)];
    let service = service_with(snap);

    let err = service.generate(request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_unknown_run_id_rejected() {
    let service = service_with(small_snapshot());
    assert!(matches!(
        service.progress("no-such-run"),
        Err(ApiError::RunNotFound(_))
    ));
    assert!(matches!(
        service.result("no-such-run"),
        Err(ApiError::RunNotFound(_))
    ));
    assert!(matches!(
        service.cancel("no-such-run"),
        Err(ApiError::RunNotFound(_))
    ));
}

#[tokio::test]
async fn test_result_before_terminal_rejected() {
    // 大实例: 搜索耗时足够长, 受理后立即查询必然未结束
    let service = service_with(bulk_snapshot());
    let accepted = service.generate(request()).await.unwrap();

    match service.result(&accepted.run_id) {
        Err(ApiError::RunNotFinished(_)) | Ok(_) => {}
        other => panic!("意外结果: {:?}", other.map(|s| s.id)),
    }
    // 清理: 取消避免后台任务拖长测试
    service.cancel(&accepted.run_id).unwrap();
}

// ==========================================
// 取消
// ==========================================

/// 大实例: 20 课程 × 5 班级, 用于取消窗口
fn bulk_snapshot() -> ScheduleSnapshot {
    let mut snap = snapshot_base();
    let mut teachers = Vec::new();
    let mut courses = Vec::new();
    for i in 0..20 {
        let course_id = format!("C{:03}", i + 1);
        courses.push(make_course(
            &course_id,
            &format!("CS{:03}", i + 100),
            3,
            CourseType::Theory,
        ));
        let mut teacher = make_teacher(&format!("T{:03}", i + 1), "老师", 18);
        qualify(&mut teacher, &course_id, true);
        // 每位教师兼任相邻课程
        let next_course = format!("C{:03}", (i + 1) % 20 + 1);
        qualify(&mut teacher, &next_course, false);
        teachers.push(teacher);
    }
    snap.teachers = teachers;
    snap.courses = courses;
    snap.batches = (0..5).map(|i| make_batch(&format!("B{:03}", i + 1), 30)).collect();
    snap.rooms = (0..8)
        .map(|i| make_room(&format!("R{:03}", i + 1), &format!("{}01", i + 1), 60, RoomType::Classroom))
        .collect();
    snap
}

#[tokio::test]
async fn test_cancel_yields_failed_with_partial_schedule() {
    let service = service_with(bulk_snapshot());
    let accepted = service.generate(request()).await.unwrap();

    // 受理后立即取消, 求解器在下一个提交边界响应
    service.cancel(&accepted.run_id).unwrap();
    let schedule = wait_for_terminal(&service, &accepted.run_id).await;

    assert_eq!(schedule.status, ScheduleStatus::Failed);
    let progress = service.progress(&accepted.run_id).unwrap();
    assert_eq!(progress.current_step, "cancelled");
    // 取消幂等
    service.cancel(&accepted.run_id).unwrap();
}

// ==========================================
// 冲突修复
// ==========================================

/// 容量冲突快照: 班级 50 人, 唯一教室仅容 30 人
fn capacity_conflict_snapshot() -> ScheduleSnapshot {
    let mut snap = snapshot_base();
    let mut teacher = make_teacher("T001", "张老师", 16);
    qualify(&mut teacher, "C001", true);
    snap.teachers = vec![teacher];
    snap.courses = vec![make_course("C001", "CS201", 2, CourseType::Theory)];
    snap.batches = vec![make_batch("B001", 50)];
    snap.rooms = vec![make_room("R001", "101", 30, RoomType::Classroom)];
    snap
}

#[tokio::test]
async fn test_resolve_conflict_reassign_after_data_change() {
    // 修复前外部 CRUD 层补充了更大的教室, 修复时重新加载快照
    let provider = Arc::new(InMemorySnapshotProvider::new());
    provider.insert(capacity_conflict_snapshot());
    let service = SchedulerService::new(provider.clone(), SolverTuning::default());

    let accepted = service.generate(request()).await.unwrap();
    let schedule = wait_for_terminal(&service, &accepted.run_id).await;
    assert_eq!(schedule.status, ScheduleStatus::Generated);
    assert_eq!(schedule.conflicts.len(), 1);
    assert_eq!(
        schedule.conflicts[0].conflict_type,
        ConflictType::CapacityViolation
    );
    assert!(schedule.entries.is_empty());

    // 外部层新增大教室后再发起定向修复
    let mut updated_snap = capacity_conflict_snapshot();
    updated_snap
        .rooms
        .push(make_room("R002", "102", 80, RoomType::Classroom));
    provider.insert(updated_snap);

    let updated = service
        .resolve_conflict(
            &accepted.run_id,
            &schedule.conflicts[0].id,
            &ConflictResolution::Reassign,
        )
        .await
        .expect("数据补全后修复应当成功");

    assert!(updated.conflicts.is_empty());
    assert_eq!(updated.entries.len(), 1);
    assert_eq!(updated.entries[0].room_id, "R002");
    // 修复后的结果持久在运行句柄上
    let again = service.result(&accepted.run_id).unwrap();
    assert_eq!(again.entries, updated.entries);
}

/// 预指派教师工作量不足: 3 学时只能提交 2 学时
fn pinned_overload_snapshot() -> ScheduleSnapshot {
    let mut snap = snapshot_base();
    let mut t1 = make_teacher("T001", "张老师", 2);
    qualify(&mut t1, "C001", true);
    let mut t2 = make_teacher("T002", "李老师", 16);
    qualify(&mut t2, "C001", true);
    snap.teachers = vec![t1, t2];
    snap.courses = vec![make_course("C001", "CS201", 3, CourseType::Theory)];
    snap.batches = vec![make_batch("B001", 20)];
    snap.rooms = vec![make_room("R001", "101", 30, RoomType::Classroom)];
    // 已确认预指派钉死 T001, 但 T001 周上限仅 2 小时
    snap.workload_assignments = vec![make_assignment("WA001", "T001", "C001", "B001", 3, true)];
    snap
}

#[tokio::test]
async fn test_resolve_conflict_change_teacher_overrides_pin() {
    let service = service_with(pinned_overload_snapshot());
    let accepted = service.generate(request()).await.unwrap();
    let schedule = wait_for_terminal(&service, &accepted.run_id).await;

    // 钉死教师超工作量: 必然产生冲突
    assert_eq!(schedule.conflicts.len(), 1);
    assert_eq!(
        schedule.conflicts[0].conflict_type,
        ConflictType::WorkloadExceeded
    );

    let updated = service
        .resolve_conflict(
            &accepted.run_id,
            &schedule.conflicts[0].id,
            &ConflictResolution::ChangeTeacher {
                teacher_id: "T002".to_string(),
            },
        )
        .await
        .expect("改派教师后修复应当成功");

    assert!(updated.conflicts.is_empty());
    // 全部 3 学时改由 T002 承担
    let hours: i64 = updated
        .entries
        .iter()
        .map(|e| (e.end_time - e.start_time).num_hours())
        .sum();
    assert_eq!(hours, 3);
    assert!(updated.entries.iter().all(|e| e.teacher_id == "T002"));
}

#[tokio::test]
async fn test_resolve_conflict_acknowledge() {
    let service = service_with(capacity_conflict_snapshot());
    let accepted = service.generate(request()).await.unwrap();
    let schedule = wait_for_terminal(&service, &accepted.run_id).await;
    let conflict_id = schedule.conflicts[0].id.clone();

    let updated = service
        .resolve_conflict(&accepted.run_id, &conflict_id, &ConflictResolution::Acknowledge)
        .await
        .unwrap();

    // 仅移除冲突, 条目不变
    assert!(updated.conflicts.is_empty());
    assert_eq!(updated.entries, schedule.entries);
    assert!(updated.statistics.conflicts.is_empty());
}

#[tokio::test]
async fn test_resolve_conflict_unknown_id_rejected() {
    let service = service_with(capacity_conflict_snapshot());
    let accepted = service.generate(request()).await.unwrap();
    wait_for_terminal(&service, &accepted.run_id).await;

    let err = service
        .resolve_conflict(&accepted.run_id, "CF-9999", &ConflictResolution::Reassign)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Repair(_)));
}

#[tokio::test]
async fn test_resolve_conflict_infeasible_keeps_original() {
    // 容量冲突且快照未变: 重排必然失败, 原课表保持不变
    let service = service_with(capacity_conflict_snapshot());
    let accepted = service.generate(request()).await.unwrap();
    let schedule = wait_for_terminal(&service, &accepted.run_id).await;

    let err = service
        .resolve_conflict(
            &accepted.run_id,
            &schedule.conflicts[0].id,
            &ConflictResolution::Reassign,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Repair(_)));

    let unchanged = service.result(&accepted.run_id).unwrap();
    assert_eq!(unchanged.conflicts.len(), 1);
}
