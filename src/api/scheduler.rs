// ==========================================
// 教务排课系统 - 排课业务接口
// ==========================================
// 职责: generate/progress/result/cancel/resolve_conflict 五个对外操作
// 模式: 发起即返回句柄, 进度轮询, 协作式取消 (fire-and-track)
// 红线: 每轮排课独立状态, 多轮可并行, 轮间无共享可变状态
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::provider::SnapshotProvider;
use crate::config::constraints::{ScheduleConstraints, SchedulePreferences};
use crate::config::tuning::SolverTuning;
use crate::domain::schedule::Schedule;
use crate::domain::session::derive_sessions;
use crate::domain::types::ScheduleStatus;
use crate::engine::progress::{GenerationProgress, ProgressSink, SharedProgress};
use crate::engine::repair::{ConflictRepairer, ConflictResolution};
use crate::engine::report::{ReportScope, ScheduleReportBuilder};
use crate::engine::solver::{CancelToken, Solver};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};
use uuid::Uuid;

// ==========================================
// 对外请求/响应形状
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateScheduleRequest {
    pub department_id: String,                  // 排课范围院系
    pub academic_year: String,                  // 学年
    pub semester: String,                       // 学期
    pub constraints: ScheduleConstraints,       // 硬约束配置
    #[serde(default)]
    pub preferences: Option<SchedulePreferences>, // 软约束偏好 (未设置=全关闭)
}

/// generate 的受理回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateAccepted {
    pub run_id: String,          // 运行句柄 (即课表ID)
    pub status: ScheduleStatus,  // 受理时状态 (generating)
    pub estimated_time: u64,     // 预估耗时 (秒)
}

// ==========================================
// RunEntry - 运行注册表条目
// ==========================================
#[derive(Clone)]
struct RunEntry {
    cancel: CancelToken,
    progress: SharedProgress,
    result: Arc<RwLock<Option<Schedule>>>,
    request: GenerateScheduleRequest,
}

// ==========================================
// SchedulerService - 排课服务
// ==========================================
pub struct SchedulerService<P: SnapshotProvider> {
    provider: Arc<P>,
    tuning: SolverTuning,
    runs: Arc<RwLock<HashMap<String, RunEntry>>>,
}

impl<P: SnapshotProvider + 'static> SchedulerService<P> {
    pub fn new(provider: Arc<P>, tuning: SolverTuning) -> Self {
        Self {
            provider,
            tuning,
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 发起一轮排课生成
    ///
    /// # 流程
    /// 1. 加载并校验实体快照 (失败立即返回, 不启动生成)
    /// 2. 派生会话并预检约束配置
    /// 3. 注册运行句柄, 求解任务投递到阻塞线程池
    /// 4. 立即返回句柄, 调用方轮询 progress/result
    pub async fn generate(&self, request: GenerateScheduleRequest) -> ApiResult<GenerateAccepted> {
        let snapshot = self
            .provider
            .load_snapshot(
                &request.department_id,
                &request.academic_year,
                &request.semester,
            )
            .await
            .map_err(|e| ApiError::SnapshotLoad(e.to_string()))?;
        snapshot.validate()?;

        let sessions = derive_sessions(&snapshot, request.constraints.max_continuous_hours);
        let preferences = request.preferences.unwrap_or_default();
        {
            // 预检: 配置自相矛盾在搜索前拒绝
            let solver = Solver::new(&snapshot, &request.constraints, &preferences, &self.tuning);
            solver.preflight(&sessions)?;
        }

        let run_id = Uuid::new_v4().to_string();
        let entry = RunEntry {
            cancel: CancelToken::new(),
            progress: SharedProgress::new(),
            result: Arc::new(RwLock::new(None)),
            request: GenerateScheduleRequest {
                preferences: Some(preferences),
                ..request.clone()
            },
        };
        entry.progress.publish(&GenerationProgress::starting());
        {
            let mut runs = self
                .runs
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            runs.insert(run_id.clone(), entry.clone());
        }

        let estimated_time = (sessions.len() as u64).div_ceil(10).max(1);
        info!(
            run_id = %run_id,
            department_id = %request.department_id,
            sessions_total = sessions.len(),
            "排课生成已受理"
        );

        let tuning = self.tuning.clone();
        let constraints = request.constraints.clone();
        let scope_meta = (
            request.department_id.clone(),
            request.academic_year.clone(),
            request.semester.clone(),
        );
        let run_id_for_task = run_id.clone();
        tokio::task::spawn_blocking(move || {
            run_generation(
                run_id_for_task,
                snapshot,
                sessions,
                constraints,
                preferences,
                tuning,
                scope_meta,
                entry,
            );
        });

        Ok(GenerateAccepted {
            run_id,
            status: ScheduleStatus::Generating,
            estimated_time,
        })
    }

    /// 查询生成进度
    pub fn progress(&self, run_id: &str) -> ApiResult<GenerationProgress> {
        let entry = self.entry(run_id)?;
        Ok(entry
            .progress
            .snapshot()
            .unwrap_or_else(GenerationProgress::starting))
    }

    /// 获取生成结果 (状态进入 generated/failed 后有效)
    pub fn result(&self, run_id: &str) -> ApiResult<Schedule> {
        let entry = self.entry(run_id)?;
        let guard = entry
            .result
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(schedule) => Ok(schedule.clone()),
            None if entry.cancel.is_cancelled() => {
                Err(ApiError::Cancelled(run_id.to_string()))
            }
            None => Err(ApiError::RunNotFinished(run_id.to_string())),
        }
    }

    /// 请求取消运行 (幂等; 求解器在下一个提交边界响应)
    pub fn cancel(&self, run_id: &str) -> ApiResult<()> {
        let entry = self.entry(run_id)?;
        entry.cancel.cancel();
        info!(run_id, "已请求取消排课运行");
        Ok(())
    }

    /// 针对单个冲突执行定向修复
    ///
    /// 修复成功后更新运行注册表内的课表, 后续 result 返回修复后的版本
    pub async fn resolve_conflict(
        &self,
        schedule_id: &str,
        conflict_id: &str,
        resolution: &ConflictResolution,
    ) -> ApiResult<Schedule> {
        let entry = self.entry(schedule_id)?;
        let schedule = {
            let guard = entry
                .result
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard
                .as_ref()
                .cloned()
                .ok_or_else(|| ApiError::RunNotFinished(schedule_id.to_string()))?
        };

        let snapshot = self
            .provider
            .load_snapshot(
                &entry.request.department_id,
                &entry.request.academic_year,
                &entry.request.semester,
            )
            .await
            .map_err(|e| ApiError::SnapshotLoad(e.to_string()))?;
        snapshot.validate()?;

        let preferences = entry.request.preferences.unwrap_or_default();
        let repairer = ConflictRepairer::new(
            &snapshot,
            &entry.request.constraints,
            &preferences,
            &self.tuning,
        );
        let mut updated = repairer.resolve(&schedule, conflict_id, resolution)?;
        updated.updated_at = Utc::now();

        {
            let mut guard = entry
                .result
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(updated.clone());
        }
        info!(schedule_id, conflict_id, "冲突修复完成");
        Ok(updated)
    }

    fn entry(&self, run_id: &str) -> ApiResult<RunEntry> {
        let runs = self
            .runs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        runs.get(run_id)
            .cloned()
            .ok_or_else(|| ApiError::RunNotFound(run_id.to_string()))
    }
}

// ==========================================
// 生成任务体 (阻塞线程池内执行)
// ==========================================
#[allow(clippy::too_many_arguments)]
fn run_generation(
    run_id: String,
    snapshot: crate::domain::snapshot::ScheduleSnapshot,
    sessions: Vec<crate::domain::session::Session>,
    constraints: ScheduleConstraints,
    preferences: SchedulePreferences,
    tuning: SolverTuning,
    scope_meta: (String, String, String),
    entry: RunEntry,
) {
    let (department_id, academic_year, semester) = scope_meta;
    let solver = Solver::new(&snapshot, &constraints, &preferences, &tuning);
    let outcome = solver.solve(&sessions, &entry.cancel, &entry.progress);

    let status = if outcome.stats.cancelled {
        ScheduleStatus::Failed
    } else {
        ScheduleStatus::Generated
    };
    let now = Utc::now();
    let scope = ReportScope {
        schedule_id: run_id.clone(),
        name: format!("{} 第{}学期 排课方案", academic_year, semester),
        department_id,
        academic_year,
        semester,
        created_at: now,
        updated_at: now,
    };
    let builder = ScheduleReportBuilder::new(&snapshot, &tuning.slot_grid);
    let schedule = builder.build(&scope, status, &outcome);
    let conflicts_found = schedule.conflicts.len() as u32;
    let entries_generated = schedule.entries.len() as u32;

    // 先归档结果再发布终态进度: 轮询方看到终态时结果必须已可用
    {
        let mut guard = entry
            .result
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(schedule);
    }
    entry.progress.publish(&GenerationProgress {
        progress: 1.0,
        status,
        current_step: if outcome.stats.cancelled {
            "cancelled".to_string()
        } else {
            "completed".to_string()
        },
        conflicts_found,
        entries_generated,
    });

    if outcome.stats.cancelled {
        error!(run_id = %run_id, "排课运行已取消, 部分课表已归档至句柄");
    } else {
        info!(run_id = %run_id, "排课运行完成");
    }
}
