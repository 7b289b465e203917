// ==========================================
// 教务排课系统 - API层错误类型
// ==========================================
// 职责: 定义业务接口错误, 转换领域/引擎错误为用户可见的错误消息
// 红线: 所有错误信息必须包含显式原因 (可解释性)
// ==========================================

use crate::domain::error::ValidationError;
use crate::engine::repair::RepairError;
use crate::engine::solver::InfeasibleConstraint;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与配置错误
    // ==========================================
    /// 快照校验失败, 排课未启动
    #[error("数据验证失败: {0}")]
    Validation(#[from] ValidationError),

    /// 约束配置自相矛盾, 预检拒绝
    #[error("约束预检失败: {0}")]
    Infeasible(#[from] InfeasibleConstraint),

    /// 外部数据快照加载失败
    #[error("快照加载失败: {0}")]
    SnapshotLoad(String),

    // ==========================================
    // 运行句柄错误
    // ==========================================
    #[error("排课运行不存在: run_id={0}")]
    RunNotFound(String),

    #[error("排课尚未结束: run_id={0}")]
    RunNotFinished(String),

    /// 运行被取消且无部分结果可供查询
    #[error("排课已取消: run_id={0}")]
    Cancelled(String),

    // ==========================================
    // 修复错误
    // ==========================================
    #[error("冲突修复失败: {0}")]
    Repair(#[from] RepairError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_conversion() {
        let err = ValidationError::DuplicateId {
            entity: "Course",
            id: "C001".to_string(),
        };
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::Validation(_)));
        assert!(api_err.to_string().contains("C001"));
    }

    #[test]
    fn test_infeasible_error_conversion() {
        let err = InfeasibleConstraint {
            constraint: "max_continuous_hours",
            detail: "连续授课上限不得为0".to_string(),
        };
        let api_err: ApiError = err.into();
        assert!(api_err.to_string().contains("max_continuous_hours"));
    }

    #[test]
    fn test_repair_error_conversion() {
        let err = RepairError::ConflictNotFound("CF-0001".to_string());
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::Repair(_)));
        assert!(api_err.to_string().contains("CF-0001"));
    }
}
