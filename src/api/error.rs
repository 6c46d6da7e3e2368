// ==========================================
// 成绩聚合与评议引擎 - API层错误类型
// ==========================================
// 职责: 将仓储/引擎层错误转换为用户友好的错误消息
// 红线: 所有错误信息必须包含显式原因（可解释性）
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("并发修改冲突: {0}")]
    ConcurrentModification(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将仓储层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                entry_id,
                expected,
                actual,
            } => ApiError::ConcurrentModification(format!(
                "账本行{}已被其他用户修改（期望version={}，实际version={}）",
                entry_id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidRange { mark, max } => ApiError::InvalidInput(format!(
                "分数越界: mark={}, 允许范围 [0, {}]",
                mark, max
            )),
            EngineError::InvalidStatusTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            EngineError::UnknownStudent(id) => {
                ApiError::NotFound(format!("学生(id={})不存在", id))
            }
            EngineError::UnknownComponent(id) => {
                ApiError::NotFound(format!("评估组成(id={})不存在", id))
            }
            EngineError::UnknownUnit(code) => {
                ApiError::NotFound(format!("教学单元(code={})不存在", code))
            }
            EngineError::InvalidComponentWeights { unit_code, sum } => {
                ApiError::BusinessRuleViolation(format!(
                    "教学单元{}的组成权重合计为{}，要求 100 ± 0.01",
                    unit_code, sum
                ))
            }
            EngineError::NoTeachingUnitsForLevel { level, year } => {
                ApiError::BusinessRuleViolation(format!(
                    "层级{}在学年{}未配置任何教学单元",
                    level, year
                ))
            }
            EngineError::NoStudentsForLevel { level, year } => {
                ApiError::BusinessRuleViolation(format!(
                    "层级{}在学年{}无学生汇总可排名",
                    level, year
                ))
            }
            EngineError::NoGradesForUnit { unit_code, year } => {
                ApiError::BusinessRuleViolation(format!(
                    "教学单元{}在学年{}无最终成绩可统计",
                    unit_code, year
                ))
            }
            EngineError::MissingDeliberationParams(level) => {
                ApiError::BusinessRuleViolation(format!("层级{}未配置评议阈值", level))
            }
            EngineError::ConcurrentModification {
                entry_id,
                expected,
                actual,
            } => ApiError::ConcurrentModification(format!(
                "账本行{}已被其他用户修改（期望version={}，实际version={}）",
                entry_id, expected, actual
            )),
            EngineError::Repository(repo_err) => repo_err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "EvaluationEntry".to_string(),
            id: "E001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("EvaluationEntry"));
                assert!(msg.contains("E001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let repo_err = RepositoryError::OptimisticLockFailure {
            entry_id: "E001".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::ConcurrentModification(msg) => {
                assert!(msg.contains("E001"));
                assert!(msg.contains("已被其他用户修改"));
            }
            _ => panic!("Expected ConcurrentModification"),
        }
    }

    #[test]
    fn test_engine_error_conversion() {
        let engine_err = EngineError::InvalidComponentWeights {
            unit_code: "UE-MATH-101".to_string(),
            sum: 90.0,
        };
        let api_err: ApiError = engine_err.into();
        match api_err {
            ApiError::BusinessRuleViolation(msg) => {
                assert!(msg.contains("UE-MATH-101"));
                assert!(msg.contains("100"));
            }
            _ => panic!("Expected BusinessRuleViolation"),
        }
    }
}
