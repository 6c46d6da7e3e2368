// ==========================================
// 成绩聚合与评议引擎 - 引擎层错误类型
// ==========================================
// 错误分类:
// - 校验错误（分数越界、非法状态转换）: 同步拒绝，绝不部分生效
// - 引用错误（学生/单元/组成不存在）: 同步拒绝
// - 一致性错误（权重不闭合、缺少评议阈值）: 在配置写入点拒绝
// - 并发错误（版本不匹配）: 上抛给调用方重试，绝不静默覆盖
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 校验错误 =====
    #[error("分数越界: mark={mark}, 允许范围 [0, {max}]")]
    InvalidRange { mark: f64, max: f64 },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStatusTransition { from: String, to: String },

    // ===== 引用错误 =====
    #[error("学生不存在: {0}")]
    UnknownStudent(String),

    #[error("评估组成不存在: {0}")]
    UnknownComponent(String),

    #[error("教学单元不存在: {0}")]
    UnknownUnit(String),

    // ===== 一致性错误 =====
    #[error("评估组成权重不闭合: unit_code={unit_code}, 权重合计={sum}（要求 100 ± 0.01）")]
    InvalidComponentWeights { unit_code: String, sum: f64 },

    #[error("层级未配置教学单元: level={level}, year={year}")]
    NoTeachingUnitsForLevel { level: String, year: String },

    #[error("层级无学生汇总可排名: level={level}, year={year}")]
    NoStudentsForLevel { level: String, year: String },

    #[error("教学单元无最终成绩可统计: unit_code={unit_code}, year={year}")]
    NoGradesForUnit { unit_code: String, year: String },

    #[error("层级未配置评议阈值: {0}")]
    MissingDeliberationParams(String),

    // ===== 并发错误 =====
    #[error("并发修改冲突: entry_id={entry_id}, expected_version={expected}, actual_version={actual}（请重读后重试）")]
    ConcurrentModification {
        entry_id: String,
        expected: i32,
        actual: i32,
    },

    // ===== 下层错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// 将仓储层乐观锁冲突归一为引擎层并发冲突信号
    pub fn from_repo(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                entry_id,
                expected,
                actual,
            } => EngineError::ConcurrentModification {
                entry_id,
                expected,
                actual,
            },
            other => EngineError::Repository(other),
        }
    }
}
