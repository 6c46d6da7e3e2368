// ==========================================
// 成绩聚合与评议引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod evaluation_repo;
pub mod grade_repo;
pub mod params_repo;
pub mod recap_repo;
pub mod stats_repo;
pub mod student_repo;
pub mod unit_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use evaluation_repo::{EvaluationEntryRepository, QualifyingMark};
pub use grade_repo::FinalGradeRepository;
pub use params_repo::DeliberationParamsRepository;
pub use recap_repo::StudentRecapRepository;
pub use stats_repo::UeStatisticsRepository;
pub use student_repo::StudentRepository;
pub use unit_repo::{EvaluationComponentRepository, TeachingUnitRepository};

/// 行映射时的枚举解析失败 → FromSqlConversionFailure
pub(crate) fn conv_err(idx: usize, msg: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            msg.to_string(),
        )),
    )
}
