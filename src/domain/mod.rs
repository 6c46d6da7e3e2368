// ==========================================
// 成绩聚合与评议引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod evaluation;
pub mod grade;
pub mod student;
pub mod types;
pub mod unit;

// 重导出核心类型
pub use evaluation::{EntryPatch, EvaluationEntry, RecordEntryRequest};
pub use grade::{
    DeliberationParams, EligibilityCriterion, EligibilityReport, FinalGrade, RankedStudent,
    StudentRecap, UeStatistics, CAPITALIZATION_THRESHOLD,
};
pub use student::Student;
pub use types::{ComponentKind, EntryMode, EntryStatus, Mention, OverallDecision, UnitStatus};
pub use unit::{EvaluationComponent, TeachingUnit, DEFAULT_POINT_SCALE, MAX_UNIT_CREDITS};
