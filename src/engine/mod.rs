// ==========================================
// 成绩聚合与评议引擎 - 引擎层
// ==========================================
// 职责: 账本维护、成绩派生、排名、统计、评议资格的业务核心
// 红线: 引擎只依赖仓储与纯函数核心，不做 I/O 之外的副作用
// ==========================================

pub mod aggregator;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod grade_core;
pub mod ledger;
pub mod ranking;
pub mod recap;
pub mod statistics;

// 重导出核心引擎
pub use aggregator::FinalGradeAggregator;
pub use eligibility::EligibilityEvaluator;
pub use error::{EngineError, EngineResult};
pub use events::{
    GradeEvent, GradeEventPublisher, GradeEventType, NoOpEventPublisher, OptionalEventPublisher,
};
pub use grade_core::GradeCore;
pub use ledger::EvaluationLedger;
pub use ranking::RankingEngine;
pub use recap::RecapCalculator;
pub use statistics::StatisticsEngine;
