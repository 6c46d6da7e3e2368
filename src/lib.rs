// ==========================================
// 成绩聚合与评议引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 评议决策支持引擎 (评议委员会拥有最终裁量权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ComponentKind, EntryMode, EntryStatus, Mention, OverallDecision, UnitStatus,
};

// 领域实体
pub use domain::{
    DeliberationParams, EligibilityCriterion, EligibilityReport, EntryPatch, EvaluationComponent,
    EvaluationEntry, FinalGrade, RankedStudent, RecordEntryRequest, Student, StudentRecap,
    TeachingUnit, UeStatistics,
};

// 引擎
pub use engine::{
    EligibilityEvaluator, EvaluationLedger, FinalGradeAggregator, GradeCore, RankingEngine,
    RecapCalculator, StatisticsEngine,
};

// API
pub use api::{ConfigApi, DeliberationApi, GradeApi};

// 应用装配
pub use app::{get_default_db_path, AppContext};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "成绩聚合与评议引擎";
