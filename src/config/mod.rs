// ==========================================
// 成绩聚合与评议引擎 - 配置层
// ==========================================
// 职责: 评分制度配置（默认满分制 / 导入参数 / 评议阈值预置）
// ==========================================

pub mod grading_profile;

pub use grading_profile::{DeliberationSeed, GradingProfile, ImportOptions};
