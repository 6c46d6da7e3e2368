// ==========================================
// 成绩聚合与评议引擎 - API层
// ==========================================
// 职责: 组合仓储与引擎，对外提供配置 / 录入 / 评议三个门面
// ==========================================

pub mod config_api;
pub mod deliberation_api;
pub mod error;
pub mod grade_api;

pub use config_api::{ComponentSpec, ConfigApi};
pub use deliberation_api::{DeliberationApi, DeliberationSessionSummary};
pub use error::{ApiError, ApiResult};
pub use grade_api::GradeApi;
