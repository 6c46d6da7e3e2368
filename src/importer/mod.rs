// ==========================================
// 成绩聚合与评议引擎 - 导入层
// ==========================================
// 职责: CSV 成绩单的批量落账（逐行独立，错误收集进摘要）
// ==========================================

pub mod error;
pub mod mark_importer;

pub use error::{ImportError, ImportResult};
pub use mark_importer::{MarkImportSummary, MarkImporter, MarkImporterImpl, RowError};
