// ==========================================
// 成绩聚合与评议引擎 - 成绩批量导入
// ==========================================
// 职责: CSV 成绩单导入（EntryMode=IMPORT）
// 规则: 逐行独立落账——单行失败不阻断整批，错误收集进导入摘要
// ==========================================

use crate::api::grade_api::GradeApi;
use crate::config::ImportOptions;
use crate::domain::evaluation::RecordEntryRequest;
use crate::domain::types::{ComponentKind, EntryMode};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::EvaluationComponentRepository;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// 单行导入失败明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize, // 1 起始的数据行号（不含表头）
    pub message: String,
}

/// 导入摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkImportSummary {
    pub total_rows: usize,
    pub ok_count: usize,
    pub failed_count: usize,
    pub row_errors: Vec<RowError>,
}

// ==========================================
// MarkImporter Trait
// ==========================================
// 用途: 成绩批量导入主接口
// 实现者: MarkImporterImpl
#[async_trait]
pub trait MarkImporter: Send + Sync {
    /// 从 CSV 文件导入成绩
    ///
    /// # 列格式（带表头）
    /// student_id, unit_code, component_kind, mark, entry_date, comment
    ///
    /// # 参数
    /// - file_path: CSV 文件路径（.csv）
    /// - author: 录入人（整批统一，来自外部身份系统）
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        author: &str,
    ) -> ImportResult<MarkImportSummary>;
}

// ==========================================
// MarkImporterImpl - 成绩批量导入实现
// ==========================================
pub struct MarkImporterImpl {
    grade_api: Arc<GradeApi>,
    component_repo: Arc<EvaluationComponentRepository>,
    options: ImportOptions,
}

/// CSV 行的中间结构
#[derive(Debug, Deserialize)]
struct MarkRow {
    student_id: String,
    unit_code: String,
    component_kind: String,
    mark: String,
    entry_date: String,
    #[serde(default)]
    comment: Option<String>,
}

impl MarkImporterImpl {
    /// 创建新的MarkImporterImpl实例（缺省导入参数）
    pub fn new(
        grade_api: Arc<GradeApi>,
        component_repo: Arc<EvaluationComponentRepository>,
    ) -> Self {
        Self::with_options(grade_api, component_repo, ImportOptions::default())
    }

    /// 按配置的导入参数创建
    pub fn with_options(
        grade_api: Arc<GradeApi>,
        component_repo: Arc<EvaluationComponentRepository>,
        options: ImportOptions,
    ) -> Self {
        Self {
            grade_api,
            component_repo,
            options,
        }
    }

    /// 单行导入（解析 → 解析组成 → 落账 + 同步重算）
    fn import_row(&self, row: &MarkRow, row_number: usize, author: &str) -> ImportResult<()> {
        let student_id = row.student_id.trim();
        if student_id.is_empty() {
            return Err(ImportError::FieldMappingError {
                row: row_number,
                message: "student_id 为空".to_string(),
            });
        }

        let kind = ComponentKind::from_str(row.component_kind.trim()).ok_or_else(|| {
            ImportError::FieldMappingError {
                row: row_number,
                message: format!("未知的评估组成类别: {}", row.component_kind),
            }
        })?;

        let mark: f64 =
            row.mark
                .trim()
                .parse()
                .map_err(|_| ImportError::TypeConversionError {
                    row: row_number,
                    field: "mark".to_string(),
                    message: format!("无法解析为数值: {}", row.mark),
                })?;

        let entry_date = NaiveDate::parse_from_str(row.entry_date.trim(), "%Y-%m-%d").map_err(
            |_| ImportError::DateFormatError {
                row: row_number,
                field: "entry_date".to_string(),
                value: row.entry_date.clone(),
            },
        )?;

        let unit_code = row.unit_code.trim();
        let component = self
            .component_repo
            .find_by_unit(unit_code)
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?
            .into_iter()
            .find(|c| c.kind == kind)
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row_number,
                message: format!(
                    "教学单元{}不存在类别为{}的评估组成",
                    unit_code,
                    kind.to_db_str()
                ),
            })?;

        let request = RecordEntryRequest {
            student_id: student_id.to_string(),
            component_id: component.component_id,
            mark,
            entry_date,
            author: author.to_string(),
            mode: EntryMode::Import,
            comment: row
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };

        self.grade_api
            .record_entry(&request)
            .map_err(|e| ImportError::FieldMappingError {
                row: row_number,
                message: e.to_string(),
            })?;

        Ok(())
    }
}

#[async_trait]
impl MarkImporter for MarkImporterImpl {
    #[instrument(skip(self, file_path))]
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        author: &str,
    ) -> ImportResult<MarkImportSummary> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            return Err(ImportError::UnsupportedFormat(path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.options.has_headers)
            .delimiter(self.options.delimiter as u8)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut summary = MarkImportSummary {
            total_rows: 0,
            ok_count: 0,
            failed_count: 0,
            row_errors: Vec::new(),
        };

        for (idx, record) in reader.deserialize::<MarkRow>().enumerate() {
            let row_number = idx + 1;
            summary.total_rows += 1;

            let outcome = record
                .map_err(ImportError::from)
                .and_then(|row| self.import_row(&row, row_number, author));

            match outcome {
                Ok(()) => summary.ok_count += 1,
                Err(e) => {
                    summary.failed_count += 1;
                    tracing::warn!(row = row_number, error = %e, "成绩行导入失败");
                    summary.row_errors.push(RowError {
                        row: row_number,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total_rows = summary.total_rows,
            ok_count = summary.ok_count,
            failed_count = summary.failed_count,
            author = %author,
            "成绩批量导入完成"
        );

        Ok(summary)
    }
}
