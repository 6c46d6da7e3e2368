// ==========================================
// 成绩聚合与评议引擎 - 成绩录入 API
// ==========================================
// 职责: 账本写入口 + 所属最终成绩的同步重算
// 说明: 事件发布器负责异步调度场景；本 API 走同步路径，
//       每次账本写入成功后立即重算所属最终成绩（幂等，可重复）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::evaluation::{EntryPatch, EvaluationEntry, RecordEntryRequest};
use crate::domain::grade::FinalGrade;
use crate::domain::types::EntryStatus;
use crate::engine::aggregator::FinalGradeAggregator;
use crate::engine::ledger::EvaluationLedger;
use crate::repository::{EvaluationComponentRepository, TeachingUnitRepository};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// GradeApi - 成绩录入 API
// ==========================================
pub struct GradeApi {
    ledger: Arc<EvaluationLedger>,
    aggregator: Arc<FinalGradeAggregator>,
    component_repo: Arc<EvaluationComponentRepository>,
    unit_repo: Arc<TeachingUnitRepository>,
    grade_repo: Arc<crate::repository::FinalGradeRepository>,
}

impl GradeApi {
    /// 创建新的GradeApi实例
    pub fn new(
        ledger: Arc<EvaluationLedger>,
        aggregator: Arc<FinalGradeAggregator>,
        component_repo: Arc<EvaluationComponentRepository>,
        unit_repo: Arc<TeachingUnitRepository>,
        grade_repo: Arc<crate::repository::FinalGradeRepository>,
    ) -> Self {
        Self {
            ledger,
            aggregator,
            component_repo,
            unit_repo,
            grade_repo,
        }
    }

    /// 录入成绩并同步重算所属最终成绩
    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    pub fn record_entry(&self, request: &RecordEntryRequest) -> ApiResult<EvaluationEntry> {
        let entry = self.ledger.record_entry(request)?;
        self.recompute_owning_grade(&entry)?;
        Ok(entry)
    }

    /// 修改账本行（乐观并发）并同步重算
    #[instrument(skip(self, patch))]
    pub fn update_entry(
        &self,
        entry_id: &str,
        patch: &EntryPatch,
        expected_version: i32,
    ) -> ApiResult<EvaluationEntry> {
        let entry = self.ledger.update_entry(entry_id, patch, expected_version)?;
        self.recompute_owning_grade(&entry)?;
        Ok(entry)
    }

    /// 状态流转并同步重算
    #[instrument(skip(self))]
    pub fn set_status(
        &self,
        entry_id: &str,
        new_status: EntryStatus,
        actor: &str,
    ) -> ApiResult<EvaluationEntry> {
        let entry = self.ledger.set_status(entry_id, new_status, actor)?;
        self.recompute_owning_grade(&entry)?;
        Ok(entry)
    }

    /// 查询最终成绩（评议纪要生成侧读取口）
    pub fn get_final_grade(
        &self,
        student_id: &str,
        unit_code: &str,
        academic_year: &str,
    ) -> ApiResult<Option<FinalGrade>> {
        Ok(self.grade_repo.find(student_id, unit_code, academic_year)?)
    }

    /// 重算账本行所属的最终成绩（无合格行时聚合器自行跳过）
    fn recompute_owning_grade(&self, entry: &EvaluationEntry) -> ApiResult<()> {
        let component = self
            .component_repo
            .find_by_id(&entry.component_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("评估组成(id={})不存在", entry.component_id))
            })?;
        let unit = self
            .unit_repo
            .find_by_code(&component.unit_code)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("教学单元(code={})不存在", component.unit_code))
            })?;

        self.aggregator.recompute_final_grade(
            &entry.student_id,
            &component.unit_code,
            &unit.academic_year,
        )?;
        Ok(())
    }
}
