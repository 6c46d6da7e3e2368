// ==========================================
// 成绩聚合与评议引擎 - 最终成绩聚合引擎
// ==========================================
// 职责: 由账本 FINAL/RETAKE 行聚合出单元最终成绩（成绩派生的唯一事实点）
// 红线: 无合格账本行时不写任何成绩行——部分评定不得被误读为 0 分
// 红线: 账本未变化时重复计算保持行字节不变（幂等、可重入）
// ==========================================

use crate::domain::grade::FinalGrade;
use crate::domain::types::Mention;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::grade_core::GradeCore;
use crate::repository::{
    EvaluationEntryRepository, FinalGradeRepository, TeachingUnitRepository,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// FinalGradeAggregator - 最终成绩聚合引擎
// ==========================================
pub struct FinalGradeAggregator {
    entry_repo: Arc<EvaluationEntryRepository>,
    unit_repo: Arc<TeachingUnitRepository>,
    grade_repo: Arc<FinalGradeRepository>,
}

impl FinalGradeAggregator {
    /// 创建新的FinalGradeAggregator实例
    pub fn new(
        entry_repo: Arc<EvaluationEntryRepository>,
        unit_repo: Arc<TeachingUnitRepository>,
        grade_repo: Arc<FinalGradeRepository>,
    ) -> Self {
        Self {
            entry_repo,
            unit_repo,
            grade_repo,
        }
    }

    /// 重算单元最终成绩
    ///
    /// # 算法
    /// 1. 选取该学生在该单元全部组成下 status ∈ {FINAL, RETAKE} 的账本行
    /// 2. 贡献 = mark_over_20 × (weight_pct / 100)，合计后两位小数（0.5 远离零）
    /// 3. 无合格账本行 → 返回 None，并删除存量成绩行（若有）
    /// 4. capitalized = 成绩 ≥ 10.0；评定等级按分数段推导
    /// 5. 结果与现存行一致时原样返回（computation_version 不递增）
    #[instrument(skip(self))]
    pub fn recompute_final_grade(
        &self,
        student_id: &str,
        unit_code: &str,
        academic_year: &str,
    ) -> EngineResult<Option<FinalGrade>> {
        self.unit_repo
            .find_by_code(unit_code)?
            .ok_or_else(|| EngineError::UnknownUnit(unit_code.to_string()))?;

        let marks = self
            .entry_repo
            .list_qualifying_for_unit(student_id, unit_code)?;

        if marks.is_empty() {
            // 部分评定状态: 不得写出 0 分成绩；账本行全部失效时清除存量成绩
            if self.grade_repo.delete(student_id, unit_code, academic_year)? {
                tracing::info!(
                    student_id = %student_id,
                    unit_code = %unit_code,
                    "合格账本行已清空，存量最终成绩已删除"
                );
            }
            return Ok(None);
        }

        let contributions: Vec<(f64, f64)> = marks
            .iter()
            .map(|m| (m.mark_over_20, m.weight_pct))
            .collect();
        let grade = GradeCore::aggregate_final_grade(&contributions);
        let capitalized = GradeCore::is_capitalized(grade);
        let mention = Mention::from_grade(grade);

        let existing = self.grade_repo.find(student_id, unit_code, academic_year)?;

        // 幂等保证: 派生值未变化时不触碰存量行
        if let Some(ref current) = existing {
            if current.grade == grade
                && current.capitalized == capitalized
                && current.mention == mention
            {
                return Ok(existing);
            }
        }

        let candidate = FinalGrade {
            student_id: student_id.to_string(),
            unit_code: unit_code.to_string(),
            academic_year: academic_year.to_string(),
            grade,
            capitalized,
            mention,
            computation_version: 1, // 实际版本由仓储写入时维护
            computed_at: Utc::now(),
        };

        match existing {
            Some(_) => self.grade_repo.overwrite(&candidate)?,
            None => self.grade_repo.insert(&candidate)?,
        }

        let written = self.grade_repo.find(student_id, unit_code, academic_year)?;

        tracing::info!(
            student_id = %student_id,
            unit_code = %unit_code,
            grade = grade,
            capitalized = capitalized,
            mention = %mention,
            "最终成绩已重算"
        );

        Ok(written)
    }
}
