// ==========================================
// 成绩聚合与评议引擎 - 评议 API
// ==========================================
// 职责: 评议会前的一键批量重算（成绩 → 汇总 → 排名 → 统计 → 资格）
// 说明: 全流程幂等可重入，替代源制度中由数据库触发器承担的联动重算
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::grade::{EligibilityReport, RankedStudent, StudentRecap, UeStatistics};
use crate::engine::aggregator::FinalGradeAggregator;
use crate::engine::eligibility::EligibilityEvaluator;
use crate::engine::error::EngineError;
use crate::engine::ranking::RankingEngine;
use crate::engine::recap::RecapCalculator;
use crate::engine::statistics::StatisticsEngine;
use crate::repository::{StudentRepository, TeachingUnitRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 评议批处理结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationSessionSummary {
    pub academic_level: String,
    pub academic_year: String,
    pub unit_count: i32,
    pub student_count: i32,
    pub final_grades_written: i32,
    pub recaps_recomputed: i32,
    pub units_with_statistics: i32,
    pub eligibility_evaluated: i32,
    pub eligible_count: i32,
}

// ==========================================
// DeliberationApi - 评议 API
// ==========================================
pub struct DeliberationApi {
    unit_repo: Arc<TeachingUnitRepository>,
    student_repo: Arc<StudentRepository>,
    aggregator: Arc<FinalGradeAggregator>,
    recap_calculator: Arc<RecapCalculator>,
    ranking_engine: Arc<RankingEngine>,
    statistics_engine: Arc<StatisticsEngine>,
    eligibility_evaluator: Arc<EligibilityEvaluator>,
}

impl DeliberationApi {
    /// 创建新的DeliberationApi实例
    pub fn new(
        unit_repo: Arc<TeachingUnitRepository>,
        student_repo: Arc<StudentRepository>,
        aggregator: Arc<FinalGradeAggregator>,
        recap_calculator: Arc<RecapCalculator>,
        ranking_engine: Arc<RankingEngine>,
        statistics_engine: Arc<StatisticsEngine>,
        eligibility_evaluator: Arc<EligibilityEvaluator>,
    ) -> Self {
        Self {
            unit_repo,
            student_repo,
            aggregator,
            recap_calculator,
            ranking_engine,
            statistics_engine,
            eligibility_evaluator,
        }
    }

    /// 重算单个学生汇总
    pub fn recompute_recap(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
    ) -> ApiResult<StudentRecap> {
        Ok(self
            .recap_calculator
            .recompute_recap(student_id, academic_level, academic_year)?)
    }

    /// 层级排名
    pub fn rank_level(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> ApiResult<Vec<RankedStudent>> {
        Ok(self.ranking_engine.rank_level(academic_level, academic_year)?)
    }

    /// 单元统计
    pub fn compute_statistics(
        &self,
        unit_code: &str,
        academic_year: &str,
    ) -> ApiResult<UeStatistics> {
        Ok(self
            .statistics_engine
            .compute_ue_statistics(unit_code, academic_year)?)
    }

    /// 评议资格评定
    pub fn evaluate_eligibility(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
    ) -> ApiResult<EligibilityReport> {
        Ok(self.eligibility_evaluator.evaluate_eligibility(
            student_id,
            academic_level,
            academic_year,
        )?)
    }

    /// 评议会前一键批处理
    ///
    /// # 流程
    /// 1. 层级全部单元 × 全部学生: 重算最终成绩（无合格账本行的组合跳过）
    /// 2. 全部学生: 重算汇总
    /// 3. 层级排名
    /// 4. 逐单元统计（无成绩的单元跳过）
    /// 5. 须评议学生: 逐个评定资格并回写
    ///
    /// 整个流程幂等: 账本未变化时重复执行不产生任何写入
    #[instrument(skip(self))]
    pub async fn run_session(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> ApiResult<DeliberationSessionSummary> {
        let units = self
            .unit_repo
            .list_by_level_year(academic_level, academic_year)?;
        if units.is_empty() {
            return Err(EngineError::NoTeachingUnitsForLevel {
                level: academic_level.to_string(),
                year: academic_year.to_string(),
            }
            .into());
        }

        let students = self
            .student_repo
            .list_by_level_year(academic_level, academic_year)?;
        if students.is_empty() {
            return Err(EngineError::NoStudentsForLevel {
                level: academic_level.to_string(),
                year: academic_year.to_string(),
            }
            .into());
        }

        // 1. 最终成绩
        let mut final_grades_written = 0;
        for unit in &units {
            for student in &students {
                if self
                    .aggregator
                    .recompute_final_grade(&student.student_id, &unit.code, academic_year)?
                    .is_some()
                {
                    final_grades_written += 1;
                }
            }
        }

        // 2. 学生汇总
        let mut recaps = Vec::with_capacity(students.len());
        for student in &students {
            recaps.push(self.recap_calculator.recompute_recap(
                &student.student_id,
                academic_level,
                academic_year,
            )?);
        }

        // 3. 排名
        self.ranking_engine.rank_level(academic_level, academic_year)?;

        // 4. 单元统计
        let mut units_with_statistics = 0;
        for unit in &units {
            match self
                .statistics_engine
                .compute_ue_statistics(&unit.code, academic_year)
            {
                Ok(_) => units_with_statistics += 1,
                Err(EngineError::NoGradesForUnit { .. }) => {
                    tracing::debug!(unit_code = %unit.code, "单元尚无最终成绩，跳过统计");
                }
                Err(e) => return Err(e.into()),
            }
        }

        // 5. 资格评定（仅须评议的学生）
        let mut eligibility_evaluated = 0;
        let mut eligible_count = 0;
        for recap in &recaps {
            if !recap.subject_to_deliberation {
                continue;
            }
            let report = self.eligibility_evaluator.evaluate_eligibility(
                &recap.student_id,
                academic_level,
                academic_year,
            )?;
            eligibility_evaluated += 1;
            if report.eligible {
                eligible_count += 1;
            }
        }

        let summary = DeliberationSessionSummary {
            academic_level: academic_level.to_string(),
            academic_year: academic_year.to_string(),
            unit_count: units.len() as i32,
            student_count: students.len() as i32,
            final_grades_written,
            recaps_recomputed: recaps.len() as i32,
            units_with_statistics,
            eligibility_evaluated,
            eligible_count,
        };

        tracing::info!(
            academic_level = %academic_level,
            academic_year = %academic_year,
            final_grades_written = summary.final_grades_written,
            eligibility_evaluated = summary.eligibility_evaluated,
            eligible_count = summary.eligible_count,
            "评议批处理完成"
        );

        Ok(summary)
    }
}
