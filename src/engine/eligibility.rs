// ==========================================
// 成绩聚合与评议引擎 - 评议资格评定器
// ==========================================
// 职责: 对须评议的学生按层级阈值逐项判定资格
// 红线: 所有判定必须可解释——每条判据都带观测值/阈值，未满足时给出理由
// ==========================================

use crate::domain::grade::{EligibilityCriterion, EligibilityReport};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::recap::RecapCalculator;
use crate::repository::{DeliberationParamsRepository, StudentRecapRepository};
use std::sync::Arc;
use tracing::instrument;

/// 判据名: 最低学分获得百分比
pub const CRITERION_MIN_CAPITALIZATION_PCT: &str = "MIN_CAPITALIZATION_PCT";
/// 判据名: 最多未获学分单元数
pub const CRITERION_MAX_NON_CAPITALIZED: &str = "MAX_NON_CAPITALIZED_UNITS";

// ==========================================
// EligibilityEvaluator - 评议资格评定器
// ==========================================
pub struct EligibilityEvaluator {
    params_repo: Arc<DeliberationParamsRepository>,
    recap_repo: Arc<StudentRecapRepository>,
    recap_calculator: Arc<RecapCalculator>,
}

impl EligibilityEvaluator {
    /// 创建新的EligibilityEvaluator实例
    pub fn new(
        params_repo: Arc<DeliberationParamsRepository>,
        recap_repo: Arc<StudentRecapRepository>,
        recap_calculator: Arc<RecapCalculator>,
    ) -> Self {
        Self {
            params_repo,
            recap_repo,
            recap_calculator,
        }
    }

    /// 评定学生评议资格并回写标记
    ///
    /// # 判据（同时满足才具资格）
    /// 1. capitalization_pct ≥ min_capitalization_pct
    /// 2. (ue_total − ue_capitalized) ≤ max_non_capitalized
    ///
    /// 评定前先重算汇总，保证判定基于最新账本状态
    #[instrument(skip(self))]
    pub fn evaluate_eligibility(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
    ) -> EngineResult<EligibilityReport> {
        let params = self
            .params_repo
            .find_by_level(academic_level)?
            .ok_or_else(|| {
                EngineError::MissingDeliberationParams(academic_level.to_string())
            })?;

        let recap =
            self.recap_calculator
                .recompute_recap(student_id, academic_level, academic_year)?;

        let non_capitalized = recap.ue_total - recap.ue_capitalized;

        let criteria = vec![
            EligibilityCriterion {
                name: CRITERION_MIN_CAPITALIZATION_PCT.to_string(),
                observed: recap.capitalization_pct,
                threshold: params.min_capitalization_pct,
                passed: recap.capitalization_pct >= params.min_capitalization_pct,
            },
            EligibilityCriterion {
                name: CRITERION_MAX_NON_CAPITALIZED.to_string(),
                observed: non_capitalized as f64,
                threshold: params.max_non_capitalized as f64,
                passed: non_capitalized <= params.max_non_capitalized,
            },
        ];

        let reasons: Vec<String> = criteria
            .iter()
            .filter(|c| !c.passed)
            .map(|c| match c.name.as_str() {
                CRITERION_MIN_CAPITALIZATION_PCT => format!(
                    "学分获得率 {:.2}% 低于层级最低要求 {:.2}%",
                    c.observed, c.threshold
                ),
                CRITERION_MAX_NON_CAPITALIZED => format!(
                    "未获学分单元数 {} 超过层级上限 {}",
                    c.observed as i32, c.threshold as i32
                ),
                _ => format!("判据 {} 未满足: 观测值 {} 阈值 {}", c.name, c.observed, c.threshold),
            })
            .collect();

        let eligible = reasons.is_empty();

        self.recap_repo
            .update_eligibility_flag(student_id, academic_level, academic_year, eligible)?;

        tracing::info!(
            student_id = %student_id,
            academic_level = %academic_level,
            eligible = eligible,
            failed_criteria = reasons.len(),
            "评议资格已评定"
        );

        Ok(EligibilityReport {
            student_id: student_id.to_string(),
            academic_level: academic_level.to_string(),
            academic_year: academic_year.to_string(),
            eligible,
            criteria,
            reasons,
        })
    }
}
