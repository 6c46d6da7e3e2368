// ==========================================
// 成绩聚合与评议引擎 - 单元统计引擎
// ==========================================
// 职责: 按教学单元/学年计算最终成绩的描述统计
// 规则: 标准差为总体标准差（除以 N）；四分位/中位数用线性插值法
// ==========================================

use crate::domain::grade::{UeStatistics, CAPITALIZATION_THRESHOLD};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::grade_core::GradeCore;
use crate::repository::{FinalGradeRepository, UeStatisticsRepository};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// StatisticsEngine - 单元统计引擎
// ==========================================
pub struct StatisticsEngine {
    grade_repo: Arc<FinalGradeRepository>,
    stats_repo: Arc<UeStatisticsRepository>,
}

impl StatisticsEngine {
    /// 创建新的StatisticsEngine实例
    pub fn new(
        grade_repo: Arc<FinalGradeRepository>,
        stats_repo: Arc<UeStatisticsRepository>,
    ) -> Self {
        Self {
            grade_repo,
            stats_repo,
        }
    }

    /// 计算并落库教学单元统计
    ///
    /// # 输出（均两位小数）
    /// mean / std_dev（总体，除以 N）/ min / max / q1 / median / q3
    /// pass_count（成绩 ≥ 10 人数）/ fail_count / pass_rate
    ///
    /// 无任何最终成绩时返回 NoGradesForUnit，不写统计行
    #[instrument(skip(self))]
    pub fn compute_ue_statistics(
        &self,
        unit_code: &str,
        academic_year: &str,
    ) -> EngineResult<UeStatistics> {
        let grades = self.grade_repo.list_by_unit_year(unit_code, academic_year)?;

        if grades.is_empty() {
            return Err(EngineError::NoGradesForUnit {
                unit_code: unit_code.to_string(),
                year: academic_year.to_string(),
            });
        }

        let mut values: Vec<f64> = grades.iter().map(|g| g.grade).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = values.len();
        let pass_count = values
            .iter()
            .filter(|v| **v >= CAPITALIZATION_THRESHOLD)
            .count() as i64;

        let candidate = UeStatistics {
            unit_code: unit_code.to_string(),
            academic_year: academic_year.to_string(),
            grade_count: n as i64,
            mean: GradeCore::round2(GradeCore::mean(&values)),
            std_dev: GradeCore::round2(GradeCore::population_std_dev(&values)),
            min: values[0],
            max: values[n - 1],
            q1: GradeCore::round2(GradeCore::percentile(&values, 25.0)),
            median: GradeCore::round2(GradeCore::percentile(&values, 50.0)),
            q3: GradeCore::round2(GradeCore::percentile(&values, 75.0)),
            pass_count,
            fail_count: n as i64 - pass_count,
            pass_rate: GradeCore::round2(pass_count as f64 / n as f64 * 100.0),
            computed_at: Utc::now(),
        };

        // 幂等保证: 派生值未变化时不触碰存量行
        if let Some(current) = self.stats_repo.find(unit_code, academic_year)? {
            if Self::values_equal(&current, &candidate) {
                return Ok(current);
            }
        }

        self.stats_repo.upsert(&candidate)?;

        tracing::info!(
            unit_code = %unit_code,
            academic_year = %academic_year,
            grade_count = candidate.grade_count,
            mean = candidate.mean,
            pass_rate = candidate.pass_rate,
            "单元统计已落库"
        );

        Ok(candidate)
    }

    /// 比较除 computed_at 外的全部派生字段
    fn values_equal(current: &UeStatistics, candidate: &UeStatistics) -> bool {
        current.grade_count == candidate.grade_count
            && current.mean == candidate.mean
            && current.std_dev == candidate.std_dev
            && current.min == candidate.min
            && current.max == candidate.max
            && current.q1 == candidate.q1
            && current.median == candidate.median
            && current.q3 == candidate.q3
            && current.pass_count == candidate.pass_count
            && current.pass_rate == candidate.pass_rate
    }
}
