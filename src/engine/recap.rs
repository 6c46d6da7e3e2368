// ==========================================
// 成绩聚合与评议引擎 - 学生汇总引擎
// ==========================================
// 职责: 汇总学生在某层级/学年的全部最终成绩
// 规则: 缺失的最终成绩视为"尚未评定"——不计入平均，但计入 ue_total；
//       学分获得率分母恒为层级总学分，只会随获得单元增加而上升
// ==========================================

use crate::domain::grade::StudentRecap;
use crate::domain::types::{Mention, OverallDecision};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::grade_core::GradeCore;
use crate::repository::{
    FinalGradeRepository, StudentRecapRepository, StudentRepository, TeachingUnitRepository,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// RecapCalculator - 学生汇总引擎
// ==========================================
pub struct RecapCalculator {
    unit_repo: Arc<TeachingUnitRepository>,
    grade_repo: Arc<FinalGradeRepository>,
    recap_repo: Arc<StudentRecapRepository>,
    student_repo: Arc<StudentRepository>,
}

impl RecapCalculator {
    /// 创建新的RecapCalculator实例
    pub fn new(
        unit_repo: Arc<TeachingUnitRepository>,
        grade_repo: Arc<FinalGradeRepository>,
        recap_repo: Arc<StudentRecapRepository>,
        student_repo: Arc<StudentRepository>,
    ) -> Self {
        Self {
            unit_repo,
            grade_repo,
            recap_repo,
            student_repo,
        }
    }

    /// 重算学生汇总
    ///
    /// # 算法
    /// 1. 取层级/学年全部教学单元；为空 → NoTeachingUnitsForLevel
    /// 2. 逐单元取最终成绩；缺失记为"尚未评定"
    /// 3. 简单平均 = 已评成绩均值；加权平均 = Σ(成绩×学分)/Σ(学分)（仅已评单元）
    /// 4. 学分获得率 = 已获学分 / 层级总学分 × 100
    /// 5. 与现存行值一致时原样返回（保持字节不变）
    ///
    /// # 保留字段
    /// rank / eligible_for_deliberation / has_been_deliberated 由排名引擎、
    /// 资格评定器与外部评议流程回写，重算时原值保留
    #[instrument(skip(self))]
    pub fn recompute_recap(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
    ) -> EngineResult<StudentRecap> {
        self.student_repo
            .find_by_id(student_id)?
            .ok_or_else(|| EngineError::UnknownStudent(student_id.to_string()))?;

        let units = self
            .unit_repo
            .list_by_level_year(academic_level, academic_year)?;
        if units.is_empty() {
            return Err(EngineError::NoTeachingUnitsForLevel {
                level: academic_level.to_string(),
                year: academic_year.to_string(),
            });
        }

        let mut evaluated: Vec<(f64, i32)> = Vec::new(); // (成绩, 学分)
        let mut ue_capitalized = 0;
        let mut credits_obtained = 0;
        let mut credits_total = 0;

        for unit in &units {
            credits_total += unit.credits;
            if let Some(grade) = self.grade_repo.find(student_id, &unit.code, academic_year)? {
                evaluated.push((grade.grade, unit.credits));
                if grade.capitalized {
                    ue_capitalized += 1;
                    credits_obtained += unit.credits;
                }
            }
        }

        let ue_total = units.len() as i32;
        let all_evaluated = evaluated.len() as i32 == ue_total;

        let unweighted_avg = if evaluated.is_empty() {
            None
        } else {
            let grades: Vec<f64> = evaluated.iter().map(|(g, _)| *g).collect();
            Some(GradeCore::round2(GradeCore::mean(&grades)))
        };

        let weighted_avg = {
            let weight_sum: i32 = evaluated.iter().map(|(_, c)| *c).sum();
            if weight_sum == 0 {
                None
            } else {
                let weighted: f64 = evaluated.iter().map(|(g, c)| g * *c as f64).sum();
                Some(GradeCore::round2(weighted / weight_sum as f64))
            }
        };

        // 分母恒为层级总学分（未评单元视为未获得），获得率单调不减
        let capitalization_pct =
            GradeCore::round2(credits_obtained as f64 / credits_total as f64 * 100.0);

        // 全部获得 → 通过；已评完但有未获得 → 待定（等待评议）；未评完 → 结论悬空
        let decision = if all_evaluated && ue_capitalized == ue_total {
            Some(OverallDecision::Admitted)
        } else if all_evaluated {
            Some(OverallDecision::Deferred)
        } else {
            None
        };

        let existing = self
            .recap_repo
            .find(student_id, academic_level, academic_year)?;

        let candidate = StudentRecap {
            student_id: student_id.to_string(),
            academic_level: academic_level.to_string(),
            academic_year: academic_year.to_string(),
            unweighted_avg,
            weighted_avg,
            capitalization_pct,
            ue_capitalized,
            ue_total,
            credits_obtained,
            credits_total,
            rank: existing.as_ref().and_then(|r| r.rank),
            subject_to_deliberation: all_evaluated && ue_capitalized < ue_total,
            eligible_for_deliberation: existing
                .as_ref()
                .map(|r| r.eligible_for_deliberation)
                .unwrap_or(false),
            has_been_deliberated: existing
                .as_ref()
                .map(|r| r.has_been_deliberated)
                .unwrap_or(false),
            decision,
            mention: weighted_avg.map(Mention::from_grade),
            computed_at: Utc::now(),
        };

        // 幂等保证: 派生值未变化时不触碰存量行
        if let Some(current) = existing {
            if Self::values_equal(&current, &candidate) {
                return Ok(current);
            }
        }

        self.recap_repo.upsert(&candidate)?;

        tracing::info!(
            student_id = %student_id,
            academic_level = %academic_level,
            capitalization_pct = candidate.capitalization_pct,
            ue_capitalized = candidate.ue_capitalized,
            ue_total = candidate.ue_total,
            "学生汇总已重算"
        );

        Ok(candidate)
    }

    /// 比较除 computed_at 外的全部派生字段
    fn values_equal(current: &StudentRecap, candidate: &StudentRecap) -> bool {
        current.unweighted_avg == candidate.unweighted_avg
            && current.weighted_avg == candidate.weighted_avg
            && current.capitalization_pct == candidate.capitalization_pct
            && current.ue_capitalized == candidate.ue_capitalized
            && current.ue_total == candidate.ue_total
            && current.credits_obtained == candidate.credits_obtained
            && current.credits_total == candidate.credits_total
            && current.subject_to_deliberation == candidate.subject_to_deliberation
            && current.decision == candidate.decision
            && current.mention == candidate.mention
    }
}
