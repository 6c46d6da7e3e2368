// ==========================================
// 成绩聚合与评议引擎 - 排名引擎
// ==========================================
// 职责: 按层级/学年对学生汇总排名并回写 rank
// 规则: 并列者仍获得不同的连续名次（非竞赛排名 1,2,2,4，刻意保持）
// 并发: 排名期间汇总被并发重算时采用后写胜出，下一次排名自然修正
// ==========================================

use crate::domain::grade::RankedStudent;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::StudentRecapRepository;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// RankingEngine - 排名引擎
// ==========================================
pub struct RankingEngine {
    recap_repo: Arc<StudentRecapRepository>,
}

impl RankingEngine {
    /// 创建新的RankingEngine实例
    pub fn new(recap_repo: Arc<StudentRecapRepository>) -> Self {
        Self { recap_repo }
    }

    /// 对层级/学年全部学生排名并回写
    ///
    /// # 排序键（依次比较）
    /// 1. 简单平均降序（None 视为负无穷，排在最后）
    /// 2. 加权平均降序
    /// 3. student_id 升序（保证确定性）
    ///
    /// 名次 1 起始、连续、互不相同；并列者由第三键拆分
    #[instrument(skip(self))]
    pub fn rank_level(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> EngineResult<Vec<RankedStudent>> {
        let mut recaps = self
            .recap_repo
            .list_by_level_year(academic_level, academic_year)?;

        if recaps.is_empty() {
            return Err(EngineError::NoStudentsForLevel {
                level: academic_level.to_string(),
                year: academic_year.to_string(),
            });
        }

        recaps.sort_by(|a, b| {
            let a_un = a.unweighted_avg.unwrap_or(f64::NEG_INFINITY);
            let b_un = b.unweighted_avg.unwrap_or(f64::NEG_INFINITY);
            b_un.partial_cmp(&a_un)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let a_w = a.weighted_avg.unwrap_or(f64::NEG_INFINITY);
                    let b_w = b.weighted_avg.unwrap_or(f64::NEG_INFINITY);
                    b_w.partial_cmp(&a_w).unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.student_id.cmp(&b.student_id))
        });

        let mut ranked = Vec::with_capacity(recaps.len());
        for (idx, recap) in recaps.iter().enumerate() {
            let rank = idx as i32 + 1;
            self.recap_repo
                .update_rank(&recap.student_id, academic_level, academic_year, rank)?;
            ranked.push(RankedStudent {
                rank,
                student_id: recap.student_id.clone(),
                unweighted_avg: recap.unweighted_avg,
                weighted_avg: recap.weighted_avg,
            });
        }

        tracing::info!(
            academic_level = %academic_level,
            academic_year = %academic_year,
            student_count = ranked.len(),
            "层级排名已回写"
        );

        Ok(ranked)
    }
}
