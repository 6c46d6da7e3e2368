// ==========================================
// 成绩聚合与评议引擎 - 学生汇总仓储
// ==========================================
// 键: (student_id, academic_level, academic_year) 唯一
// 说明: rank / has_been_deliberated 由排名引擎与外部评议流程回写
// ==========================================

use crate::domain::grade::StudentRecap;
use crate::domain::types::{Mention, OverallDecision};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// StudentRecapRepository - 学生汇总仓储
// ==========================================
pub struct StudentRecapRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRecapRepository {
    /// 创建新的StudentRecapRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按键查询学生汇总
    pub fn find(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
    ) -> RepositoryResult<Option<StudentRecap>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "{} WHERE student_id = ? AND academic_level = ? AND academic_year = ?",
                SELECT_RECAP
            ),
            params![student_id, academic_level, academic_year],
            |row| Self::map_row(row),
        ) {
            Ok(recap) => Ok(Some(recap)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入或覆盖学生汇总（按键 UPSERT）
    pub fn upsert(&self, recap: &StudentRecap) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO student_recap (
                student_id, academic_level, academic_year,
                unweighted_avg, weighted_avg, capitalization_pct,
                ue_capitalized, ue_total, credits_obtained, credits_total,
                rank, subject_to_deliberation, eligible_for_deliberation,
                has_been_deliberated, decision, mention, computed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (student_id, academic_level, academic_year) DO UPDATE SET
                unweighted_avg = excluded.unweighted_avg,
                weighted_avg = excluded.weighted_avg,
                capitalization_pct = excluded.capitalization_pct,
                ue_capitalized = excluded.ue_capitalized,
                ue_total = excluded.ue_total,
                credits_obtained = excluded.credits_obtained,
                credits_total = excluded.credits_total,
                rank = excluded.rank,
                subject_to_deliberation = excluded.subject_to_deliberation,
                eligible_for_deliberation = excluded.eligible_for_deliberation,
                has_been_deliberated = excluded.has_been_deliberated,
                decision = excluded.decision,
                mention = excluded.mention,
                computed_at = excluded.computed_at"#,
            params![
                &recap.student_id,
                &recap.academic_level,
                &recap.academic_year,
                &recap.unweighted_avg,
                &recap.weighted_avg,
                &recap.capitalization_pct,
                &recap.ue_capitalized,
                &recap.ue_total,
                &recap.credits_obtained,
                &recap.credits_total,
                &recap.rank,
                recap.subject_to_deliberation,
                recap.eligible_for_deliberation,
                recap.has_been_deliberated,
                recap.decision.map(|d| d.to_db_str()),
                recap.mention.map(|m| m.to_db_str()),
                &recap.computed_at,
            ],
        )?;

        Ok(())
    }

    /// 查询层级/学年的全部学生汇总
    pub fn list_by_level_year(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> RepositoryResult<Vec<StudentRecap>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE academic_level = ? AND academic_year = ? ORDER BY student_id",
            SELECT_RECAP
        ))?;

        let recaps = stmt
            .query_map(params![academic_level, academic_year], |row| {
                Self::map_row(row)
            })?
            .collect::<Result<Vec<StudentRecap>, _>>()?;

        Ok(recaps)
    }

    /// 回写排名（排名引擎专用）
    pub fn update_rank(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
        rank: i32,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE student_recap
               SET rank = ?
               WHERE student_id = ? AND academic_level = ? AND academic_year = ?"#,
            params![rank, student_id, academic_level, academic_year],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "StudentRecap".to_string(),
                id: format!("{}/{}/{}", student_id, academic_level, academic_year),
            });
        }

        Ok(())
    }

    /// 回写评议资格标记（资格评定器专用）
    pub fn update_eligibility_flag(
        &self,
        student_id: &str,
        academic_level: &str,
        academic_year: &str,
        eligible: bool,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE student_recap
               SET eligible_for_deliberation = ?
               WHERE student_id = ? AND academic_level = ? AND academic_year = ?"#,
            params![eligible, student_id, academic_level, academic_year],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "StudentRecap".to_string(),
                id: format!("{}/{}/{}", student_id, academic_level, academic_year),
            });
        }

        Ok(())
    }

    /// 映射数据库行到StudentRecap对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<StudentRecap> {
        Ok(StudentRecap {
            student_id: row.get(0)?,
            academic_level: row.get(1)?,
            academic_year: row.get(2)?,
            unweighted_avg: row.get(3)?,
            weighted_avg: row.get(4)?,
            capitalization_pct: row.get(5)?,
            ue_capitalized: row.get(6)?,
            ue_total: row.get(7)?,
            credits_obtained: row.get(8)?,
            credits_total: row.get(9)?,
            rank: row.get(10)?,
            subject_to_deliberation: row.get(11)?,
            eligible_for_deliberation: row.get(12)?,
            has_been_deliberated: row.get(13)?,
            decision: row
                .get::<_, Option<String>>(14)?
                .and_then(|s| OverallDecision::from_str(&s)),
            mention: row
                .get::<_, Option<String>>(15)?
                .and_then(|s| Mention::from_str(&s)),
            computed_at: row.get(16)?,
        })
    }
}

/// 学生汇总查询列（与 map_row 列序一致）
const SELECT_RECAP: &str = r#"SELECT student_id, academic_level, academic_year,
       unweighted_avg, weighted_avg, capitalization_pct,
       ue_capitalized, ue_total, credits_obtained, credits_total,
       rank, subject_to_deliberation, eligible_for_deliberation,
       has_been_deliberated, decision, mention, computed_at
FROM student_recap"#;
