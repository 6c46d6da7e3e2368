// ==========================================
// 成绩聚合与评议引擎 - 最终成绩仓储
// ==========================================
// 键: (student_id, unit_code, academic_year) 唯一
// 说明: 是否写入由聚合引擎决定（结果未变化时保持行字节不变）
// ==========================================

use crate::domain::grade::FinalGrade;
use crate::domain::types::Mention;
use crate::repository::conv_err;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// FinalGradeRepository - 最终成绩仓储
// ==========================================
pub struct FinalGradeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FinalGradeRepository {
    /// 创建新的FinalGradeRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按键查询最终成绩
    pub fn find(
        &self,
        student_id: &str,
        unit_code: &str,
        academic_year: &str,
    ) -> RepositoryResult<Option<FinalGrade>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT student_id, unit_code, academic_year, grade, capitalized,
                      mention, computation_version, computed_at
               FROM final_grade
               WHERE student_id = ? AND unit_code = ? AND academic_year = ?"#,
            params![student_id, unit_code, academic_year],
            |row| Self::map_row(row),
        ) {
            Ok(grade) => Ok(Some(grade)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 首次写入最终成绩（computation_version = 1）
    pub fn insert(&self, grade: &FinalGrade) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO final_grade (
                student_id, unit_code, academic_year, grade, capitalized,
                mention, computation_version, computed_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?)"#,
            params![
                &grade.student_id,
                &grade.unit_code,
                &grade.academic_year,
                &grade.grade,
                grade.capitalized,
                grade.mention.to_db_str(),
                &grade.computed_at,
            ],
        )?;

        Ok(())
    }

    /// 覆盖最终成绩并递增计算版本
    pub fn overwrite(&self, grade: &FinalGrade) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE final_grade
               SET grade = ?, capitalized = ?, mention = ?,
                   computation_version = computation_version + 1, computed_at = ?
               WHERE student_id = ? AND unit_code = ? AND academic_year = ?"#,
            params![
                &grade.grade,
                grade.capitalized,
                grade.mention.to_db_str(),
                &grade.computed_at,
                &grade.student_id,
                &grade.unit_code,
                &grade.academic_year,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "FinalGrade".to_string(),
                id: format!(
                    "{}/{}/{}",
                    grade.student_id, grade.unit_code, grade.academic_year
                ),
            });
        }

        Ok(())
    }

    /// 删除最终成绩（合格账本行清空时由聚合引擎调用）
    pub fn delete(
        &self,
        student_id: &str,
        unit_code: &str,
        academic_year: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"DELETE FROM final_grade
               WHERE student_id = ? AND unit_code = ? AND academic_year = ?"#,
            params![student_id, unit_code, academic_year],
        )?;

        Ok(rows_affected > 0)
    }

    /// 查询教学单元/学年的全部最终成绩
    pub fn list_by_unit_year(
        &self,
        unit_code: &str,
        academic_year: &str,
    ) -> RepositoryResult<Vec<FinalGrade>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT student_id, unit_code, academic_year, grade, capitalized,
                      mention, computation_version, computed_at
               FROM final_grade
               WHERE unit_code = ? AND academic_year = ?
               ORDER BY student_id"#,
        )?;

        let grades = stmt
            .query_map(params![unit_code, academic_year], |row| Self::map_row(row))?
            .collect::<Result<Vec<FinalGrade>, _>>()?;

        Ok(grades)
    }

    /// 映射数据库行到FinalGrade对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<FinalGrade> {
        let mention_str: String = row.get(5)?;
        Ok(FinalGrade {
            student_id: row.get(0)?,
            unit_code: row.get(1)?,
            academic_year: row.get(2)?,
            grade: row.get(3)?,
            capitalized: row.get(4)?,
            mention: Mention::from_str(&mention_str)
                .ok_or_else(|| conv_err(5, &format!("未知的评定等级: {}", mention_str)))?,
            computation_version: row.get(6)?,
            computed_at: row.get(7)?,
        })
    }
}
