// ==========================================
// 成绩聚合与评议引擎 - 单元统计仓储
// ==========================================
// 键: (unit_code, academic_year) 唯一
// ==========================================

use crate::domain::grade::UeStatistics;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// UeStatisticsRepository - 单元统计仓储
// ==========================================
pub struct UeStatisticsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UeStatisticsRepository {
    /// 创建新的UeStatisticsRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按键查询单元统计
    pub fn find(
        &self,
        unit_code: &str,
        academic_year: &str,
    ) -> RepositoryResult<Option<UeStatistics>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT unit_code, academic_year, grade_count, mean, std_dev,
                      min, max, q1, median, q3, pass_count, fail_count, pass_rate, computed_at
               FROM ue_statistics
               WHERE unit_code = ? AND academic_year = ?"#,
            params![unit_code, academic_year],
            |row| Self::map_row(row),
        ) {
            Ok(stats) => Ok(Some(stats)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入或覆盖单元统计（按键 UPSERT）
    pub fn upsert(&self, stats: &UeStatistics) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO ue_statistics (
                unit_code, academic_year, grade_count, mean, std_dev,
                min, max, q1, median, q3, pass_count, fail_count, pass_rate, computed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (unit_code, academic_year) DO UPDATE SET
                grade_count = excluded.grade_count,
                mean = excluded.mean,
                std_dev = excluded.std_dev,
                min = excluded.min,
                max = excluded.max,
                q1 = excluded.q1,
                median = excluded.median,
                q3 = excluded.q3,
                pass_count = excluded.pass_count,
                fail_count = excluded.fail_count,
                pass_rate = excluded.pass_rate,
                computed_at = excluded.computed_at"#,
            params![
                &stats.unit_code,
                &stats.academic_year,
                &stats.grade_count,
                &stats.mean,
                &stats.std_dev,
                &stats.min,
                &stats.max,
                &stats.q1,
                &stats.median,
                &stats.q3,
                &stats.pass_count,
                &stats.fail_count,
                &stats.pass_rate,
                &stats.computed_at,
            ],
        )?;

        Ok(())
    }

    /// 映射数据库行到UeStatistics对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<UeStatistics> {
        Ok(UeStatistics {
            unit_code: row.get(0)?,
            academic_year: row.get(1)?,
            grade_count: row.get(2)?,
            mean: row.get(3)?,
            std_dev: row.get(4)?,
            min: row.get(5)?,
            max: row.get(6)?,
            q1: row.get(7)?,
            median: row.get(8)?,
            q3: row.get(9)?,
            pass_count: row.get(10)?,
            fail_count: row.get(11)?,
            pass_rate: row.get(12)?,
            computed_at: row.get(13)?,
        })
    }
}
