// ==========================================
// 成绩聚合与评议引擎 - 评议阈值仓储
// ==========================================
// 用途: 教务管理端按层级配置，引擎只读
// ==========================================

use crate::domain::grade::DeliberationParams;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// DeliberationParamsRepository - 评议阈值仓储
// ==========================================
pub struct DeliberationParamsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliberationParamsRepository {
    /// 创建新的DeliberationParamsRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按层级查询评议阈值
    pub fn find_by_level(
        &self,
        academic_level: &str,
    ) -> RepositoryResult<Option<DeliberationParams>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT academic_level, min_capitalization_pct, max_non_capitalized, updated_at
               FROM deliberation_params
               WHERE academic_level = ?"#,
            params![academic_level],
            |row| Self::map_row(row),
        ) {
            Ok(params) => Ok(Some(params)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入或覆盖评议阈值（外部管理端写入口）
    pub fn upsert(&self, params_row: &DeliberationParams) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO deliberation_params (
                academic_level, min_capitalization_pct, max_non_capitalized, updated_at
            ) VALUES (?, ?, ?, ?)
            ON CONFLICT (academic_level) DO UPDATE SET
                min_capitalization_pct = excluded.min_capitalization_pct,
                max_non_capitalized = excluded.max_non_capitalized,
                updated_at = excluded.updated_at"#,
            params![
                &params_row.academic_level,
                &params_row.min_capitalization_pct,
                &params_row.max_non_capitalized,
                &params_row.updated_at,
            ],
        )?;

        Ok(())
    }

    /// 映射数据库行到DeliberationParams对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DeliberationParams> {
        Ok(DeliberationParams {
            academic_level: row.get(0)?,
            min_capitalization_pct: row.get(1)?,
            max_non_capitalized: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}
