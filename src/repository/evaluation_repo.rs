// ==========================================
// 成绩聚合与评议引擎 - 评估账本仓储
// ==========================================
// 红线: 同一 (学生, 组成) 至多一条记录（UNIQUE 约束 + UPSERT 事务）
// 并发控制: version 乐观锁，期望版本不匹配返回 OptimisticLockFailure
// ==========================================

use crate::domain::evaluation::EvaluationEntry;
use crate::domain::types::{EntryMode, EntryStatus};
use crate::repository::conv_err;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// QualifyingMark - 参与聚合的账本行（联查评估组成）
// ==========================================
#[derive(Debug, Clone)]
pub struct QualifyingMark {
    pub component_id: String,
    pub mark_over_20: f64,
    pub weight_pct: f64,
    pub status: EntryStatus,
}

// ==========================================
// EvaluationEntryRepository - 评估账本仓储
// ==========================================
pub struct EvaluationEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EvaluationEntryRepository {
    /// 创建新的EvaluationEntryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按标识查询账本行
    pub fn find_by_id(&self, entry_id: &str) -> RepositoryResult<Option<EvaluationEntry>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE entry_id = ?", SELECT_ENTRY),
            params![entry_id],
            |row| Self::map_row(row),
        ) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 (学生, 组成) 查询账本行
    pub fn find_by_student_component(
        &self,
        student_id: &str,
        component_id: &str,
    ) -> RepositoryResult<Option<EvaluationEntry>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE student_id = ? AND component_id = ?", SELECT_ENTRY),
            params![student_id, component_id],
            |row| Self::map_row(row),
        ) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 成绩 UPSERT（同一事务内查询 + 写入）
    ///
    /// 说明：
    /// - 不存在则插入，version = 1
    /// - 已存在则覆盖 mark/entry_date/comment 等字段，version 恰好 +1，状态保持原值
    /// - 返回写入后的账本行
    pub fn upsert_mark(&self, candidate: &EvaluationEntry) -> RepositoryResult<EvaluationEntry> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let existing_id: Option<String> = match tx.query_row(
            "SELECT entry_id FROM evaluation_entry WHERE student_id = ? AND component_id = ?",
            params![&candidate.student_id, &candidate.component_id],
            |row| row.get(0),
        ) {
            Ok(id) => Some(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let entry_id = match existing_id {
            Some(entry_id) => {
                tx.execute(
                    r#"UPDATE evaluation_entry
                       SET mark = ?, mark_over_20 = ?, entry_date = ?, author = ?,
                           mode = ?, comment = ?, version = version + 1, updated_at = ?
                       WHERE entry_id = ?"#,
                    params![
                        &candidate.mark,
                        &candidate.mark_over_20,
                        &candidate.entry_date,
                        &candidate.author,
                        candidate.mode.to_db_str(),
                        &candidate.comment,
                        &candidate.updated_at,
                        &entry_id,
                    ],
                )?;
                entry_id
            }
            None => {
                tx.execute(
                    r#"INSERT INTO evaluation_entry (
                        entry_id, student_id, component_id, mark, mark_over_20,
                        entry_date, author, status, mode, comment,
                        version, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)"#,
                    params![
                        &candidate.entry_id,
                        &candidate.student_id,
                        &candidate.component_id,
                        &candidate.mark,
                        &candidate.mark_over_20,
                        &candidate.entry_date,
                        &candidate.author,
                        candidate.status.to_db_str(),
                        candidate.mode.to_db_str(),
                        &candidate.comment,
                        &candidate.created_at,
                        &candidate.updated_at,
                    ],
                )?;
                candidate.entry_id.clone()
            }
        };

        let written = tx.query_row(
            &format!("{} WHERE entry_id = ?", SELECT_ENTRY),
            params![&entry_id],
            |row| Self::map_row(row),
        )?;

        tx.commit()?;
        Ok(written)
    }

    /// 更新账本行（带乐观锁检查）
    ///
    /// # 并发控制
    /// 使用乐观锁 (version字段) 防止并发更新冲突
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: version不匹配 (其他写入者已更新)
    /// - `RepositoryError::NotFound`: entry_id不存在
    pub fn update_with_version_check(&self, entry: &EvaluationEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        // 执行更新，带version检查
        let rows_affected = conn.execute(
            r#"UPDATE evaluation_entry
               SET mark = ?, mark_over_20 = ?, entry_date = ?, comment = ?,
                   version = version + 1, updated_at = ?
               WHERE entry_id = ? AND version = ?"#,
            params![
                &entry.mark,
                &entry.mark_over_20,
                &entry.entry_date,
                &entry.comment,
                &entry.updated_at,
                &entry.entry_id,
                &entry.version,
            ],
        )?;

        // 检查是否更新成功
        if rows_affected == 0 {
            // 判断是记录不存在还是version冲突
            let exists: Result<i32, _> = conn.query_row(
                "SELECT version FROM evaluation_entry WHERE entry_id = ?",
                params![&entry.entry_id],
                |row| row.get(0),
            );

            match exists {
                Ok(actual_version) => {
                    // 记录存在，但version不匹配 -> 乐观锁冲突
                    return Err(RepositoryError::OptimisticLockFailure {
                        entry_id: entry.entry_id.clone(),
                        expected: entry.version,
                        actual: actual_version,
                    });
                }
                Err(_) => {
                    // 记录不存在
                    return Err(RepositoryError::NotFound {
                        entity: "EvaluationEntry".to_string(),
                        id: entry.entry_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// 更新账本行状态（状态机校验由账本引擎完成）
    pub fn update_status(
        &self,
        entry_id: &str,
        new_status: EntryStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE evaluation_entry
               SET status = ?, version = version + 1, updated_at = ?
               WHERE entry_id = ?"#,
            params![new_status.to_db_str(), &updated_at, entry_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "EvaluationEntry".to_string(),
                id: entry_id.to_string(),
            });
        }

        Ok(())
    }

    /// 查询参与最终成绩聚合的账本行（FINAL / RETAKE）
    ///
    /// 说明：
    /// - 按组成展示顺序排序，保证重复计算遍历顺序一致
    pub fn list_qualifying_for_unit(
        &self,
        student_id: &str,
        unit_code: &str,
    ) -> RepositoryResult<Vec<QualifyingMark>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT e.component_id, e.mark_over_20, c.weight_pct, e.status
               FROM evaluation_entry e
               JOIN evaluation_component c ON c.component_id = e.component_id
               WHERE e.student_id = ?
                 AND c.unit_code = ?
                 AND e.status IN ('FINAL', 'RETAKE')
               ORDER BY c.ordering, c.kind"#,
        )?;

        let marks = stmt
            .query_map(params![student_id, unit_code], |row| {
                let status_str: String = row.get(3)?;
                Ok(QualifyingMark {
                    component_id: row.get(0)?,
                    mark_over_20: row.get(1)?,
                    weight_pct: row.get(2)?,
                    status: EntryStatus::from_str(&status_str)
                        .ok_or_else(|| conv_err(3, &format!("未知的账本状态: {}", status_str)))?,
                })
            })?
            .collect::<Result<Vec<QualifyingMark>, _>>()?;

        Ok(marks)
    }

    /// 查询组成下的全部账本行
    pub fn list_by_component(&self, component_id: &str) -> RepositoryResult<Vec<EvaluationEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE component_id = ? ORDER BY student_id",
            SELECT_ENTRY
        ))?;

        let entries = stmt
            .query_map(params![component_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<EvaluationEntry>, _>>()?;

        Ok(entries)
    }

    /// 教学单元是否存在评估历史（删除保护用）
    pub fn has_history_for_unit(&self, unit_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM evaluation_entry e
               JOIN evaluation_component c ON c.component_id = e.component_id
               WHERE c.unit_code = ?"#,
            params![unit_code],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// 评估组成是否存在评估历史（删除保护用）
    pub fn has_history_for_component(&self, component_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evaluation_entry WHERE component_id = ?",
            params![component_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// 映射数据库行到EvaluationEntry对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<EvaluationEntry> {
        let status_str: String = row.get(7)?;
        let mode_str: String = row.get(8)?;
        Ok(EvaluationEntry {
            entry_id: row.get(0)?,
            student_id: row.get(1)?,
            component_id: row.get(2)?,
            mark: row.get(3)?,
            mark_over_20: row.get(4)?,
            entry_date: row.get(5)?,
            author: row.get(6)?,
            status: EntryStatus::from_str(&status_str)
                .ok_or_else(|| conv_err(7, &format!("未知的账本状态: {}", status_str)))?,
            mode: EntryMode::from_str(&mode_str),
            comment: row.get(9)?,
            version: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

/// 账本行查询列（与 map_row 列序一致）
const SELECT_ENTRY: &str = r#"SELECT entry_id, student_id, component_id, mark, mark_over_20,
       entry_date, author, status, mode, comment, version, created_at, updated_at
FROM evaluation_entry"#;
