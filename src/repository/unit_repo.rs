// ==========================================
// 成绩聚合与评议引擎 - 教学单元/评估组成仓储
// ==========================================
// 红线: Repository 不含业务逻辑
//       （权重闭合、归档不可变等规则由配置 API 层把关）
// ==========================================

use crate::domain::types::{ComponentKind, UnitStatus};
use crate::domain::unit::{EvaluationComponent, TeachingUnit};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::conv_err;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// TeachingUnitRepository - 教学单元仓储
// ==========================================
pub struct TeachingUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeachingUnitRepository {
    /// 创建新的TeachingUnitRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建教学单元
    pub fn create(&self, unit: &TeachingUnit) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO teaching_unit (
                code, name, academic_level, program, credits,
                academic_year, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &unit.code,
                &unit.name,
                &unit.academic_level,
                &unit.program,
                &unit.credits,
                &unit.academic_year,
                unit.status.to_db_str(),
                &unit.created_at,
                &unit.updated_at,
            ],
        )?;

        Ok(unit.code.clone())
    }

    /// 按代码查询教学单元
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<TeachingUnit>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT code, name, academic_level, program, credits,
                      academic_year, status, created_at, updated_at
               FROM teaching_unit
               WHERE code = ?"#,
            params![code],
            |row| Self::map_row(row),
        ) {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某层级/学年的全部教学单元
    pub fn list_by_level_year(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> RepositoryResult<Vec<TeachingUnit>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT code, name, academic_level, program, credits,
                      academic_year, status, created_at, updated_at
               FROM teaching_unit
               WHERE academic_level = ? AND academic_year = ?
               ORDER BY code"#,
        )?;

        let units = stmt
            .query_map(params![academic_level, academic_year], |row| {
                Self::map_row(row)
            })?
            .collect::<Result<Vec<TeachingUnit>, _>>()?;

        Ok(units)
    }

    /// 更新教学单元（全量覆盖，按主键）
    pub fn update(&self, unit: &TeachingUnit) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE teaching_unit
               SET name = ?, academic_level = ?, program = ?, credits = ?,
                   academic_year = ?, status = ?, updated_at = ?
               WHERE code = ?"#,
            params![
                &unit.name,
                &unit.academic_level,
                &unit.program,
                &unit.credits,
                &unit.academic_year,
                unit.status.to_db_str(),
                &unit.updated_at,
                &unit.code,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TeachingUnit".to_string(),
                id: unit.code.clone(),
            });
        }

        Ok(())
    }

    /// 删除教学单元（历史校验由配置 API 层完成）
    pub fn delete(&self, code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute("DELETE FROM teaching_unit WHERE code = ?", params![code])?;

        Ok(())
    }

    /// 映射数据库行到TeachingUnit对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TeachingUnit> {
        let status_str: String = row.get(6)?;
        Ok(TeachingUnit {
            code: row.get(0)?,
            name: row.get(1)?,
            academic_level: row.get(2)?,
            program: row.get(3)?,
            credits: row.get(4)?,
            academic_year: row.get(5)?,
            status: UnitStatus::from_str(&status_str),
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

// ==========================================
// EvaluationComponentRepository - 评估组成仓储
// ==========================================
pub struct EvaluationComponentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EvaluationComponentRepository {
    /// 创建新的EvaluationComponentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建评估组成
    pub fn create(&self, component: &EvaluationComponent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO evaluation_component (
                component_id, unit_code, kind, name, weight_pct, point_scale, ordering
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &component.component_id,
                &component.unit_code,
                component.kind.to_db_str(),
                &component.name,
                &component.weight_pct,
                &component.point_scale,
                &component.ordering,
            ],
        )?;

        Ok(component.component_id.clone())
    }

    /// 更新评估组成（全量覆盖，按主键）
    pub fn update(&self, component: &EvaluationComponent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE evaluation_component
               SET kind = ?, name = ?, weight_pct = ?, point_scale = ?, ordering = ?
               WHERE component_id = ?"#,
            params![
                component.kind.to_db_str(),
                &component.name,
                &component.weight_pct,
                &component.point_scale,
                &component.ordering,
                &component.component_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "EvaluationComponent".to_string(),
                id: component.component_id.clone(),
            });
        }

        Ok(())
    }

    /// 按标识查询评估组成
    pub fn find_by_id(&self, component_id: &str) -> RepositoryResult<Option<EvaluationComponent>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT component_id, unit_code, kind, name, weight_pct, point_scale, ordering
               FROM evaluation_component
               WHERE component_id = ?"#,
            params![component_id],
            |row| Self::map_row(row),
        ) {
            Ok(component) => Ok(Some(component)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询教学单元的全部评估组成（按展示顺序）
    pub fn find_by_unit(&self, unit_code: &str) -> RepositoryResult<Vec<EvaluationComponent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT component_id, unit_code, kind, name, weight_pct, point_scale, ordering
               FROM evaluation_component
               WHERE unit_code = ?
               ORDER BY ordering, kind"#,
        )?;

        let components = stmt
            .query_map(params![unit_code], |row| Self::map_row(row))?
            .collect::<Result<Vec<EvaluationComponent>, _>>()?;

        Ok(components)
    }

    /// 删除评估组成
    pub fn delete(&self, component_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "DELETE FROM evaluation_component WHERE component_id = ?",
            params![component_id],
        )?;

        Ok(())
    }

    /// 映射数据库行到EvaluationComponent对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<EvaluationComponent> {
        let kind_str: String = row.get(2)?;
        Ok(EvaluationComponent {
            component_id: row.get(0)?,
            unit_code: row.get(1)?,
            kind: ComponentKind::from_str(&kind_str)
                .ok_or_else(|| conv_err(2, &format!("未知的评估组成类别: {}", kind_str)))?,
            name: row.get(3)?,
            weight_pct: row.get(4)?,
            point_scale: row.get(5)?,
            ordering: row.get(6)?,
        })
    }
}
