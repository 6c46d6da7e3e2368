// ==========================================
// 成绩聚合与评议引擎 - 学籍仓储
// ==========================================
// 用途: 引用校验（UnknownStudent）与层级内学生枚举
// ==========================================

use crate::domain::student::Student;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// StudentRepository - 学籍仓储
// ==========================================
pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepository {
    /// 创建新的StudentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记学生（外部学籍系统写入口）
    pub fn create(&self, student: &Student) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO student (
                student_id, full_name, academic_level, academic_year, created_at
            ) VALUES (?, ?, ?, ?, ?)"#,
            params![
                &student.student_id,
                &student.full_name,
                &student.academic_level,
                &student.academic_year,
                &student.created_at,
            ],
        )?;

        Ok(student.student_id.clone())
    }

    /// 按学号查询
    pub fn find_by_id(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT student_id, full_name, academic_level, academic_year, created_at
               FROM student
               WHERE student_id = ?"#,
            params![student_id],
            |row| Self::map_row(row),
        ) {
            Ok(student) => Ok(Some(student)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某层级/学年的全部学生
    pub fn list_by_level_year(
        &self,
        academic_level: &str,
        academic_year: &str,
    ) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT student_id, full_name, academic_level, academic_year, created_at
               FROM student
               WHERE academic_level = ? AND academic_year = ?
               ORDER BY student_id"#,
        )?;

        let students = stmt
            .query_map(params![academic_level, academic_year], |row| {
                Self::map_row(row)
            })?
            .collect::<Result<Vec<Student>, _>>()?;

        Ok(students)
    }

    /// 映射数据库行到Student对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Student> {
        Ok(Student {
            student_id: row.get(0)?,
            full_name: row.get(1)?,
            academic_level: row.get(2)?,
            academic_year: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
