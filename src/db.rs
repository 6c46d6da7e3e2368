// ==========================================
// 成绩聚合与评议引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供内置建表脚本，保证引擎/测试/运维工具使用同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema
///
/// 唯一约束（与仓储层 UPSERT 语义一一对应）：
/// - evaluation_entry: (student_id, component_id) —— 重复提交走更新而非新增
/// - evaluation_component: (unit_code, kind)
/// - final_grade: (student_id, unit_code, academic_year)
/// - student_recap: (student_id, academic_level, academic_year)
/// - ue_statistics: (unit_code, academic_year)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS student (
            student_id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            academic_level TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS teaching_unit (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            academic_level TEXT NOT NULL,
            program TEXT NOT NULL,
            credits INTEGER NOT NULL CHECK (credits > 0 AND credits <= 60),
            academic_year TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS evaluation_component (
            component_id TEXT PRIMARY KEY,
            unit_code TEXT NOT NULL REFERENCES teaching_unit(code),
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            weight_pct REAL NOT NULL CHECK (weight_pct >= 0 AND weight_pct <= 100),
            point_scale REAL NOT NULL DEFAULT 20,
            ordering INTEGER NOT NULL DEFAULT 0,
            UNIQUE (unit_code, kind)
        );

        CREATE TABLE IF NOT EXISTS evaluation_entry (
            entry_id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES student(student_id),
            component_id TEXT NOT NULL REFERENCES evaluation_component(component_id),
            mark REAL NOT NULL,
            mark_over_20 REAL NOT NULL,
            entry_date TEXT NOT NULL,
            author TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PROVISIONAL',
            mode TEXT NOT NULL DEFAULT 'MANUAL',
            comment TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (student_id, component_id)
        );

        CREATE TABLE IF NOT EXISTS final_grade (
            student_id TEXT NOT NULL,
            unit_code TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            grade REAL NOT NULL,
            capitalized INTEGER NOT NULL,
            mention TEXT NOT NULL,
            computation_version INTEGER NOT NULL DEFAULT 1,
            computed_at TEXT NOT NULL,
            UNIQUE (student_id, unit_code, academic_year)
        );

        CREATE TABLE IF NOT EXISTS student_recap (
            student_id TEXT NOT NULL,
            academic_level TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            unweighted_avg REAL,
            weighted_avg REAL,
            capitalization_pct REAL NOT NULL DEFAULT 0,
            ue_capitalized INTEGER NOT NULL DEFAULT 0,
            ue_total INTEGER NOT NULL DEFAULT 0,
            credits_obtained INTEGER NOT NULL DEFAULT 0,
            credits_total INTEGER NOT NULL DEFAULT 0,
            rank INTEGER,
            subject_to_deliberation INTEGER NOT NULL DEFAULT 0,
            eligible_for_deliberation INTEGER NOT NULL DEFAULT 0,
            has_been_deliberated INTEGER NOT NULL DEFAULT 0,
            decision TEXT,
            mention TEXT,
            computed_at TEXT NOT NULL,
            UNIQUE (student_id, academic_level, academic_year)
        );

        CREATE TABLE IF NOT EXISTS ue_statistics (
            unit_code TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            grade_count INTEGER NOT NULL,
            mean REAL NOT NULL,
            std_dev REAL NOT NULL,
            min REAL NOT NULL,
            max REAL NOT NULL,
            q1 REAL NOT NULL,
            median REAL NOT NULL,
            q3 REAL NOT NULL,
            pass_count INTEGER NOT NULL,
            fail_count INTEGER NOT NULL,
            pass_rate REAL NOT NULL,
            computed_at TEXT NOT NULL,
            UNIQUE (unit_code, academic_year)
        );

        CREATE TABLE IF NOT EXISTS deliberation_params (
            academic_level TEXT PRIMARY KEY,
            min_capitalization_pct REAL NOT NULL,
            max_non_capitalized INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;
    Ok(())
}
