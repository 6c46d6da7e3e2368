// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、测试数据生成
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use grade_engine::app::AppContext;
use grade_engine::config::GradingProfile;
use grade_engine::db::{init_schema, open_sqlite_connection};
use grade_engine::domain::evaluation::RecordEntryRequest;
use grade_engine::domain::grade::DeliberationParams;
use grade_engine::domain::student::Student;
use grade_engine::domain::types::{ComponentKind, EntryMode, EntryStatus, UnitStatus};
use grade_engine::domain::unit::TeachingUnit;
use grade_engine::api::config_api::ComponentSpec;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试连接（统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 创建装配完整的测试上下文
pub fn create_test_context() -> Result<(NamedTempFile, AppContext), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let conn = open_sqlite_connection(&db_path)?;
    let ctx = AppContext::from_connection(Arc::new(Mutex::new(conn)));
    Ok((temp_file, ctx))
}

/// 按指定评分制度配置创建测试上下文
pub fn create_test_context_with_profile(
    profile: &GradingProfile,
) -> Result<(NamedTempFile, AppContext), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let conn = open_sqlite_connection(&db_path)?;
    let ctx = AppContext::from_connection_with_profile(Arc::new(Mutex::new(conn)), profile);
    Ok((temp_file, ctx))
}

/// 登记测试学生
pub fn seed_student(ctx: &AppContext, student_id: &str, level: &str, year: &str) {
    ctx.student_repo
        .create(&Student {
            student_id: student_id.to_string(),
            full_name: format!("测试学生{}", student_id),
            academic_level: level.to_string(),
            academic_year: year.to_string(),
            created_at: Utc::now(),
        })
        .expect("学生登记失败");
}

/// 创建测试教学单元（平时 30% + 正考 70%，均 20 分制）
///
/// # 返回
/// - (平时组成 component_id, 正考组成 component_id)
pub fn seed_unit_with_components(
    ctx: &AppContext,
    code: &str,
    level: &str,
    year: &str,
    credits: i32,
) -> (String, String) {
    let now = Utc::now();
    ctx.config_api
        .create_unit(&TeachingUnit {
            code: code.to_string(),
            name: format!("测试单元{}", code),
            academic_level: level.to_string(),
            program: "INFO".to_string(),
            credits,
            academic_year: year.to_string(),
            status: UnitStatus::Active,
            created_at: now,
            updated_at: now,
        })
        .expect("教学单元创建失败");

    let components = ctx
        .config_api
        .replace_components(
            code,
            &[
                ComponentSpec {
                    kind: ComponentKind::ContinuousAssessment,
                    name: "平时成绩".to_string(),
                    weight_pct: 30.0,
                    point_scale: Some(20.0),
                    ordering: 1,
                },
                ComponentSpec {
                    kind: ComponentKind::NormalSession,
                    name: "正考".to_string(),
                    weight_pct: 70.0,
                    point_scale: Some(20.0),
                    ordering: 2,
                },
            ],
        )
        .expect("评估组成创建失败");

    (
        components[0].component_id.clone(),
        components[1].component_id.clone(),
    )
}

/// 录入一条成绩并直接定稿（PROVISIONAL → FINAL）
pub fn record_final_mark(ctx: &AppContext, student_id: &str, component_id: &str, mark: f64) {
    let entry = ctx
        .grade_api
        .record_entry(&RecordEntryRequest {
            student_id: student_id.to_string(),
            component_id: component_id.to_string(),
            mark,
            entry_date: test_date(),
            author: "teacher01".to_string(),
            mode: EntryMode::Manual,
            comment: None,
        })
        .expect("成绩录入失败");

    ctx.grade_api
        .set_status(&entry.entry_id, EntryStatus::Final, "jury01")
        .expect("定稿失败");
}

/// 写入层级评议阈值
pub fn seed_deliberation_params(ctx: &AppContext, level: &str, min_pct: f64, max_non_cap: i32) {
    ctx.config_api
        .set_deliberation_params(&DeliberationParams {
            academic_level: level.to_string(),
            min_capitalization_pct: min_pct,
            max_non_capitalized: max_non_cap,
            updated_at: Utc::now(),
        })
        .expect("评议阈值写入失败");
}

/// 统一测试日期
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}
