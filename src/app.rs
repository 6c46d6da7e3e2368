// ==========================================
// 成绩聚合与评议引擎 - 应用装配
// ==========================================
// 职责: 打开数据库、建表、装配仓储 / 引擎 / API 的唯一入口
// 说明: 所有组件共享同一个 Arc<Mutex<Connection>>（统一 PRAGMA）
// ==========================================

use crate::api::config_api::ConfigApi;
use crate::api::deliberation_api::DeliberationApi;
use crate::api::grade_api::GradeApi;
use crate::config::GradingProfile;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::grade::DeliberationParams;
use crate::engine::aggregator::FinalGradeAggregator;
use crate::engine::eligibility::EligibilityEvaluator;
use crate::engine::ledger::EvaluationLedger;
use crate::engine::ranking::RankingEngine;
use crate::engine::recap::RecapCalculator;
use crate::engine::statistics::StatisticsEngine;
use crate::importer::mark_importer::MarkImporterImpl;
use crate::repository::{
    DeliberationParamsRepository, EvaluationComponentRepository, EvaluationEntryRepository,
    FinalGradeRepository, StudentRecapRepository, StudentRepository, TeachingUnitRepository,
    UeStatisticsRepository,
};
use chrono::Utc;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// AppContext - 组件装配上下文
// ==========================================
pub struct AppContext {
    pub conn: Arc<Mutex<Connection>>,

    // ===== 仓储 =====
    pub student_repo: Arc<StudentRepository>,
    pub unit_repo: Arc<TeachingUnitRepository>,
    pub component_repo: Arc<EvaluationComponentRepository>,
    pub entry_repo: Arc<EvaluationEntryRepository>,
    pub grade_repo: Arc<FinalGradeRepository>,
    pub recap_repo: Arc<StudentRecapRepository>,
    pub stats_repo: Arc<UeStatisticsRepository>,
    pub params_repo: Arc<DeliberationParamsRepository>,

    // ===== API 门面 =====
    pub config_api: Arc<ConfigApi>,
    pub grade_api: Arc<GradeApi>,
    pub deliberation_api: Arc<DeliberationApi>,
    pub importer: Arc<MarkImporterImpl>,
}

impl AppContext {
    /// 打开数据库并装配全部组件（内置默认配置）
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        Self::with_profile(db_path, &GradingProfile::default())
    }

    /// 打开数据库并按评分制度配置装配全部组件
    pub fn with_profile(db_path: &str, profile: &GradingProfile) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        if let Some(version) = read_schema_version(&conn)? {
            if version != CURRENT_SCHEMA_VERSION {
                tracing::warn!(
                    found = version,
                    expected = CURRENT_SCHEMA_VERSION,
                    "schema_version 与当前代码不一致"
                );
            }
        }

        let conn = Arc::new(Mutex::new(conn));
        Ok(Self::from_connection_with_profile(conn, profile))
    }

    /// 从已有连接装配（测试与嵌入场景，内置默认配置）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::from_connection_with_profile(conn, &GradingProfile::default())
    }

    /// 从已有连接按评分制度配置装配
    ///
    /// 配置在此处生效: ConfigApi 取默认满分制，导入器取分隔符/表头参数
    pub fn from_connection_with_profile(
        conn: Arc<Mutex<Connection>>,
        profile: &GradingProfile,
    ) -> Self {
        let student_repo = Arc::new(StudentRepository::new(conn.clone()));
        let unit_repo = Arc::new(TeachingUnitRepository::new(conn.clone()));
        let component_repo = Arc::new(EvaluationComponentRepository::new(conn.clone()));
        let entry_repo = Arc::new(EvaluationEntryRepository::new(conn.clone()));
        let grade_repo = Arc::new(FinalGradeRepository::new(conn.clone()));
        let recap_repo = Arc::new(StudentRecapRepository::new(conn.clone()));
        let stats_repo = Arc::new(UeStatisticsRepository::new(conn.clone()));
        let params_repo = Arc::new(DeliberationParamsRepository::new(conn.clone()));

        let ledger = Arc::new(EvaluationLedger::new(
            entry_repo.clone(),
            component_repo.clone(),
            unit_repo.clone(),
            student_repo.clone(),
            None,
        ));
        let aggregator = Arc::new(FinalGradeAggregator::new(
            entry_repo.clone(),
            unit_repo.clone(),
            grade_repo.clone(),
        ));
        let recap_calculator = Arc::new(RecapCalculator::new(
            unit_repo.clone(),
            grade_repo.clone(),
            recap_repo.clone(),
            student_repo.clone(),
        ));
        let ranking_engine = Arc::new(RankingEngine::new(recap_repo.clone()));
        let statistics_engine = Arc::new(StatisticsEngine::new(
            grade_repo.clone(),
            stats_repo.clone(),
        ));
        let eligibility_evaluator = Arc::new(EligibilityEvaluator::new(
            params_repo.clone(),
            recap_repo.clone(),
            recap_calculator.clone(),
        ));

        let config_api = Arc::new(ConfigApi::new(
            unit_repo.clone(),
            component_repo.clone(),
            entry_repo.clone(),
            params_repo.clone(),
            profile.default_point_scale,
        ));
        let grade_api = Arc::new(GradeApi::new(
            ledger,
            aggregator.clone(),
            component_repo.clone(),
            unit_repo.clone(),
            grade_repo.clone(),
        ));
        let deliberation_api = Arc::new(DeliberationApi::new(
            unit_repo.clone(),
            student_repo.clone(),
            aggregator,
            recap_calculator,
            ranking_engine,
            statistics_engine,
            eligibility_evaluator,
        ));
        let importer = Arc::new(MarkImporterImpl::with_options(
            grade_api.clone(),
            component_repo.clone(),
            profile.import.clone(),
        ));

        Self {
            conn,
            student_repo,
            unit_repo,
            component_repo,
            entry_repo,
            grade_repo,
            recap_repo,
            stats_repo,
            params_repo,
            config_api,
            grade_api,
            deliberation_api,
            importer,
        }
    }

    /// 按配置预置评议阈值（已有层级保持不动）
    pub fn seed_deliberation_params(&self, profile: &GradingProfile) -> Result<(), Box<dyn Error>> {
        for seed in &profile.deliberation_seeds {
            if self.params_repo.find_by_level(&seed.academic_level)?.is_some() {
                continue;
            }
            self.params_repo.upsert(&DeliberationParams {
                academic_level: seed.academic_level.clone(),
                min_capitalization_pct: seed.min_capitalization_pct,
                max_non_capitalized: seed.max_non_capitalized,
                updated_at: Utc::now(),
            })?;
            tracing::info!(academic_level = %seed.academic_level, "评议阈值已预置");
        }
        Ok(())
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 GRADE_ENGINE_DB_PATH 优先
/// - 否则使用用户数据目录/grade-engine/grade_engine.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("GRADE_ENGINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./grade_engine.db");

    if let Some(data_dir) = dirs::data_dir() {
        path = data_dir.join("grade-engine");
        std::fs::create_dir_all(&path).ok();
        path = path.join("grade_engine.db");
    }

    path.to_string_lossy().to_string()
}
