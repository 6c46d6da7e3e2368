// ==========================================
// 成绩聚合与评议引擎 - 维护入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 评议决策支持引擎
// ==========================================

use grade_engine::app::{get_default_db_path, AppContext};
use grade_engine::config::GradingProfile;
use grade_engine::importer::mark_importer::MarkImporter;
use grade_engine::logging;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", grade_engine::APP_NAME);
    tracing::info!("系统版本: {}", grade_engine::VERSION);
    tracing::info!("==================================================");

    // 可选配置文件（GRADE_ENGINE_PROFILE 指向 JSON），装配前加载
    let profile = match std::env::var("GRADE_ENGINE_PROFILE") {
        Ok(path) if !path.trim().is_empty() => {
            match GradingProfile::load_from_file(Path::new(path.trim())) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, path = %path, "配置文件加载失败");
                    return ExitCode::FAILURE;
                }
            }
        }
        _ => GradingProfile::default(),
    };

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let ctx = match AppContext::with_profile(&db_path, &profile) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "初始化失败");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = ctx.seed_deliberation_params(&profile) {
        tracing::error!(error = %e, "评议阈值预置失败");
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("sweep") => {
            let (level, year) = match (args.get(2), args.get(3)) {
                (Some(l), Some(y)) => (l.clone(), y.clone()),
                _ => {
                    eprintln!("用法: grade-engine sweep <层级> <学年>");
                    return ExitCode::FAILURE;
                }
            };
            match ctx.deliberation_api.run_session(&level, &year).await {
                Ok(summary) => {
                    tracing::info!(
                        final_grades_written = summary.final_grades_written,
                        recaps_recomputed = summary.recaps_recomputed,
                        units_with_statistics = summary.units_with_statistics,
                        eligibility_evaluated = summary.eligibility_evaluated,
                        eligible_count = summary.eligible_count,
                        "评议批处理完成"
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "评议批处理失败");
                    ExitCode::FAILURE
                }
            }
        }
        Some("import") => {
            let (file, author) = match (args.get(2), args.get(3)) {
                (Some(f), Some(a)) => (f.clone(), a.clone()),
                _ => {
                    eprintln!("用法: grade-engine import <csv文件> <录入人>");
                    return ExitCode::FAILURE;
                }
            };
            match ctx.importer.import_from_csv(Path::new(&file), &author).await {
                Ok(summary) => {
                    tracing::info!(
                        total_rows = summary.total_rows,
                        ok_count = summary.ok_count,
                        failed_count = summary.failed_count,
                        "成绩导入完成"
                    );
                    for err in &summary.row_errors {
                        tracing::warn!(row = err.row, "{}", err.message);
                    }
                    if summary.failed_count == 0 {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "成绩导入失败");
                    ExitCode::FAILURE
                }
            }
        }
        Some("init") | None => {
            // AppContext::new 已完成建表
            tracing::info!("数据库已就绪");
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("未知命令: {}", other);
            eprintln!("可用命令: init | sweep <层级> <学年> | import <csv文件> <录入人>");
            ExitCode::FAILURE
        }
    }
}
